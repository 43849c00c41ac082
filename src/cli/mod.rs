//! Command-line interface for hy2-admin.

mod commands;

use clap::{Parser, Subcommand};

/// hy2-admin - access gateway and subscription server for Hysteria2
#[derive(Parser)]
#[command(name = "hy2-admin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    #[command(alias = "daemon", alias = "-d", alias = "--daemon")]
    Serve,

    /// Replace the bootstrap account's credentials with random ones
    Reset,

    /// List proxy-server releases compatible with the minimum version
    Releases {
        /// Version floor, defaults to hysteria2.min_version
        #[arg(long)]
        min_version: Option<String>,
        /// Required asset name, defaults to this platform's binary
        #[arg(long)]
        asset: Option<String>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
