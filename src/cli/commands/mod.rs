mod releases;
mod reset;

pub use releases::cmd_releases;
pub use reset::{BOOTSTRAP_ACCOUNT_ID, ResetCredentials, cmd_reset, reset_bootstrap_account};
