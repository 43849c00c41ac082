//! Compatible proxy-server releases.
//!
//! The feed is newest first. Selection stops at the first release below the
//! version floor instead of filtering, so an out-of-order feed truncates the
//! result.

use std::env::consts::{ARCH, OS};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::clients::github::ReleaseFeed;
use crate::models::release::Release;

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    #[error("Release feed unavailable: {0}")]
    Upstream(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

/// `major.minor.patch`, compared numerically.
///
/// A `-pre` or `+build` suffix is accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemVer {
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for SemVer {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReleaseError::InvalidVersion(s.to_string());

        let core = s.trim().trim_start_matches('v');
        let core = core.split(['-', '+']).next().unwrap_or_default();

        let mut parts = core.split('.');
        let mut next = || -> Result<u64, ReleaseError> {
            parts
                .next()
                .filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)
        };

        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Splits a `<prefix>/v<semver>` tag, returning the semver text.
#[must_use]
pub fn tag_version(tag: &str) -> Option<&str> {
    let mut parts = tag.split("/v");
    let (_, version, rest) = (parts.next()?, parts.next()?, parts.next());
    rest.is_none().then_some(version)
}

/// Lazy iterator over compatible version labels (`v<semver>`).
///
/// Cloning restarts from the clone point; a fresh call to
/// [`select_compatible_versions`] restarts from the top of the feed.
#[derive(Debug, Clone)]
pub struct CompatibleVersions<'a> {
    releases: std::slice::Iter<'a, Release>,
    min_version: SemVer,
    asset_name: &'a str,
    done: bool,
}

impl Iterator for CompatibleVersions<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        for release in self.releases.by_ref() {
            let Some(raw) = tag_version(&release.tag_name) else {
                continue;
            };
            let Ok(version) = raw.parse::<SemVer>() else {
                debug!(tag = %release.tag_name, "Skipping release with malformed version");
                continue;
            };

            if version < self.min_version {
                self.done = true;
                return None;
            }

            if release.has_asset(self.asset_name) {
                return Some(format!("v{raw}"));
            }
        }

        self.done = true;
        None
    }
}

/// Versions in `releases` at or above `min_version` that ship `asset_name`.
pub fn select_compatible_versions<'a>(
    releases: &'a [Release],
    min_version: &str,
    asset_name: &'a str,
) -> Result<CompatibleVersions<'a>, ReleaseError> {
    Ok(CompatibleVersions {
        releases: releases.iter(),
        min_version: min_version.parse()?,
        asset_name,
        done: false,
    })
}

/// Name of the release asset for the running platform, e.g.
/// `hysteria-linux-amd64`.
pub fn platform_asset_name() -> Result<String, ReleaseError> {
    asset_name_for(OS, ARCH)
}

pub fn asset_name_for(os: &str, arch: &str) -> Result<String, ReleaseError> {
    let unsupported = || ReleaseError::UnsupportedPlatform(format!("{os}-{arch}"));

    let os_name = match os {
        "linux" => "linux",
        "macos" => "darwin",
        "windows" => "windows",
        "freebsd" => "freebsd",
        _ => return Err(unsupported()),
    };
    let arch_name = match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "arm" => "arm",
        "s390x" => "s390x",
        "riscv64" => "riscv64",
        _ => return Err(unsupported()),
    };

    let suffix = if os == "windows" { ".exe" } else { "" };
    Ok(format!("hysteria-{os_name}-{arch_name}{suffix}"))
}

/// Fetches the feed and applies the selection.
pub struct ReleaseService {
    feed: Arc<dyn ReleaseFeed>,
    default_min_version: String,
}

impl ReleaseService {
    #[must_use]
    pub fn new(feed: Arc<dyn ReleaseFeed>, default_min_version: String) -> Self {
        Self {
            feed,
            default_min_version,
        }
    }

    #[must_use]
    pub fn default_min_version(&self) -> &str {
        &self.default_min_version
    }

    /// Lists compatible versions, newest first.
    ///
    /// `min_version` and `asset_name` fall back to the configured floor and the
    /// running platform's binary.
    pub async fn list_compatible(
        &self,
        min_version: Option<&str>,
        asset_name: Option<&str>,
    ) -> Result<Vec<String>, ReleaseError> {
        let min_version = min_version.unwrap_or(self.default_min_version.as_str());
        // validate before spending a request on the feed
        min_version.parse::<SemVer>()?;

        let asset_name = match asset_name {
            Some(name) => name.to_string(),
            None => platform_asset_name()?,
        };

        let releases = self
            .feed
            .list_releases()
            .await
            .map_err(|e| ReleaseError::Upstream(format!("{e:#}")))?;

        Ok(select_compatible_versions(&releases, min_version, &asset_name)?.collect())
    }
}
