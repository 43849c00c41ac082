//! Time-bounded revocation of proxy access.
//!
//! A kick only writes `denied_until`; enforcement happens inside
//! [`crate::services::AccessService`] at validation time, so there is no
//! expiry sweep. Only future validations are refused.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::db::AccountRepository;
use crate::models::account::AccountPatch;

#[derive(Debug, Error)]
pub enum KickError {
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl From<anyhow::Error> for KickError {
    fn from(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }
}

pub struct KickService {
    accounts: Arc<dyn AccountRepository>,
}

impl KickService {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    /// Denies the given accounts until `until_ms` (unix milliseconds).
    ///
    /// Unknown ids are skipped. Returns how many accounts were updated.
    pub async fn kick(&self, ids: &[i64], until_ms: i64) -> Result<usize, KickError> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut updated = 0;
        for id in ids {
            if self
                .accounts
                .update_fields(id, AccountPatch::denied_until(until_ms))
                .await?
            {
                updated += 1;
            } else {
                debug!(account_id = id, "Skipping kick for unknown account");
            }
        }

        metrics::counter!("hysteria2_kicked_accounts_total").increment(updated as u64);
        info!(accounts = updated, until_ms, "Kicked accounts");

        Ok(updated)
    }
}
