//! Persistence for sites and their measurements.
//!
//! Handlers and the sampler only see the [`Store`] trait; the backend is
//! picked once at startup.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use log::info;

use crate::structures::{
    errors::SitemetersError,
    model::{validate_registration, DeletionOutcome, Measurement, Site},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Returns the site stored under `name`, inserting it first if absent.
    /// Inputs are already validated.
    async fn get_or_insert_site(&self, name: &str, url: &str) -> Result<Site, SitemetersError>;

    async fn list_sites(&self) -> Result<Vec<Site>, SitemetersError>;

    /// Removes the site and every measurement referencing it. `None` when the
    /// site does not exist.
    async fn delete_site(&self, name: &str) -> Result<Option<(Site, u64)>, SitemetersError>;

    /// Measurements of `site`, newest first, at most `limit`.
    async fn recent_measurements(
        &self,
        site: &str,
        limit: i64,
    ) -> Result<Vec<Measurement>, SitemetersError>;

    async fn record_measurement(
        &self,
        site: &str,
        elapsed_seconds: f64,
    ) -> Result<Measurement, SitemetersError>;

    /// Idempotent registration keyed by name.
    async fn upsert_site(&self, name: &str, url: &str) -> Result<Site, SitemetersError> {
        let (name, url) = validate_registration(name, url)?;
        self.get_or_insert_site(name, url).await
    }

    /// Deletes every id in the batch. Unknown ids are reported and skipped.
    async fn delete_sites(&self, ids: &[String]) -> Result<Vec<DeletionOutcome>, SitemetersError> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            match self.delete_site(id).await? {
                Some((site, measurements_removed)) => {
                    info!(
                        "Deleted site {} with {} measurements",
                        site.name, measurements_removed
                    );
                    outcomes.push(DeletionOutcome::Deleted {
                        site,
                        measurements_removed,
                    });
                }
                None => outcomes.push(DeletionOutcome::NotFound { id: id.clone() }),
            }
        }
        Ok(outcomes)
    }
}
