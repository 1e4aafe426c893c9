use async_trait::async_trait;
use parking_lot::RwLock;
use time::OffsetDateTime;

use super::Store;
use crate::structures::{
    errors::SitemetersError,
    model::{validate_elapsed, Measurement, Site},
};

/// Process-local store, used when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    sites: Vec<Site>,
    measurements: Vec<Measurement>,
    next_measurement_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_or_insert_site(&self, name: &str, url: &str) -> Result<Site, SitemetersError> {
        let mut inner = self.inner.write();
        if let Some(site) = inner.sites.iter().find(|s| s.name == name) {
            return Ok(site.clone());
        }
        let site = Site {
            name: name.to_string(),
            permalink: url.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        inner.sites.push(site.clone());
        Ok(site)
    }

    async fn list_sites(&self) -> Result<Vec<Site>, SitemetersError> {
        Ok(self.inner.read().sites.clone())
    }

    async fn delete_site(&self, name: &str) -> Result<Option<(Site, u64)>, SitemetersError> {
        let mut inner = self.inner.write();
        let Some(pos) = inner.sites.iter().position(|s| s.name == name) else {
            return Ok(None);
        };
        let before = inner.measurements.len();
        inner.measurements.retain(|m| m.site != name);
        let removed = (before - inner.measurements.len()) as u64;
        let site = inner.sites.remove(pos);
        Ok(Some((site, removed)))
    }

    async fn recent_measurements(
        &self,
        site: &str,
        limit: i64,
    ) -> Result<Vec<Measurement>, SitemetersError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let inner = self.inner.read();
        let mut measurements: Vec<Measurement> = inner
            .measurements
            .iter()
            .filter(|m| m.site == site)
            .cloned()
            .collect();
        // Newest first; ids break ties between equal timestamps.
        measurements.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        measurements.truncate(limit);
        Ok(measurements)
    }

    async fn record_measurement(
        &self,
        site: &str,
        elapsed_seconds: f64,
    ) -> Result<Measurement, SitemetersError> {
        validate_elapsed(elapsed_seconds)?;
        let mut inner = self.inner.write();
        if !inner.sites.iter().any(|s| s.name == site) {
            return Err(SitemetersError::NotFound(format!("site {}", site)));
        }
        inner.next_measurement_id += 1;
        let measurement = Measurement {
            id: inner.next_measurement_id,
            site: site.to_string(),
            elapsed_seconds,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.measurements.push(measurement.clone());
        Ok(measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::model::DeletionOutcome;

    #[actix_web::test]
    async fn upsert_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.upsert_site("a", "http://a.example").await.unwrap();
        let second = store.upsert_site("a", "http://other.example").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.permalink, "http://a.example");
        assert_eq!(store.list_sites().await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn invalid_registration_creates_nothing() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.upsert_site("", "http://a.example").await,
            Err(SitemetersError::Validation(_))
        ));
        assert!(matches!(
            store.upsert_site("a", "").await,
            Err(SitemetersError::Validation(_))
        ));
        assert!(store.list_sites().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn recent_measurements_are_newest_first() {
        let store = MemoryStore::new();
        store.upsert_site("a", "http://a.example").await.unwrap();
        for elapsed in [0.1, 0.2, 0.3] {
            store.record_measurement("a", elapsed).await.unwrap();
        }

        let elapsed: Vec<f64> = store
            .recent_measurements("a", 10)
            .await
            .unwrap()
            .iter()
            .map(|m| m.elapsed_seconds)
            .collect();
        assert_eq!(elapsed, vec![0.3, 0.2, 0.1]);
    }

    #[actix_web::test]
    async fn recent_measurements_respect_limit_and_site() {
        let store = MemoryStore::new();
        store.upsert_site("a", "http://a.example").await.unwrap();
        store.upsert_site("b", "http://b.example").await.unwrap();
        for i in 0..15 {
            store.record_measurement("a", i as f64).await.unwrap();
        }
        store.record_measurement("b", 1.5).await.unwrap();

        let recent = store.recent_measurements("a", 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].elapsed_seconds, 14.0);
        assert_eq!(recent[9].elapsed_seconds, 5.0);
        assert!(recent.iter().all(|m| m.site == "a"));
        assert!(recent
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
    }

    #[actix_web::test]
    async fn record_measurement_checks_site_and_value() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.record_measurement("ghost", 0.1).await,
            Err(SitemetersError::NotFound(_))
        ));
        store.upsert_site("a", "http://a.example").await.unwrap();
        assert!(matches!(
            store.record_measurement("a", -1.0).await,
            Err(SitemetersError::Validation(_))
        ));
    }

    #[actix_web::test]
    async fn delete_cascades_and_skips_missing_ids() {
        let store = MemoryStore::new();
        store.upsert_site("a", "http://a.example").await.unwrap();
        store.upsert_site("b", "http://b.example").await.unwrap();
        store.record_measurement("a", 0.1).await.unwrap();
        store.record_measurement("a", 0.2).await.unwrap();
        store.record_measurement("b", 0.3).await.unwrap();

        let outcomes = store
            .delete_sites(&["ghost".to_string(), "a".to_string()])
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            outcomes[0],
            DeletionOutcome::NotFound {
                id: "ghost".into()
            }
        );
        assert!(matches!(
            &outcomes[1],
            DeletionOutcome::Deleted { site, measurements_removed: 2 } if site.name == "a"
        ));
        assert!(store.recent_measurements("a", 10).await.unwrap().is_empty());
        let remaining: Vec<String> = store
            .list_sites()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(remaining, vec!["b".to_string()]);
        assert_eq!(store.recent_measurements("b", 10).await.unwrap().len(), 1);
    }
}
