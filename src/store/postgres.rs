use async_trait::async_trait;
use log::info;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::Store;
use crate::structures::{
    errors::SitemetersError,
    model::{validate_elapsed, Measurement, Site},
};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, SitemetersError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::from_pool(pool))
    }

    /// Wraps an already migrated pool.
    pub fn from_pool(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_or_insert_site(&self, name: &str, url: &str) -> Result<Site, SitemetersError> {
        sqlx::query(
            "insert into sites(name, permalink) values ($1, $2) on conflict (name) do nothing",
        )
        .bind(name)
        .bind(url)
        .execute(&self.pool)
        .await?;

        Ok(
            sqlx::query_as("select name, permalink, created_at from sites where name = $1")
                .bind(name)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn list_sites(&self) -> Result<Vec<Site>, SitemetersError> {
        Ok(
            sqlx::query_as("select name, permalink, created_at from sites order by created_at, name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn delete_site(&self, name: &str) -> Result<Option<(Site, u64)>, SitemetersError> {
        let mut tx = self.pool.begin().await?;

        let site: Option<Site> = sqlx::query_as(
            "select name, permalink, created_at from sites where name = $1 for update",
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(site) = site else {
            tx.rollback().await?;
            return Ok(None);
        };

        let removed = sqlx::query("delete from measurements where site = $1")
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("delete from sites where name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some((site, removed)))
    }

    async fn recent_measurements(
        &self,
        site: &str,
        limit: i64,
    ) -> Result<Vec<Measurement>, SitemetersError> {
        Ok(sqlx::query_as(
            r#"
              select id, site, elapsed_seconds, created_at from measurements
              where site = $1
              order by created_at desc, id desc
              limit $2
            "#,
        )
        .bind(site)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn record_measurement(
        &self,
        site: &str,
        elapsed_seconds: f64,
    ) -> Result<Measurement, SitemetersError> {
        validate_elapsed(elapsed_seconds)?;
        let inserted: Option<Measurement> = sqlx::query_as(
            r#"
              with site_row as (
                  select name from sites where name = $1
              )
              insert into measurements(site, elapsed_seconds)
              select name, $2 from site_row
              returning id, site, elapsed_seconds, created_at
            "#,
        )
        .bind(site)
        .bind(elapsed_seconds)
        .fetch_optional(&self.pool)
        .await?;
        inserted.ok_or_else(|| SitemetersError::NotFound(format!("site {}", site)))
    }
}
