use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use super::errors::SitemetersError;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Postgres connection string; the in-memory store is used without one.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: i64,
    /// Sites upserted at startup.
    #[serde(default)]
    pub sites: Vec<SeedSite>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedSite {
    pub name: String,
    pub url: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    5
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_fetch_concurrency() -> usize {
    1
}

fn default_recent_limit() -> i64 {
    10
}

impl Config {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SitemetersError> {
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, SitemetersError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SitemetersError> {
        if self.fetch_timeout_secs == 0 {
            return Err(SitemetersError::Config(
                "fetch_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.fetch_concurrency == 0 {
            return Err(SitemetersError::Config(
                "fetch_concurrency must be at least 1".into(),
            ));
        }
        if self.recent_limit < 1 {
            return Err(SitemetersError::Config(
                "recent_limit must be at least 1".into(),
            ));
        }
        if self.max_connections == 0 {
            return Err(SitemetersError::Config(
                "max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.fetch_concurrency, 1);
        assert_eq!(config.recent_limit, 10);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert!(config.database_url.is_none());
        assert!(config.sites.is_empty());
    }

    #[test]
    fn parses_seed_sites() {
        let config = Config::from_yaml(
            r#"
port: 9000
fetch_concurrency: 4
sites:
  - name: a
    url: http://a.example
  - name: b
    url: https://b.example
"#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.fetch_concurrency, 4);
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.sites[1].url, "https://b.example");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            Config::from_yaml("interval: 60"),
            Err(SitemetersError::SerdeYaml(_))
        ));
    }

    #[test]
    fn zero_values_are_rejected() {
        for yaml in [
            "fetch_timeout_secs: 0",
            "fetch_concurrency: 0",
            "recent_limit: 0",
            "max_connections: 0",
        ] {
            assert!(
                matches!(Config::from_yaml(yaml), Err(SitemetersError::Config(_))),
                "{yaml} should be rejected"
            );
        }
    }
}
