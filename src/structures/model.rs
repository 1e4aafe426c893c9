use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use url::Url;

use super::errors::SitemetersError;

/// A registered target. `name` is the record key.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Site {
    pub name: String,
    pub permalink: String,
    pub created_at: OffsetDateTime,
}

/// One successful timed fetch of a site.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Measurement {
    pub id: i64,
    pub site: String,
    pub elapsed_seconds: f64,
    pub created_at: OffsetDateTime,
}

impl Measurement {
    pub fn created_at_display(&self) -> String {
        format_timestamp(self.created_at)
    }
}

impl Site {
    pub fn created_at_display(&self) -> String {
        format_timestamp(self.created_at)
    }
}

fn format_timestamp(tstamp: OffsetDateTime) -> String {
    tstamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| tstamp.to_string())
}

/// A site together with its most recent measurements, newest first.
#[derive(Debug)]
pub struct SiteReport {
    pub site: Site,
    pub measurements: Vec<Measurement>,
}

/// Result of deleting a single id from a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DeletionOutcome {
    Deleted {
        site: Site,
        measurements_removed: u64,
    },
    NotFound {
        id: String,
    },
}

impl DeletionOutcome {
    pub fn message(&self) -> String {
        match self {
            DeletionOutcome::Deleted {
                site,
                measurements_removed,
            } => format!(
                "deleted : {} ({} measurements)",
                site.name, measurements_removed
            ),
            DeletionOutcome::NotFound { id } => format!("not found : {}", id),
        }
    }
}

/// Checks a registration pair and returns the trimmed values.
pub fn validate_registration<'a>(
    name: &'a str,
    url: &'a str,
) -> Result<(&'a str, &'a str), SitemetersError> {
    let name = name.trim();
    let url = url.trim();
    if name.is_empty() {
        return Err(SitemetersError::Validation("site name is empty".into()));
    }
    if url.is_empty() {
        return Err(SitemetersError::Validation("site url is empty".into()));
    }
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok((name, url)),
        Ok(parsed) => Err(SitemetersError::Validation(format!(
            "unsupported url scheme {}",
            parsed.scheme()
        ))),
        Err(e) => Err(SitemetersError::Validation(format!(
            "malformed url {}: {}",
            url, e
        ))),
    }
}

pub fn validate_elapsed(elapsed_seconds: f64) -> Result<(), SitemetersError> {
    if elapsed_seconds.is_finite() && elapsed_seconds >= 0.0 {
        Ok(())
    } else {
        Err(SitemetersError::Validation(format!(
            "elapsed time must be a non-negative number, got {}",
            elapsed_seconds
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_trimmed() {
        let (name, url) = validate_registration("  a ", " http://a.example ").unwrap();
        assert_eq!(name, "a");
        assert_eq!(url, "http://a.example");
    }

    #[test]
    fn registration_rejects_empty_and_bad_urls() {
        for (name, url) in [
            ("", "http://a.example"),
            ("a", ""),
            ("   ", "http://a.example"),
            ("a", "not a url"),
            ("a", "ftp://a.example"),
        ] {
            assert!(
                matches!(
                    validate_registration(name, url),
                    Err(SitemetersError::Validation(_))
                ),
                "{name:?} / {url:?} should be rejected"
            );
        }
    }

    #[test]
    fn elapsed_must_be_finite_and_non_negative() {
        assert!(validate_elapsed(0.0).is_ok());
        assert!(validate_elapsed(0.05).is_ok());
        assert!(validate_elapsed(-0.1).is_err());
        assert!(validate_elapsed(f64::NAN).is_err());
        assert!(validate_elapsed(f64::INFINITY).is_err());
    }
}
