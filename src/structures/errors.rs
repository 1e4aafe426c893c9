use actix_web::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitemetersError {
    #[error("IO error\n{0}")]
    Read(#[from] std::io::Error),

    #[error("askama templating error\n{0}")]
    Askama(#[from] askama::Error),

    #[error("reqwest error\n{0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("sqlx error\n{0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("sqlx migrate error\n{0}")]
    SqlxMigrate(#[from] sqlx::migrate::MigrateError),

    #[error("serde_yaml error\n{0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl actix_web::error::ResponseError for SitemetersError {
    fn status_code(&self) -> StatusCode {
        match self {
            SitemetersError::Validation(_) => StatusCode::BAD_REQUEST,
            SitemetersError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::ResponseError;

    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(
            SitemetersError::Validation("empty name".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SitemetersError::NotFound("site a".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SitemetersError::Config("port".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
