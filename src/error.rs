use axum::http::StatusCode;
use thiserror::Error;

use crate::scans::repo_types::ScanStatus;

/// Persistence failure. `NotFound` is the domain sentinel, everything else is
/// a storage problem.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("scan not found")]
    NotFound,

    #[error("scan does not belong to user")]
    Forbidden,

    #[error("no image stored for this scan")]
    NoImage,

    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),

    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition { from: ScanStatus, to: ScanStatus },

    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for ScanError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ScanError::NotFound,
            other => ScanError::Repo(other),
        }
    }
}

impl ScanError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScanError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ScanError::NotFound | ScanError::NoImage => StatusCode::NOT_FOUND,
            ScanError::Forbidden => StatusCode::FORBIDDEN,
            ScanError::Storage(_) => StatusCode::BAD_GATEWAY,
            ScanError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ScanError::Repo(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ScanError> for (StatusCode, String) {
    fn from(e: ScanError) -> Self {
        let status = e.status_code();
        if status.is_server_error() {
            tracing::error!(error = %e, "scan request failed");
        }
        (status, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_repo_error_becomes_scan_not_found() {
        assert!(matches!(ScanError::from(RepoError::NotFound), ScanError::NotFound));
        assert!(matches!(
            ScanError::from(RepoError::Corrupt("bad status".into())),
            ScanError::Repo(RepoError::Corrupt(_))
        ));
    }

    #[test]
    fn errors_map_to_http_statuses() {
        let (status, body) = <(StatusCode, String)>::from(ScanError::InvalidInput("bad id".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "bad id");

        let (status, _) = <(StatusCode, String)>::from(ScanError::Forbidden);
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = <(StatusCode, String)>::from(ScanError::Repo(RepoError::Corrupt("x".into())));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
