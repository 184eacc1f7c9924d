use thiserror::Error;

use crate::source::SourceError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("App with package name '{0}' not found.")]
    NotFound(String),

    #[error("{0}")]
    SourceUnavailable(String),

    /// A newer query superseded the task. Never shown to observers.
    #[error("query superseded")]
    Cancelled,
}

impl From<SourceError> for CatalogError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(package_id) => CatalogError::NotFound(package_id),
            other => CatalogError::SourceUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_package() {
        let err: CatalogError = SourceError::NotFound("com.missing".to_string()).into();
        assert_eq!(err, CatalogError::NotFound("com.missing".to_string()));
        assert_eq!(err.to_string(), "App with package name 'com.missing' not found.");
    }

    #[test]
    fn test_other_failures_are_source_unavailable() {
        let err: CatalogError = SourceError::PermissionDenied("/root/apps".to_string()).into();
        assert_eq!(
            err,
            CatalogError::SourceUnavailable("permission denied: /root/apps".to_string())
        );
    }
}
