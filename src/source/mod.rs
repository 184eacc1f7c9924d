pub mod desktop;

use thiserror::Error;

use crate::app::RawAppEntry;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("package not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Enumerates the applications installed on the host.
///
/// Implementations do blocking I/O; the catalog only calls them from
/// blocking worker threads.
pub trait DirectorySource: Send + Sync {
    fn name(&self) -> &str;
    fn enumerate_all(&self) -> Result<Vec<RawAppEntry>, SourceError>;
    /// Resolve a single package, failing with `SourceError::NotFound` when it
    /// is not installed.
    fn resolve_one(&self, package_id: &str) -> Result<RawAppEntry, SourceError>;
}
