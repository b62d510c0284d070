use thiserror::Error;

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Errors that can surface from the resolver's own plumbing.
///
/// Lookups never fail with these; they are raised by the storage port and by
/// selector parsing, and the memory layer logs and absorbs the storage ones.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Reading or writing the memory document failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The memory document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A selector string could not be parsed
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Any other storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}
