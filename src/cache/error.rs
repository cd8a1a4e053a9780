use crate::mzml::MzMLError;

/// Errors raised while building or reading the peak cache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// The source mzML could not be read
    #[error("mzML error: {0}")]
    Source(#[from] MzMLError),

    /// A finished table could not be moved to its final name
    #[error("could not publish cache table: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// Column not found
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Column has an unexpected type
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}
