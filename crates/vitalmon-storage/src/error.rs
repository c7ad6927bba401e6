use vitalmon_alert::error::StoreError;

/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use vitalmon_storage::error::StorageError;
///
/// let err = StorageError::UnexpectedColumnValue {
///     column: "alert_level",
///     value: 9,
/// };
/// assert!(err.to_string().contains("alert_level"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An underlying SQLite error.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to prepare the data directory.
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A coded column held a value outside its known range.
    #[error("Storage: unexpected value {value} in column '{column}'")]
    UnexpectedColumnValue { column: &'static str, value: i64 },
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        StoreError::Backend(Box::new(e))
    }
}
