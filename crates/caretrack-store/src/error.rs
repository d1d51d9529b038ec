use caretrack_core::CareError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Another thread panicked while holding the connection lock.
    #[error("connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for CareError {
    fn from(e: StoreError) -> Self {
        CareError::Database(e.to_string())
    }
}
