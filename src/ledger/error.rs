use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failures reported by a [`RecordStore`](super::store::RecordStore) or a
/// [`Directory`](crate::registry::Directory).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness or state guard rejected the write.
    #[error("write conflicts with the stored state")]
    Conflict,
    #[error("record {0} not found")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("already checked in today")]
    DuplicateCheckIn,
    #[error("no open check-in found for today")]
    NoOpenCheckIn,
    #[error("record store unavailable")]
    StorageUnavailable(#[source] StoreError),
}

impl LedgerError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        LedgerError::InvalidInput(reason.into())
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        LedgerError::StorageUnavailable(err)
    }
}
