use crate::contract::ContractValidationError;
use crate::patient::AslStatus;

/// Errors surfaced by the ASL core.
///
/// Everything here is a reported, recoverable condition: validation failures
/// and state conflicts carry enough detail for the caller to correct input or
/// retry, storage failures roll the in-flight transaction back, and nothing
/// is allowed to escape the request boundary as a panic.
#[derive(Debug, thiserror::Error)]
pub enum AslError {
    #[error(transparent)]
    Contract(#[from] ContractValidationError),

    #[error("cannot {action} - current status is {current}")]
    StateConflict {
        action: &'static str,
        current: AslStatus,
    },

    #[error("patient {0} not found")]
    PatientNotFound(i64),
    #[error("prescription {0} not found")]
    PrescriptionNotFound(i64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to create data directory: {0}")]
    DataDirCreation(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize store: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize store: {0}")]
    Deserialization(serde_json::Error),
    #[error("corrupt store row: {0}")]
    CorruptStore(String),
    #[error("store lock poisoned by an earlier panic")]
    LockPoisoned,
}

pub type AslResult<T> = std::result::Result<T, AslError>;
