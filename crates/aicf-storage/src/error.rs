use aicf_core::JobId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job {0} is not in the expected state for this transition")]
    InvalidTransition(JobId),
    #[error("lease mismatch for job {0}")]
    LeaseMismatch(JobId),
    #[error("job {0} is already completed with a different digest")]
    DigestMismatch(JobId),
}
