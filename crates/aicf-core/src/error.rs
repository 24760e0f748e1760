//! Root error taxonomy. Subsystem crates define narrower enums and convert
//! into `AicfError` at the crate boundary; the RPC layer maps `AicfError`
//! onto stable wire codes (see `aicf-rpc`).

use thiserror::Error;

use crate::types::{BlockHeight, JobId, ProviderId, TokenAmount};

#[derive(Debug, Error)]
pub enum AicfError {
    // ---- Registry ----------------------------------------------------
    #[error("provider denied by allowlist")]
    RegistryDenied,
    #[error("attestation invalid")]
    AttestationInvalid,
    #[error("provider not found: {0}")]
    ProviderNotFound(ProviderId),

    // ---- Staking ------------------------------------------------------
    #[error("insufficient stake: required {required}, actual {actual}")]
    InsufficientStake {
        required: TokenAmount,
        actual: TokenAmount,
    },

    // ---- Queue / lease --------------------------------------------------
    #[error("job expired: {job_id}")]
    JobExpired {
        job_id: JobId,
        expiry_height: Option<BlockHeight>,
    },
    #[error("lease lost for job {job_id}")]
    LeaseLost {
        job_id: JobId,
        previous_holder: Option<ProviderId>,
    },

    // ---- Completion -----------------------------------------------------
    #[error("schema invalid: {0}")]
    SchemaInvalid(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("proof invalid: {0}")]
    ProofInvalid(String),

    // ---- Treasury -------------------------------------------------------
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: TokenAmount,
        available: TokenAmount,
    },
    #[error("escrow not found")]
    EscrowNotFound,
    #[error("escrow already closed")]
    EscrowAlreadyClosed,

    // ---- RPC --------------------------------------------------------------
    #[error("rate limited")]
    RateLimited { retry_after_ms: Option<u64> },

    // ---- General ------------------------------------------------------
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Other(String),
}
