use aicf_core::{ProviderId, TokenAmount};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("provider denied by allowlist")]
    Denied,
    #[error("attestation invalid")]
    AttestationInvalid,
    #[error("provider not found: {0}")]
    NotFound(ProviderId),
    #[error("provider already registered: {0}")]
    AlreadyRegistered(ProviderId),
    #[error("insufficient stake: required {required}, actual {actual}")]
    InsufficientStake {
        required: TokenAmount,
        actual: TokenAmount,
    },
    #[error("unstake amount must be in (0, total]")]
    InvalidUnstakeAmount,
}
