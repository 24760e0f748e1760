use aicf_core::ProviderId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlaError {
    #[error("confidence value {0} is not one of the supported levels (0.80/0.90/0.95/0.975/0.99)")]
    UnsupportedConfidence(f64),
    #[error("provider {0} is jailed and cannot be evaluated")]
    ProviderJailed(ProviderId),
    #[error(transparent)]
    Treasury(#[from] aicf_treasury::TreasuryError),
    #[error(transparent)]
    Registry(#[from] aicf_registry::error::RegistryError),
}
