use thiserror::Error;

#[derive(Debug, Error)]
pub enum EconomicsError {
    #[error(transparent)]
    Pricing(#[from] crate::pricing::PricingError),
    #[error(transparent)]
    Split(#[from] crate::split::SplitError),
}
