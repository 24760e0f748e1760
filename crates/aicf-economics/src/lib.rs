//! Pricing, split, epoch budget and settlement planning.

pub mod epoch;
pub mod error;
pub mod pricing;
pub mod settlement;
pub mod split;

pub use epoch::{EpochAccounting, EpochIndex, EpochParams};
pub use error::EconomicsError;
pub use pricing::{PricingError, PricingSchedule, Rounding};
pub use settlement::{PayeeKind, PayoutLine, SettlementPlan, TransferInstruction};
pub use split::{ResidualTarget, Shares, SplitError, SplitPolicy, SplitRule};
