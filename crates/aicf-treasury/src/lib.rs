//! Treasury ledger (§4.13), rewards audit (§4.14) and the delayed
//! withdrawal queue (§4.15) — the provider-facing money side of AICF.

pub mod error;
pub mod ledger;
pub mod rewards;
pub mod withdraw;

pub use error::TreasuryError;
pub use ledger::{EscrowHold, EscrowStatus, JournalEntry, LedgerOp, ProviderAccount, TreasuryLedger};
pub use rewards::{credit_id, CreditRecord, PayoutCredit, RewardsAudit};
pub use withdraw::{WithdrawalConfig, WithdrawalQueue, WithdrawalRequest, WithdrawalStatus};
