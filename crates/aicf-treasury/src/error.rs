use aicf_core::{EscrowId, ProviderId, TokenAmount};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreasuryError {
    #[error("provider {provider} has insufficient funds: have {available}, need {required}")]
    InsufficientFunds {
        provider: ProviderId,
        available: TokenAmount,
        required: TokenAmount,
    },
    #[error("provider {provider} has insufficient stake for slash: have staked={staked} available={available}, need {required}")]
    InsufficientStake {
        provider: ProviderId,
        staked: TokenAmount,
        available: TokenAmount,
        required: TokenAmount,
    },
    #[error("escrow {0} not found")]
    EscrowNotFound(EscrowId),
    #[error("escrow {0} already closed")]
    EscrowAlreadyClosed(EscrowId),
    #[error("escrow {0} already open for this provider")]
    EscrowAlreadyOpen(EscrowId),
    #[error("payout {settlement_id}/{payout_id} already applied")]
    DuplicatePayout {
        settlement_id: String,
        payout_id: String,
    },
    #[error("withdrawal request {0} not found")]
    WithdrawalNotFound(u64),
    #[error("withdrawal request {0} is not pending")]
    WithdrawalNotPending(u64),
    #[error("withdrawal request {0} is not owned by provider {1}")]
    WithdrawalNotOwner(u64, ProviderId),
    #[error("withdrawal amount {amount} is below the minimum {min}")]
    WithdrawalBelowMinimum { amount: TokenAmount, min: TokenAmount },
    #[error("withdrawal cooldown active for provider {provider}: next request allowed at height {next_allowed}")]
    WithdrawalCooldown {
        provider: ProviderId,
        next_allowed: aicf_core::BlockHeight,
    },
    #[error("provider {provider} already has {pending} pending withdrawals (max {max})")]
    TooManyPendingWithdrawals {
        provider: ProviderId,
        pending: usize,
        max: usize,
    },
    #[error("withdrawal {0} not yet executable")]
    WithdrawalNotMatured(u64),
}
