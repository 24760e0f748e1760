//! Stake accounting: add/increase, delayed unstake requests, maturation,
//! and the per-capability minimum-stake guard. Grounded on the reference
//! `Staking` class — effective stake excludes unlocks not yet matured.

use aicf_core::{BlockHeight, Capability, TokenAmount};

use crate::error::RegistryError;
use crate::provider::{PendingUnlock, ProviderRecord};

#[derive(Clone, Copy, Debug)]
pub struct StakeMinimums {
    pub min_stake_ai: TokenAmount,
    pub min_stake_quantum: TokenAmount,
}

impl Default for StakeMinimums {
    fn default() -> Self {
        Self {
            min_stake_ai: 1_000_000_000,
            min_stake_quantum: 5_000_000_000,
        }
    }
}

impl StakeMinimums {
    pub fn minimum_for(&self, capability: Capability) -> TokenAmount {
        if capability.contains(Capability::QUANTUM) {
            self.min_stake_quantum
        } else {
            self.min_stake_ai
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StakingConfig {
    pub unlock_delay_blocks: BlockHeight,
    pub minimums: StakeMinimums,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            unlock_delay_blocks: 14_400,
            minimums: StakeMinimums::default(),
        }
    }
}

pub fn stake(provider: &mut ProviderRecord, amount: TokenAmount) {
    provider.stake_total = provider.stake_total.saturating_add(amount);
}

/// Appends a pending unlock maturing at `current_height + unlock_delay_blocks`.
/// Rejects if `amount` is not in `(0, stake_total]`.
pub fn request_unstake(
    provider: &mut ProviderRecord,
    amount: TokenAmount,
    current_height: BlockHeight,
    cfg: &StakingConfig,
) -> Result<(), RegistryError> {
    if amount == 0 || amount > provider.stake_total {
        return Err(RegistryError::InvalidUnstakeAmount);
    }
    provider.stake_pending_unlocks.push(PendingUnlock {
        amount,
        release_height: current_height + cfg.unlock_delay_blocks,
    });
    Ok(())
}

/// Matures all pending unlocks whose `release_height <= current_height`,
/// deducting them from `stake_total`. Returns the matured unlocks.
pub fn process_unlocks(
    provider: &mut ProviderRecord,
    current_height: BlockHeight,
) -> Vec<PendingUnlock> {
    let (matured, remaining): (Vec<_>, Vec<_>) = provider
        .stake_pending_unlocks
        .drain(..)
        .partition(|u| u.release_height <= current_height);
    provider.stake_pending_unlocks = remaining;
    for u in &matured {
        provider.stake_total = provider.stake_total.saturating_sub(u.amount);
    }
    matured
}

/// Fails with `insufficient_stake{required, actual}` if effective stake is
/// below the capability-specific minimum. A QUANTUM capability grant must
/// call this first and keeps `quantum_upgrade_blocked` until it succeeds.
pub fn ensure_minimum(
    provider: &mut ProviderRecord,
    capability: Capability,
    current_height: BlockHeight,
    cfg: &StakingConfig,
) -> Result<(), RegistryError> {
    let required = cfg.minimums.minimum_for(capability);
    let actual = provider.effective_stake(current_height);
    if actual < required {
        if capability.contains(Capability::QUANTUM) {
            provider.quantum_upgrade_blocked = true;
        }
        return Err(RegistryError::InsufficientStake { required, actual });
    }
    if capability.contains(Capability::QUANTUM) {
        provider.quantum_upgrade_blocked = false;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ProviderRecord {
        ProviderRecord::new(
            aicf_core::ProviderId::from_bytes([1u8; 32]),
            Capability::AI,
            Default::default(),
            None,
            10_000,
        )
    }

    #[test]
    fn unstake_then_unlock_matures() {
        let mut p = provider();
        let cfg = StakingConfig {
            unlock_delay_blocks: 100,
            ..Default::default()
        };
        request_unstake(&mut p, 4_000, 10, &cfg).unwrap();
        assert_eq!(p.effective_stake(10), 6_000);
        assert_eq!(p.effective_stake(200), 6_000); // still locked until release_height
        let matured = process_unlocks(&mut p, 109);
        assert!(matured.is_empty());
        let matured = process_unlocks(&mut p, 110);
        assert_eq!(matured.len(), 1);
        assert_eq!(p.stake_total, 6_000);
    }

    #[test]
    fn quantum_upgrade_guard_persists_until_fresh_check() {
        let mut p = provider();
        p.stake_total = 1_000;
        let cfg = StakingConfig::default();
        assert!(ensure_minimum(&mut p, Capability::QUANTUM, 0, &cfg).is_err());
        assert!(p.quantum_upgrade_blocked);
        p.stake_total = cfg.minimums.min_stake_quantum;
        assert!(ensure_minimum(&mut p, Capability::QUANTUM, 0, &cfg).is_ok());
        assert!(!p.quantum_upgrade_blocked);
    }
}
