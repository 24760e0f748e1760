//! Provider record as held by the registry (see spec §3 Provider).

use std::collections::{HashMap, HashSet};

use aicf_core::{BlockHeight, Capability, ProviderId, ProviderStatus, TimestampMs, TokenAmount};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingUnlock {
    pub amount: TokenAmount,
    pub release_height: BlockHeight,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub provider_id: ProviderId,
    pub capabilities: Capability,
    pub endpoints: HashMap<String, String>,
    pub region: Option<String>,
    pub status: ProviderStatus,
    pub stake_total: TokenAmount,
    pub stake_pending_unlocks: Vec<PendingUnlock>,
    pub jail_until_height: BlockHeight,
    pub last_heartbeat: Option<TimestampMs>,
    pub health_score: f64,
    /// Set once a capability upgrade has failed `ensure_minimum`; cleared only
    /// by a fresh successful check (capability upgrade guard, §4.2).
    pub quantum_upgrade_blocked: bool,
    /// Algorithms/models this provider declares support for; empty means
    /// "supports anything" (no declared restriction).
    pub supported_algorithms: HashSet<String>,
}

impl ProviderRecord {
    pub fn new(
        provider_id: ProviderId,
        capabilities: Capability,
        endpoints: HashMap<String, String>,
        region: Option<String>,
        stake_total: TokenAmount,
    ) -> Self {
        Self {
            provider_id,
            capabilities,
            endpoints,
            region,
            status: ProviderStatus::Active,
            stake_total,
            stake_pending_unlocks: Vec::new(),
            jail_until_height: 0,
            last_heartbeat: None,
            health_score: 1.0,
            quantum_upgrade_blocked: false,
            supported_algorithms: HashSet::new(),
        }
    }

    /// `stake_total` minus pending unlocks whose `release_height` is still
    /// in the future relative to `current_height`.
    pub fn effective_stake(&self, current_height: BlockHeight) -> TokenAmount {
        let locked: TokenAmount = self
            .stake_pending_unlocks
            .iter()
            .filter(|u| u.release_height > current_height)
            .map(|u| u.amount)
            .sum();
        self.stake_total.saturating_sub(locked)
    }

    pub fn supports(&self, required: Capability) -> bool {
        self.capabilities.contains(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ProviderRecord {
        ProviderRecord::new(
            ProviderId::from_bytes([1u8; 32]),
            Capability::AI,
            Default::default(),
            None,
            10_000,
        )
    }

    #[test]
    fn effective_stake_excludes_future_unlocks() {
        let mut p = provider();
        p.stake_pending_unlocks.push(PendingUnlock {
            amount: 4_000,
            release_height: 100,
        });
        assert_eq!(p.effective_stake(50), 6_000);
        assert_eq!(p.effective_stake(100), 10_000);
        assert_eq!(p.effective_stake(200), 10_000);
    }

    #[test]
    fn supports_checks_capability_bit() {
        let p = provider();
        assert!(p.supports(Capability::AI));
        assert!(!p.supports(Capability::QUANTUM));
        assert!(!p.supports(Capability::AI | Capability::QUANTUM));
    }
}
