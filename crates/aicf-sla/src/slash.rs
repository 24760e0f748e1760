//! Slash engine (§4.17): turns a failed SLA window into a stake penalty and,
//! once violations accumulate inside a sliding window, a jail with a cooldown.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use aicf_core::{BlockHeight, ProviderId, ProviderStatus, TokenAmount};
use aicf_registry::Registry;
use aicf_treasury::TreasuryLedger;

use crate::error::SlaError;

#[derive(Clone, Copy, Debug)]
pub struct SlashConfig {
    /// Basis points of effective stake slashed per violation, before the
    /// severity multiplier (10_000 bps == 100%).
    pub base_bps: u32,
    pub min_slash: TokenAmount,
    pub max_slash: TokenAmount,
    /// Number of violations inside `violation_window_blocks` that triggers a
    /// jail.
    pub jail_after: usize,
    pub violation_window_blocks: BlockHeight,
    pub jail_duration_blocks: BlockHeight,
}

impl Default for SlashConfig {
    fn default() -> Self {
        Self {
            base_bps: 500,
            min_slash: 1,
            max_slash: TokenAmount::MAX,
            jail_after: 2,
            violation_window_blocks: 50_000,
            jail_duration_blocks: 5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SlashEvent {
    pub provider_id: ProviderId,
    pub height: BlockHeight,
    pub amount_slashed: TokenAmount,
    pub remaining_stake: TokenAmount,
    pub violations_in_window: usize,
    pub jailed: bool,
    pub jail_until_height: BlockHeight,
}

fn slash_amount(effective_stake: TokenAmount, cfg: &SlashConfig, severity: f64) -> TokenAmount {
    let severity = severity.clamp(0.0, 1.0);
    let base = (effective_stake.saturating_mul(cfg.base_bps as u128)) / 10_000;
    let scaled = ((base as f64) * severity) as u128;
    scaled.clamp(cfg.min_slash, cfg.max_slash).min(effective_stake)
}

/// Tracks sliding violation windows per provider and applies slashes/jails
/// against the shared ledger and registry.
pub struct SlashEngine {
    cfg: SlashConfig,
    violations: Mutex<HashMap<ProviderId, VecDeque<BlockHeight>>>,
}

impl SlashEngine {
    pub fn new(cfg: SlashConfig) -> Self {
        Self {
            cfg,
            violations: Mutex::new(HashMap::new()),
        }
    }

    fn prune_and_count(&self, pid: ProviderId, height: BlockHeight) -> usize {
        let mut g = self.violations.lock().unwrap();
        let q = g.entry(pid).or_default();
        let floor = height.saturating_sub(self.cfg.violation_window_blocks);
        while q.front().is_some_and(|&h| h < floor) {
            q.pop_front();
        }
        q.push_back(height);
        q.len()
    }

    /// Records a failed SLA window: slashes stake proportional to
    /// `severity` (0.0..=1.0, how far under the gate the window fell), and
    /// jails once `jail_after` violations land inside the rolling window.
    pub fn record_violation(
        &self,
        ledger: &TreasuryLedger,
        registry: &mut Registry,
        pid: ProviderId,
        height: BlockHeight,
        severity: f64,
        reason: &str,
    ) -> Result<SlashEvent, SlaError> {
        let account = ledger.account(pid);
        let effective_stake = account.staked + account.available;
        let amount = slash_amount(effective_stake, &self.cfg, severity);
        let remaining_stake = if amount > 0 {
            ledger.slash(pid, amount, height, reason)?
        } else {
            account.staked
        };

        let violations_in_window = self.prune_and_count(pid, height);
        let jailed = violations_in_window >= self.cfg.jail_after;

        if jailed {
            if let Some(p) = registry.get_mut(pid) {
                p.status = ProviderStatus::Jailed;
                p.jail_until_height = height + self.cfg.jail_duration_blocks;
            }
            ledger.jail(pid, true);
        }

        let jail_until_height = registry.get(pid).map(|p| p.jail_until_height).unwrap_or(0);

        Ok(SlashEvent {
            provider_id: pid,
            height,
            amount_slashed: amount,
            remaining_stake,
            violations_in_window,
            jailed,
            jail_until_height,
        })
    }

    /// Called on a passing SLA window: once `height >= jail_until_height`
    /// clears, un-jails the provider and resets its violation count. Before
    /// the cooldown matures this is a no-op (§4.17 edge case).
    pub fn record_pass(&self, ledger: &TreasuryLedger, registry: &mut Registry, pid: ProviderId, height: BlockHeight) {
        let Some(p) = registry.get_mut(pid) else {
            return;
        };
        if p.status != ProviderStatus::Jailed {
            return;
        }
        if height < p.jail_until_height {
            return;
        }
        p.status = ProviderStatus::Active;
        p.jail_until_height = 0;
        ledger.jail(pid, false);
        self.violations.lock().unwrap().remove(&pid);
    }

    pub fn violations_in_window(&self, pid: ProviderId) -> usize {
        self.violations.lock().unwrap().get(&pid).map(VecDeque::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{evaluate, SlaThresholds, WindowMeasurement};
    use aicf_registry::{Allowlist, Registry};
    use aicf_core::Capability;

    fn pid(b: u8) -> ProviderId {
        ProviderId::from_bytes([b; 32])
    }

    fn severity_for(decision: &crate::evaluator::SlaDecision) -> f64 {
        if decision.passed {
            0.0
        } else {
            (1.0 - decision.soft_score).clamp(0.0, 1.0)
        }
    }

    /// E5: stake 10_000, two bad SLA windows slash and jail the provider;
    /// the jail persists through the cooldown and clears on the next good
    /// window, after which further good windows are no-ops.
    #[test]
    fn two_bad_windows_jail_then_cooldown_clears_on_good_window() {
        let ledger = TreasuryLedger::new();
        let mut registry = Registry::new(Allowlist::default());
        let p = pid(7);
        registry
            .register_provider(p, Capability::AI, Default::default(), true, 0, None)
            .unwrap();
        ledger.credit(p, 10_000, 0);
        ledger.stake_lock(p, 10_000, 0).unwrap();

        let engine = SlashEngine::new(SlashConfig {
            base_bps: 500,
            jail_after: 2,
            jail_duration_blocks: 5,
            ..Default::default()
        });

        let thresholds = SlaThresholds {
            traps_min: 0.98,
            qos_min: 0.90,
            ..Default::default()
        };

        let bad = WindowMeasurement {
            total: 200,
            traps_ok: 190,
            qos_ok: 150,
            latency_ms: 200.0,
            availability: 0.99,
        };
        let decision = evaluate(&bad, &thresholds);
        assert!(!decision.passed);

        let ev1 = engine
            .record_violation(&ledger, &mut registry, p, 1, severity_for(&decision), "bad_window")
            .unwrap();
        assert!(!ev1.jailed);
        assert_eq!(registry.get(p).unwrap().status, ProviderStatus::Active);

        let ev2 = engine
            .record_violation(&ledger, &mut registry, p, 2, severity_for(&decision), "bad_window")
            .unwrap();
        assert!(ev2.jailed);
        assert_eq!(registry.get(p).unwrap().status, ProviderStatus::Jailed);
        assert_eq!(registry.get(p).unwrap().jail_until_height, 7);
        assert!(ledger.account(p).staked < 10_000);

        // cooldown has not matured: a good window is a no-op.
        engine.record_pass(&ledger, &mut registry, p, 5);
        assert_eq!(registry.get(p).unwrap().status, ProviderStatus::Jailed);

        // cooldown matured: the next good window clears the jail.
        engine.record_pass(&ledger, &mut registry, p, 7);
        assert_eq!(registry.get(p).unwrap().status, ProviderStatus::Active);
        assert_eq!(registry.get(p).unwrap().jail_until_height, 0);
        assert_eq!(engine.violations_in_window(p), 0);

        // further good windows are no-ops (provider already active).
        engine.record_pass(&ledger, &mut registry, p, 8);
        assert_eq!(registry.get(p).unwrap().status, ProviderStatus::Active);
    }

    #[test]
    fn slash_amount_is_clamped_to_effective_stake() {
        let cfg = SlashConfig {
            base_bps: 10_000,
            min_slash: 0,
            max_slash: TokenAmount::MAX,
            ..Default::default()
        };
        let amt = slash_amount(100, &cfg, 1.0);
        assert_eq!(amt, 100);
    }

    #[test]
    fn zero_severity_still_floors_at_min_slash() {
        let cfg = SlashConfig::default();
        let amt = slash_amount(10_000, &cfg, 0.0);
        assert_eq!(amt, cfg.min_slash.max(0));
    }
}
