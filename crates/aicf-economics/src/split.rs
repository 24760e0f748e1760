//! Split rules (§4.10): divide a job's reward among provider, treasury and
//! miner in basis points, with the integer-division remainder assigned to a
//! configured residual target.

use aicf_core::{JobKind, TokenAmount};
use thiserror::Error;

const BPS_DENOM: u128 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResidualTarget {
    Provider,
    Treasury,
    Miner,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("split bps must sum to 10_000, got {total}")]
    BadTotal { total: u32 },
}

#[derive(Clone, Copy, Debug)]
pub struct SplitRule {
    pub provider_bps: u32,
    pub treasury_bps: u32,
    pub miner_bps: u32,
    pub residual_to: ResidualTarget,
}

impl SplitRule {
    pub fn new(
        provider_bps: u32,
        treasury_bps: u32,
        miner_bps: u32,
        residual_to: ResidualTarget,
    ) -> Result<Self, SplitError> {
        let total = provider_bps + treasury_bps + miner_bps;
        if total != 10_000 {
            return Err(SplitError::BadTotal { total });
        }
        Ok(Self {
            provider_bps,
            treasury_bps,
            miner_bps,
            residual_to,
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SplitPolicy {
    pub ai: SplitRule,
    pub quantum: SplitRule,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self {
            ai: SplitRule::new(8_500, 1_000, 500, ResidualTarget::Provider).unwrap(),
            quantum: SplitRule::new(8_000, 1_500, 500, ResidualTarget::Provider).unwrap(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shares {
    pub provider: TokenAmount,
    pub treasury: TokenAmount,
    pub miner: TokenAmount,
}

fn apply_rule(total: TokenAmount, rule: &SplitRule) -> Shares {
    let mut prov = total * rule.provider_bps as u128 / BPS_DENOM;
    let mut tres = total * rule.treasury_bps as u128 / BPS_DENOM;
    let mut mine = total * rule.miner_bps as u128 / BPS_DENOM;

    let remainder = total - (prov + tres + mine);
    if remainder > 0 {
        match rule.residual_to {
            ResidualTarget::Provider => prov += remainder,
            ResidualTarget::Treasury => tres += remainder,
            ResidualTarget::Miner => mine += remainder,
        }
    }

    debug_assert_eq!(prov + tres + mine, total);
    Shares {
        provider: prov,
        treasury: tres,
        miner: mine,
    }
}

pub fn split_for_kind(kind: JobKind, total: TokenAmount, policy: &SplitPolicy) -> Shares {
    match kind {
        JobKind::Ai => apply_rule(total, &policy.ai),
        JobKind::Quantum => apply_rule(total, &policy.quantum),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ai_split_matches_reference() {
        let policy = SplitPolicy::default();
        let shares = split_for_kind(JobKind::Ai, 1_000_000, &policy);
        assert_eq!(shares.provider, 850_000);
        assert_eq!(shares.treasury, 100_000);
        assert_eq!(shares.miner, 50_000);
    }

    #[test]
    fn residual_always_lands_on_provider_by_default() {
        let policy = SplitPolicy::default();
        let shares = split_for_kind(JobKind::Quantum, 7, &policy);
        assert_eq!(shares.provider + shares.treasury + shares.miner, 7);
    }

    #[test]
    fn rejects_bps_not_summing_to_10000() {
        assert!(SplitRule::new(9_000, 500, 400, ResidualTarget::Provider).is_err());
    }

    /// E4 — price then split two proofs (AI units=120 @ rate 2/unit,
    /// Quantum units=15 @ rate 5/unit) under an 80/15/5 split policy (the
    /// scenario's reference split, distinct from the AI 85/10/5 default);
    /// the resulting shares are exactly the ones credited to each payee.
    #[test]
    fn e4_proof_to_payout_shares_match_reference() {
        use crate::pricing::{price_job, PricingSchedule, FACTOR_SCALE};

        let schedule = PricingSchedule {
            ai_per_unit: 2,
            quantum_per_unit: 5,
            min_reward: None,
            max_reward: None,
            ..PricingSchedule::default()
        };
        let rule = SplitRule::new(8_000, 1_500, 500, ResidualTarget::Provider).unwrap();
        let policy = SplitPolicy {
            ai: rule,
            quantum: rule,
        };

        let ai_reward = price_job(JobKind::Ai, 120, &schedule, FACTOR_SCALE, FACTOR_SCALE).unwrap();
        assert_eq!(ai_reward, 240);
        let ai_shares = split_for_kind(JobKind::Ai, ai_reward, &policy);
        assert_eq!(ai_shares.provider, 192);
        assert_eq!(ai_shares.treasury, 36);
        assert_eq!(ai_shares.miner, 12);

        let q_reward = price_job(JobKind::Quantum, 15, &schedule, FACTOR_SCALE, FACTOR_SCALE).unwrap();
        assert_eq!(q_reward, 75);
        let q_shares = split_for_kind(JobKind::Quantum, q_reward, &policy);
        assert_eq!(q_shares.provider, 61); // 60 + residual(1)
        assert_eq!(q_shares.treasury, 11);
        assert_eq!(q_shares.miner, 3);

        let treasury_total = ai_shares.treasury + q_shares.treasury;
        let miner_total = ai_shares.miner + q_shares.miner;
        assert_eq!(treasury_total, 47);
        assert_eq!(miner_total, 15);
    }
}
