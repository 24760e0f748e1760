//! Eligibility filter and composite provider scoring (second half of §4.4).

use std::collections::HashSet;

use aicf_core::{Capability, JobKind, ProviderId, ProviderStatus, TokenAmount};
use aicf_registry::ProviderRecord;

#[derive(Clone, Debug)]
pub struct EligibilityPolicy {
    pub min_health: f64,
    pub min_stake_ai: TokenAmount,
    pub min_stake_quantum: TokenAmount,
    pub denied_regions: HashSet<String>,
    pub weight_health: f64,
    pub weight_stake: f64,
    pub region_bonus: f64,
    pub preferred_regions: HashSet<String>,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            min_health: 0.3,
            min_stake_ai: 1_000_000_000,
            min_stake_quantum: 5_000_000_000,
            denied_regions: HashSet::new(),
            weight_health: 0.7,
            weight_stake: 0.3,
            region_bonus: 0.05,
            preferred_regions: HashSet::new(),
        }
    }
}

pub struct EligibilityInput<'a> {
    pub kind: JobKind,
    pub required_algorithms: &'a [String],
    pub current_height: u64,
}

/// `true` iff `provider` is eligible to receive `job` under `policy`.
pub fn is_eligible(
    provider: &ProviderRecord,
    input: &EligibilityInput,
    policy: &EligibilityPolicy,
) -> bool {
    if provider.status != ProviderStatus::Active {
        return false;
    }
    let required_cap = Capability::required_for(input.kind);
    if !provider.supports(required_cap) {
        return false;
    }
    let min_stake = match input.kind {
        JobKind::Ai => policy.min_stake_ai,
        JobKind::Quantum => policy.min_stake_quantum,
    };
    if provider.effective_stake(input.current_height) < min_stake {
        return false;
    }
    if let Some(region) = &provider.region {
        if policy.denied_regions.contains(region) {
            return false;
        }
    }
    if !input.required_algorithms.is_empty() && !provider.supported_algorithms.is_empty() {
        let supported = &provider.supported_algorithms;
        if !input
            .required_algorithms
            .iter()
            .all(|a| supported.contains(a))
        {
            return false;
        }
    }
    if provider.health_score < policy.min_health {
        return false;
    }
    true
}

/// Composite score used to rank eligible providers for a job; higher wins.
/// Ties break on `provider_id` by the caller.
pub fn score(
    provider: &ProviderRecord,
    stake_normalizer: TokenAmount,
    current_height: u64,
    policy: &EligibilityPolicy,
) -> f64 {
    let stake_normalized = if stake_normalizer == 0 {
        0.0
    } else {
        (provider.effective_stake(current_height) as f64 / stake_normalizer as f64).min(1.0)
    };
    let total_weight = policy.weight_health + policy.weight_stake;
    let (wh, ws) = if total_weight > 0.0 {
        (
            policy.weight_health / total_weight,
            policy.weight_stake / total_weight,
        )
    } else {
        (0.5, 0.5)
    };
    let region_bonus = provider
        .region
        .as_deref()
        .map(|r| {
            if policy.preferred_regions.contains(r) {
                policy.region_bonus
            } else {
                0.0
            }
        })
        .unwrap_or(0.0);
    wh * provider.health_score + ws * stake_normalized + region_bonus
}

/// Picks the best eligible provider not in `excluded`, breaking ties on id.
pub fn best_eligible<'a>(
    providers: impl IntoIterator<Item = &'a ProviderRecord>,
    input: &EligibilityInput,
    policy: &EligibilityPolicy,
    stake_normalizer: TokenAmount,
    excluded: &HashSet<ProviderId>,
) -> Option<&'a ProviderRecord> {
    providers
        .into_iter()
        .filter(|p| !excluded.contains(&p.provider_id))
        .filter(|p| is_eligible(p, input, policy))
        .max_by(|a, b| {
            let sa = score(a, stake_normalizer, input.current_height, policy);
            let sb = score(b, stake_normalizer, input.current_height, policy);
            sa.partial_cmp(&sb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.provider_id.cmp(&a.provider_id))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aicf_core::ProviderId;

    fn provider(id: u8, caps: Capability, status: ProviderStatus, health: f64) -> ProviderRecord {
        let mut p = ProviderRecord::new(
            ProviderId::from_bytes([id; 32]),
            caps,
            Default::default(),
            None,
            10_000_000_000,
        );
        p.status = status;
        p.health_score = health;
        p
    }

    fn input(kind: JobKind) -> EligibilityInput<'static> {
        EligibilityInput {
            kind,
            required_algorithms: &[],
            current_height: 0,
        }
    }

    #[test]
    fn rejects_wrong_capability() {
        let p = provider(1, Capability::QUANTUM, ProviderStatus::Active, 1.0);
        let policy = EligibilityPolicy::default();
        assert!(!is_eligible(&p, &input(JobKind::Ai), &policy));
    }

    #[test]
    fn rejects_non_active_status() {
        let p = provider(1, Capability::AI, ProviderStatus::Paused, 1.0);
        let policy = EligibilityPolicy::default();
        assert!(!is_eligible(&p, &input(JobKind::Ai), &policy));
    }

    #[test]
    fn rejects_below_min_health() {
        let p = provider(1, Capability::AI, ProviderStatus::Active, 0.1);
        let policy = EligibilityPolicy {
            min_health: 0.5,
            min_stake_ai: 0,
            min_stake_quantum: 0,
            ..EligibilityPolicy::default()
        };
        assert!(!is_eligible(&p, &input(JobKind::Ai), &policy));
    }

    #[test]
    fn rejects_denied_region() {
        let mut p = provider(1, Capability::AI, ProviderStatus::Active, 1.0);
        p.region = Some("banned".into());
        let mut policy = EligibilityPolicy {
            min_stake_ai: 0,
            min_stake_quantum: 0,
            ..EligibilityPolicy::default()
        };
        policy.denied_regions.insert("banned".into());
        assert!(!is_eligible(&p, &input(JobKind::Ai), &policy));
    }

    #[test]
    fn rejects_missing_required_algorithm() {
        let mut p = provider(1, Capability::AI, ProviderStatus::Active, 1.0);
        p.supported_algorithms.insert("llama3".into());
        let policy = EligibilityPolicy {
            min_stake_ai: 0,
            min_stake_quantum: 0,
            ..EligibilityPolicy::default()
        };
        let required = vec!["mixtral".to_string()];
        let inp = EligibilityInput {
            kind: JobKind::Ai,
            required_algorithms: &required,
            current_height: 0,
        };
        assert!(!is_eligible(&p, &inp, &policy));
    }

    #[test]
    fn best_eligible_breaks_ties_on_provider_id() {
        let a = provider(1, Capability::AI, ProviderStatus::Active, 0.9);
        let b = provider(2, Capability::AI, ProviderStatus::Active, 0.9);
        let providers = vec![a.clone(), b.clone()];
        let policy = EligibilityPolicy {
            min_stake_ai: 0,
            min_stake_quantum: 0,
            ..EligibilityPolicy::default()
        };
        let excluded = HashSet::new();
        let winner = best_eligible(&providers, &input(JobKind::Ai), &policy, 10_000_000_000, &excluded)
            .unwrap();
        assert_eq!(winner.provider_id, b.provider_id);
    }

    #[test]
    fn best_eligible_excludes_already_taken_providers() {
        let a = provider(1, Capability::AI, ProviderStatus::Active, 1.0);
        let providers = vec![a.clone()];
        let policy = EligibilityPolicy {
            min_stake_ai: 0,
            min_stake_quantum: 0,
            ..EligibilityPolicy::default()
        };
        let mut excluded = HashSet::new();
        excluded.insert(a.provider_id);
        assert!(best_eligible(&providers, &input(JobKind::Ai), &policy, 10_000_000_000, &excluded)
            .is_none());
    }
}
