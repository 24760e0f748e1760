//! Deterministic job ranking (§4.4). Sort key: `(-fee, created_at,
//! size_bytes, tier_score, job_id)`. Total order — permuting the input
//! preserves the output.

use aicf_storage::JobRecord;

pub fn rank(mut jobs: Vec<JobRecord>) -> Vec<JobRecord> {
    jobs.sort_by(|a, b| {
        b.fee
            .cmp(&a.fee)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.size_bytes.cmp(&b.size_bytes))
            .then(a.tier.score().cmp(&b.tier.score()))
            .then(a.job_id.cmp(&b.job_id))
    });
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use aicf_core::{JobId, JobKind, JobStatus, Tier};

    fn job(id: u8, fee: u128, created_at: i64) -> JobRecord {
        JobRecord {
            job_id: JobId::from_bytes([id; 32]),
            kind: JobKind::Ai,
            requester: "r".into(),
            fee,
            size_bytes: 10,
            tier: Tier::Standard,
            spec: serde_json::json!({}),
            ttl_seconds: 60,
            created_at,
            not_before: 0,
            status: JobStatus::Queued,
            attempts: 0,
            max_attempts: 3,
            priority: fee as f64,
            assigned_to: None,
            lease_id: None,
            lease_expires_at: None,
            result: None,
            completed_digest: None,
            last_error: None,
            updated_at: 0,
            completed_at: None,
            terminal_at: None,
        }
    }

    #[test]
    fn higher_fee_wins() {
        let jobs = vec![job(1, 10, 0), job(2, 20, 0)];
        let ranked = rank(jobs);
        assert_eq!(ranked[0].job_id, JobId::from_bytes([2u8; 32]));
    }

    #[test]
    fn tiebreak_is_deterministic_under_permutation() {
        let a = rank(vec![job(1, 10, 5), job(2, 10, 5)]);
        let b = rank(vec![job(2, 10, 5), job(1, 10, 5)]);
        assert_eq!(
            a.iter().map(|j| j.job_id).collect::<Vec<_>>(),
            b.iter().map(|j| j.job_id).collect::<Vec<_>>()
        );
        assert_eq!(a[0].job_id, JobId::from_bytes([1u8; 32]));
    }
}
