//! TTL garbage collection (§4.7 TTL GC). Separates EXPIRE (terminal
//! transition) from PURGE (hard delete); the strongest applicable action
//! wins (PURGE > EXPIRE > KEEP). Idempotent — a failed action just leaves
//! the row for the next cycle.

use aicf_core::{JobStatus, TimestampMs};
use aicf_storage::{JobRecord, Storage};

#[derive(Clone, Copy, Debug)]
pub struct TtlPolicy {
    pub queued_ttl_ms: i64,
    pub leased_grace_ms: i64,
    pub completed_retention_ms: i64,
    pub failed_retention_ms: i64,
    pub max_total_age_ms: i64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            queued_ttl_ms: 30 * 60_000,
            leased_grace_ms: 10 * 60_000,
            completed_retention_ms: 60 * 60_000,
            failed_retention_ms: 60 * 60_000,
            max_total_age_ms: 2 * 24 * 60 * 60_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub expired: u64,
    pub purged: u64,
    pub kept: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Purge,
    Expire,
    Keep,
}

fn decide(job: &JobRecord, now: TimestampMs, policy: &TtlPolicy) -> Action {
    let age = now - job.created_at;
    if age > policy.max_total_age_ms {
        return if job.is_terminal() {
            Action::Purge
        } else {
            Action::Expire
        };
    }

    match job.status {
        JobStatus::Completed => {
            let t0 = job.completed_at.unwrap_or(job.updated_at);
            if now - t0 > policy.completed_retention_ms {
                Action::Purge
            } else {
                Action::Keep
            }
        }
        JobStatus::Failed | JobStatus::Tombstoned | JobStatus::Expired => {
            let t0 = job.terminal_at.unwrap_or(job.updated_at);
            if now - t0 > policy.failed_retention_ms {
                Action::Purge
            } else {
                Action::Keep
            }
        }
        JobStatus::Queued => {
            if now - job.updated_at > policy.queued_ttl_ms {
                Action::Expire
            } else {
                Action::Keep
            }
        }
        JobStatus::Assigned => {
            if let Some(exp) = job.lease_expires_at {
                if now - exp > policy.leased_grace_ms {
                    return Action::Expire;
                }
            }
            Action::Keep
        }
        JobStatus::Canceled => Action::Keep,
    }
}

pub struct TtlGc<S: Storage> {
    storage: std::sync::Arc<S>,
    policy: TtlPolicy,
}

impl<S: Storage> TtlGc<S> {
    pub fn new(storage: std::sync::Arc<S>, policy: TtlPolicy) -> Self {
        Self { storage, policy }
    }

    pub fn sweep_once(&self, now: TimestampMs) -> SweepStats {
        let mut stats = SweepStats::default();
        for job in self.storage.iter_all() {
            match decide(&job, now, &self.policy) {
                Action::Purge => {
                    if self.storage.purge_job(job.job_id).is_ok() {
                        stats.purged += 1;
                        tracing::info!(job_id = %job.job_id, "ttl: purged");
                    } else {
                        stats.kept += 1;
                    }
                }
                Action::Expire => {
                    if let Some(lease_id) = job.lease_id {
                        let _ = self.storage.release_lease(lease_id, now);
                    }
                    if self.storage.mark_expired(job.job_id, "ttl.expired", now).is_ok() {
                        stats.expired += 1;
                        tracing::info!(job_id = %job.job_id, "ttl: expired");
                    } else {
                        stats.kept += 1;
                    }
                }
                Action::Keep => stats.kept += 1,
            }
        }
        stats
    }
}
