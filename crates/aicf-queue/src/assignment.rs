//! Greedy single-pass assignment engine (§4.5).
//!
//! Lease bookkeeping lives in an explicit [`AssignmentState`] owned by the
//! engine and addressed by job id — no process-global side effects, no
//! lifetime tied to garbage collection.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use aicf_core::{AicfEvent, JobId, JobKind, ProviderId, TimestampMs};
use aicf_registry::ProviderRecord;
use aicf_storage::Storage;
use thiserror::Error;

use crate::filter::{best_eligible, EligibilityInput, EligibilityPolicy};
use crate::priority::rank;
use crate::quota::{QuotaTracker, Reservation};

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("job {0} is not held by the calling provider")]
    NotHolder(JobId),
    #[error(transparent)]
    Storage(#[from] aicf_storage::StorageError),
}

/// Explicit, engine-owned bookkeeping: which quota reservation backs which
/// in-flight job.
#[derive(Default)]
pub struct AssignmentState {
    active_reservations: HashMap<JobId, Reservation>,
}

pub struct AssignmentEngine<S: Storage> {
    storage: std::sync::Arc<S>,
    quotas: std::sync::Arc<QuotaTracker>,
    state: Mutex<AssignmentState>,
}

fn required_algorithms(spec: &serde_json::Value) -> Vec<String> {
    spec.get("required_algorithms")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn work_units(spec: &serde_json::Value) -> u64 {
    spec.get("units").and_then(|v| v.as_u64()).unwrap_or(1)
}

impl<S: Storage> AssignmentEngine<S> {
    pub fn new(storage: std::sync::Arc<S>, quotas: std::sync::Arc<QuotaTracker>) -> Self {
        Self {
            storage,
            quotas,
            state: Mutex::new(AssignmentState::default()),
        }
    }

    /// Runs one deterministic assignment pass: expire stale leases, rank
    /// ready jobs, then greedily match at most one new lease per provider.
    pub fn run_pass(
        &self,
        providers: &[ProviderRecord],
        policy: &EligibilityPolicy,
        epoch: u64,
        now: TimestampMs,
        now_secs: f64,
        lease_ttl_s: u64,
        stake_normalizer: u128,
    ) -> Vec<(JobId, ProviderId)> {
        let _ = self.storage.expire(now);

        let ready = self.storage.list_ready(None, now, usize::MAX);
        let ranked = rank(ready);

        let mut assigns = Vec::new();
        let mut taken: HashSet<ProviderId> = HashSet::new();

        for job in ranked {
            let input = EligibilityInput {
                kind: job.kind,
                required_algorithms: &required_algorithms(&job.spec),
                current_height: epoch,
            };
            let Some(provider) =
                best_eligible(providers, &input, policy, stake_normalizer, &taken)
            else {
                continue;
            };

            let units = work_units(&job.spec);
            let reservation = match self
                .quotas
                .reserve(provider.provider_id, job.kind, epoch, units)
            {
                Ok(r) => r,
                Err(_) => continue,
            };

            match self
                .storage
                .assign(job.job_id, provider.provider_id, lease_ttl_s, now)
            {
                Ok(_lease) => {
                    taken.insert(provider.provider_id);
                    self.state
                        .lock()
                        .unwrap()
                        .active_reservations
                        .insert(job.job_id, reservation);
                    let _ = self.storage.append_event(AicfEvent::Assigned {
                        job_id: job.job_id,
                        provider_id: provider.provider_id,
                        lease_id: aicf_core::LeaseId::from_bytes([0u8; 32]),
                        height: Some(epoch),
                        ts_ms: now,
                    });
                    assigns.push((job.job_id, provider.provider_id));
                }
                Err(_) => {
                    self.quotas.release(reservation);
                }
            }
        }

        let _ = now_secs;
        assigns
    }

    /// Only the lease holder may renew. New expiry = `max(old, now) + extend_s`.
    pub fn renew(
        &self,
        job_id: JobId,
        provider_id: ProviderId,
        extend_s: u64,
        now: TimestampMs,
    ) -> Result<TimestampMs, AssignmentError> {
        let job = self
            .storage
            .get_job(job_id)
            .ok_or(AssignmentError::NotHolder(job_id))?;
        if job.assigned_to != Some(provider_id) {
            return Err(AssignmentError::NotHolder(job_id));
        }
        let lease = self.storage.renew_lease(job_id, extend_s, now)?;
        Ok(lease.expires_at)
    }

    /// Only the lease holder may cancel; releases the quota reservation and
    /// requeues the job.
    pub fn cancel(
        &self,
        job_id: JobId,
        provider_id: ProviderId,
    ) -> Result<(), AssignmentError> {
        let job = self
            .storage
            .get_job(job_id)
            .ok_or(AssignmentError::NotHolder(job_id))?;
        if job.assigned_to != Some(provider_id) {
            return Err(AssignmentError::NotHolder(job_id));
        }
        if let Some(res) = self.state.lock().unwrap().active_reservations.remove(&job_id) {
            self.quotas.release(res);
        }
        self.storage.requeue(job_id, None, None)?;
        Ok(())
    }

    /// Commits the quota reservation backing `job_id`, if any (success path).
    pub fn commit_quota(&self, job_id: JobId) {
        if let Some(res) = self.state.lock().unwrap().active_reservations.remove(&job_id) {
            self.quotas.commit(res);
        }
    }

    /// Releases the quota reservation backing `job_id`, if any (failure path).
    pub fn release_quota(&self, job_id: JobId) {
        if let Some(res) = self.state.lock().unwrap().active_reservations.remove(&job_id) {
            self.quotas.release(res);
        }
    }
}
