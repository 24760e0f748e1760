//! Reference in-memory `Storage` implementation. Good enough to drive the
//! dispatcher and the test suite; a production deployment swaps this for
//! a real backend behind the same trait.

use std::collections::HashMap;
use std::sync::Mutex;

use aicf_core::{AicfEvent, JobId, JobKind, JobStatus, LeaseId, ProviderId, TimestampMs};

use crate::error::StorageError;
use crate::job::{JobRecord, Lease, ProofRef};
use crate::traits::{ExpireStats, Result, Storage};

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, JobRecord>,
    events: Vec<AicfEvent>,
}

pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn events_snapshot(&self) -> Vec<AicfEvent> {
        self.inner.lock().unwrap().events.clone()
    }
}

fn new_lease_id(job_id: JobId, provider_id: ProviderId, now: TimestampMs) -> LeaseId {
    use sha3::{Digest, Sha3_256};
    let mut hasher = Sha3_256::new();
    hasher.update(job_id.as_bytes());
    hasher.update(provider_id.as_bytes());
    hasher.update(now.to_be_bytes());
    let digest = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&digest);
    LeaseId::from_bytes(arr)
}

impl Storage for MemoryStorage {
    fn enqueue(&self, job: JobRecord) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        g.jobs.insert(job.job_id, job);
        Ok(())
    }

    fn get_job(&self, id: JobId) -> Option<JobRecord> {
        self.inner.lock().unwrap().jobs.get(&id).cloned()
    }

    fn list_ready(&self, kind: Option<JobKind>, now: TimestampMs, limit: usize) -> Vec<JobRecord> {
        let g = self.inner.lock().unwrap();
        let mut out: Vec<JobRecord> = g
            .jobs
            .values()
            .filter(|j| {
                j.status == JobStatus::Queued
                    && j.not_before <= now
                    && kind.map(|k| k == j.kind).unwrap_or(true)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.created_at.cmp(&b.created_at))
        });
        out.truncate(limit.max(1));
        out
    }

    fn assign(
        &self,
        job_id: JobId,
        provider_id: ProviderId,
        lease_secs: u64,
        now: TimestampMs,
    ) -> Result<Lease> {
        let mut g = self.inner.lock().unwrap();
        let job = g.jobs.get_mut(&job_id).ok_or(StorageError::NotFound(job_id))?;
        if job.status != JobStatus::Queued {
            return Err(StorageError::InvalidTransition(job_id));
        }
        let lease_id = new_lease_id(job_id, provider_id, now);
        let expires_at = now + (lease_secs as i64) * 1000;
        job.status = JobStatus::Assigned;
        job.assigned_to = Some(provider_id);
        job.lease_id = Some(lease_id);
        job.lease_expires_at = Some(expires_at);
        job.attempts += 1;
        job.updated_at = now;
        Ok(Lease {
            lease_id,
            job_id,
            provider_id,
            issued_at: now,
            expires_at,
            renewals: 0,
        })
    }

    fn renew_lease(&self, job_id: JobId, lease_secs: u64, now: TimestampMs) -> Result<Lease> {
        let mut g = self.inner.lock().unwrap();
        let job = g.jobs.get_mut(&job_id).ok_or(StorageError::NotFound(job_id))?;
        if job.status != JobStatus::Assigned {
            return Err(StorageError::InvalidTransition(job_id));
        }
        let lease_id = job.lease_id.ok_or(StorageError::LeaseMismatch(job_id))?;
        let provider_id = job.assigned_to.ok_or(StorageError::LeaseMismatch(job_id))?;
        let base = job.lease_expires_at.unwrap_or(now).max(now);
        let new_exp = base + (lease_secs as i64) * 1000;
        job.lease_expires_at = Some(new_exp);
        job.updated_at = now;
        Ok(Lease {
            lease_id,
            job_id,
            provider_id,
            issued_at: now,
            expires_at: new_exp,
            renewals: 1,
        })
    }

    fn complete(&self, job_id: JobId, result: Option<serde_json::Value>) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        let job = g.jobs.get_mut(&job_id).ok_or(StorageError::NotFound(job_id))?;
        job.status = JobStatus::Completed;
        job.result = result;
        job.completed_at = Some(job.updated_at);
        job.terminal_at = Some(job.updated_at);
        Ok(())
    }

    fn fail(&self, job_id: JobId, error: String, _retryable: bool) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        let job = g.jobs.get_mut(&job_id).ok_or(StorageError::NotFound(job_id))?;
        job.status = JobStatus::Failed;
        job.last_error = Some(error);
        job.terminal_at = Some(job.updated_at);
        Ok(())
    }

    fn requeue(
        &self,
        job_id: JobId,
        priority: Option<f64>,
        not_before: Option<TimestampMs>,
    ) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        let job = g.jobs.get_mut(&job_id).ok_or(StorageError::NotFound(job_id))?;
        job.status = JobStatus::Queued;
        job.assigned_to = None;
        job.lease_id = None;
        job.lease_expires_at = None;
        if let Some(p) = priority {
            job.priority = p;
        }
        if let Some(nb) = not_before {
            job.not_before = nb;
        }
        Ok(())
    }

    fn cancel(&self, job_id: JobId) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        let job = g.jobs.get_mut(&job_id).ok_or(StorageError::NotFound(job_id))?;
        if job.is_terminal() {
            return Err(StorageError::InvalidTransition(job_id));
        }
        job.status = JobStatus::Canceled;
        job.terminal_at = Some(job.updated_at);
        Ok(())
    }

    fn tombstone(&self, job_id: JobId, reason: &str) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        let job = g.jobs.get_mut(&job_id).ok_or(StorageError::NotFound(job_id))?;
        job.status = JobStatus::Tombstoned;
        job.last_error = Some(reason.to_string());
        job.terminal_at = Some(job.updated_at);
        Ok(())
    }

    fn mark_expired(&self, job_id: JobId, reason: &str, now: TimestampMs) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        let job = g.jobs.get_mut(&job_id).ok_or(StorageError::NotFound(job_id))?;
        job.status = JobStatus::Expired;
        job.last_error = Some(reason.to_string());
        job.assigned_to = None;
        job.lease_id = None;
        job.lease_expires_at = None;
        job.terminal_at = Some(now);
        job.updated_at = now;
        Ok(())
    }

    fn expire(&self, now: TimestampMs) -> Result<ExpireStats> {
        let mut g = self.inner.lock().unwrap();
        let mut stats = ExpireStats::default();
        for job in g.jobs.values_mut() {
            match job.status {
                JobStatus::Queued if now >= job.death_at_ms() => {
                    job.status = JobStatus::Expired;
                    job.terminal_at = Some(now);
                    stats.ttl_expired += 1;
                }
                JobStatus::Assigned if now >= job.death_at_ms() => {
                    job.status = JobStatus::Expired;
                    job.terminal_at = Some(now);
                    stats.ttl_expired += 1;
                }
                JobStatus::Assigned
                    if job.lease_expires_at.map(|e| now >= e).unwrap_or(false) =>
                {
                    job.status = JobStatus::Queued;
                    job.assigned_to = None;
                    job.lease_id = None;
                    job.lease_expires_at = None;
                    stats.lease_requeued += 1;
                }
                _ => {}
            }
        }
        Ok(stats)
    }

    fn schedule_retry(
        &self,
        job_id: JobId,
        available_at: TimestampMs,
        last_error: String,
        attempts: u32,
        now: TimestampMs,
    ) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        let job = g.jobs.get_mut(&job_id).ok_or(StorageError::NotFound(job_id))?;
        job.status = JobStatus::Queued;
        job.assigned_to = None;
        job.lease_id = None;
        job.lease_expires_at = None;
        job.not_before = available_at;
        job.last_error = Some(last_error);
        job.attempts = attempts;
        job.updated_at = now;
        Ok(())
    }

    fn release_lease(&self, lease_id: LeaseId, now: TimestampMs) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        if let Some(job) = g
            .jobs
            .values_mut()
            .find(|j| j.lease_id == Some(lease_id))
        {
            job.status = JobStatus::Queued;
            job.assigned_to = None;
            job.lease_id = None;
            job.lease_expires_at = None;
            job.updated_at = now;
        }
        Ok(())
    }

    fn append_event(&self, event: AicfEvent) -> Result<()> {
        self.inner.lock().unwrap().events.push(event);
        Ok(())
    }

    fn get_active_lease(&self, job_id: JobId, now: TimestampMs) -> Option<Lease> {
        let g = self.inner.lock().unwrap();
        let job = g.jobs.get(&job_id)?;
        if job.status != JobStatus::Assigned {
            return None;
        }
        let exp = job.lease_expires_at?;
        if exp <= now {
            return None;
        }
        Some(Lease {
            lease_id: job.lease_id?,
            job_id,
            provider_id: job.assigned_to?,
            issued_at: job.updated_at,
            expires_at: exp,
            renewals: 0,
        })
    }

    fn mark_completed(
        &self,
        job_id: JobId,
        digest: String,
        proof_refs: Vec<ProofRef>,
        meta: serde_json::Value,
        now: TimestampMs,
    ) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        let job = g.jobs.get_mut(&job_id).ok_or(StorageError::NotFound(job_id))?;
        job.status = JobStatus::Completed;
        job.completed_digest = Some(digest);
        job.result = Some(serde_json::json!({
            "proof_refs": proof_refs.iter().map(|r| serde_json::json!({"kind": r.kind, "value": r.value})).collect::<Vec<_>>(),
            "meta": meta,
        }));
        job.completed_at = Some(now);
        job.terminal_at = Some(now);
        job.updated_at = now;
        Ok(())
    }

    fn count_by_status(&self, status: JobStatus) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .jobs
            .values()
            .filter(|j| j.status == status)
            .count() as u64
    }

    fn list_assigned_to(&self, provider_id: ProviderId) -> Vec<JobRecord> {
        self.inner
            .lock()
            .unwrap()
            .jobs
            .values()
            .filter(|j| j.assigned_to == Some(provider_id))
            .cloned()
            .collect()
    }

    fn iter_all(&self) -> Vec<JobRecord> {
        self.inner.lock().unwrap().jobs.values().cloned().collect()
    }

    fn purge_job(&self, job_id: JobId) -> Result<()> {
        self.inner.lock().unwrap().jobs.remove(&job_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: [u8; 32], now: TimestampMs) -> JobRecord {
        JobRecord {
            job_id: JobId::from_bytes(id),
            kind: JobKind::Ai,
            requester: "req".into(),
            fee: 100,
            size_bytes: 10,
            tier: aicf_core::Tier::Standard,
            spec: serde_json::json!({}),
            ttl_seconds: 3600,
            created_at: now,
            not_before: now,
            status: JobStatus::Queued,
            attempts: 0,
            max_attempts: 5,
            priority: 100.0,
            assigned_to: None,
            lease_id: None,
            lease_expires_at: None,
            result: None,
            completed_digest: None,
            last_error: None,
            updated_at: now,
            completed_at: None,
            terminal_at: None,
        }
    }

    #[test]
    fn assign_requires_queued() {
        let s = MemoryStorage::new();
        let jid = JobId::from_bytes([1u8; 32]);
        s.enqueue(job([1u8; 32], 0)).unwrap();
        let pid = ProviderId::from_bytes([2u8; 32]);
        let lease = s.assign(jid, pid, 60, 0).unwrap();
        assert_eq!(lease.provider_id, pid);
        assert!(s.assign(jid, pid, 60, 0).is_err());
    }

    #[test]
    fn expire_sweeps_ttl_and_leases() {
        let s = MemoryStorage::new();
        let jid = JobId::from_bytes([3u8; 32]);
        let mut j = job([3u8; 32], 0);
        j.ttl_seconds = 1;
        s.enqueue(j).unwrap();
        let stats = s.expire(5_000).unwrap();
        assert_eq!(stats.ttl_expired, 1);
    }
}
