//! The narrow storage contract every dispatcher is built against. No
//! concrete database backend ships in this workspace — persistence
//! backends are an explicit Non-goal; only the interface is assumed.
//!
//! Implementations must make every method atomic: CAS-like transitions
//! (QUEUED→ASSIGNED, ASSIGNED→COMPLETED) must be race-free under
//! concurrent callers (see the concurrency model).

use aicf_core::{AicfEvent, JobId, JobKind, LeaseId, ProviderId, TimestampMs};

use crate::error::StorageError;
use crate::job::{JobRecord, Lease};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Summary of a single `expire()` sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExpireStats {
    pub ttl_expired: u64,
    pub lease_requeued: u64,
}

impl ExpireStats {
    pub fn total(&self) -> u64 {
        self.ttl_expired + self.lease_requeued
    }
}

pub trait Storage: Send + Sync {
    fn enqueue(&self, job: JobRecord) -> Result<()>;

    fn get_job(&self, id: JobId) -> Option<JobRecord>;

    /// QUEUED rows whose `not_before <= now`, ordered by `priority desc,
    /// created_at asc`. Callers further refine ordering via `aicf_queue::priority::rank`.
    fn list_ready(&self, kind: Option<JobKind>, now: TimestampMs, limit: usize) -> Vec<JobRecord>;

    /// CAS from QUEUED to ASSIGNED; fails if the job is not QUEUED.
    fn assign(
        &self,
        job_id: JobId,
        provider_id: ProviderId,
        lease_secs: u64,
        now: TimestampMs,
    ) -> Result<Lease>;

    /// Extends `lease_expires_at`; only valid while ASSIGNED.
    fn renew_lease(&self, job_id: JobId, lease_secs: u64, now: TimestampMs) -> Result<Lease>;

    fn complete(&self, job_id: JobId, result: Option<serde_json::Value>) -> Result<()>;

    fn fail(&self, job_id: JobId, error: String, retryable: bool) -> Result<()>;

    fn requeue(
        &self,
        job_id: JobId,
        priority: Option<f64>,
        not_before: Option<TimestampMs>,
    ) -> Result<()>;

    fn cancel(&self, job_id: JobId) -> Result<()>;

    fn tombstone(&self, job_id: JobId, reason: &str) -> Result<()>;

    /// Terminal EXPIRED transition driven by the TTL GC (distinct from
    /// `tombstone`, which marks permanent unsuitability for other reasons).
    fn mark_expired(&self, job_id: JobId, reason: &str, now: TimestampMs) -> Result<()>;

    /// Two sweeps: (a) QUEUED|ASSIGNED past absolute TTL -> EXPIRED, (b)
    /// ASSIGNED past lease expiry -> requeue to QUEUED. Returns totals.
    fn expire(&self, now: TimestampMs) -> Result<ExpireStats>;

    fn schedule_retry(
        &self,
        job_id: JobId,
        available_at: TimestampMs,
        last_error: String,
        attempts: u32,
        now: TimestampMs,
    ) -> Result<()>;

    fn release_lease(&self, lease_id: LeaseId, now: TimestampMs) -> Result<()>;

    fn append_event(&self, event: AicfEvent) -> Result<()>;

    fn get_active_lease(&self, job_id: JobId, now: TimestampMs) -> Option<Lease>;

    fn mark_completed(
        &self,
        job_id: JobId,
        digest: String,
        proof_refs: Vec<crate::job::ProofRef>,
        meta: serde_json::Value,
        now: TimestampMs,
    ) -> Result<()>;

    fn count_by_status(&self, status: aicf_core::JobStatus) -> u64;

    fn list_assigned_to(&self, provider_id: ProviderId) -> Vec<JobRecord>;

    /// All jobs, for TTL/retention sweeps. Implementations backed by a real
    /// database would paginate this; the in-memory reference returns
    /// everything since it never holds more than a test's worth of rows.
    fn iter_all(&self) -> Vec<JobRecord>;

    /// Hard-deletes a terminal job and its auxiliary records. Idempotent.
    fn purge_job(&self, job_id: JobId) -> Result<()>;
}
