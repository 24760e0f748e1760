//! Completion receiver (§4.8): validates submissions against active leases
//! and applies them atomically through storage.

use aicf_core::{AicfEvent, AicfError, JobId, JobStatus, ProviderId, TimestampMs};
use aicf_storage::{ProofRef, ProofRefKind, Storage};

pub trait RegistryCheck {
    fn is_allowed(&self, provider_id: ProviderId) -> bool;
    fn is_jailed(&self, provider_id: ProviderId) -> bool;
}

pub struct CompletionRequest {
    pub job_id: JobId,
    pub provider_id: ProviderId,
    pub output_digest: String,
    pub proof_refs: Vec<(String, String)>,
    pub meta: serde_json::Value,
}

fn valid_digest(digest: &str) -> bool {
    let len = digest.len();
    (len == 64 || len == 128) && digest.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn receive_completion<S: Storage>(
    storage: &S,
    registry: &impl RegistryCheck,
    req: CompletionRequest,
    now: TimestampMs,
) -> Result<(), AicfError> {
    if !valid_digest(&req.output_digest) {
        return Err(AicfError::SchemaInvalid(format!(
            "output_digest must be 32 or 64 bytes of hex, got {} chars",
            req.output_digest.len()
        )));
    }
    if !registry.is_allowed(req.provider_id) {
        return Err(AicfError::RegistryDenied);
    }
    if registry.is_jailed(req.provider_id) {
        return Err(AicfError::RegistryDenied);
    }

    let job = storage
        .get_job(req.job_id)
        .ok_or_else(|| AicfError::JobExpired {
            job_id: req.job_id,
            expiry_height: None,
        })?;

    if job.status == JobStatus::Completed {
        return if job.completed_digest.as_deref() == Some(req.output_digest.as_str()) {
            Ok(()) // idempotent ack
        } else {
            Err(AicfError::ProofInvalid(
                "completion digest mismatches the already-recorded digest".into(),
            ))
        };
    }
    if job.status != JobStatus::Assigned {
        return Err(AicfError::SchemaInvalid(format!(
            "job {} is not in an assignable state",
            req.job_id
        )));
    }

    let lease = storage
        .get_active_lease(req.job_id, now)
        .ok_or(AicfError::LeaseLost {
            job_id: req.job_id,
            previous_holder: job.assigned_to,
        })?;
    if lease.provider_id != req.provider_id {
        return Err(AicfError::LeaseLost {
            job_id: req.job_id,
            previous_holder: Some(lease.provider_id),
        });
    }
    if lease.expires_at < now {
        return Err(AicfError::DeadlineExceeded);
    }

    let sanitized: Vec<ProofRef> = req
        .proof_refs
        .into_iter()
        .filter_map(|(kind, value)| ProofRefKind::parse(&kind).map(|kind| ProofRef { kind, value }))
        .collect();

    storage
        .mark_completed(req.job_id, req.output_digest.clone(), sanitized, req.meta, now)
        .map_err(|e| AicfError::Storage(e.to_string()))?;

    let _ = storage.append_event(AicfEvent::Completed {
        job_id: req.job_id,
        provider_id: req.provider_id,
        success: true,
        digest: Some(req.output_digest),
        ts_ms: now,
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aicf_core::{JobKind, Tier};
    use aicf_storage::MemoryStorage;

    struct AllowAll;
    impl RegistryCheck for AllowAll {
        fn is_allowed(&self, _: ProviderId) -> bool {
            true
        }
        fn is_jailed(&self, _: ProviderId) -> bool {
            false
        }
    }

    fn seed_job(storage: &MemoryStorage, job_id: JobId) {
        storage
            .enqueue(aicf_storage::JobRecord {
                job_id,
                kind: JobKind::Ai,
                requester: "r".into(),
                fee: 10,
                size_bytes: 1,
                tier: Tier::Standard,
                spec: serde_json::json!({}),
                ttl_seconds: 3600,
                created_at: 0,
                not_before: 0,
                status: JobStatus::Queued,
                attempts: 0,
                max_attempts: 3,
                priority: 1.0,
                assigned_to: None,
                lease_id: None,
                lease_expires_at: None,
                result: None,
                completed_digest: None,
                last_error: None,
                updated_at: 0,
                completed_at: None,
                terminal_at: None,
            })
            .unwrap();
    }

    #[test]
    fn idempotent_on_identical_digest() {
        let storage = MemoryStorage::new();
        let jid = JobId::from_bytes([1u8; 32]);
        let pid = ProviderId::from_bytes([2u8; 32]);
        seed_job(&storage, jid);
        storage.assign(jid, pid, 60, 0).unwrap();

        let digest = "a".repeat(64);
        let req = CompletionRequest {
            job_id: jid,
            provider_id: pid,
            output_digest: digest.clone(),
            proof_refs: vec![],
            meta: serde_json::json!({}),
        };
        receive_completion(&storage, &AllowAll, req, 1).unwrap();

        let req2 = CompletionRequest {
            job_id: jid,
            provider_id: pid,
            output_digest: digest,
            proof_refs: vec![],
            meta: serde_json::json!({}),
        };
        assert!(receive_completion(&storage, &AllowAll, req2, 2).is_ok());
    }

    #[test]
    fn different_digest_is_rejected() {
        let storage = MemoryStorage::new();
        let jid = JobId::from_bytes([3u8; 32]);
        let pid = ProviderId::from_bytes([4u8; 32]);
        seed_job(&storage, jid);
        storage.assign(jid, pid, 60, 0).unwrap();

        let req = CompletionRequest {
            job_id: jid,
            provider_id: pid,
            output_digest: "a".repeat(64),
            proof_refs: vec![],
            meta: serde_json::json!({}),
        };
        receive_completion(&storage, &AllowAll, req, 1).unwrap();

        let req2 = CompletionRequest {
            job_id: jid,
            provider_id: pid,
            output_digest: "b".repeat(64),
            proof_refs: vec![],
            meta: serde_json::json!({}),
        };
        assert!(receive_completion(&storage, &AllowAll, req2, 2).is_err());
    }
}
