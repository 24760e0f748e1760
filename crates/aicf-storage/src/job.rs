//! The durable job record and its companion lease. The storage layer is the
//! sole owner of both; every other component addresses them by id.

use aicf_core::{BlockHeight, JobId, JobKind, JobStatus, LeaseId, ProviderId, Tier, TimestampMs};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub kind: JobKind,
    pub requester: String,
    pub fee: u128,
    pub size_bytes: u64,
    pub tier: Tier,
    pub spec: serde_json::Value,
    pub ttl_seconds: u64,
    pub created_at: TimestampMs,
    pub not_before: TimestampMs,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub priority: f64,

    pub assigned_to: Option<ProviderId>,
    pub lease_id: Option<LeaseId>,
    pub lease_expires_at: Option<TimestampMs>,

    pub result: Option<serde_json::Value>,
    pub completed_digest: Option<String>,
    pub last_error: Option<String>,
    pub updated_at: TimestampMs,
    pub completed_at: Option<TimestampMs>,
    pub terminal_at: Option<TimestampMs>,
}

impl JobRecord {
    /// Absolute death time: `created_at + ttl_seconds`, in milliseconds.
    pub fn death_at_ms(&self) -> TimestampMs {
        self.created_at + (self.ttl_seconds as i64) * 1000
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Completed
                | JobStatus::Failed
                | JobStatus::Expired
                | JobStatus::Canceled
                | JobStatus::Tombstoned
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lease {
    pub lease_id: LeaseId,
    pub job_id: JobId,
    pub provider_id: ProviderId,
    pub issued_at: TimestampMs,
    pub expires_at: TimestampMs,
    pub renewals: u32,
}

/// Sanitized proof reference kinds accepted by the completion receiver.
/// Unknown kinds are silently dropped (see §4.8).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofRefKind {
    DaCommitment,
    OnchainProof,
    Attestation,
    VdfProof,
}

impl ProofRefKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "da_commitment" => Some(Self::DaCommitment),
            "onchain_proof" => Some(Self::OnchainProof),
            "attestation" => Some(Self::Attestation),
            "vdf_proof" => Some(Self::VdfProof),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofRef {
    pub kind: ProofRefKind,
    pub value: String,
}

pub type Height = BlockHeight;
