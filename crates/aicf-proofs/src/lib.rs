//! Proof bridge (§4.9): normalizes pre-verified on-chain proof envelopes
//! into `ProofMetrics`/`ProofClaim`. The envelope is a tagged enum fixed
//! at the boundary — one AI shape, one Quantum shape, normalized exactly
//! once.

use aicf_core::{BlockHeight, JobId, JobKind, Nullifier, ProviderId, TaskId, TimestampMs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const AI_TOKENS_PER_UNIT: u64 = 1000;
const Q_GATE_SHOTS_PER_UNIT: u64 = 1000;

#[derive(Debug, Error)]
pub enum ProofBridgeError {
    #[error("proof digest must be 64-char lowercase hex")]
    InvalidDigest,
    #[error("nullifier invalid: {0}")]
    InvalidNullifier(#[from] aicf_core::AicfIdError),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiProofEnvelope {
    pub task_id: TaskId,
    pub nullifier: String,
    pub provider_id: ProviderId,
    pub job_id: Option<JobId>,
    pub proof_digest: Option<String>,
    pub units: Option<u64>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub traps_passed: Option<u64>,
    pub traps_total: Option<u64>,
    /// Tokens/sec, used by the SLA evaluator as the AI QoS dimension.
    pub tokens_per_sec: Option<f64>,
    pub latency_ms: Option<u64>,
    pub included_at: Option<TimestampMs>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuantumProofEnvelope {
    pub task_id: TaskId,
    pub nullifier: String,
    pub provider_id: ProviderId,
    pub job_id: Option<JobId>,
    pub proof_digest: Option<String>,
    pub units: Option<u64>,
    pub depth: Option<u64>,
    pub width: Option<u64>,
    pub shots: Option<u64>,
    pub traps_passed: Option<u64>,
    pub traps_total: Option<u64>,
    /// Fidelity scalar in [0,1], used by the SLA evaluator as the Quantum
    /// QoS dimension.
    pub fidelity: Option<f64>,
    pub latency_ms: Option<u64>,
    pub included_at: Option<TimestampMs>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProofEnvelope {
    Ai(AiProofEnvelope),
    Quantum(QuantumProofEnvelope),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofMetrics {
    pub kind: JobKind,
    pub units: u64,
    /// `None` when the window had zero traps to evaluate.
    pub traps_ratio: Option<f64>,
    pub qos: Option<f64>,
    pub latency_ms: Option<u64>,
    pub details: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofClaim {
    pub kind: JobKind,
    pub task_id: TaskId,
    pub nullifier: Nullifier,
    pub height: BlockHeight,
    pub provider_id: ProviderId,
    pub job_id: Option<JobId>,
    pub proof_digest: Option<String>,
    pub work_units: u64,
    pub included_at: Option<TimestampMs>,
}

fn ceil_div(a: u64, b: u64) -> u64 {
    if b == 0 {
        0
    } else {
        (a + b - 1) / b
    }
}

fn traps_ratio(passed: Option<u64>, total: Option<u64>) -> Option<f64> {
    match (passed, total) {
        (Some(_), Some(0)) | (_, None) | (None, _) => None,
        (Some(p), Some(t)) => Some((p as f64 / t as f64).clamp(0.0, 1.0)),
    }
}

/// Normalizes an envelope into `(ProofMetrics, ProofClaim)` for a claim
/// observed at `height`.
pub fn normalize(
    envelope: &ProofEnvelope,
    height: BlockHeight,
) -> Result<(ProofMetrics, ProofClaim), ProofBridgeError> {
    match envelope {
        ProofEnvelope::Ai(e) => {
            let units = e.units.unwrap_or_else(|| {
                ceil_div(
                    e.input_tokens.unwrap_or(0) + e.output_tokens.unwrap_or(0),
                    AI_TOKENS_PER_UNIT,
                )
            });
            let metrics = ProofMetrics {
                kind: JobKind::Ai,
                units,
                traps_ratio: traps_ratio(e.traps_passed, e.traps_total),
                qos: e.tokens_per_sec,
                latency_ms: e.latency_ms,
                details: serde_json::json!({"input_tokens": e.input_tokens, "output_tokens": e.output_tokens}),
            };
            let claim = ProofClaim {
                kind: JobKind::Ai,
                task_id: e.task_id,
                nullifier: Nullifier::new(&e.nullifier)?,
                height,
                provider_id: e.provider_id,
                job_id: e.job_id,
                proof_digest: e.proof_digest.clone(),
                work_units: units,
                included_at: e.included_at,
            };
            Ok((metrics, claim))
        }
        ProofEnvelope::Quantum(e) => {
            let units = e.units.unwrap_or_else(|| {
                ceil_div(
                    e.depth.unwrap_or(0) * e.width.unwrap_or(0) * e.shots.unwrap_or(0),
                    Q_GATE_SHOTS_PER_UNIT,
                )
            });
            let metrics = ProofMetrics {
                kind: JobKind::Quantum,
                units,
                traps_ratio: traps_ratio(e.traps_passed, e.traps_total),
                qos: e.fidelity,
                latency_ms: e.latency_ms,
                details: serde_json::json!({"depth": e.depth, "width": e.width, "shots": e.shots}),
            };
            let claim = ProofClaim {
                kind: JobKind::Quantum,
                task_id: e.task_id,
                nullifier: Nullifier::new(&e.nullifier)?,
                height,
                provider_id: e.provider_id,
                job_id: e.job_id,
                proof_digest: e.proof_digest.clone(),
                work_units: units,
                included_at: e.included_at,
            };
            Ok((metrics, claim))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nullifier() -> String {
        "b".repeat(64)
    }

    #[test]
    fn ai_units_fall_back_to_token_counts() {
        let env = ProofEnvelope::Ai(AiProofEnvelope {
            task_id: TaskId::from_bytes([1u8; 32]),
            nullifier: nullifier(),
            provider_id: ProviderId::from_bytes([2u8; 32]),
            job_id: None,
            proof_digest: None,
            units: None,
            input_tokens: Some(1500),
            output_tokens: Some(600),
            traps_passed: Some(9),
            traps_total: Some(10),
            tokens_per_sec: Some(42.0),
            latency_ms: Some(120),
            included_at: None,
        });
        let (metrics, claim) = normalize(&env, 5).unwrap();
        assert_eq!(metrics.units, 3); // ceil(2100/1000)
        assert_eq!(claim.work_units, 3);
        assert_eq!(metrics.traps_ratio, Some(0.9));
    }

    #[test]
    fn traps_ratio_is_none_when_total_zero() {
        let env = ProofEnvelope::Quantum(QuantumProofEnvelope {
            task_id: TaskId::from_bytes([3u8; 32]),
            nullifier: nullifier(),
            provider_id: ProviderId::from_bytes([4u8; 32]),
            job_id: None,
            proof_digest: None,
            units: Some(15),
            depth: None,
            width: None,
            shots: None,
            traps_passed: Some(0),
            traps_total: Some(0),
            fidelity: Some(0.98),
            latency_ms: None,
            included_at: None,
        });
        let (metrics, _) = normalize(&env, 1).unwrap();
        assert_eq!(metrics.traps_ratio, None);
    }
}
