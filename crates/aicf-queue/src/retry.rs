//! Retry/backoff scheduling and permanent-vs-transient error classification
//! (§4.7). All numeric defaults are carried over unchanged from the
//! reference retry policy.

use std::collections::HashSet;

use aicf_core::{JobId, LeaseId, TimestampMs};
use aicf_storage::Storage;
use rand::Rng;

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub attempts_cap: u32,
    pub base_delay_s: f64,
    pub multiplier: f64,
    pub max_delay_s: f64,
    pub jitter_fraction: f64,
    pub transient_errors: HashSet<String>,
    pub permanent_errors: HashSet<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let transient = [
            "provider_unreachable",
            "deadline_exceeded",
            "internal_error",
            "lease_lost",
            "network_error",
            "temporarily_unavailable",
            "queue_overloaded",
        ];
        let permanent = [
            "proof_invalid",
            "attestation_invalid",
            "job_too_large",
            "schema_invalid",
            "unsupported_algorithm",
            "forbidden",
            "payment_required",
        ];
        Self {
            attempts_cap: 6,
            base_delay_s: 2.0,
            multiplier: 1.8,
            max_delay_s: 60.0,
            jitter_fraction: 0.20,
            transient_errors: transient.iter().map(|s| s.to_string()).collect(),
            permanent_errors: permanent.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Permanent,
}

impl RetryPolicy {
    /// Permanent if in the permanent set or prefixed by
    /// `validation/`, `proof/`, `attestation/`; transient if in the
    /// transient set; anything else defaults to transient — safer to retry.
    pub fn classify(&self, error_code: &str) -> ErrorClass {
        let code = error_code.trim().to_lowercase();
        if self.permanent_errors.contains(&code)
            || code.starts_with("validation/")
            || code.starts_with("proof/")
            || code.starts_with("attestation/")
        {
            return ErrorClass::Permanent;
        }
        if self.transient_errors.contains(&code) {
            return ErrorClass::Transient;
        }
        ErrorClass::Transient
    }

    pub fn backoff_seconds(&self, attempts: u32) -> f64 {
        let attempts = attempts.max(1);
        let raw = self.base_delay_s * self.multiplier.powi((attempts - 1) as i32);
        raw.min(self.max_delay_s)
    }

    pub fn with_jitter(&self, seconds: f64, rng: &mut impl Rng) -> f64 {
        let noise = seconds * self.jitter_fraction * (2.0 * rng.gen::<f64>() - 1.0);
        (seconds + noise).max(0.0)
    }
}

pub struct RetryEngine<S: Storage> {
    storage: std::sync::Arc<S>,
    policy: RetryPolicy,
}

/// Outcome of a retry decision: `(requeued, delay_s, tombstoned)`.
pub struct RetryOutcome {
    pub requeued: bool,
    pub delay_s: Option<f64>,
    pub tombstoned: bool,
}

impl<S: Storage> RetryEngine<S> {
    pub fn new(storage: std::sync::Arc<S>, policy: RetryPolicy) -> Self {
        Self { storage, policy }
    }

    pub fn on_timeout(
        &self,
        job_id: JobId,
        lease_id: LeaseId,
        now: TimestampMs,
    ) -> RetryOutcome {
        self.retry(job_id, "deadline_exceeded", "lease lapsed without completion", lease_id, now)
    }

    pub fn on_failure(
        &self,
        job_id: JobId,
        error_code: &str,
        message: &str,
        lease_id: LeaseId,
        now: TimestampMs,
    ) -> RetryOutcome {
        if self.policy.classify(error_code) == ErrorClass::Permanent {
            let _ = self.storage.release_lease(lease_id, now);
            let _ = self
                .storage
                .tombstone(job_id, &format!("{error_code}:{message}"));
            return RetryOutcome {
                requeued: false,
                delay_s: None,
                tombstoned: true,
            };
        }
        self.retry(job_id, error_code, message, lease_id, now)
    }

    fn retry(
        &self,
        job_id: JobId,
        error_code: &str,
        message: &str,
        lease_id: LeaseId,
        now: TimestampMs,
    ) -> RetryOutcome {
        let Some(job) = self.storage.get_job(job_id) else {
            return RetryOutcome {
                requeued: false,
                delay_s: None,
                tombstoned: false,
            };
        };
        let attempts = job.attempts + 1;
        if attempts > self.policy.attempts_cap {
            let _ = self.storage.release_lease(lease_id, now);
            let _ = self
                .storage
                .tombstone(job_id, &format!("attempts_cap:{error_code}"));
            return RetryOutcome {
                requeued: false,
                delay_s: None,
                tombstoned: true,
            };
        }
        let mut rng = rand::thread_rng();
        let delay = self
            .policy
            .with_jitter(self.policy.backoff_seconds(attempts), &mut rng);
        let _ = self.storage.release_lease(lease_id, now);
        let _ = self.storage.schedule_retry(
            job_id,
            now + (delay * 1000.0) as TimestampMs,
            format!("{error_code}: {message}"),
            attempts,
            now,
        );
        RetryOutcome {
            requeued: true,
            delay_s: Some(delay),
            tombstoned: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prefixes_are_permanent() {
        let p = RetryPolicy::default();
        assert_eq!(p.classify("proof/bad_digest"), ErrorClass::Permanent);
        assert_eq!(p.classify("validation/oversize"), ErrorClass::Permanent);
        assert_eq!(p.classify("forbidden"), ErrorClass::Permanent);
    }

    #[test]
    fn classify_unknown_defaults_transient() {
        let p = RetryPolicy::default();
        assert_eq!(p.classify("something_new"), ErrorClass::Transient);
    }

    #[test]
    fn backoff_is_monotone_and_capped() {
        let p = RetryPolicy::default();
        let d1 = p.backoff_seconds(1);
        let d2 = p.backoff_seconds(2);
        let d3 = p.backoff_seconds(3);
        let d4 = p.backoff_seconds(4);
        assert!(d1 > 0.0 && d2 >= d1 && d3 >= d2 && d4 >= d3);
        assert!(p.backoff_seconds(100) <= p.max_delay_s);
    }
}
