//! SLA window evaluator (§4.16): turns a measurement window into a hard
//! pass/fail decision (all dimensions must pass) plus a soft, weighted
//! ranking score that is never itself a gate.

use crate::wilson::{wilson_lower_bound, Confidence};

#[derive(Clone, Copy, Debug)]
pub struct WindowMeasurement {
    pub total: u64,
    pub traps_ok: u64,
    pub qos_ok: u64,
    pub latency_ms: f64,
    /// Ratio in [0, 1]: fraction of the window the provider was reachable.
    pub availability: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct SlaThresholds {
    pub traps_min: f64,
    pub qos_min: f64,
    pub max_latency_ms: f64,
    pub availability_min: f64,
    pub confidence: Confidence,
}

impl Default for SlaThresholds {
    fn default() -> Self {
        Self {
            traps_min: 0.98,
            qos_min: 0.90,
            max_latency_ms: 2_000.0,
            availability_min: 0.95,
            confidence: Confidence::P95,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DimensionResult {
    Pass,
    Fail,
}

#[derive(Clone, Copy, Debug)]
pub struct SlaDecision {
    pub traps: DimensionResult,
    pub qos: DimensionResult,
    pub latency: DimensionResult,
    pub availability: DimensionResult,
    pub traps_lower_bound: f64,
    pub qos_lower_bound: f64,
    pub passed: bool,
    /// Normalized soft score in [0,1], never a hard gate — used to rank
    /// providers within the set that already passed (or to rank severity
    /// of a failure).
    pub soft_score: f64,
}

fn ramp_up(value: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 1.0;
    }
    (value / threshold).clamp(0.0, 1.0)
}

fn ramp_down(value: f64, threshold: f64) -> f64 {
    if value <= threshold {
        return 1.0;
    }
    if threshold <= 0.0 {
        return 0.0;
    }
    (threshold / value).clamp(0.0, 1.0)
}

/// Evaluate a single SLA window. Traps/QoS use the Wilson lower bound at
/// `thresholds.confidence`; latency is a hard `<=` gate; availability is a
/// plain ratio gate. All four must pass for `passed` to be true.
pub fn evaluate(window: &WindowMeasurement, thresholds: &SlaThresholds) -> SlaDecision {
    let traps_lb = wilson_lower_bound(window.traps_ok, window.total, thresholds.confidence);
    let qos_lb = wilson_lower_bound(window.qos_ok, window.total, thresholds.confidence);

    let traps = if traps_lb >= thresholds.traps_min {
        DimensionResult::Pass
    } else {
        DimensionResult::Fail
    };
    let qos = if qos_lb >= thresholds.qos_min {
        DimensionResult::Pass
    } else {
        DimensionResult::Fail
    };
    let latency = if window.latency_ms <= thresholds.max_latency_ms {
        DimensionResult::Pass
    } else {
        DimensionResult::Fail
    };
    let availability = if window.availability >= thresholds.availability_min {
        DimensionResult::Pass
    } else {
        DimensionResult::Fail
    };

    let passed = traps == DimensionResult::Pass
        && qos == DimensionResult::Pass
        && latency == DimensionResult::Pass
        && availability == DimensionResult::Pass;

    let w_traps = ramp_up(traps_lb, thresholds.traps_min);
    let w_qos = ramp_up(qos_lb, thresholds.qos_min);
    let w_avail = ramp_up(window.availability, thresholds.availability_min);
    let w_latency = ramp_down(window.latency_ms, thresholds.max_latency_ms);
    let soft_score = (w_traps + w_qos + w_avail + w_latency) / 4.0;

    SlaDecision {
        traps,
        qos,
        latency,
        availability,
        traps_lower_bound: traps_lb,
        qos_lower_bound: qos_lb,
        passed,
        soft_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn good_window_passes_all_dimensions() {
        let w = WindowMeasurement {
            total: 500,
            traps_ok: 495,
            qos_ok: 480,
            latency_ms: 500.0,
            availability: 0.99,
        };
        let d = evaluate(&w, &SlaThresholds::default());
        assert!(d.passed);
        assert_eq!(d.traps, DimensionResult::Pass);
    }

    #[test]
    fn bad_traps_and_qos_fail_window() {
        let w = WindowMeasurement {
            total: 200,
            traps_ok: 190,
            qos_ok: 150,
            latency_ms: 200.0,
            availability: 0.99,
        };
        let thresholds = SlaThresholds {
            traps_min: 0.98,
            qos_min: 0.90,
            ..Default::default()
        };
        let d = evaluate(&w, &thresholds);
        assert!(!d.passed);
        assert_eq!(d.traps, DimensionResult::Fail);
        assert_eq!(d.qos, DimensionResult::Fail);
    }

    #[test]
    fn high_latency_is_a_hard_fail_even_with_perfect_ratios() {
        let w = WindowMeasurement {
            total: 100,
            traps_ok: 100,
            qos_ok: 100,
            latency_ms: 5_000.0,
            availability: 1.0,
        };
        let d = evaluate(&w, &SlaThresholds::default());
        assert!(!d.passed);
        assert_eq!(d.latency, DimensionResult::Fail);
    }

    #[test]
    fn soft_score_is_bounded() {
        let w = WindowMeasurement {
            total: 50,
            traps_ok: 10,
            qos_ok: 5,
            latency_ms: 10_000.0,
            availability: 0.1,
        };
        let d = evaluate(&w, &SlaThresholds::default());
        assert!(d.soft_score >= 0.0 && d.soft_score <= 1.0);
    }
}
