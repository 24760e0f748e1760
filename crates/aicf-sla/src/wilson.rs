//! Wilson score interval lower bound (§4.16), used to turn a small observed
//! sample (`successes`/`total`) into a conservative pass/fail bound instead
//! of trusting the raw ratio, which is noisy for small windows.

/// Confidence levels the evaluator is allowed to configure, mapped to their
/// two-sided z-score. Anything else is rejected at config validation time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Confidence {
    P80,
    P90,
    P95,
    P975,
    P99,
}

impl Confidence {
    pub fn z(&self) -> f64 {
        match self {
            Confidence::P80 => 1.2816,
            Confidence::P90 => 1.6449,
            Confidence::P95 => 1.9600,
            Confidence::P975 => 2.2414,
            Confidence::P99 => 2.5758,
        }
    }

    pub fn from_f64(v: f64) -> Option<Self> {
        // Tolerant match on the nominal confidence value, not the z-score.
        let candidates = [
            (0.80, Confidence::P80),
            (0.90, Confidence::P90),
            (0.95, Confidence::P95),
            (0.975, Confidence::P975),
            (0.99, Confidence::P99),
        ];
        candidates
            .into_iter()
            .find(|(c, _)| (c - v).abs() < 1e-6)
            .map(|(_, conf)| conf)
    }
}

/// Lower bound of the Wilson score interval for `successes` out of `total`
/// observations at the given confidence. Returns `0.0` for `total == 0` —
/// an empty window never passes a hard gate.
pub fn wilson_lower_bound(successes: u64, total: u64, confidence: Confidence) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let p_hat = (successes as f64 / n).clamp(0.0, 1.0);
    let z = confidence.z();
    let z2 = z * z;

    let denom = 1.0 + z2 / n;
    let center = p_hat + z2 / (2.0 * n);
    let margin = z * ((p_hat * (1.0 - p_hat) / n) + z2 / (4.0 * n * n)).sqrt();

    ((center - margin) / denom).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_success_approaches_one_with_more_samples() {
        let small = wilson_lower_bound(10, 10, Confidence::P95);
        let large = wilson_lower_bound(1000, 1000, Confidence::P95);
        assert!(large > small);
        assert!(large > 0.99);
    }

    #[test]
    fn empty_window_is_zero() {
        assert_eq!(wilson_lower_bound(0, 0, Confidence::P95), 0.0);
    }

    #[test]
    fn monotone_in_successes_for_fixed_total() {
        let total = 200;
        let mut prev = -1.0;
        for k in 0..=total {
            let lb = wilson_lower_bound(k, total, Confidence::P90);
            assert!(lb >= prev - 1e-12, "k={k} lb={lb} prev={prev}");
            prev = lb;
        }
    }

    #[test]
    fn higher_confidence_is_more_conservative() {
        let lb90 = wilson_lower_bound(95, 100, Confidence::P90);
        let lb99 = wilson_lower_bound(95, 100, Confidence::P99);
        assert!(lb99 <= lb90);
    }
}
