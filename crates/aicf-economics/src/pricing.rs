//! Pricing (§4.10): converts measured job units into a base reward amount.
//!
//! Surge and quality multipliers are expressed as fixed-point integers
//! scaled by [`FACTOR_SCALE`] rather than floats — the workspace has no
//! decimal crate, and reward math must be exactly reproducible across
//! nodes, so the fractional part lives entirely in integer arithmetic.

use aicf_core::{JobKind, TokenAmount};
use thiserror::Error;

/// One unit of surge/quality == `FACTOR_SCALE`. `2_500_000` means 2.5x.
pub const FACTOR_SCALE: u64 = 1_000_000;
const FACTOR_CAP: u64 = 10 * FACTOR_SCALE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    Floor,
    Ceil,
    NearestEven,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("surge/quality factor must be > 0")]
    NonPositiveFactor,
    #[error("reward {reward} exceeds hard cap {cap}")]
    HardCapExceeded { reward: TokenAmount, cap: TokenAmount },
}

#[derive(Clone, Copy, Debug)]
pub struct PricingSchedule {
    pub ai_per_unit: TokenAmount,
    pub quantum_per_unit: TokenAmount,
    pub min_reward: Option<TokenAmount>,
    pub max_reward: Option<TokenAmount>,
    pub rounding: Rounding,
    pub hard_cap: Option<TokenAmount>,
}

impl Default for PricingSchedule {
    fn default() -> Self {
        Self {
            ai_per_unit: 100_000,
            quantum_per_unit: 800_000,
            min_reward: Some(0),
            max_reward: None,
            rounding: Rounding::Floor,
            hard_cap: None,
        }
    }
}

/// Clamps a factor into `(0, 10]`, expressed in [`FACTOR_SCALE`] units.
pub fn clamp_factor(scaled: u64) -> Result<u64, PricingError> {
    if scaled == 0 {
        return Err(PricingError::NonPositiveFactor);
    }
    Ok(scaled.min(FACTOR_CAP))
}

fn round_div(num: u128, den: u128, mode: Rounding) -> u128 {
    match mode {
        Rounding::Floor => num / den,
        Rounding::Ceil => (num + den - 1) / den,
        Rounding::NearestEven => {
            let q = num / den;
            let r = num % den;
            let twice_r = r * 2;
            if twice_r < den {
                q
            } else if twice_r > den {
                q + 1
            } else if q % 2 == 0 {
                q
            } else {
                q + 1
            }
        }
    }
}

fn apply_bounds(
    raw: TokenAmount,
    units: u64,
    schedule: &PricingSchedule,
) -> Result<TokenAmount, PricingError> {
    if units == 0 {
        return Ok(0);
    }
    let mut amt = raw;
    if let Some(min) = schedule.min_reward {
        if amt < min {
            amt = min;
        }
    }
    if let Some(max) = schedule.max_reward {
        if amt > max {
            amt = max;
        }
    }
    if let Some(cap) = schedule.hard_cap {
        if amt > cap {
            return Err(PricingError::HardCapExceeded { reward: raw, cap });
        }
    }
    Ok(amt)
}

fn price(
    per_unit: TokenAmount,
    units: u64,
    surge_scaled: u64,
    quality_scaled: u64,
    schedule: &PricingSchedule,
) -> Result<TokenAmount, PricingError> {
    if units == 0 {
        return Ok(0);
    }
    let surge = clamp_factor(surge_scaled)?;
    let quality = clamp_factor(quality_scaled)?;

    let base = per_unit * units as u128;
    let num = base * surge as u128 * quality as u128;
    let den = (FACTOR_SCALE as u128) * (FACTOR_SCALE as u128);
    let rounded = round_div(num, den, schedule.rounding);
    apply_bounds(rounded, units, schedule)
}

pub fn price_ai_units(
    units: u64,
    schedule: &PricingSchedule,
    surge_scaled: u64,
    quality_scaled: u64,
) -> Result<TokenAmount, PricingError> {
    price(schedule.ai_per_unit, units, surge_scaled, quality_scaled, schedule)
}

pub fn price_quantum_units(
    units: u64,
    schedule: &PricingSchedule,
    surge_scaled: u64,
    quality_scaled: u64,
) -> Result<TokenAmount, PricingError> {
    price(schedule.quantum_per_unit, units, surge_scaled, quality_scaled, schedule)
}

pub fn price_job(
    kind: JobKind,
    units: u64,
    schedule: &PricingSchedule,
    surge_scaled: u64,
    quality_scaled: u64,
) -> Result<TokenAmount, PricingError> {
    match kind {
        JobKind::Ai => price_ai_units(units, schedule, surge_scaled, quality_scaled),
        JobKind::Quantum => price_quantum_units(units, schedule, surge_scaled, quality_scaled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_price_no_surge() {
        let schedule = PricingSchedule::default();
        let reward = price_ai_units(10, &schedule, FACTOR_SCALE, FACTOR_SCALE).unwrap();
        assert_eq!(reward, 1_000_000);
    }

    #[test]
    fn surge_scales_reward() {
        let schedule = PricingSchedule::default();
        let reward = price_quantum_units(3, &schedule, 1_200_000, FACTOR_SCALE).unwrap();
        assert_eq!(reward, 2_880_000); // 800_000*3*1.2
    }

    #[test]
    fn hard_cap_is_rejected() {
        let mut schedule = PricingSchedule::default();
        schedule.hard_cap = Some(500_000);
        let err = price_ai_units(10, &schedule, FACTOR_SCALE, FACTOR_SCALE).unwrap_err();
        assert!(matches!(err, PricingError::HardCapExceeded { .. }));
    }

    #[test]
    fn zero_units_is_zero_reward_even_under_min() {
        let mut schedule = PricingSchedule::default();
        schedule.min_reward = Some(1_000);
        assert_eq!(price_ai_units(0, &schedule, FACTOR_SCALE, FACTOR_SCALE).unwrap(), 0);
    }
}
