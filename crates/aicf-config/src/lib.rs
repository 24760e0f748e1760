//! Typed AICF configuration (§6): the canonical sections loaded from TOML,
//! overlaid with `AICF_<SECTION>_<FIELD>` environment variables, and
//! validated up front before the rest of the workspace is constructed
//! from it.

pub mod error;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;

fn split_9500() -> SplitConfig {
    SplitConfig::default()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutsConfig {
    pub ai_unit_rate_nano: u128,
    pub quantum_unit_rate_nano: u128,
}

impl Default for PayoutsConfig {
    fn default() -> Self {
        Self {
            ai_unit_rate_nano: 2,
            quantum_unit_rate_nano: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub provider_bps: u32,
    pub treasury_bps: u32,
    pub miner_bps: u32,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            provider_bps: 8_500,
            treasury_bps: 1_000,
            miner_bps: 500,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakeConfig {
    pub min_stake_ai_nano: u128,
    pub min_stake_quantum_nano: u128,
    pub lock_period_blocks: u64,
    pub unbonding_period_blocks: u64,
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            min_stake_ai_nano: 1_000,
            min_stake_quantum_nano: 5_000,
            lock_period_blocks: 2_400,
            unbonding_period_blocks: 14_400,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaConfig {
    pub traps_ratio_min: f64,
    pub qos_min: f64,
    pub latency_p95_max_ms: f64,
    pub availability_min: f64,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            traps_ratio_min: 0.98,
            qos_min: 0.90,
            latency_p95_max_ms: 2_000.0,
            availability_min: 0.95,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlashingConfig {
    pub traps_fail_bps: u32,
    pub qos_fail_bps: u32,
    pub availability_fail_bps: u32,
    pub misbehavior_bps: u32,
    pub jail_blocks: u64,
}

impl Default for SlashingConfig {
    fn default() -> Self {
        Self {
            traps_fail_bps: 500,
            qos_fail_bps: 500,
            availability_fail_bps: 300,
            misbehavior_bps: 10_000,
            jail_blocks: 5,
        }
    }
}

/// Canonical AICF configuration (§6). Every section has an explicit
/// default so a config file only needs to name the overrides it cares
/// about; defaulted fields can simply be omitted from the TOML.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AicfConfig {
    pub payouts: PayoutsConfig,
    pub split: SplitConfig,
    pub stake: StakeConfig,
    pub sla: SlaConfig,
    pub slashing: SlashingConfig,
    pub token_decimals: u8,
    pub chain_id: u64,
}

impl Default for AicfConfig {
    fn default() -> Self {
        Self {
            payouts: PayoutsConfig::default(),
            split: split_9500(),
            stake: StakeConfig::default(),
            sla: SlaConfig::default(),
            slashing: SlashingConfig::default(),
            token_decimals: 9,
            chain_id: 1,
        }
    }
}

impl AicfConfig {
    /// Loads `path` as TOML, applies any `AICF_<SECTION>_<FIELD>` env
    /// overrides found in the process environment, and validates the
    /// result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut cfg: AicfConfig = toml::from_str(&text)?;
        cfg.apply_env_overlay(std::env::vars())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Applies `AICF_<SECTION>_<FIELD>` overrides from an arbitrary
    /// key/value iterator (exposed separately from `load` so tests don't
    /// need to touch the real process environment).
    pub fn apply_env_overlay(
        &mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        let mut value = toml::Value::try_from(&*self).expect("config always serializes");
        for (key, raw) in vars {
            let Some(rest) = key.strip_prefix("AICF_") else {
                continue;
            };
            let Some((section, field)) = rest.split_once('_') else {
                continue;
            };
            let section = section.to_ascii_lowercase();
            let field = field.to_ascii_lowercase();
            let table = value
                .as_table_mut()
                .expect("top level config is a table")
                .get_mut(&section);
            let Some(table) = table.and_then(|v| v.as_table_mut()) else {
                return Err(ConfigError::InvalidOverride {
                    key: key.clone(),
                    value: raw,
                    reason: format!("unknown config section '{section}'"),
                });
            };
            if !table.contains_key(&field) {
                return Err(ConfigError::InvalidOverride {
                    key: key.clone(),
                    value: raw,
                    reason: format!("unknown field '{field}' in section '{section}'"),
                });
            }
            table.insert(field, parse_override(&raw));
        }
        *self = value.try_into().map_err(|e: toml::de::Error| ConfigError::Parse(e))?;
        Ok(())
    }

    /// Validates §6's stated rules: bps in `[0, 10_000]` with split
    /// summing to exactly `10_000`, ratios in `[0, 1]`, positive
    /// durations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let split_sum = self.split.provider_bps as u64 + self.split.treasury_bps as u64 + self.split.miner_bps as u64;
        if split_sum != 10_000 {
            return Err(ConfigError::Invalid(format!(
                "split bps must sum to 10_000, got {split_sum}"
            )));
        }
        for (name, bps) in [
            ("slashing.traps_fail_bps", self.slashing.traps_fail_bps),
            ("slashing.qos_fail_bps", self.slashing.qos_fail_bps),
            ("slashing.availability_fail_bps", self.slashing.availability_fail_bps),
            ("slashing.misbehavior_bps", self.slashing.misbehavior_bps),
        ] {
            if bps > 10_000 {
                return Err(ConfigError::Invalid(format!("{name} must be in [0, 10_000], got {bps}")));
            }
        }
        for (name, ratio) in [
            ("sla.traps_ratio_min", self.sla.traps_ratio_min),
            ("sla.qos_min", self.sla.qos_min),
            ("sla.availability_min", self.sla.availability_min),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(ConfigError::Invalid(format!("{name} must be in [0, 1], got {ratio}")));
            }
        }
        if self.sla.latency_p95_max_ms <= 0.0 {
            return Err(ConfigError::Invalid("sla.latency_p95_max_ms must be positive".into()));
        }
        if self.stake.lock_period_blocks == 0 || self.stake.unbonding_period_blocks == 0 {
            return Err(ConfigError::Invalid("stake lock/unbonding periods must be positive".into()));
        }
        if self.slashing.jail_blocks == 0 {
            return Err(ConfigError::Invalid("slashing.jail_blocks must be positive".into()));
        }
        Ok(())
    }
}

fn parse_override(raw: &str) -> toml::Value {
    if let Ok(i) = raw.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return toml::Value::Float(f);
    }
    if let Ok(b) = raw.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    toml::Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        AicfConfig::default().validate().unwrap();
    }

    #[test]
    fn split_not_summing_to_10000_is_rejected() {
        let mut cfg = AicfConfig::default();
        cfg.split.miner_bps += 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_overlay_overrides_nested_field() {
        let mut cfg = AicfConfig::default();
        cfg.apply_env_overlay([("AICF_SLA_QOS_MIN".to_string(), "0.75".to_string())])
            .unwrap();
        assert_eq!(cfg.sla.qos_min, 0.75);
        cfg.validate().unwrap();
    }

    #[test]
    fn env_overlay_rejects_unknown_section() {
        let mut cfg = AicfConfig::default();
        let err = cfg
            .apply_env_overlay([("AICF_BOGUS_FIELD".to_string(), "1".to_string())])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = AicfConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        let back: AicfConfig = toml::from_str(&text).unwrap();
        assert_eq!(cfg, back);
    }
}
