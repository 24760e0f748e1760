//! Per-provider concurrent/epoch unit budgets (§4.6). Grounded on the
//! reference `QuotaTracker`: a reservation moves `reserved -> used` on
//! commit, or is simply dropped on release (cancel path).

use std::collections::HashMap;
use std::sync::Mutex;

use aicf_core::{JobKind, ProviderId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("units must be > 0")]
    InvalidUnits,
    #[error("concurrent_exhausted")]
    ConcurrentExhausted,
    #[error("ai_units_exhausted")]
    AiUnitsExhausted,
    #[error("quantum_units_exhausted")]
    QuantumUnitsExhausted,
}

#[derive(Clone, Copy, Debug)]
pub struct QuotaConfig {
    pub ai_units_per_epoch: u64,
    pub quantum_units_per_epoch: u64,
    pub max_concurrent: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            ai_units_per_epoch: 1_000_000_000,
            quantum_units_per_epoch: 1_000_000_000,
            max_concurrent: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Usage {
    ai_used: u64,
    ai_reserved: u64,
    quantum_used: u64,
    quantum_reserved: u64,
    concurrent: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reservation {
    pub rid: u64,
    pub provider: ProviderId,
    pub kind: JobKind,
    pub epoch: u64,
    pub units: u64,
}

pub struct QuotaTracker {
    default_cfg: QuotaConfig,
    configs: Mutex<HashMap<ProviderId, QuotaConfig>>,
    usage: Mutex<HashMap<(ProviderId, u64), Usage>>,
    next_rid: Mutex<u64>,
}

impl QuotaTracker {
    pub fn new(default_cfg: QuotaConfig) -> Self {
        Self {
            default_cfg,
            configs: Mutex::new(HashMap::new()),
            usage: Mutex::new(HashMap::new()),
            next_rid: Mutex::new(0),
        }
    }

    pub fn set_config(&self, provider: ProviderId, cfg: QuotaConfig) {
        self.configs.lock().unwrap().insert(provider, cfg);
    }

    pub fn get_config(&self, provider: ProviderId) -> QuotaConfig {
        self.configs
            .lock()
            .unwrap()
            .get(&provider)
            .copied()
            .unwrap_or(self.default_cfg)
    }

    fn next_id(&self) -> u64 {
        let mut g = self.next_rid.lock().unwrap();
        *g += 1;
        *g
    }

    pub fn reserve(
        &self,
        provider: ProviderId,
        kind: JobKind,
        epoch: u64,
        units: u64,
    ) -> Result<Reservation, QuotaError> {
        if units == 0 {
            return Err(QuotaError::InvalidUnits);
        }
        let cfg = self.get_config(provider);
        let mut g = self.usage.lock().unwrap();
        let u = g.entry((provider, epoch)).or_default();
        if u.concurrent >= cfg.max_concurrent {
            return Err(QuotaError::ConcurrentExhausted);
        }
        match kind {
            JobKind::Ai => {
                let rem = cfg.ai_units_per_epoch.saturating_sub(u.ai_used + u.ai_reserved);
                if rem < units {
                    return Err(QuotaError::AiUnitsExhausted);
                }
                u.ai_reserved += units;
            }
            JobKind::Quantum => {
                let rem = cfg
                    .quantum_units_per_epoch
                    .saturating_sub(u.quantum_used + u.quantum_reserved);
                if rem < units {
                    return Err(QuotaError::QuantumUnitsExhausted);
                }
                u.quantum_reserved += units;
            }
        }
        u.concurrent += 1;
        drop(g);
        Ok(Reservation {
            rid: self.next_id(),
            provider,
            kind,
            epoch,
            units,
        })
    }

    pub fn release(&self, res: Reservation) {
        let mut g = self.usage.lock().unwrap();
        let u = g.entry((res.provider, res.epoch)).or_default();
        u.concurrent = u.concurrent.saturating_sub(1);
        match res.kind {
            JobKind::Ai => u.ai_reserved = u.ai_reserved.saturating_sub(res.units),
            JobKind::Quantum => u.quantum_reserved = u.quantum_reserved.saturating_sub(res.units),
        }
    }

    pub fn commit(&self, res: Reservation) {
        let mut g = self.usage.lock().unwrap();
        let u = g.entry((res.provider, res.epoch)).or_default();
        u.concurrent = u.concurrent.saturating_sub(1);
        match res.kind {
            JobKind::Ai => {
                let moved = res.units.min(u.ai_reserved);
                u.ai_reserved -= moved;
                u.ai_used += moved;
            }
            JobKind::Quantum => {
                let moved = res.units.min(u.quantum_reserved);
                u.quantum_reserved -= moved;
                u.quantum_used += moved;
            }
        }
    }

    pub fn adjust_committed(&self, res: Reservation, delta: i64) {
        let mut g = self.usage.lock().unwrap();
        let u = g.entry((res.provider, res.epoch)).or_default();
        match res.kind {
            JobKind::Ai => {
                u.ai_used = (u.ai_used as i64 + delta).max(0) as u64;
            }
            JobKind::Quantum => {
                u.quantum_used = (u.quantum_used as i64 + delta).max(0) as u64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_commit_release_roundtrip() {
        let qt = QuotaTracker::new(QuotaConfig {
            ai_units_per_epoch: 100,
            quantum_units_per_epoch: 100,
            max_concurrent: 2,
        });
        let pid = ProviderId::from_bytes([1u8; 32]);
        let r1 = qt.reserve(pid, JobKind::Ai, 0, 60).unwrap();
        assert!(qt.reserve(pid, JobKind::Ai, 0, 60).is_err());
        qt.commit(r1);
        let r2 = qt.reserve(pid, JobKind::Ai, 0, 40).unwrap();
        qt.release(r2);
    }
}
