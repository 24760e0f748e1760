//! Liveness pings folded into a decaying health score and a derived status.
//! Numeric defaults are carried over unchanged from the reference
//! heartbeat monitor so that operators tuning network policy inherit the
//! same curve shape.

use std::collections::HashMap;
use std::sync::Mutex;

use aicf_core::ProviderId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unresponsive,
}

#[derive(Clone, Copy, Debug)]
pub struct HeartbeatConfig {
    pub halflife_s: f64,
    pub latency_target_ms: f64,
    pub latency_tolerance_ms: f64,
    pub asc_rate: f64,
    pub fail_penalty_base: f64,
    pub fail_penalty_per_consecutive: f64,
    pub fail_penalty_cap: f64,
    pub degrade_threshold: f64,
    pub down_threshold: f64,
    pub stale_timeout_s: f64,
    pub max_consecutive_fail_for_down: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            halflife_s: 900.0,
            latency_target_ms: 250.0,
            latency_tolerance_ms: 750.0,
            asc_rate: 0.5,
            fail_penalty_base: 0.18,
            fail_penalty_per_consecutive: 0.08,
            fail_penalty_cap: 0.9,
            degrade_threshold: 0.55,
            down_threshold: 0.22,
            stale_timeout_s: 300.0,
            max_consecutive_fail_for_down: 5,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ProviderHeartbeatState {
    pub last_seen_ts: f64,
    pub score: f64,
    pub success_ema: f64,
    pub latency_ema_ms: f64,
    pub last_update_ts: f64,
    pub consecutive_failures: u32,
    pub last_status: HealthStatus,
}

impl Default for ProviderHeartbeatState {
    fn default() -> Self {
        Self {
            last_seen_ts: 0.0,
            score: 1.0,
            success_ema: 1.0,
            latency_ema_ms: 0.0,
            last_update_ts: 0.0,
            consecutive_failures: 0,
            last_status: HealthStatus::Healthy,
        }
    }
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

impl ProviderHeartbeatState {
    /// `score *= 0.5^(dt/halflife)`, applied to score, success_ema and
    /// latency_ema_ms alike.
    pub fn decay(&mut self, now: f64, halflife_s: f64) {
        let dt = (now - self.last_update_ts).max(0.0);
        if dt == 0.0 || halflife_s <= 0.0 {
            self.last_update_ts = now;
            return;
        }
        let factor = 0.5f64.powf(dt / halflife_s);
        self.score *= factor;
        self.success_ema *= factor;
        self.latency_ema_ms *= factor;
        self.last_update_ts = now;
    }

    fn derive_status(&self, now: f64, cfg: &HeartbeatConfig) -> HealthStatus {
        let stale = (now - self.last_seen_ts) > cfg.stale_timeout_s || self.last_seen_ts <= 0.0;
        if stale {
            if self.consecutive_failures >= cfg.max_consecutive_fail_for_down
                || self.score <= cfg.down_threshold
            {
                HealthStatus::Unresponsive
            } else {
                HealthStatus::Degraded
            }
        } else if self.score <= cfg.down_threshold
            || self.consecutive_failures >= cfg.max_consecutive_fail_for_down
        {
            HealthStatus::Unresponsive
        } else if self.score <= cfg.degrade_threshold {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

fn latency_impulse(latency_ms: f64, target: f64, tolerance: f64) -> f64 {
    if latency_ms <= target {
        return 1.0;
    }
    (1.0 - (latency_ms - target) / tolerance).max(0.0)
}

pub type StatusHook = Box<dyn Fn(ProviderId, HealthStatus, HealthStatus) + Send + Sync>;

pub struct HeartbeatMonitor {
    cfg: HeartbeatConfig,
    states: Mutex<HashMap<ProviderId, ProviderHeartbeatState>>,
    status_hook: Option<StatusHook>,
}

impl HeartbeatMonitor {
    pub fn new(cfg: HeartbeatConfig) -> Self {
        Self {
            cfg,
            states: Mutex::new(HashMap::new()),
            status_hook: None,
        }
    }

    pub fn with_status_hook(mut self, hook: StatusHook) -> Self {
        self.status_hook = Some(hook);
        self
    }

    pub fn snapshot(&self, provider_id: ProviderId) -> ProviderHeartbeatState {
        self.states
            .lock()
            .unwrap()
            .get(&provider_id)
            .copied()
            .unwrap_or_default()
    }

    /// Applies time decay without recording a new ping; useful for a
    /// periodic background tick that keeps scores fresh between pings.
    pub fn tick(&self, provider_id: ProviderId, now: f64) -> HealthStatus {
        let mut g = self.states.lock().unwrap();
        let st = g.entry(provider_id).or_default();
        st.decay(now, self.cfg.halflife_s);
        let status = st.derive_status(now, &self.cfg);
        self.transition(provider_id, st, status)
    }

    pub fn record_ping(
        &self,
        provider_id: ProviderId,
        ok: bool,
        latency_ms: Option<f64>,
        now: f64,
    ) -> HealthStatus {
        let mut g = self.states.lock().unwrap();
        let st = g.entry(provider_id).or_default();
        st.decay(now, self.cfg.halflife_s);
        st.last_seen_ts = now;

        if ok {
            st.consecutive_failures = 0;
            st.success_ema = clamp01(st.success_ema + (1.0 - st.success_ema) * 0.6);
            let lat = latency_ms.unwrap_or(self.cfg.latency_target_ms);
            st.latency_ema_ms = st.latency_ema_ms * 0.4 + lat * 0.6;
            let imp_lat =
                latency_impulse(lat, self.cfg.latency_target_ms, self.cfg.latency_tolerance_ms);
            let impulse = 0.5 + 0.5 * imp_lat;
            st.score = clamp01(st.score + self.cfg.asc_rate * (1.0 - st.score) * impulse);
        } else {
            st.consecutive_failures += 1;
            st.success_ema *= 0.5;
            let penalty = (self.cfg.fail_penalty_base
                + self.cfg.fail_penalty_per_consecutive
                    * ((st.consecutive_failures - 1) as f64))
                .clamp(0.0, self.cfg.fail_penalty_cap);
            st.score *= 1.0 - penalty;
        }

        let status = st.derive_status(now, &self.cfg);
        self.transition(provider_id, st, status)
    }

    fn transition(
        &self,
        provider_id: ProviderId,
        st: &mut ProviderHeartbeatState,
        status: HealthStatus,
    ) -> HealthStatus {
        let prev = st.last_status;
        st.last_status = status;
        if prev != status {
            if let Some(hook) = &self.status_hook {
                hook(provider_id, prev, status);
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_pings_keep_score_high() {
        let mon = HeartbeatMonitor::new(HeartbeatConfig::default());
        let pid = ProviderId::from_bytes([7u8; 32]);
        for i in 0..10 {
            let status = mon.record_ping(pid, true, Some(100.0), i as f64 * 10.0);
            assert_eq!(status, HealthStatus::Healthy);
        }
    }

    #[test]
    fn repeated_failures_drive_unresponsive() {
        let mon = HeartbeatMonitor::new(HeartbeatConfig::default());
        let pid = ProviderId::from_bytes([8u8; 32]);
        mon.record_ping(pid, true, Some(100.0), 0.0);
        let mut last = HealthStatus::Healthy;
        for i in 1..10 {
            last = mon.record_ping(pid, false, None, i as f64);
        }
        assert_eq!(last, HealthStatus::Unresponsive);
    }

    #[test]
    fn staleness_forces_at_least_degraded() {
        let mon = HeartbeatMonitor::new(HeartbeatConfig::default());
        let pid = ProviderId::from_bytes([9u8; 32]);
        mon.record_ping(pid, true, Some(50.0), 0.0);
        let status = mon.tick(pid, 10_000.0);
        assert_ne!(status, HealthStatus::Healthy);
    }
}
