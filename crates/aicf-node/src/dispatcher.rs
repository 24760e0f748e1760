//! The dispatcher (§5): a cooperative `tokio::task` loop that repeatedly
//! sweeps expired leases/jobs and runs one assignment pass, backing off to
//! an idle sleep when a tick finds nothing to do. Stops on a
//! `tokio::sync::watch` signal.

use std::sync::{Arc, Mutex};

use rand::Rng;
use tracing::{debug, info};

use aicf_core::{AicfEvent, BlockHeight, TimestampMs};
use aicf_queue::{AssignmentEngine, EligibilityPolicy, TtlGc};
use aicf_registry::Registry;
use aicf_storage::Storage;

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub tick_interval_ms: u64,
    pub idle_sleep_ms: u64,
    pub jitter_fraction: f64,
    pub lease_ttl_s: u64,
    pub stake_normalizer: u128,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            idle_sleep_ms: 2_000,
            jitter_fraction: 0.1,
            lease_ttl_s: 300,
            stake_normalizer: 10_000_000_000,
        }
    }
}

pub struct Dispatcher<S: Storage> {
    storage: Arc<S>,
    registry: Arc<Mutex<Registry>>,
    assignment: Arc<AssignmentEngine<S>>,
    ttl_gc: Arc<TtlGc<S>>,
    policy: EligibilityPolicy,
    events: tokio::sync::broadcast::Sender<AicfEvent>,
    cfg: DispatcherConfig,
}

impl<S: Storage> Dispatcher<S> {
    pub fn new(
        storage: Arc<S>,
        registry: Arc<Mutex<Registry>>,
        assignment: Arc<AssignmentEngine<S>>,
        ttl_gc: Arc<TtlGc<S>>,
        policy: EligibilityPolicy,
        events: tokio::sync::broadcast::Sender<AicfEvent>,
        cfg: DispatcherConfig,
    ) -> Self {
        Self {
            storage,
            registry,
            assignment,
            ttl_gc,
            policy,
            events,
            cfg,
        }
    }

    fn tick_delay(&self, rng: &mut impl Rng) -> std::time::Duration {
        let base = self.cfg.tick_interval_ms as f64;
        let noise = base * self.cfg.jitter_fraction * (2.0 * rng.gen::<f64>() - 1.0);
        std::time::Duration::from_millis((base + noise).max(0.0) as u64)
    }

    /// One sweep + one assignment pass. `height` doubles as the epoch
    /// counter — the dispatcher advances it by one per tick, matching how
    /// the epoch budget (§4.11) is keyed off height elsewhere.
    fn run_once(&self, height: BlockHeight, now: TimestampMs) -> usize {
        let swept = self.ttl_gc.sweep_once(now);
        if swept.expired > 0 || swept.purged > 0 {
            debug!(expired = swept.expired, purged = swept.purged, kept = swept.kept, "ttl sweep");
        }

        let providers: Vec<_> = {
            let registry = self.registry.lock().unwrap();
            registry.list().into_iter().cloned().collect()
        };
        let now_secs = now as f64 / 1000.0;
        let assigned = self.assignment.run_pass(
            &providers,
            &self.policy,
            height as u64,
            now,
            now_secs,
            self.cfg.lease_ttl_s,
            self.cfg.stake_normalizer,
        );
        for (job_id, provider_id) in &assigned {
            info!(%job_id, %provider_id, "assigned");
        }
        let _ = &self.events; // events are forwarded by storage.append_event inside run_pass
        assigned.len()
    }

    /// Runs until `stop` is signalled `true`. Each tick is scheduled with
    /// `tick_interval_ms` plus jitter; a tick that assigns nothing backs
    /// off to `idle_sleep_ms` before the next attempt.
    pub async fn run(self, mut stop: tokio::sync::watch::Receiver<bool>) {
        let mut height: BlockHeight = 0;
        let mut rng = rand::thread_rng();
        info!("dispatcher starting");
        loop {
            if *stop.borrow() {
                break;
            }
            let now = now_ms();
            let did = self.run_once(height, now);
            height += 1;

            let delay = if did == 0 {
                std::time::Duration::from_millis(self.cfg.idle_sleep_ms)
            } else {
                self.tick_delay(&mut rng)
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop.changed() => {
                    if *stop.borrow() {
                        break;
                    }
                }
            }
        }
        info!("dispatcher stopped");
    }
}

fn now_ms() -> TimestampMs {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as TimestampMs)
        .unwrap_or(0)
}
