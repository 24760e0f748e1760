//! aicf-node — the AI Compute Fund scheduling/economics node binary.
//!
//! Startup sequence:
//!   1. Load and validate configuration (TOML + `AICF_*` env overrides)
//!   2. Build in-memory storage, registry, treasury ledger and rewards audit
//!   3. Start the JSON-RPC 2.0 server
//!   4. Spawn the dispatcher as a background task
//!   5. Wait for Ctrl-C, then signal the dispatcher to stop and drain it

mod dispatcher;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tracing::info;

use aicf_config::AicfConfig;
use aicf_queue::{AssignmentEngine, EligibilityPolicy, QuotaConfig, QuotaTracker, TtlGc, TtlPolicy};
use aicf_registry::{Allowlist, Registry};
use aicf_rpc::{RpcServer, RpcServerState};
use aicf_storage::MemoryStorage;
use aicf_treasury::{RewardsAudit, TreasuryLedger};

use dispatcher::{Dispatcher, DispatcherConfig};

#[derive(Parser, Debug)]
#[command(
    name = "aicf-node",
    version,
    about = "AI Compute Fund node — job scheduling, staking and settlement"
)]
struct Args {
    /// Path to the node's TOML config. Missing file falls back to defaults.
    #[arg(long, default_value = "aicf.toml")]
    config: PathBuf,

    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8645")]
    rpc_addr: SocketAddr,

    /// Dispatcher tick interval, in milliseconds.
    #[arg(long, default_value_t = 500)]
    tick_interval_ms: u64,

    /// Dispatcher idle backoff, in milliseconds, used after a tick assigns nothing.
    #[arg(long, default_value_t = 2_000)]
    idle_sleep_ms: u64,

    /// Fractional jitter applied to the tick interval (0.0 disables jitter).
    #[arg(long, default_value_t = 0.1)]
    jitter_fraction: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aicf=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("aicf-node starting");

    // ── Configuration ──────────────────────────────────────────────────────
    let config = if args.config.exists() {
        AicfConfig::load(&args.config).with_context(|| format!("loading config {}", args.config.display()))?
    } else {
        info!(path = %args.config.display(), "no config file found, using defaults");
        AicfConfig::default()
    };

    // ── Storage, registry, treasury ────────────────────────────────────────
    let storage = Arc::new(MemoryStorage::new());
    let registry = Arc::new(Mutex::new(Registry::new(Allowlist::default())));
    let ledger = Arc::new(TreasuryLedger::new());
    let rewards = Arc::new(Mutex::new(RewardsAudit::new()));

    let quotas = Arc::new(QuotaTracker::new(QuotaConfig::default()));
    let assignment = Arc::new(AssignmentEngine::new(Arc::clone(&storage), Arc::clone(&quotas)));
    let ttl_gc = Arc::new(TtlGc::new(Arc::clone(&storage), TtlPolicy::default()));

    let mut policy = EligibilityPolicy::default();
    policy.min_stake_ai = config.stake.min_stake_ai_nano;
    policy.min_stake_quantum = config.stake.min_stake_quantum_nano;

    // ── Event fan-out ───────────────────────────────────────────────────────
    let (events_tx, _events_rx) = tokio::sync::broadcast::channel(1_024);

    // ── RPC server ──────────────────────────────────────────────────────────
    let rpc_state = Arc::new(RpcServerState {
        storage: storage.clone() as Arc<dyn aicf_storage::Storage>,
        registry: Arc::clone(&registry),
        ledger: Arc::clone(&ledger),
        rewards: Arc::clone(&rewards),
        events: events_tx.clone(),
    });
    let _rpc_handle = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting RPC server")?;

    // ── Dispatcher ──────────────────────────────────────────────────────────
    let dispatcher_cfg = DispatcherConfig {
        tick_interval_ms: args.tick_interval_ms,
        idle_sleep_ms: args.idle_sleep_ms,
        jitter_fraction: args.jitter_fraction,
        lease_ttl_s: config.stake.lock_period_blocks.min(3_600),
        stake_normalizer: config.stake.min_stake_ai_nano.max(1),
    };
    let dispatcher = Dispatcher::new(
        Arc::clone(&storage),
        Arc::clone(&registry),
        Arc::clone(&assignment),
        Arc::clone(&ttl_gc),
        policy,
        events_tx.clone(),
        dispatcher_cfg,
    );

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let dispatcher_task = tokio::spawn(dispatcher.run(stop_rx));

    info!(rpc_addr = %args.rpc_addr, "node ready");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutdown signal received");

    let _ = stop_tx.send(true);
    let _ = dispatcher_task.await;

    Ok(())
}
