use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use aicf_core::{AicfEvent, JobId, JobKind, JobStatus, ProviderId};
use aicf_registry::Registry;
use aicf_storage::Storage;
use aicf_treasury::{RewardsAudit, TreasuryLedger};

use crate::api::AicfApiServer;
use crate::errors::{internal, invalid_params, not_found};
use crate::types::{
    RpcBalanceView, RpcClaimResult, RpcJobFilter, RpcJobView, RpcPage, RpcPayoutLine, RpcProviderView,
};

fn job_kind_str(k: JobKind) -> &'static str {
    match k {
        JobKind::Ai => "ai",
        JobKind::Quantum => "quantum",
    }
}

fn job_status_str(s: JobStatus) -> &'static str {
    match s {
        JobStatus::Queued => "QUEUED",
        JobStatus::Assigned => "ASSIGNED",
        JobStatus::Completed => "COMPLETED",
        JobStatus::Failed => "FAILED",
        JobStatus::Expired => "EXPIRED",
        JobStatus::Canceled => "CANCELED",
        JobStatus::Tombstoned => "TOMBSTONED",
    }
}

/// Shared state passed to the RPC server — every handler borrows this
/// rather than owning engine state directly.
pub struct RpcServerState {
    pub storage: Arc<dyn Storage>,
    pub registry: Arc<Mutex<Registry>>,
    pub ledger: Arc<TreasuryLedger>,
    pub rewards: Arc<Mutex<RewardsAudit>>,
    /// Bounded fan-out for dispatcher-emitted events; `subscribe_events`
    /// hands out a fresh receiver per caller (e.g. a WS bridge outside this
    /// crate). Bounded channels give natural backpressure against slow
    /// subscribers.
    pub events: tokio::sync::broadcast::Sender<AicfEvent>,
}

impl RpcServerState {
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<AicfEvent> {
        self.events.subscribe()
    }
}

pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Starts the JSON-RPC server on `addr` with permissive CORS. Returns a
    /// handle that stops the server when dropped or explicitly stopped.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any);

        let server = Server::builder()
            .set_http_middleware(tower::ServiceBuilder::new().layer(cors))
            .build(addr)
            .await?;

        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "RPC server started");
        Ok(handle)
    }
}

fn provider_view(record: &aicf_registry::ProviderRecord, current_height: aicf_core::BlockHeight) -> RpcProviderView {
    RpcProviderView {
        provider_id: record.provider_id.to_hex(),
        capabilities: record.capabilities.0,
        status: format!("{:?}", record.status).to_uppercase(),
        region: record.region.clone(),
        stake_total: record.stake_total.to_string(),
        effective_stake: record.effective_stake(current_height).to_string(),
        jail_until_height: record.jail_until_height,
        health_score: record.health_score,
    }
}

fn job_view(job: &aicf_storage::JobRecord) -> RpcJobView {
    RpcJobView {
        job_id: job.job_id.to_hex(),
        kind: job_kind_str(job.kind).to_string(),
        requester: job.requester.clone(),
        fee: job.fee.to_string(),
        tier: format!("{:?}", job.tier).to_uppercase(),
        status: job_status_str(job.status).to_string(),
        attempts: job.attempts,
        assigned_to: job.assigned_to.map(|p| p.to_hex()),
        lease_id: job.lease_id.map(|l| l.to_hex()),
        created_at: job.created_at,
        updated_at: job.updated_at,
        completed_at: job.completed_at,
    }
}

#[async_trait]
impl AicfApiServer for RpcServer {
    async fn list_providers(&self, offset: u32, limit: u32) -> RpcResult<RpcPage<RpcProviderView>> {
        let limit = limit.min(200) as usize;
        let offset = offset as usize;
        let registry = self.state.registry.lock().unwrap();
        let mut all: Vec<_> = registry.list().into_iter().collect();
        all.sort_by_key(|p| p.provider_id);
        let total = all.len();
        let items: Vec<RpcProviderView> = all
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|p| provider_view(p, 0))
            .collect();
        let next_offset = if offset + items.len() < total {
            Some((offset + items.len()) as u32)
        } else {
            None
        };
        Ok(RpcPage { items, next_offset })
    }

    async fn get_provider(&self, provider_id: String) -> RpcResult<RpcProviderView> {
        let pid = ProviderId::from_hex(&provider_id).map_err(|e| invalid_params(e.to_string()))?;
        let registry = self.state.registry.lock().unwrap();
        let record = registry.get(pid).ok_or_else(|| not_found(format!("provider {provider_id}")))?;
        Ok(provider_view(record, 0))
    }

    async fn list_jobs(&self, filter: RpcJobFilter) -> RpcResult<RpcPage<RpcJobView>> {
        let limit = filter.limit.min(200) as usize;
        let offset = filter.offset as usize;

        let provider_filter = filter
            .provider_id
            .as_deref()
            .map(ProviderId::from_hex)
            .transpose()
            .map_err(|e| invalid_params(e.to_string()))?;

        let mut all = self.state.storage.iter_all();
        if let Some(kind) = filter.kind.as_deref() {
            all.retain(|j| job_kind_str(j.kind).eq_ignore_ascii_case(kind));
        }
        if let Some(status) = filter.status.as_deref() {
            all.retain(|j| job_status_str(j.status).eq_ignore_ascii_case(status));
        }
        if let Some(pid) = provider_filter {
            all.retain(|j| j.assigned_to == Some(pid));
        }
        if let Some(requester) = filter.requester.as_deref() {
            all.retain(|j| j.requester == requester);
        }
        all.sort_by_key(|j| j.job_id);

        let total = all.len();
        let items: Vec<RpcJobView> = all.iter().skip(offset).take(limit).map(job_view).collect();
        let next_offset = if offset + items.len() < total {
            Some((offset + items.len()) as u32)
        } else {
            None
        };
        Ok(RpcPage { items, next_offset })
    }

    async fn get_job(&self, job_id: String) -> RpcResult<RpcJobView> {
        let jid = JobId::from_hex(&job_id).map_err(|e| invalid_params(e.to_string()))?;
        let job = self.state.storage.get_job(jid).ok_or_else(|| not_found(format!("job {job_id}")))?;
        Ok(job_view(&job))
    }

    async fn get_balance(&self, provider_id: String) -> RpcResult<RpcBalanceView> {
        let pid = ProviderId::from_hex(&provider_id).map_err(|e| invalid_params(e.to_string()))?;
        let account = self.state.ledger.account(pid);
        Ok(RpcBalanceView {
            provider_id: provider_id.clone(),
            available: account.available.to_string(),
            pending: account.staked.to_string(),
            escrow: account.escrowed.to_string(),
            last_settlement_epoch: None,
        })
    }

    async fn claim_payout(&self, provider_id: String, upto_epoch: Option<u64>) -> RpcResult<RpcClaimResult> {
        let pid = ProviderId::from_hex(&provider_id).map_err(|e| invalid_params(e.to_string()))?;
        let rewards = self.state.rewards.lock().unwrap();
        let records = rewards.records_for(pid, upto_epoch);
        drop(rewards);

        let total_paid: u128 = records.iter().map(|r| r.amount).sum();
        if total_paid == 0 {
            return Ok(RpcClaimResult {
                provider_id,
                total_paid: "0".to_string(),
                epoch_from: 0,
                epoch_to: upto_epoch.unwrap_or(0),
                payouts: Vec::new(),
                tx_hash: None,
            });
        }

        self.state
            .ledger
            .debit(pid, total_paid, upto_epoch.unwrap_or(0))
            .map_err(|e| internal(e.to_string()))?;

        let epoch_from = records.iter().map(|r| r.height).min().unwrap_or(0);
        let epoch_to = records.iter().map(|r| r.height).max().unwrap_or(0);
        let payouts = records
            .into_iter()
            .map(|r| RpcPayoutLine {
                job_id: r.payout_id,
                amount: r.amount.to_string(),
            })
            .collect();

        Ok(RpcClaimResult {
            provider_id,
            total_paid: total_paid.to_string(),
            epoch_from,
            epoch_to,
            payouts,
            tx_hash: None,
        })
    }
}
