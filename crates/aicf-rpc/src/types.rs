use serde::{Deserialize, Serialize};

/// JSON view of a provider, returned by `aicf.listProviders` / `aicf.getProvider`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcProviderView {
    pub provider_id: String,
    pub capabilities: u8,
    pub status: String,
    pub region: Option<String>,
    pub stake_total: String,
    pub effective_stake: String,
    pub jail_until_height: u64,
    pub health_score: f64,
}

/// JSON view of a job, returned by `aicf.listJobs` / `aicf.getJob`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcJobView {
    pub job_id: String,
    pub kind: String,
    pub requester: String,
    pub fee: String,
    pub tier: String,
    pub status: String,
    pub attempts: u32,
    pub assigned_to: Option<String>,
    pub lease_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
}

/// A page of results, returned by list-style methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcPage<T> {
    pub items: Vec<T>,
    pub next_offset: Option<u32>,
}

/// Optional filter bag for `aicf.listJobs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcJobFilter {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub provider_id: Option<String>,
    pub requester: Option<String>,
    #[serde(default)]
    pub offset: u32,
    pub limit: u32,
}

/// `aicf.getBalance` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcBalanceView {
    pub provider_id: String,
    pub available: String,
    pub pending: String,
    pub escrow: String,
    pub last_settlement_epoch: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcPayoutLine {
    pub job_id: String,
    pub amount: String,
}

/// `aicf.claimPayout` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcClaimResult {
    pub provider_id: String,
    pub total_paid: String,
    pub epoch_from: u64,
    pub epoch_to: u64,
    pub payouts: Vec<RpcPayoutLine>,
    pub tx_hash: Option<String>,
}
