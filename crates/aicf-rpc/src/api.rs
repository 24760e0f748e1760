use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{RpcBalanceView, RpcClaimResult, RpcJobFilter, RpcJobView, RpcPage, RpcProviderView};

/// AICF JSON-RPC 2.0 API definition (§6). All method names are prefixed
/// with "aicf_" via `namespace = "aicf"`.
#[rpc(server, namespace = "aicf")]
pub trait AicfApi {
    /// Paginated provider listing.
    #[method(name = "listProviders")]
    async fn list_providers(&self, offset: u32, limit: u32) -> RpcResult<RpcPage<RpcProviderView>>;

    /// Single provider by hex id.
    #[method(name = "getProvider")]
    async fn get_provider(&self, provider_id: String) -> RpcResult<RpcProviderView>;

    /// Paginated, optionally filtered job listing.
    #[method(name = "listJobs")]
    async fn list_jobs(&self, filter: RpcJobFilter) -> RpcResult<RpcPage<RpcJobView>>;

    /// Single job by hex id.
    #[method(name = "getJob")]
    async fn get_job(&self, job_id: String) -> RpcResult<RpcJobView>;

    /// Treasury balance summary for a provider.
    #[method(name = "getBalance")]
    async fn get_balance(&self, provider_id: String) -> RpcResult<RpcBalanceView>;

    /// Claims accrued payouts up to (and including) `upto_epoch`, or all
    /// outstanding credits when omitted.
    #[method(name = "claimPayout")]
    async fn claim_payout(&self, provider_id: String, upto_epoch: Option<u64>) -> RpcResult<RpcClaimResult>;
}
