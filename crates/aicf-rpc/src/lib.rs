//! AICF JSON-RPC 2.0 surface (§6): a `#[rpc(server, namespace = "aicf")]`
//! trait, a jsonrpsee `Server` with a permissive CORS layer, and shared
//! state handed to every handler.

pub mod api;
pub mod errors;
pub mod server;
pub mod types;

pub use api::AicfApiServer;
pub use server::{RpcServer, RpcServerState};
pub use types::{
    RpcBalanceView, RpcClaimResult, RpcJobFilter, RpcJobView, RpcPage, RpcPayoutLine, RpcProviderView,
};
