//! Canonical JSON-RPC error codes (§6, §7). Standard codes below `-32000`
//! are the JSON-RPC 2.0 reserved range; domain codes occupy the server-
//! defined range above it.

use jsonrpsee::types::ErrorObject;

pub const NOT_FOUND: i32 = -32001;
pub const INSUFFICIENT_STAKE: i32 = -32002;
pub const JOB_EXPIRED: i32 = -32003;
pub const LEASE_LOST: i32 = -32004;
pub const REGISTRY_DENIED: i32 = -32005;
pub const RATE_LIMITED: i32 = -32006;
/// Resolved open question (§7): canonical code for a duplicate idempotent
/// submission (e.g. a replayed rewards-audit batch).
pub const DUPLICATE_TX: i32 = -32010;

pub fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

pub fn invalid_params(msg: impl Into<String>) -> ErrorObject<'static> {
    rpc_err(jsonrpsee::types::error::ErrorCode::InvalidParams.code(), msg)
}

pub fn internal(msg: impl Into<String>) -> ErrorObject<'static> {
    rpc_err(jsonrpsee::types::error::ErrorCode::InternalError.code(), msg)
}

pub fn not_found(what: impl Into<String>) -> ErrorObject<'static> {
    rpc_err(NOT_FOUND, format!("not found: {}", what.into()))
}
