//! `AicfEvent`: the discriminated union emitted by the dispatcher and
//! forwarded to WebSocket subscribers (see `aicf-rpc`).

use serde::{Deserialize, Serialize};

use crate::types::{BlockHeight, JobId, LeaseId, ProviderId, TimestampMs, TokenAmount};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AicfEvent {
    Enqueued {
        job_id: JobId,
        requester: String,
        fee: TokenAmount,
        ts_ms: TimestampMs,
    },
    Assigned {
        job_id: JobId,
        provider_id: ProviderId,
        lease_id: LeaseId,
        height: Option<BlockHeight>,
        ts_ms: TimestampMs,
    },
    Completed {
        job_id: JobId,
        provider_id: ProviderId,
        success: bool,
        digest: Option<String>,
        ts_ms: TimestampMs,
    },
    Settled {
        epoch: u64,
        payouts: u64,
        amount: TokenAmount,
        height: Option<BlockHeight>,
        ts_ms: TimestampMs,
    },
    Slashed {
        provider_id: ProviderId,
        reason: String,
        penalty: Option<TokenAmount>,
        height: Option<BlockHeight>,
        ts_ms: TimestampMs,
    },
}
