//! Epoch budget (§4.11): fixed-length height windows with a per-epoch spend
//! cap and optional rollover of unused budget. Pure/functional — every
//! transition returns a new `EpochAccounting` rather than mutating in place,
//! so replay and concurrent read access are safe by construction.

use aicf_core::{BlockHeight, TokenAmount};

#[derive(Clone, Copy, Debug)]
pub struct EpochParams {
    pub start_height: BlockHeight,
    pub length: BlockHeight,
    pub base_budget: TokenAmount,
    pub rollover_rate: f64,
}

impl Default for EpochParams {
    fn default() -> Self {
        Self {
            start_height: 0,
            length: 720,
            base_budget: 0,
            rollover_rate: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochIndex {
    pub idx: i64,
    pub start_height: BlockHeight,
    pub end_height_exclusive: BlockHeight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochAccounting {
    pub epoch: EpochIndex,
    pub budget_total: TokenAmount,
    pub budget_spent: TokenAmount,
    pub payouts_count: u64,
}

impl EpochAccounting {
    pub fn remaining(&self) -> TokenAmount {
        self.budget_total.saturating_sub(self.budget_spent)
    }
}

/// Heights before `params.start_height` map to the sentinel index `-1`.
pub fn epoch_index_for_height(h: BlockHeight, params: &EpochParams) -> EpochIndex {
    if h < params.start_height {
        return EpochIndex {
            idx: -1,
            start_height: 0,
            end_height_exclusive: params.start_height,
        };
    }
    let offset = h - params.start_height;
    let idx = offset / params.length;
    let start = params.start_height + idx * params.length;
    EpochIndex {
        idx: idx as i64,
        start_height: start,
        end_height_exclusive: start + params.length,
    }
}

pub fn compute_next_budget(prev: Option<&EpochAccounting>, params: &EpochParams) -> TokenAmount {
    let carry = match prev {
        Some(p) => {
            let unused = p.budget_total.saturating_sub(p.budget_spent) as f64;
            (unused * params.rollover_rate).floor() as TokenAmount
        }
        None => 0,
    };
    params.base_budget + carry
}

/// Starts (or re-derives) the accounting record for the epoch containing
/// height `h`. Rollover only applies when `prev` is the immediately
/// preceding epoch; any other `prev` is treated as absent.
pub fn start_epoch_for_height(
    h: BlockHeight,
    params: &EpochParams,
    prev: Option<&EpochAccounting>,
) -> EpochAccounting {
    let eidx = epoch_index_for_height(h, params);
    if eidx.idx < 0 {
        return EpochAccounting {
            epoch: eidx,
            budget_total: 0,
            budget_spent: 0,
            payouts_count: 0,
        };
    }
    let expected_prev_idx = eidx.idx - 1;
    let prev_for_roll = prev.filter(|p| p.epoch.idx == expected_prev_idx);
    EpochAccounting {
        epoch: eidx,
        budget_total: compute_next_budget(prev_for_roll, params),
        budget_spent: 0,
        payouts_count: 0,
    }
}

/// Functional reservation: succeeds iff `amount <= remaining`.
pub fn try_reserve(state: &EpochAccounting, amount: TokenAmount) -> (bool, EpochAccounting) {
    if amount <= state.remaining() {
        (
            true,
            EpochAccounting {
                budget_spent: state.budget_spent + amount,
                payouts_count: state.payouts_count + 1,
                ..*state
            },
        )
    } else {
        (false, *state)
    }
}

pub fn apply_refund(state: &EpochAccounting, amount: TokenAmount) -> EpochAccounting {
    EpochAccounting {
        budget_spent: state.budget_spent.saturating_sub(amount),
        ..*state
    }
}

/// Consumes `amounts` in order, accepting while capacity permits.
pub fn cap_batch_spend(
    state: &EpochAccounting,
    amounts: &[TokenAmount],
) -> (EpochAccounting, Vec<TokenAmount>, Vec<TokenAmount>) {
    let mut cur = *state;
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for &amt in amounts {
        let (ok, next) = try_reserve(&cur, amt);
        if ok {
            accepted.push(amt);
            cur = next;
        } else {
            rejected.push(amt);
        }
    }
    (cur, accepted, rejected)
}
