//! Delayed withdrawal queue (§4.15): requesting a withdrawal debits
//! `available` immediately (the funds are locked in-queue, not spendable,
//! not yet paid out); execution is gated on a per-request maturity height.

use std::collections::HashMap;
use std::sync::Mutex;

use aicf_core::{BlockHeight, ProviderId, TokenAmount};
use serde::{Deserialize, Serialize};

use crate::error::TreasuryError;
use crate::ledger::TreasuryLedger;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    Pending,
    Executed,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: u64,
    pub provider: ProviderId,
    pub amount: TokenAmount,
    pub requested_height: BlockHeight,
    pub earliest_exec_height: BlockHeight,
    pub status: WithdrawalStatus,
}

#[derive(Clone, Copy, Debug)]
pub struct WithdrawalConfig {
    pub min_amount: TokenAmount,
    pub cooldown_blocks: BlockHeight,
    pub delay_blocks: BlockHeight,
    pub max_pending_per_provider: usize,
    pub max_per_block_execute: Option<TokenAmount>,
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        Self {
            min_amount: 1,
            cooldown_blocks: 2_400,
            delay_blocks: 14_400,
            max_pending_per_provider: 4,
            max_per_block_execute: None,
        }
    }
}

#[derive(Default)]
struct State {
    requests: HashMap<u64, WithdrawalRequest>,
    by_provider_last_request: HashMap<ProviderId, BlockHeight>,
    next_id: u64,
}

pub struct WithdrawalQueue {
    cfg: WithdrawalConfig,
    state: Mutex<State>,
}

impl WithdrawalQueue {
    pub fn new(cfg: WithdrawalConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(State::default()),
        }
    }

    fn pending_count(state: &State, provider: ProviderId) -> usize {
        state
            .requests
            .values()
            .filter(|r| r.provider == provider && r.status == WithdrawalStatus::Pending)
            .count()
    }

    pub fn request(
        &self,
        ledger: &TreasuryLedger,
        provider: ProviderId,
        amount: TokenAmount,
        height: BlockHeight,
    ) -> Result<WithdrawalRequest, TreasuryError> {
        if amount < self.cfg.min_amount {
            return Err(TreasuryError::WithdrawalBelowMinimum {
                amount,
                min: self.cfg.min_amount,
            });
        }
        let mut state = self.state.lock().unwrap();
        if let Some(&last) = state.by_provider_last_request.get(&provider) {
            let next_allowed = last + self.cfg.cooldown_blocks;
            if height < next_allowed {
                return Err(TreasuryError::WithdrawalCooldown {
                    provider,
                    next_allowed,
                });
            }
        }
        let pending = Self::pending_count(&state, provider);
        if pending >= self.cfg.max_pending_per_provider {
            return Err(TreasuryError::TooManyPendingWithdrawals {
                provider,
                pending,
                max: self.cfg.max_pending_per_provider,
            });
        }

        ledger.debit(provider, amount, height)?;

        state.next_id += 1;
        let req = WithdrawalRequest {
            id: state.next_id,
            provider,
            amount,
            requested_height: height,
            earliest_exec_height: height + self.cfg.delay_blocks,
            status: WithdrawalStatus::Pending,
        };
        state.requests.insert(req.id, req.clone());
        state.by_provider_last_request.insert(provider, height);
        Ok(req)
    }

    pub fn cancel(
        &self,
        ledger: &TreasuryLedger,
        id: u64,
        provider: ProviderId,
        height: BlockHeight,
    ) -> Result<(), TreasuryError> {
        let mut state = self.state.lock().unwrap();
        let req = state
            .requests
            .get_mut(&id)
            .ok_or(TreasuryError::WithdrawalNotFound(id))?;
        if req.provider != provider {
            return Err(TreasuryError::WithdrawalNotOwner(id, provider));
        }
        if req.status != WithdrawalStatus::Pending {
            return Err(TreasuryError::WithdrawalNotPending(id));
        }
        req.status = WithdrawalStatus::Cancelled;
        let amount = req.amount;
        drop(state);
        ledger.credit(provider, amount, height);
        Ok(())
    }

    pub fn execute(&self, id: u64, height: BlockHeight) -> Result<WithdrawalRequest, TreasuryError> {
        let mut state = self.state.lock().unwrap();
        let req = state
            .requests
            .get_mut(&id)
            .ok_or(TreasuryError::WithdrawalNotFound(id))?;
        if req.status != WithdrawalStatus::Pending {
            return Err(TreasuryError::WithdrawalNotPending(id));
        }
        if height < req.earliest_exec_height {
            return Err(TreasuryError::WithdrawalNotMatured(id));
        }
        req.status = WithdrawalStatus::Executed;
        Ok(req.clone())
    }

    pub fn get(&self, id: u64) -> Option<WithdrawalRequest> {
        self.state.lock().unwrap().requests.get(&id).cloned()
    }

    /// Executes all matured, still-pending requests in ascending id order,
    /// respecting `max_per_block_execute` if configured. A request bigger
    /// than the remaining budget is skipped, not partially executed.
    pub fn finalize_due(&self, height: BlockHeight) -> Vec<WithdrawalRequest> {
        let mut state = self.state.lock().unwrap();
        let mut due: Vec<u64> = state
            .requests
            .values()
            .filter(|r| r.status == WithdrawalStatus::Pending && height >= r.earliest_exec_height)
            .map(|r| r.id)
            .collect();
        due.sort_unstable();

        let mut budget = self.cfg.max_per_block_execute;
        let mut executed = Vec::new();
        for id in due.drain(..) {
            let req = state.requests.get_mut(&id).unwrap();
            if let Some(b) = budget {
                if req.amount > b {
                    continue;
                }
            }
            req.status = WithdrawalStatus::Executed;
            if let Some(b) = &mut budget {
                *b -= req.amount;
            }
            executed.push(req.clone());
        }
        executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(b: u8) -> ProviderId {
        ProviderId::from_bytes([b; 32])
    }

    #[test]
    fn request_locks_funds_immediately() {
        let ledger = TreasuryLedger::new();
        let q = WithdrawalQueue::new(WithdrawalConfig::default());
        let p = pid(1);
        ledger.credit(p, 1_000, 0);
        let req = q.request(&ledger, p, 400, 0).unwrap();
        assert_eq!(ledger.account(p).available, 600);
        assert_eq!(req.status, WithdrawalStatus::Pending);
    }

    #[test]
    fn cooldown_blocks_second_request() {
        let ledger = TreasuryLedger::new();
        let cfg = WithdrawalConfig {
            cooldown_blocks: 100,
            ..Default::default()
        };
        let q = WithdrawalQueue::new(cfg);
        let p = pid(2);
        ledger.credit(p, 1_000, 0);
        q.request(&ledger, p, 10, 0).unwrap();
        assert!(q.request(&ledger, p, 10, 50).is_err());
        assert!(q.request(&ledger, p, 10, 100).is_ok());
    }

    #[test]
    fn cancel_credits_funds_back() {
        let ledger = TreasuryLedger::new();
        let q = WithdrawalQueue::new(WithdrawalConfig::default());
        let p = pid(3);
        ledger.credit(p, 500, 0);
        let req = q.request(&ledger, p, 200, 0).unwrap();
        q.cancel(&ledger, req.id, p, 1).unwrap();
        assert_eq!(ledger.account(p).available, 500);
    }

    #[test]
    fn execute_requires_maturity() {
        let ledger = TreasuryLedger::new();
        let cfg = WithdrawalConfig {
            delay_blocks: 10,
            ..Default::default()
        };
        let q = WithdrawalQueue::new(cfg);
        let p = pid(4);
        ledger.credit(p, 500, 0);
        let req = q.request(&ledger, p, 100, 0).unwrap();
        assert!(q.execute(req.id, 5).is_err());
        assert!(q.execute(req.id, 10).is_ok());
    }

    #[test]
    fn finalize_due_skips_over_budget() {
        let ledger = TreasuryLedger::new();
        let cfg = WithdrawalConfig {
            delay_blocks: 0,
            cooldown_blocks: 0,
            max_pending_per_provider: 10,
            max_per_block_execute: Some(150),
            ..Default::default()
        };
        let q = WithdrawalQueue::new(cfg);
        let p = pid(5);
        ledger.credit(p, 1_000, 0);
        let r1 = q.request(&ledger, p, 100, 0).unwrap();
        let r2 = q.request(&ledger, p, 100, 1).unwrap();
        let executed = q.finalize_due(2);
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].id, r1.id);
        assert_eq!(q.get(r2.id).unwrap().status, WithdrawalStatus::Pending);
    }
}
