//! Rewards audit (§4.14): idempotent application of a settlement batch's
//! per-payout credits, keyed by a deterministic `credit_id` derived from
//! `(settlement_id, payout_id)` so replaying a batch is a safe no-op.

use std::collections::{HashMap, HashSet};

use aicf_core::{BlockHeight, ProviderId, TokenAmount};
use sha3::{Digest, Sha3_256};

use crate::error::TreasuryError;
use crate::ledger::TreasuryLedger;

#[derive(Clone, Debug)]
pub struct PayoutCredit {
    pub payout_id: String,
    pub provider_id: ProviderId,
    pub amount: TokenAmount,
}

#[derive(Clone, Debug)]
pub struct CreditRecord {
    pub credit_id: String,
    pub settlement_id: String,
    pub payout_id: String,
    pub provider_id: ProviderId,
    pub amount: TokenAmount,
    pub height: BlockHeight,
}

/// `0x`-prefixed sha3-256 of `"aicf:rewards:v1|<settlement_id>|<payout_id>"`.
pub fn credit_id(settlement_id: &str, payout_id: &str) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(b"aicf:rewards:v1|");
    hasher.update(settlement_id.as_bytes());
    hasher.update(b"|");
    hasher.update(payout_id.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[derive(Default)]
pub struct RewardsAudit {
    applied: HashSet<String>,
    records: HashMap<String, CreditRecord>,
    provider_totals: HashMap<ProviderId, TokenAmount>,
    watermark: Option<(String, BlockHeight)>,
}

impl RewardsAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider_total(&self, pid: ProviderId) -> TokenAmount {
        self.provider_totals.get(&pid).copied().unwrap_or(0)
    }

    pub fn watermark(&self) -> Option<&(String, BlockHeight)> {
        self.watermark.as_ref()
    }

    pub fn record(&self, credit_id: &str) -> Option<&CreditRecord> {
        self.records.get(credit_id)
    }

    /// All credit records for `provider_id`, optionally bounded to
    /// `height <= upto_height`, oldest first. Used by `aicf.claimPayout`
    /// (§6) to enumerate what a claim call would pay out.
    pub fn records_for(&self, provider_id: ProviderId, upto_height: Option<BlockHeight>) -> Vec<CreditRecord> {
        let mut out: Vec<CreditRecord> = self
            .records
            .values()
            .filter(|r| r.provider_id == provider_id)
            .filter(|r| match upto_height {
                Some(h) => r.height <= h,
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by_key(|r| r.height);
        out
    }

    /// Applies one settlement batch. Each payout already indexed by
    /// `credit_id` is skipped (or raises if `skip_duplicates=false`).
    /// Returns the list of credit ids actually applied this call.
    pub fn apply_batch(
        &mut self,
        ledger: &TreasuryLedger,
        settlement_id: &str,
        payouts: &[PayoutCredit],
        height: BlockHeight,
        skip_duplicates: bool,
    ) -> Result<Vec<String>, TreasuryError> {
        let mut applied_ids = Vec::new();
        for payout in payouts {
            let cid = credit_id(settlement_id, &payout.payout_id);
            if self.applied.contains(&cid) {
                if skip_duplicates {
                    continue;
                }
                return Err(TreasuryError::DuplicatePayout {
                    settlement_id: settlement_id.to_string(),
                    payout_id: payout.payout_id.clone(),
                });
            }
            ledger.credit(payout.provider_id, payout.amount, height);
            self.applied.insert(cid.clone());
            self.records.insert(
                cid.clone(),
                CreditRecord {
                    credit_id: cid.clone(),
                    settlement_id: settlement_id.to_string(),
                    payout_id: payout.payout_id.clone(),
                    provider_id: payout.provider_id,
                    amount: payout.amount,
                    height,
                },
            );
            *self.provider_totals.entry(payout.provider_id).or_insert(0) += payout.amount;
            applied_ids.push(cid);
        }
        self.watermark = Some((settlement_id.to_string(), height));
        Ok(applied_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaying_a_batch_adds_nothing() {
        let ledger = TreasuryLedger::new();
        let mut audit = RewardsAudit::new();
        let pid = ProviderId::from_bytes([1u8; 32]);
        let payouts = vec![PayoutCredit {
            payout_id: "job-1".into(),
            provider_id: pid,
            amount: 192,
        }];
        audit.apply_batch(&ledger, "settle-0", &payouts, 10, true).unwrap();
        assert_eq!(audit.provider_total(pid), 192);
        assert_eq!(ledger.account(pid).available, 192);

        audit.apply_batch(&ledger, "settle-0", &payouts, 10, true).unwrap();
        assert_eq!(audit.provider_total(pid), 192);
        assert_eq!(ledger.account(pid).available, 192);
    }

    #[test]
    fn credit_id_is_deterministic() {
        assert_eq!(credit_id("s1", "p1"), credit_id("s1", "p1"));
        assert_ne!(credit_id("s1", "p1"), credit_id("s1", "p2"));
        assert!(credit_id("s1", "p1").starts_with("0x"));
    }

    #[test]
    fn duplicate_without_skip_raises() {
        let ledger = TreasuryLedger::new();
        let mut audit = RewardsAudit::new();
        let pid = ProviderId::from_bytes([2u8; 32]);
        let payouts = vec![PayoutCredit {
            payout_id: "job-2".into(),
            provider_id: pid,
            amount: 10,
        }];
        audit.apply_batch(&ledger, "settle-1", &payouts, 1, false).unwrap();
        assert!(audit.apply_batch(&ledger, "settle-1", &payouts, 1, false).is_err());
    }
}
