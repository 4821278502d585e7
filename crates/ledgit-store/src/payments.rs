use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use ledgit_crypto::Identity;
use ledgit_types::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Errors from value transfers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("insufficient funds in {payer}: need {needed}, have {available}")]
    InsufficientFunds {
        payer: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("transfer rejected: {0}")]
    Rejected(String),

    #[error("payment rail unavailable: {0}")]
    Unavailable(String),
}

/// Acknowledgement of a completed transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub id: String,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

/// Moves value between addresses. Bounty payouts and pool donations use it.
#[async_trait]
pub trait PaymentRail: Send + Sync {
    async fn transfer(
        &self,
        payer: &dyn Identity,
        to: &Address,
        amount: Amount,
    ) -> Result<TransferReceipt, PaymentError>;
}

/// Balance-tracking payment rail held in memory.
#[derive(Default)]
pub struct InMemoryPaymentRail {
    balances: RwLock<HashMap<Address, Amount>>,
    failing: AtomicBool,
    next_id: AtomicU64,
}

impl InMemoryPaymentRail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an address.
    pub fn fund(&self, address: &Address, amount: Amount) {
        let mut balances = self.balances.write().expect("lock poisoned");
        let entry = balances.entry(address.clone()).or_default();
        *entry = entry.checked_add(amount).unwrap_or(Amount::from_base_units(u64::MAX));
    }

    pub fn balance(&self, address: &Address) -> Amount {
        self.balances
            .read()
            .expect("lock poisoned")
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    /// Make every transfer fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for InMemoryPaymentRail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryPaymentRail")
            .field("failing", &self.failing.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl PaymentRail for InMemoryPaymentRail {
    async fn transfer(
        &self,
        payer: &dyn Identity,
        to: &Address,
        amount: Amount,
    ) -> Result<TransferReceipt, PaymentError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PaymentError::Unavailable("rail is failing".into()));
        }
        if amount.is_zero() {
            return Err(PaymentError::Rejected("zero amount".into()));
        }
        let from = payer.address();
        let mut balances = self.balances.write().expect("lock poisoned");
        let available = balances.get(&from).copied().unwrap_or_default();
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| PaymentError::InsufficientFunds {
                payer: from.clone(),
                needed: amount,
                available,
            })?;
        balances.insert(from.clone(), remaining);
        let credited = balances.entry(to.clone()).or_default();
        *credited = credited
            .checked_add(amount)
            .ok_or_else(|| PaymentError::Rejected("recipient balance overflow".into()))?;

        let id = format!("transfer-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        tracing::debug!(%from, %to, %amount, %id, "transfer settled");
        Ok(TransferReceipt {
            id,
            from,
            to: to.clone(),
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgit_crypto::LocalIdentity;

    #[tokio::test]
    async fn transfer_moves_balance() {
        let rail = InMemoryPaymentRail::new();
        let payer = LocalIdentity::generate();
        let payee = LocalIdentity::generate().address();
        rail.fund(&payer.address(), Amount::from_base_units(1_000));

        let receipt = rail
            .transfer(&payer, &payee, Amount::from_base_units(400))
            .await
            .unwrap();
        assert_eq!(receipt.amount, Amount::from_base_units(400));
        assert_eq!(rail.balance(&payer.address()), Amount::from_base_units(600));
        assert_eq!(rail.balance(&payee), Amount::from_base_units(400));
    }

    #[tokio::test]
    async fn insufficient_funds() {
        let rail = InMemoryPaymentRail::new();
        let payer = LocalIdentity::generate();
        let err = rail
            .transfer(&payer, &payer.address(), Amount::from_base_units(1))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn failing_rail_rejects_everything() {
        let rail = InMemoryPaymentRail::new();
        let payer = LocalIdentity::generate();
        rail.fund(&payer.address(), Amount::from_base_units(10));
        rail.set_failing(true);
        assert!(rail
            .transfer(&payer, &payer.address(), Amount::from_base_units(1))
            .await
            .is_err());
        assert_eq!(rail.balance(&payer.address()), Amount::from_base_units(10));
    }
}
