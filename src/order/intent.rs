//! Pending order intents
//!
//! An intent is recorded the moment an order is submitted and resolved once the transaction
//! is mined. Resolved intents linger for a grace window so the confirmed position has time
//! to appear before the optimistic entry disappears.

use crate::types::{OrderKind, Side};
use alloy::primitives::{Address, TxHash, U256};
use std::time::Duration;
use tokio::time::Instant;

pub type IntentId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentStatus {
    Pending,
    Executed,
    Failed,
}

/// A submitted order as tracked client-side
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub id: IntentId,
    pub kind: OrderKind,
    pub side: Side,
    pub market: Address,
    /// 30-decimal USD
    pub size_usd: U256,
    /// Keeper price used to price the order
    pub requested_price: U256,
    pub acceptable_price: U256,
    pub status: IntentStatus,
    pub created_at: Instant,
    pub resolved_at: Option<Instant>,
    pub tx_hash: Option<TxHash>,
    /// User-facing failure message
    pub failure: Option<String>,
}

impl OrderIntent {
    pub fn is_pending(&self) -> bool {
        self.status == IntentStatus::Pending
    }
}

/// Intent parameters captured at submission
#[derive(Debug, Clone, Copy)]
pub struct NewIntent {
    pub kind: OrderKind,
    pub side: Side,
    pub market: Address,
    pub size_usd: U256,
    pub requested_price: U256,
    pub acceptable_price: U256,
}

/// Owned set of intents
#[derive(Debug)]
pub struct IntentBook {
    next_id: IntentId,
    intents: Vec<OrderIntent>,
    grace: Duration,
}

impl IntentBook {
    pub fn new(grace: Duration) -> Self {
        Self {
            next_id: 1,
            intents: Vec::new(),
            grace,
        }
    }

    /// Record a PENDING intent
    pub fn record(&mut self, intent: NewIntent) -> IntentId {
        let id = self.next_id;
        self.next_id += 1;
        self.intents.push(OrderIntent {
            id,
            kind: intent.kind,
            side: intent.side,
            market: intent.market,
            size_usd: intent.size_usd,
            requested_price: intent.requested_price,
            acceptable_price: intent.acceptable_price,
            status: IntentStatus::Pending,
            created_at: Instant::now(),
            resolved_at: None,
            tx_hash: None,
            failure: None,
        });
        id
    }

    pub fn set_tx_hash(&mut self, id: IntentId, tx_hash: TxHash) {
        if let Some(intent) = self.get_mut(id) {
            intent.tx_hash = Some(tx_hash);
        }
    }

    /// PENDING -> EXECUTED; false if the intent is unknown or already resolved
    pub fn mark_executed(&mut self, id: IntentId, tx_hash: TxHash) -> bool {
        self.resolve(id, IntentStatus::Executed, Some(tx_hash), None)
    }

    /// PENDING -> FAILED; false if the intent is unknown or already resolved
    pub fn mark_failed(&mut self, id: IntentId, tx_hash: Option<TxHash>, reason: String) -> bool {
        self.resolve(id, IntentStatus::Failed, tx_hash, Some(reason))
    }

    fn resolve(
        &mut self,
        id: IntentId,
        status: IntentStatus,
        tx_hash: Option<TxHash>,
        failure: Option<String>,
    ) -> bool {
        let Some(intent) = self.get_mut(id).filter(|i| i.is_pending()) else {
            return false;
        };
        intent.status = status;
        intent.resolved_at = Some(Instant::now());
        intent.tx_hash = tx_hash.or(intent.tx_hash);
        intent.failure = failure;
        true
    }

    /// Drop intents resolved longer than the grace window ago
    pub fn prune(&mut self) -> usize {
        let grace = self.grace;
        let before = self.intents.len();
        self.intents
            .retain(|i| i.resolved_at.map_or(true, |at| at.elapsed() < grace));
        before - self.intents.len()
    }

    pub fn get(&self, id: IntentId) -> Option<&OrderIntent> {
        self.intents.iter().find(|i| i.id == id)
    }

    fn get_mut(&mut self, id: IntentId) -> Option<&mut OrderIntent> {
        self.intents.iter_mut().find(|i| i.id == id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &OrderIntent> {
        self.intents.iter().filter(|i| i.is_pending())
    }

    /// All tracked intents, newest first
    pub fn list(&self) -> Vec<OrderIntent> {
        self.intents.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{usd, GM};

    fn open_long() -> NewIntent {
        NewIntent {
            kind: OrderKind::Increase,
            side: Side::Long,
            market: GM,
            size_usd: usd(5000),
            requested_price: U256::from(2850u64),
            acceptable_price: U256::MAX,
        }
    }

    #[test]
    fn test_status_transitions_are_terminal() {
        let mut book = IntentBook::new(Duration::from_secs(10));
        let id = book.record(open_long());
        assert_eq!(book.pending().count(), 1);

        assert!(book.mark_failed(id, None, "Transaction cancelled".into()));
        assert!(!book.mark_executed(id, TxHash::ZERO));
        let intent = book.get(id).unwrap();
        assert_eq!(intent.status, IntentStatus::Failed);
        assert_eq!(intent.failure.as_deref(), Some("Transaction cancelled"));
        assert!(!book.mark_executed(99, TxHash::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_after_grace() {
        let mut book = IntentBook::new(Duration::from_secs(10));
        let done = book.record(open_long());
        let waiting = book.record(open_long());
        book.mark_executed(done, TxHash::repeat_byte(1));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(book.prune(), 0);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(book.prune(), 1);
        assert!(book.get(done).is_none());
        // Pending intents are never pruned
        assert!(book.get(waiting).is_some());
    }

    #[test]
    fn test_list_newest_first() {
        let mut book = IntentBook::new(Duration::from_secs(10));
        let first = book.record(open_long());
        let second = book.record(open_long());
        let ids: Vec<_> = book.list().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![second, first]);
    }
}
