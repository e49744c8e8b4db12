use super::product::ProductId;
use std::fmt;

/// Store-assigned identity of a delivered transaction event, passed back when
/// the event is acknowledged.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-minted identity of one submitted payment attempt.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct AttemptId(pub u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome tag the store puts on a transaction event.
///
/// `Purchased`, `Restored` and `Failed` are terminal. `Purchasing` and
/// `Deferred` events stay outstanding on the store side and reappear in a
/// later batch.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Disposition {
    Purchased,
    Restored,
    Failed,
    Purchasing,
    Deferred,
}

#[derive(Debug, PartialEq, Clone)]
pub struct TransactionEvent {
    pub id: TransactionId,
    /// Correlates the event back to a submitted payment. `None` for events
    /// this session did not originate, such as restored purchases.
    pub attempt: Option<AttemptId>,
    pub product: ProductId,
    pub disposition: Disposition,
}

impl TransactionEvent {
    pub fn new(
        id: TransactionId,
        attempt: Option<AttemptId>,
        product: ProductId,
        disposition: Disposition,
    ) -> Self {
        Self {
            id,
            attempt,
            product,
            disposition,
        }
    }

    pub fn purchased(id: TransactionId, attempt: AttemptId, product: ProductId) -> Self {
        Self::new(id, Some(attempt), product, Disposition::Purchased)
    }

    /// A restored event carries the product identifier of the original
    /// purchase and no attempt of its own.
    pub fn restored(id: TransactionId, original_product: ProductId) -> Self {
        Self::new(id, None, original_product, Disposition::Restored)
    }

    pub fn failed(id: TransactionId, attempt: AttemptId, product: ProductId) -> Self {
        Self::new(id, Some(attempt), product, Disposition::Failed)
    }
}

/// One delivered batch split by terminal disposition, input order preserved
/// within each bucket.
#[derive(Debug, Default, PartialEq)]
pub struct ClassifiedBatch {
    pub purchased: Vec<TransactionEvent>,
    pub restored: Vec<TransactionEvent>,
    pub failed: Vec<TransactionEvent>,
}

impl ClassifiedBatch {
    /// Partitions `events` by disposition. Non-terminal events are dropped
    /// from the batch entirely so they are never acknowledged; the store
    /// redelivers them once they settle.
    pub fn partition(events: Vec<TransactionEvent>) -> Self {
        let mut batch = Self::default();
        for event in events {
            match event.disposition {
                Disposition::Purchased => batch.purchased.push(event),
                Disposition::Restored => batch.restored.push(event),
                Disposition::Failed => batch.failed.push(event),
                Disposition::Purchasing | Disposition::Deferred => {}
            }
        }
        batch
    }

    pub fn terminal_len(&self) -> usize {
        self.purchased.len() + self.restored.len() + self.failed.len()
    }
}
