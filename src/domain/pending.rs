use super::product::{Product, ProductId};
use super::transaction::AttemptId;
use crate::error::{BillingError, Result};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::oneshot;

/// Store-minted identity of one in-flight products request.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct RequestHandle(pub u64);

impl fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a products-fetch caller eventually receives.
pub type ProductsResult = Result<Vec<Product>>;
/// What purchase and restore callers eventually receive: the full
/// entitlement snapshot at resolution time.
pub type EntitlementsResult = Result<Vec<ProductId>>;

pub type ProductsResponder = oneshot::Sender<ProductsResult>;
pub type ProductsReceiver = oneshot::Receiver<ProductsResult>;
pub type EntitlementsResponder = oneshot::Sender<EntitlementsResult>;
pub type EntitlementsReceiver = oneshot::Receiver<EntitlementsResult>;

/// A purchase attempt awaiting its terminal transaction event.
#[derive(Debug)]
pub struct PendingPurchase {
    pub product: ProductId,
    pub responder: EntitlementsResponder,
}

impl PendingPurchase {
    pub fn new(product: ProductId, responder: EntitlementsResponder) -> Self {
        Self { product, responder }
    }
}

/// Bookkeeping for every caller still waiting on a store callback.
///
/// Registering stores the caller's responder under its request identity;
/// resolving removes and returns it, so each identity resolves at most once.
/// Resolving an identity that is not registered returns `None`, which turns
/// duplicate or unsolicited callbacks into no-ops.
#[derive(Debug, Default)]
pub struct PendingRequestRegistry {
    fetches: HashMap<RequestHandle, ProductsResponder>,
    purchases: HashMap<AttemptId, PendingPurchase>,
    restore_waiters: Vec<EntitlementsResponder>,
}

impl PendingRequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_fetch(
        &mut self,
        handle: RequestHandle,
        responder: ProductsResponder,
    ) -> Result<()> {
        if self.fetches.contains_key(&handle) {
            return Err(BillingError::DuplicateHandle(handle.to_string()));
        }
        self.fetches.insert(handle, responder);
        Ok(())
    }

    pub fn resolve_fetch(&mut self, handle: RequestHandle) -> Option<ProductsResponder> {
        self.fetches.remove(&handle)
    }

    pub fn register_purchase(
        &mut self,
        attempt: AttemptId,
        pending: PendingPurchase,
    ) -> Result<()> {
        if self.purchases.contains_key(&attempt) {
            return Err(BillingError::DuplicateAttempt(format!("attempt {}", attempt)));
        }
        self.purchases.insert(attempt, pending);
        Ok(())
    }

    pub fn resolve_purchase(&mut self, attempt: AttemptId) -> Option<PendingPurchase> {
        self.purchases.remove(&attempt)
    }

    /// True while any registered attempt references `product`.
    pub fn purchase_in_flight(&self, product: &ProductId) -> bool {
        self.purchases
            .values()
            .any(|pending| pending.product == *product)
    }

    /// Restore waiters have no per-request identity; concurrent callers pile
    /// onto one list and are all resolved by the same cycle.
    pub fn register_restore_waiter(&mut self, responder: EntitlementsResponder) {
        self.restore_waiters.push(responder);
    }

    /// Empties the waiter list, returning waiters in registration order.
    pub fn drain_restore_waiters(&mut self) -> Vec<EntitlementsResponder> {
        std::mem::take(&mut self.restore_waiters)
    }

    /// True while a restore cycle is outstanding: waiters accumulate from
    /// the first request until a terminal restore callback drains them.
    pub fn has_restore_waiters(&self) -> bool {
        !self.restore_waiters.is_empty()
    }

    pub fn pending_fetches(&self) -> usize {
        self.fetches.len()
    }

    pub fn pending_purchases(&self) -> usize {
        self.purchases.len()
    }
}
