use crate::domain::ledger::PurchaseLedger;
use crate::domain::pending::{
    EntitlementsReceiver, PendingPurchase, PendingRequestRegistry, ProductsReceiver, RequestHandle,
};
use crate::domain::ports::StoreGatewayBox;
use crate::domain::product::{Product, ProductCache, ProductId};
use crate::domain::transaction::{ClassifiedBatch, TransactionEvent, TransactionId};
use crate::error::{BillingError, Result};
use std::collections::BTreeSet;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

/// The main entry point for correlating billing requests with the store's
/// asynchronous callbacks.
///
/// `CorrelationEngine` owns the store gateway and all mutable session state.
/// Caller operations and store callbacks serialize on one lock, and each
/// submission registers its pending entry under the same lock acquisition,
/// so a callback can never observe a submitted-but-untracked request.
pub struct CorrelationEngine {
    store: StoreGatewayBox,
    state: Mutex<EngineState>,
}

#[derive(Default)]
struct EngineState {
    pending: PendingRequestRegistry,
    ledger: PurchaseLedger,
    products: ProductCache,
}

impl CorrelationEngine {
    /// Creates a new `CorrelationEngine` over `store`.
    pub fn new(store: StoreGatewayBox) -> Self {
        Self {
            store,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Requests catalog details for `identifiers`.
    ///
    /// Duplicates collapse under set semantics before submission. The
    /// returned receiver resolves when the store answers; if the store never
    /// answers, it stays pending indefinitely.
    pub async fn fetch_products(&self, identifiers: Vec<ProductId>) -> Result<ProductsReceiver> {
        let identifiers: Vec<ProductId> = identifiers
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut state = self.state.lock().await;
        let handle = match self.store.submit_products_request(&identifiers).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "products request submission failed");
                return Err(BillingError::StoreRequestFailed);
            }
        };

        let (responder, receiver) = oneshot::channel();
        state.pending.register_fetch(handle, responder)?;
        debug!(handle = %handle, count = identifiers.len(), "products request submitted");
        Ok(receiver)
    }

    /// Submits a payment for `identifier`.
    ///
    /// The product must be present in the fetched catalog and must not
    /// already have an attempt in flight. The receiver resolves with the
    /// full entitlement snapshot once the store reports a terminal outcome
    /// for the attempt.
    pub async fn purchase(&self, identifier: ProductId) -> Result<EntitlementsReceiver> {
        let mut state = self.state.lock().await;
        if !state.products.contains(&identifier) {
            return Err(BillingError::ProductNotFound(identifier.to_string()));
        }
        if state.pending.purchase_in_flight(&identifier) {
            return Err(BillingError::DuplicateAttempt(identifier.to_string()));
        }

        let attempt = match self.store.submit_payment(&identifier).await {
            Ok(attempt) => attempt,
            Err(e) => {
                warn!(product = %identifier, error = %e, "payment submission failed");
                return Err(BillingError::StoreRequestFailed);
            }
        };

        let (responder, receiver) = oneshot::channel();
        state
            .pending
            .register_purchase(attempt, PendingPurchase::new(identifier.clone(), responder))?;
        debug!(attempt = %attempt, product = %identifier, "payment submitted");
        Ok(receiver)
    }

    /// Requests the user's owned products.
    ///
    /// Concurrent callers coalesce onto one restore cycle: only the first
    /// waiter since the last terminal restore callback submits a request to
    /// the store, and every accumulated waiter resolves together when the
    /// cycle ends.
    pub async fn fetch_purchases(&self) -> Result<EntitlementsReceiver> {
        let mut state = self.state.lock().await;
        if !state.pending.has_restore_waiters() {
            if let Err(e) = self.store.submit_restore_request().await {
                warn!(error = %e, "restore request submission failed");
                return Err(BillingError::StoreRequestFailed);
            }
            debug!("restore cycle requested");
        }

        let (responder, receiver) = oneshot::channel();
        state.pending.register_restore_waiter(responder);
        Ok(receiver)
    }

    /// Read-only snapshot of the entitlement ledger.
    pub async fn entitlements(&self) -> Vec<ProductId> {
        self.state.lock().await.ledger.snapshot()
    }

    /// Store callback: a products request succeeded.
    ///
    /// The catalog cache is replaced wholesale even when no caller is
    /// waiting on `handle`, so a late or duplicate callback still refreshes
    /// the cache without resolving anyone twice.
    pub async fn on_products_response(&self, handle: RequestHandle, products: Vec<Product>) {
        let mut state = self.state.lock().await;
        state.products.replace_all(products.clone());

        match state.pending.resolve_fetch(handle) {
            Some(responder) => {
                debug!(handle = %handle, count = products.len(), "products request resolved");
                if responder.send(Ok(products)).is_err() {
                    debug!(handle = %handle, "products caller went away");
                }
            }
            None => debug!(handle = %handle, "products response for unknown handle"),
        }
    }

    /// Store callback: a products request failed.
    pub async fn on_products_failure(&self, handle: RequestHandle) {
        let mut state = self.state.lock().await;
        match state.pending.resolve_fetch(handle) {
            Some(responder) => {
                if responder.send(Err(BillingError::StoreRequestFailed)).is_err() {
                    debug!(handle = %handle, "products caller went away");
                }
            }
            None => debug!(handle = %handle, "products failure for unknown handle"),
        }
    }

    /// Store callback: a batch of transaction events.
    ///
    /// Terminal events update the ledger, resolve their awaiting caller if
    /// one is registered, and are acknowledged exactly once either way.
    /// Non-terminal events are skipped without acknowledgment so the store
    /// redelivers them once they settle.
    pub async fn on_transactions(&self, events: Vec<TransactionEvent>) {
        let total = events.len();
        let batch = ClassifiedBatch::partition(events);
        let skipped = total - batch.terminal_len();
        if skipped > 0 {
            debug!(skipped, "non-terminal transaction events left unacknowledged");
        }

        let mut state = self.state.lock().await;
        for event in batch.purchased {
            state.ledger.grant(event.product.clone());
            Self::resolve_entitlement(&mut state, &event);
            self.acknowledge(event.id).await;
        }
        for event in batch.restored {
            state.ledger.grant(event.product.clone());
            Self::resolve_entitlement(&mut state, &event);
            self.acknowledge(event.id).await;
        }
        for event in batch.failed {
            let resolved = event
                .attempt
                .and_then(|attempt| state.pending.resolve_purchase(attempt));
            match resolved {
                Some(pending) => {
                    let failure = BillingError::PurchaseFailed(event.product.to_string());
                    if pending.responder.send(Err(failure)).is_err() {
                        debug!(transaction = %event.id, "purchase caller went away");
                    }
                }
                None => {
                    debug!(transaction = %event.id, product = %event.product, "failed event without awaiting caller");
                }
            }
            self.acknowledge(event.id).await;
        }
    }

    /// Store callback: the restore cycle finished. Every coalesced waiter
    /// receives the same entitlement snapshot.
    pub async fn on_restore_finished(&self) {
        let mut state = self.state.lock().await;
        let waiters = state.pending.drain_restore_waiters();
        if waiters.is_empty() {
            debug!("restore finished with no waiters");
            return;
        }

        let snapshot = state.ledger.snapshot();
        debug!(waiters = waiters.len(), owned = snapshot.len(), "restore finished");
        for responder in waiters {
            if responder.send(Ok(snapshot.clone())).is_err() {
                debug!("restore caller went away");
            }
        }
    }

    /// Store callback: the restore cycle failed. Every waiter is released
    /// with the failure.
    pub async fn on_restore_failed(&self) {
        let mut state = self.state.lock().await;
        let waiters = state.pending.drain_restore_waiters();
        debug!(waiters = waiters.len(), "restore failed");
        for responder in waiters {
            if responder.send(Err(BillingError::StoreRequestFailed)).is_err() {
                debug!("restore caller went away");
            }
        }
    }

    /// Resolves the attempt awaiting `event`, if any, with the current
    /// ledger snapshot. Purchased and restored events share this path: a
    /// purchase of an already-owned product reaches its terminal state
    /// through a restored event carrying the same attempt.
    fn resolve_entitlement(state: &mut EngineState, event: &TransactionEvent) {
        let resolved = event
            .attempt
            .and_then(|attempt| state.pending.resolve_purchase(attempt));
        match resolved {
            Some(pending) => {
                let snapshot = state.ledger.snapshot();
                if pending.responder.send(Ok(snapshot)).is_err() {
                    debug!(transaction = %event.id, "purchase caller went away");
                }
            }
            None => {
                debug!(transaction = %event.id, product = %event.product, "terminal event without awaiting caller");
            }
        }
    }

    /// Acknowledgment failures are tolerated: the store redelivers the event
    /// and the idempotent handler paths absorb the duplicate.
    async fn acknowledge(&self, transaction: TransactionId) {
        if let Err(e) = self.store.acknowledge(transaction).await {
            warn!(transaction = %transaction, error = %e, "acknowledgment failed, store will redeliver");
        }
    }
}
