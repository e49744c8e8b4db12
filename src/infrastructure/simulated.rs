use crate::domain::pending::RequestHandle;
use crate::domain::ports::StoreGateway;
use crate::domain::product::{Product, ProductId};
use crate::domain::transaction::{AttemptId, Disposition, TransactionEvent, TransactionId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;
use tokio::sync::Mutex;

/// An in-memory stand-in for the platform store.
///
/// Records every submission, mints monotonically increasing correlation
/// identities, and produces correctly correlated callback payloads on
/// demand. Clones share state, so one clone can serve the engine while
/// another drives callbacks from a test or script.
#[derive(Default, Clone)]
pub struct SimulatedStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    catalog: HashMap<ProductId, Product>,
    next_handle: u64,
    next_attempt: u64,
    next_transaction: u64,
    product_requests: VecDeque<(RequestHandle, Vec<ProductId>)>,
    payments: VecDeque<(AttemptId, ProductId)>,
    restore_cycle_open: bool,
    restore_requests: u64,
    acknowledged: Vec<TransactionId>,
}

impl Inner {
    fn next_transaction_id(&mut self) -> TransactionId {
        self.next_transaction += 1;
        TransactionId(self.next_transaction)
    }

    fn take_payment(&mut self, product: &ProductId) -> Option<(AttemptId, ProductId)> {
        let position = self
            .payments
            .iter()
            .position(|(_, pending)| pending == product)?;
        self.payments.remove(position)
    }
}

impl SimulatedStore {
    /// Creates a new store with an empty backend catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose backend knows `catalog`.
    pub fn with_catalog(catalog: Vec<Product>) -> Self {
        let catalog = catalog
            .into_iter()
            .map(|product| (product.identifier.clone(), product))
            .collect();
        Self {
            inner: Arc::new(Mutex::new(Inner {
                catalog,
                ..Inner::default()
            })),
        }
    }

    /// Answers the oldest outstanding products request from the backend
    /// catalog. Identifiers the backend does not know are omitted from the
    /// response, mirroring how real stores treat invalid identifiers.
    pub async fn respond_products(&self) -> Option<(RequestHandle, Vec<Product>)> {
        let mut inner = self.inner.lock().await;
        let (handle, identifiers) = inner.product_requests.pop_front()?;
        let products = identifiers
            .iter()
            .filter_map(|identifier| inner.catalog.get(identifier).cloned())
            .collect();
        Some((handle, products))
    }

    /// Fails the oldest outstanding products request.
    pub async fn fail_products(&self) -> Option<RequestHandle> {
        let mut inner = self.inner.lock().await;
        inner.product_requests.pop_front().map(|(handle, _)| handle)
    }

    /// Produces the terminal purchased event for the oldest outstanding
    /// payment on `product`.
    pub async fn approve_payment(&self, product: &ProductId) -> Option<TransactionEvent> {
        let mut inner = self.inner.lock().await;
        let (attempt, product) = inner.take_payment(product)?;
        let id = inner.next_transaction_id();
        Some(TransactionEvent::purchased(id, attempt, product))
    }

    /// Produces the terminal failed event for the oldest outstanding payment
    /// on `product`.
    pub async fn reject_payment(&self, product: &ProductId) -> Option<TransactionEvent> {
        let mut inner = self.inner.lock().await;
        let (attempt, product) = inner.take_payment(product)?;
        let id = inner.next_transaction_id();
        Some(TransactionEvent::failed(id, attempt, product))
    }

    /// Produces a restored event for the oldest outstanding payment on
    /// `product`, which is how stores settle a payment for something the
    /// user already owns.
    pub async fn restore_payment(&self, product: &ProductId) -> Option<TransactionEvent> {
        let mut inner = self.inner.lock().await;
        let (attempt, product) = inner.take_payment(product)?;
        let id = inner.next_transaction_id();
        Some(TransactionEvent::new(
            id,
            Some(attempt),
            product,
            Disposition::Restored,
        ))
    }

    /// Produces restored events replaying previously owned `products`.
    /// Returns `None` unless a restore cycle is open.
    pub async fn restore_events(&self, products: &[ProductId]) -> Option<Vec<TransactionEvent>> {
        let mut inner = self.inner.lock().await;
        if !inner.restore_cycle_open {
            return None;
        }
        let events = products
            .iter()
            .map(|product| {
                let id = inner.next_transaction_id();
                TransactionEvent::restored(id, product.clone())
            })
            .collect();
        Some(events)
    }

    /// Closes the open restore cycle successfully. Returns `false` when no
    /// cycle is open.
    pub async fn finish_restore(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.restore_cycle_open {
            inner.restore_cycle_open = false;
            true
        } else {
            false
        }
    }

    /// Closes the open restore cycle with a failure. Returns `false` when no
    /// cycle is open.
    pub async fn fail_restore(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.restore_cycle_open {
            inner.restore_cycle_open = false;
            true
        } else {
            false
        }
    }

    /// Every transaction identity acknowledged so far, in order.
    pub async fn acknowledged(&self) -> Vec<TransactionId> {
        self.inner.lock().await.acknowledged.clone()
    }

    pub async fn restore_requests_submitted(&self) -> u64 {
        self.inner.lock().await.restore_requests
    }

    pub async fn outstanding_product_requests(&self) -> usize {
        self.inner.lock().await.product_requests.len()
    }

    pub async fn outstanding_payments(&self) -> usize {
        self.inner.lock().await.payments.len()
    }
}

#[async_trait]
impl StoreGateway for SimulatedStore {
    async fn submit_payment(&self, product: &ProductId) -> io::Result<AttemptId> {
        let mut inner = self.inner.lock().await;
        inner.next_attempt += 1;
        let attempt = AttemptId(inner.next_attempt);
        inner.payments.push_back((attempt, product.clone()));
        Ok(attempt)
    }

    async fn submit_products_request(
        &self,
        identifiers: &[ProductId],
    ) -> io::Result<RequestHandle> {
        let mut inner = self.inner.lock().await;
        inner.next_handle += 1;
        let handle = RequestHandle(inner.next_handle);
        inner.product_requests.push_back((handle, identifiers.to_vec()));
        Ok(handle)
    }

    async fn submit_restore_request(&self) -> io::Result<()> {
        let mut inner = self.inner.lock().await;
        inner.restore_requests += 1;
        inner.restore_cycle_open = true;
        Ok(())
    }

    async fn acknowledge(&self, transaction: TransactionId) -> io::Result<()> {
        self.inner.lock().await.acknowledged.push(transaction);
        Ok(())
    }
}
