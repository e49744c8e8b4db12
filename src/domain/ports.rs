use super::pending::RequestHandle;
use super::product::ProductId;
use super::transaction::{AttemptId, TransactionId};
use async_trait::async_trait;
use std::io;

/// Outbound contract the platform store adapter fulfils.
///
/// Submissions are fire-and-forget: outcomes arrive later through the
/// engine's callback handlers, correlated by the identity each submission
/// returns. An `Err` here is a synchronous transport failure only.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn submit_payment(&self, product: &ProductId) -> io::Result<AttemptId>;
    async fn submit_products_request(&self, identifiers: &[ProductId])
    -> io::Result<RequestHandle>;
    /// Starts a restore cycle: zero or more restored-transaction batches
    /// followed by exactly one terminal restore callback.
    async fn submit_restore_request(&self) -> io::Result<()>;
    /// Marks a delivered transaction event as fully handled. The store keeps
    /// redelivering events that are never acknowledged.
    async fn acknowledge(&self, transaction: TransactionId) -> io::Result<()>;
}

pub type StoreGatewayBox = Box<dyn StoreGateway>;
