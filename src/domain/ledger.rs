use super::product::ProductId;
use std::collections::BTreeSet;

/// Product identifiers the user is entitled to in this session.
///
/// The ledger only grows: purchased and restored events add entries and
/// nothing removes them. Set semantics make duplicate deliveries harmless.
#[derive(Debug, Default)]
pub struct PurchaseLedger {
    owned: BTreeSet<ProductId>,
}

impl PurchaseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an entitlement. Returns `false` when the product was already
    /// owned.
    pub fn grant(&mut self, product: ProductId) -> bool {
        self.owned.insert(product)
    }

    pub fn contains(&self, product: &ProductId) -> bool {
        self.owned.contains(product)
    }

    /// Current entitlements in sorted order.
    pub fn snapshot(&self) -> Vec<ProductId> {
        self.owned.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.owned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }
}
