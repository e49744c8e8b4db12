use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Store-catalog identifier of a purchasable product.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(identifier: &str) -> Self {
        Self(identifier.to_string())
    }
}

impl From<String> for ProductId {
    fn from(identifier: String) -> Self {
        Self(identifier)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Product,
    Subscription,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Product {
    pub identifier: ProductId,
    pub kind: ProductKind,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub currency_code: String,
    pub formatted_price: String,
    pub locale_tag: String,
}

/// The most recently fetched catalog.
///
/// Every successful products response replaces the whole cache; entries from
/// earlier responses are discarded, never merged.
#[derive(Debug, Default)]
pub struct ProductCache {
    products: HashMap<ProductId, Product>,
}

impl ProductCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cached catalog with `products`.
    pub fn replace_all(&mut self, products: Vec<Product>) {
        self.products = products
            .into_iter()
            .map(|product| (product.identifier.clone(), product))
            .collect();
    }

    pub fn get(&self, identifier: &ProductId) -> Option<&Product> {
        self.products.get(identifier)
    }

    pub fn contains(&self, identifier: &ProductId) -> bool {
        self.products.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
