use crate::domain::product::Product;
use crate::error::{BillingError, Result};
use std::io::Read;

/// Reads catalog entries from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<Product>`. It handles whitespace trimming and flexible record
/// lengths automatically.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    /// Creates a new `CatalogReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes catalog entries.
    pub fn products(self) -> impl Iterator<Item = Result<Product>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(BillingError::from))
    }
}
