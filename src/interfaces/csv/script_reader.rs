use crate::application::scenario::ScriptRow;
use crate::error::{BillingError, Result};
use std::io::Read;

/// Reads scenario steps from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<ScriptRow>`. It handles whitespace trimming and flexible record
/// lengths automatically.
pub struct ScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScriptReader<R> {
    /// Creates a new `ScriptReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes script rows.
    pub fn commands(self) -> impl Iterator<Item = Result<ScriptRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(BillingError::from))
    }
}
