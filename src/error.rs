use thiserror::Error;

pub type Result<T, E = BillingError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum BillingError {
    /// The store reported a request-level failure, or a submission never
    /// reached it. Carries no product detail because the store reports none.
    #[error("store request failed")]
    StoreRequestFailed,
    #[error("payment for {0} was rejected by the store")]
    PurchaseFailed(String),
    #[error("product {0} is not in the fetched catalog")]
    ProductNotFound(String),
    #[error("duplicate purchase attempt: {0}")]
    DuplicateAttempt(String),
    #[error("duplicate products request handle: {0}")]
    DuplicateHandle(String),
    #[error("script error: {0}")]
    ScriptError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
