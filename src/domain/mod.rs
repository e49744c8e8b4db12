pub mod ledger;
pub mod pending;
pub mod ports;
pub mod product;
pub mod transaction;
