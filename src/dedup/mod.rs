// src/dedup/mod.rs
pub mod identity;
pub mod ledger;

pub use identity::{derive_identity, magnitude_bucket, time_bucket, AlertIdentity};
pub use ledger::{SentLedger, DEFAULT_LEDGER_CAPACITY};
