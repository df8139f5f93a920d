//! Core business logic: parsing, normalization, storage and aggregation

pub mod amount;
pub mod analytics;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod ledger;
pub mod log;
pub mod normalizer;
pub mod persist;
pub mod session;
pub mod transaction;

// Re-export main types for cleaner imports
pub use feed::FeedProvider;
pub use ledger::{Ledger, ManualEntryError};
pub use persist::{StateKey, StateStore};
pub use session::{AppState, RefreshOutcome, Session};
pub use transaction::{PeriodKey, Transaction, TransactionType};
