//! Alert storage.
//!
//! Keeps the append-only alert log, the identifier ledger that deduplicates
//! it, and the lock that keeps a second scraper off both files.

mod ledger;
mod lock;
mod writer;

pub use ledger::DedupLedger;
pub use lock::StateLock;
pub use writer::{AppendLogWriter, CommitReport, LogFormat};
