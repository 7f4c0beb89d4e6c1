//! Ops Manager alert scraper.
//!
//! Polls the open alerts of one Ops Manager project and appends every alert
//! not seen before to an append-only log. This crate provides:
//! - A digest-authenticated client for the Ops Manager public API
//! - Health-gated fetching with a synthetic record when the API is down
//! - A deduplication ledger persisted next to the log
//! - A scheduler running one cycle at a time on a fixed period

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod scheduler;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types
pub use api::{AlertBatch, AlertRecord, AlertSource, Endpoints, OpsManagerClient};
pub use auth::Credentials;
pub use config::ScraperConfig;
pub use error::{ConfigError, FetchError, LedgerError, PersistError, StartupError};
pub use fetcher::AlertFetcher;
pub use scheduler::{CycleReport, Scheduler};
pub use storage::{AppendLogWriter, DedupLedger, LogFormat};
