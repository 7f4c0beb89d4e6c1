//! Collection scheduler - drives the fetch, dedupe and persist cycle.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::api::BatchOrigin;
use crate::error::{ConfigError, StartupError};
use crate::fetcher::AlertFetcher;
use crate::storage::{AppendLogWriter, CommitReport, DedupLedger, StateLock};

/// Result of a single collection cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Where the batch came from.
    pub origin: BatchOrigin,
    /// Records in the fetched batch.
    pub fetched: usize,
    /// What was written.
    pub commit: CommitReport,
    /// Wall time of the cycle.
    pub elapsed: Duration,
}

/// Owns the collection state and runs cycles one at a time.
///
/// A `Scheduler` only exists once the state lock is held and the ledger has
/// been rehydrated.
pub struct Scheduler {
    fetcher: AlertFetcher,
    writer: AppendLogWriter,
    ledger: DedupLedger,
    period: Duration,
    _lock: StateLock,
}

impl Scheduler {
    /// Lock the state files and load the ledger.
    ///
    /// A zero period is rejected before any state file is touched.
    pub fn start(
        fetcher: AlertFetcher,
        writer: AppendLogWriter,
        period: Duration,
    ) -> Result<Self, StartupError> {
        if period.is_zero() {
            return Err(ConfigError::InvalidPeriod.into());
        }

        let lock = StateLock::acquire(writer.id_path())?;
        let ledger = DedupLedger::load_from(writer.id_path())?;

        if !writer.log_path().exists() {
            info!(
                path = %writer.log_path().display(),
                "Output file not found, starting a new alert collection"
            );
        }

        Ok(Self {
            fetcher,
            writer,
            ledger,
            period,
            _lock: lock,
        })
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Run one fetch, dedupe and persist cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started = Instant::now();
        debug!(at = %chrono::Utc::now(), "Periodic job starting");

        let batch = self.fetcher.fetch().await;
        let commit = self.writer.commit_cycle(&batch, &mut self.ledger);

        let report = CycleReport {
            origin: batch.origin(),
            fetched: batch.len(),
            commit,
            elapsed: started.elapsed(),
        };

        if report.commit.appended > 0 || report.commit.synthetic > 0 {
            info!(
                origin = ?report.origin,
                fetched = report.fetched,
                appended = report.commit.appended,
                synthetic = report.commit.synthetic,
                tracked = report.commit.tracked,
                "Alerts collected"
            );
        } else {
            debug!(
                origin = ?report.origin,
                fetched = report.fetched,
                duplicates = report.commit.duplicates,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "No new alerts"
            );
        }

        report
    }

    /// Run cycles every `period` until `stop` resolves.
    ///
    /// A cycle that outlasts the period delays the next one instead of
    /// overlapping it. `stop` is only observed between cycles and while
    /// fetching, never while a batch is being written.
    pub async fn run_until<F>(&mut self, stop: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            period_secs = self.period.as_secs_f64(),
            tracked = self.ledger.len(),
            "Scheduler running"
        );

        let mut cycles = 0;
        tokio::pin!(stop);
        loop {
            tokio::select! {
                biased;
                () = &mut stop => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                () = &mut stop => break,
                _ = self.run_cycle() => cycles += 1,
            }
        }

        info!(cycles, "Scheduler stopped");
        cycles
    }
}
