//! Append-only alert log and identifier file persistence.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::api::{AlertBatch, AlertRecord};
use crate::error::PersistError;

use super::DedupLedger;

/// Layout of the alert log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `//##` header lines, then `,`-prefixed pretty JSON objects.
    ///
    /// The file as a whole is not a JSON document.
    #[default]
    Fragments,
    /// One compact JSON object per line, header included.
    #[serde(alias = "ndjson")]
    JsonLines,
}

/// Outcome of committing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Real alerts appended.
    pub appended: usize,
    /// Synthetic health-check records appended.
    pub synthetic: usize,
    /// Records skipped because their id was already logged.
    pub duplicates: usize,
    /// Records skipped because they carry no usable id.
    pub unidentified: usize,
    /// Whether the log header was written this cycle.
    pub header_written: bool,
    /// Ledger size after the commit.
    pub tracked: usize,
}

/// Writes novel alerts to the log and keeps the identifier file in step.
#[derive(Debug, Clone)]
pub struct AppendLogWriter {
    log_path: PathBuf,
    id_path: PathBuf,
    project_name: String,
    format: LogFormat,
}

impl AppendLogWriter {
    #[must_use]
    pub fn new(
        log_path: impl Into<PathBuf>,
        id_path: impl Into<PathBuf>,
        project_name: impl Into<String>,
        format: LogFormat,
    ) -> Self {
        Self {
            log_path: log_path.into(),
            id_path: id_path.into(),
            project_name: project_name.into(),
            format,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn id_path(&self) -> &Path {
        &self.id_path
    }

    /// Commit a batch, logging instead of returning any failure.
    ///
    /// The report reflects what reached the log, even when the identifier
    /// rewrite afterwards fails.
    pub fn commit_cycle(&self, batch: &AlertBatch, ledger: &mut DedupLedger) -> CommitReport {
        let report = match self.append_batch(batch, ledger) {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Flushing alert objects to file failed");
                return CommitReport {
                    tracked: ledger.len(),
                    ..CommitReport::default()
                };
            }
        };

        if let Err(e) = self.rewrite_identifiers(ledger) {
            error!(error = %e, appended = report.appended, "Rewriting alert id file failed");
        }
        report
    }

    /// Append novel records, then rewrite the identifier file.
    ///
    /// Ids enter the ledger only once the log append has been synced, so a
    /// failed append leaves them to be offered again next cycle. The
    /// identifier file is replaced atomically; a crash between the two steps
    /// leaves it behind the log, never ahead of it.
    pub fn try_commit(
        &self,
        batch: &AlertBatch,
        ledger: &mut DedupLedger,
    ) -> Result<CommitReport, PersistError> {
        let report = self.append_batch(batch, ledger)?;
        self.rewrite_identifiers(ledger)?;
        Ok(report)
    }

    /// Append novel records and track their ids once the log is synced.
    fn append_batch(
        &self,
        batch: &AlertBatch,
        ledger: &mut DedupLedger,
    ) -> Result<CommitReport, PersistError> {
        let mut report = CommitReport::default();
        let log_err = |source| PersistError::Log {
            path: self.log_path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(log_err)?;
        let is_empty = file.metadata().map_err(log_err)?.len() == 0;

        let mut out = BufWriter::new(file);
        if is_empty {
            self.write_header(&mut out, Utc::now()).map_err(log_err)?;
            report.header_written = true;
            info!(path = %self.log_path.display(), "Created alert collection file");
        }

        let mut pending: HashSet<String> = HashSet::new();
        for record in batch.records() {
            let Some(id) = record.id() else {
                warn!("Skipping alert without an id");
                report.unidentified += 1;
                continue;
            };

            if !ledger.is_novel(&id) || pending.contains(&id) {
                report.duplicates += 1;
                continue;
            }

            self.write_record(&mut out, record, &id)?;
            if record.is_sentinel() {
                report.synthetic += 1;
            } else {
                debug!(id = %id, event = ?record.event_type_name(), "New alert");
                pending.insert(id);
                report.appended += 1;
            }
        }

        let file: File = out
            .into_inner()
            .map_err(|e| log_err(e.into_error()))?;
        file.sync_data().map_err(log_err)?;

        for id in &pending {
            ledger.mark_seen(id);
        }
        report.tracked = ledger.len();
        Ok(report)
    }

    fn write_header<W: Write>(&self, out: &mut W, now: DateTime<Utc>) -> std::io::Result<()> {
        match self.format {
            LogFormat::Fragments => {
                writeln!(
                    out,
                    "//## Alert collection file created {},",
                    now.format("%B %d, %Y")
                )?;
                writeln!(out, "//## Ops Manager project : {}", self.project_name)
            }
            LogFormat::JsonLines => {
                let header = serde_json::json!({
                    "header": {
                        "created": now.to_rfc3339(),
                        "project": self.project_name,
                    }
                });
                writeln!(out, "{header}")
            }
        }
    }

    fn write_record<W: Write>(
        &self,
        out: &mut W,
        record: &AlertRecord,
        id: &str,
    ) -> Result<(), PersistError> {
        let serialize_err = |source: serde_json::Error| {
            if source.is_io() {
                PersistError::Log {
                    path: self.log_path.clone(),
                    source: source.into(),
                }
            } else {
                PersistError::Serialize {
                    id: id.to_string(),
                    source,
                }
            }
        };

        match self.format {
            LogFormat::Fragments => {
                out.write_all(b",").map_err(|source| PersistError::Log {
                    path: self.log_path.clone(),
                    source,
                })?;
                record.write_pretty(&mut *out).map_err(serialize_err)
            }
            LogFormat::JsonLines => {
                record.write_compact(&mut *out).map_err(serialize_err)?;
                out.write_all(b"\n").map_err(|source| PersistError::Log {
                    path: self.log_path.clone(),
                    source,
                })
            }
        }
    }

    /// Replace the identifier file with the full ledger via temp file + rename.
    fn rewrite_identifiers(&self, ledger: &DedupLedger) -> Result<(), PersistError> {
        let id_err = |source| PersistError::Identifiers {
            path: self.id_path.clone(),
            source,
        };

        let parent = self
            .id_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(parent).map_err(id_err)?;
        tmp.write_all(ledger.render().as_bytes()).map_err(id_err)?;
        tmp.as_file().sync_all().map_err(id_err)?;
        tmp.persist(&self.id_path).map_err(|e| id_err(e.error))?;
        Ok(())
    }
}
