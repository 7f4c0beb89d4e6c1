//! Deduplication ledger of alert identifiers already written to the log.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::api::SENTINEL_ID;
use crate::error::LedgerError;

/// Set of alert ids already committed to the alert log.
///
/// The set only grows. The sentinel id is never tracked, so synthetic
/// health-check records are always novel.
#[derive(Debug, Clone, Default)]
pub struct DedupLedger {
    seen: HashSet<String>,
}

impl DedupLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate the ledger from an identifier file.
    ///
    /// Each line holds one id, optionally followed by a `,` separator. A
    /// missing or empty file yields an empty ledger.
    pub fn load_from(path: &Path) -> Result<Self, LedgerError> {
        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    path = %path.display(),
                    "Identifier file not found, starting with a new list of alerts"
                );
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(LedgerError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let ledger = Self::parse(&content, path)?;
        info!(
            path = %path.display(),
            count = ledger.len(),
            "Logged alert ids loaded"
        );
        Ok(ledger)
    }

    fn parse(content: &[u8], path: &Path) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();

        for (idx, raw) in content.split(|b| *b == b'\n').enumerate() {
            let line = std::str::from_utf8(raw).map_err(|e| LedgerError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: e.to_string(),
            })?;

            let id = line.split(',').next().unwrap_or_default().trim();
            if id.is_empty() {
                continue;
            }
            if id == SENTINEL_ID {
                debug!(line = idx + 1, "Ignoring sentinel id in identifier file");
                continue;
            }
            ledger.seen.insert(id.to_string());
        }

        Ok(ledger)
    }

    /// Whether a record with this id should be written.
    pub fn is_novel(&self, id: &str) -> bool {
        id == SENTINEL_ID || !self.seen.contains(id)
    }

    /// Track an id. Returns `true` if it was not tracked before.
    /// The sentinel is never tracked.
    pub fn mark_seen(&mut self, id: &str) -> bool {
        if id == SENTINEL_ID {
            return false;
        }
        self.seen.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Tracked ids in sorted order.
    pub fn snapshot(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.seen.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Identifier file contents: one `id,` line per tracked id.
    pub fn render(&self) -> String {
        self.snapshot()
            .into_iter()
            .map(|id| format!("{id},\n"))
            .collect()
    }
}
