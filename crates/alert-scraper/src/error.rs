//! Error types for the alert scraper.

use std::path::PathBuf;

use thiserror::Error;

/// Why a request to the monitoring API produced no usable response.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, TLS failure or similar
    #[error("monitoring API unreachable: {0}")]
    Unreachable(String),

    /// The transport gave up waiting for a response
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Non-2xx status from the API
    #[error("HTTP {status} from {url}")]
    HttpError { status: u16, url: String },

    /// Body could not be decoded into the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            Self::HttpError {
                status: status.as_u16(),
                url: err.url().map(ToString::to_string).unwrap_or_default(),
            }
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

/// Errors raised while loading and validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A required setting is absent or empty
    #[error("{0} is undefined")]
    Missing(&'static str),

    #[error("scraping period must be at least one second")]
    InvalidPeriod,

    #[error("CA pem file not found: {}", .0.display())]
    MissingCaFile(PathBuf),

    #[error("invalid CA pem file {}: {reason}", path.display())]
    InvalidCaFile { path: PathBuf, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors raised while rehydrating the deduplication ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read identifier file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("identifier file {} line {line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("failed to open lock file {}: {source}", path.display())]
    LockFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another scraper instance owns the state files
    #[error("state files are locked by another instance ({}): {source}", path.display())]
    Locked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while committing a cycle to disk.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to append to alert log {}: {source}", path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize alert {id}: {source}")]
    Serialize {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to rewrite identifier file {}: {source}", path.display())]
    Identifiers {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal conditions that stop the scraper before the first cycle.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("project lookup failed: {0}")]
    ProjectLookup(#[from] FetchError),

    #[error("no matching project found: expected {expected:?}, got {found:?}")]
    ProjectMismatch { expected: String, found: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl StartupError {
    /// Process exit code reported for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ProjectLookup(_) | Self::ProjectMismatch { .. } => 1,
            Self::Config(_) => 3,
            Self::Ledger(_) => 4,
        }
    }
}
