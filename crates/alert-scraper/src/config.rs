//! Scraper configuration loaded from YAML.
//!
//! The file keeps the layout operators already deploy:
//!
//! ```yaml
//! topology:
//!   projectId: 5f1a2b3c4d5e6f7a8b9c0d1e
//!   projectName: production
//! link:
//!   sslMode: true
//!   sslCAFile: /etc/ssl/om-ca.pem
//! output:
//!   alert_filePath: /var/lib/om-alerts/alerts.json
//!   id_filePath: /var/lib/om-alerts/alert-ids.txt
//! param:
//!   period: 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::storage::LogFormat;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// TLS verification mode for the API link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Certificates are not verified
    Disabled,
    /// Verify against the given CA bundle
    CaBundle(PathBuf),
}

/// HTTP link settings.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub tls: TlsMode,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries for transient transport errors.
    pub retries: u32,
    /// Backoff step between retries (multiplied by the attempt number).
    pub retry_backoff: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::Disabled,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

/// Validated scraper configuration.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Ops Manager project (group) id.
    pub project_id: String,
    /// Expected project name, checked at startup.
    pub project_name: String,
    pub link: LinkConfig,
    /// Append-only alert log.
    pub alert_file: PathBuf,
    /// Identifier ledger file.
    pub id_file: PathBuf,
    pub log_format: LogFormat,
    /// Poll interval.
    pub period: Duration,
}

impl ScraperConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        raw.try_into()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    topology: RawTopology,
    #[serde(default)]
    link: RawLink,
    #[serde(default)]
    output: RawOutput,
    #[serde(default)]
    param: RawParam,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTopology {
    project_id: Option<String>,
    project_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLink {
    #[serde(default)]
    ssl_mode: bool,
    #[serde(rename = "sslCAFile")]
    ssl_ca_file: Option<PathBuf>,
    timeout_secs: Option<u64>,
    retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOutput {
    #[serde(rename = "alert_filePath")]
    alert_file_path: Option<PathBuf>,
    #[serde(rename = "id_filePath")]
    id_file_path: Option<PathBuf>,
    #[serde(default)]
    format: LogFormat,
}

#[derive(Debug, Default, Deserialize)]
struct RawParam {
    period: Option<u64>,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn required_path(value: Option<PathBuf>, name: &'static str) -> Result<PathBuf, ConfigError> {
    value
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(ConfigError::Missing(name))
}

impl TryFrom<RawConfig> for ScraperConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let project_id = required(raw.topology.project_id, "topology.projectId")?;
        let project_name = required(raw.topology.project_name, "topology.projectName")?;

        let tls = if raw.link.ssl_mode {
            let ca = required_path(raw.link.ssl_ca_file, "link.sslCAFile")?;
            if !ca.exists() {
                return Err(ConfigError::MissingCaFile(ca));
            }
            TlsMode::CaBundle(ca)
        } else {
            TlsMode::Disabled
        };

        let link = LinkConfig {
            tls,
            timeout: Duration::from_secs(raw.link.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            retries: raw.link.retries.unwrap_or(DEFAULT_RETRIES),
            retry_backoff: Duration::from_millis(
                raw.link.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
            ),
        };

        let alert_file = required_path(raw.output.alert_file_path, "output.alert_filePath")?;
        let id_file = required_path(raw.output.id_file_path, "output.id_filePath")?;

        let period = match raw.param.period {
            None => return Err(ConfigError::Missing("param.period")),
            Some(0) => return Err(ConfigError::InvalidPeriod),
            Some(secs) => Duration::from_secs(secs),
        };

        Ok(Self {
            project_id,
            project_name,
            link,
            alert_file,
            id_file,
            log_format: raw.output.format,
            period,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
topology:
  projectId: 5f1a2b3c4d5e6f7a8b9c0d1e
  projectName: production
link:
  sslMode: false
output:
  alert_filePath: /tmp/alerts.json
  id_filePath: /tmp/alert-ids.txt
param:
  period: 5
";

    #[test]
    fn test_parse_sample() {
        let config = ScraperConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.project_id, "5f1a2b3c4d5e6f7a8b9c0d1e");
        assert_eq!(config.project_name, "production");
        assert_eq!(config.link.tls, TlsMode::Disabled);
        assert_eq!(config.link.timeout, Duration::from_secs(30));
        assert_eq!(config.link.retries, 2);
        assert_eq!(config.alert_file, PathBuf::from("/tmp/alerts.json"));
        assert_eq!(config.id_file, PathBuf::from("/tmp/alert-ids.txt"));
        assert_eq!(config.log_format, LogFormat::Fragments);
        assert_eq!(config.period, Duration::from_secs(5));
    }

    #[test]
    fn test_link_overrides_and_jsonlines() {
        let yaml = SAMPLE
            .replace(
                "sslMode: false",
                "sslMode: false\n  timeoutSecs: 5\n  retries: 0\n  retryBackoffMs: 10",
            )
            .replace(
                "id_filePath: /tmp/alert-ids.txt",
                "id_filePath: /tmp/alert-ids.txt\n  format: jsonlines",
            );
        let config = ScraperConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.link.timeout, Duration::from_secs(5));
        assert_eq!(config.link.retries, 0);
        assert_eq!(config.link.retry_backoff, Duration::from_millis(10));
        assert_eq!(config.log_format, LogFormat::JsonLines);
    }

    #[test]
    fn test_missing_period() {
        let yaml = SAMPLE.replace("  period: 5\n", "");
        assert!(matches!(
            ScraperConfig::from_yaml(&yaml),
            Err(ConfigError::Missing("param.period"))
        ));
    }

    #[test]
    fn test_zero_period() {
        let yaml = SAMPLE.replace("period: 5", "period: 0");
        assert!(matches!(
            ScraperConfig::from_yaml(&yaml),
            Err(ConfigError::InvalidPeriod)
        ));
    }

    #[test]
    fn test_missing_output_path() {
        let yaml = SAMPLE.replace("  id_filePath: /tmp/alert-ids.txt\n", "");
        assert!(matches!(
            ScraperConfig::from_yaml(&yaml),
            Err(ConfigError::Missing("output.id_filePath"))
        ));
    }

    #[test]
    fn test_ssl_mode_requires_existing_ca() {
        let yaml = SAMPLE.replace(
            "sslMode: false",
            "sslMode: true\n  sslCAFile: /nonexistent/om-ca.pem",
        );
        assert!(matches!(
            ScraperConfig::from_yaml(&yaml),
            Err(ConfigError::MissingCaFile(_))
        ));

        let yaml = SAMPLE.replace("sslMode: false", "sslMode: true");
        assert!(matches!(
            ScraperConfig::from_yaml(&yaml),
            Err(ConfigError::Missing("link.sslCAFile"))
        ));
    }

    #[test]
    fn test_ssl_mode_with_ca_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let ca = dir.path().join("ca.pem");
        std::fs::write(&ca, "-----BEGIN CERTIFICATE-----\n").unwrap();
        let yaml = SAMPLE.replace(
            "sslMode: false",
            &format!("sslMode: true\n  sslCAFile: {}", ca.display()),
        );
        let config = ScraperConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.link.tls, TlsMode::CaBundle(ca));
    }

    #[test]
    fn test_missing_file() {
        let err = ScraperConfig::from_file(Path::new("/nonexistent/scraper.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_blank_project_name() {
        let yaml = SAMPLE.replace("projectName: production", "projectName: \"  \"");
        assert!(matches!(
            ScraperConfig::from_yaml(&yaml),
            Err(ConfigError::Missing("topology.projectName"))
        ));
    }
}
