//! HTTP client for the Ops Manager public API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{generate_cnonce, Credentials, DigestChallenge};
use crate::config::{LinkConfig, TlsMode};
use crate::error::{ConfigError, FetchError};

use super::{AlertPage, AlertRecord, AlertSource, Endpoints, HealthStatus, ProjectInfo};

/// Alerts requested per page (the API maximum is 500).
const PAGE_SIZE: usize = 100;

/// Ops Manager API client with digest authentication.
#[derive(Debug, Clone)]
pub struct OpsManagerClient {
    http: reqwest::Client,
    credentials: Credentials,
    retries: u32,
    retry_backoff: Duration,
}

impl OpsManagerClient {
    /// Build a client for the given link settings.
    pub fn new(link: &LinkConfig, credentials: Credentials) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder().timeout(link.timeout);

        match &link.tls {
            TlsMode::Disabled => {
                warn!("TLS certificate verification is disabled (sslMode: false)");
                builder = builder.danger_accept_invalid_certs(true);
            }
            TlsMode::CaBundle(path) => {
                let invalid = |reason: String| ConfigError::InvalidCaFile {
                    path: path.clone(),
                    reason,
                };
                let pem = std::fs::read(path).map_err(|e| invalid(e.to_string()))?;
                let cert =
                    reqwest::Certificate::from_pem(&pem).map_err(|e| invalid(e.to_string()))?;
                builder = builder.add_root_certificate(cert);
            }
        }

        let http = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            credentials,
            retries: link.retries,
            retry_backoff: link.retry_backoff,
        })
    }

    /// GET a JSON document, retrying transient transport errors.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let mut attempt = 0;
        loop {
            match self.get_once(url, query).await {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    warn!(url, attempt, error = %e, "Transient API error, retrying");
                    tokio::time::sleep(backoff_delay(self.retry_backoff, attempt)).await;
                }
                result => return result,
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let mut response = self.http.get(url).query(query).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(challenge) = digest_challenge(&response) {
                let uri = request_target(response.url());
                let authorization = challenge.authorization(
                    &self.credentials,
                    "GET",
                    &uri,
                    &generate_cnonce(),
                    1,
                );
                debug!(url, realm = %challenge.realm, "Answering digest challenge");
                response = self
                    .http
                    .get(url)
                    .query(query)
                    .header(AUTHORIZATION, authorization)
                    .send()
                    .await?;
            }
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpError {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

fn digest_challenge(response: &Response) -> Option<DigestChallenge> {
    response
        .headers()
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(DigestChallenge::parse)
}

/// Linear backoff before retry `attempt`, saturating instead of overflowing.
fn backoff_delay(step: Duration, attempt: u32) -> Duration {
    step.checked_mul(attempt).unwrap_or(Duration::MAX)
}

/// Path and query as sent on the request line.
fn request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

#[async_trait]
impl AlertSource for OpsManagerClient {
    async fn health(&self, endpoints: &Endpoints) -> Result<HealthStatus, FetchError> {
        self.get_json(&endpoints.health, &[]).await
    }

    async fn open_alerts(&self, endpoints: &Endpoints) -> Result<Vec<AlertRecord>, FetchError> {
        let mut records = Vec::new();
        let mut received = 0;
        let mut page_num: usize = 1;

        loop {
            let query = [
                ("status", "OPEN".to_string()),
                ("itemsPerPage", PAGE_SIZE.to_string()),
                ("pageNum", page_num.to_string()),
            ];
            let page: AlertPage = self.get_json(&endpoints.alerts, &query).await?;
            let count = page.results.len();
            received += count;

            for value in page.results {
                match AlertRecord::from_value(value) {
                    Some(record) if record.id().is_some() => records.push(record),
                    _ => warn!(page = page_num, "Dropping alert entry without a usable id"),
                }
            }

            match page.total_count {
                Some(total) if count > 0 && received < total => page_num += 1,
                _ => break,
            }
        }

        debug!(count = records.len(), pages = page_num, "Listed open alerts");
        Ok(records)
    }

    async fn project(&self, endpoints: &Endpoints) -> Result<ProjectInfo, FetchError> {
        self.get_json(&endpoints.project, &[]).await
    }
}
