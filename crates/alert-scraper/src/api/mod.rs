//! Ops Manager public API access.
//!
//! The scraper only needs three calls: health, project lookup and the open
//! alert listing. [`AlertSource`] is the seam between them and the rest of
//! the crate; [`OpsManagerClient`] is the HTTP implementation.

mod client;
mod types;

pub use client::OpsManagerClient;
pub use types::{
    AlertBatch, AlertRecord, BatchOrigin, HealthStatus, ProjectInfo, HEALTH_CHECK_EVENT,
    SENTINEL_ID,
};

pub(crate) use types::AlertPage;

use async_trait::async_trait;

use crate::error::FetchError;

/// Path of the public API below the base URL.
pub const API_ROOT: &str = "/api/public/v1.0";

/// Resolved URLs for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `GET` health status.
    pub health: String,
    /// `GET` project (group) details.
    pub project: String,
    /// `GET` alert listing, queried with `status=OPEN`.
    pub alerts: String,
}

impl Endpoints {
    #[must_use]
    pub fn new(base_url: &str, project_id: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let project = format!("{base}{API_ROOT}/groups/{project_id}");
        Self {
            health: format!("{base}/monitor/health"),
            alerts: format!("{project}/alerts/"),
            project,
        }
    }
}

/// Remote source of alerts.
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Query the monitor health endpoint.
    async fn health(&self, endpoints: &Endpoints) -> Result<HealthStatus, FetchError>;

    /// List every open alert of the project.
    async fn open_alerts(&self, endpoints: &Endpoints) -> Result<Vec<AlertRecord>, FetchError>;

    /// Look up the project itself.
    async fn project(&self, endpoints: &Endpoints) -> Result<ProjectInfo, FetchError>;
}
