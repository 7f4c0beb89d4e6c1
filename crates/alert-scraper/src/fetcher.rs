//! Health-gated alert fetching.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::api::{AlertBatch, AlertSource, Endpoints, ProjectInfo};
use crate::error::StartupError;

/// Fetches the open alerts of one project, checking API health first.
pub struct AlertFetcher {
    source: Arc<dyn AlertSource>,
    endpoints: Endpoints,
}

impl AlertFetcher {
    #[must_use]
    pub fn new(source: Arc<dyn AlertSource>, endpoints: Endpoints) -> Self {
        Self { source, endpoints }
    }

    /// Fetch the current batch. Never fails.
    ///
    /// - health not `OK` or unreachable: one synthetic health-check record,
    ///   the listing is not requested
    /// - listing fails after a healthy check: an empty batch, so alerts raised
    ///   in this window are only picked up if still open next cycle
    pub async fn fetch(&self) -> AlertBatch {
        match self.source.health(&self.endpoints).await {
            Ok(health) if health.is_ok() => {}
            Ok(health) => {
                warn!(status = %health.status, "Health check Ops Manager failed");
                return AlertBatch::health_check_failed(Utc::now());
            }
            Err(e) => {
                warn!(error = %e, "Health check Ops Manager failed");
                return AlertBatch::health_check_failed(Utc::now());
            }
        }

        match self.source.open_alerts(&self.endpoints).await {
            Ok(records) => {
                debug!(count = records.len(), "Fetched open alerts");
                AlertBatch::remote(records)
            }
            Err(e) => {
                error!(error = %e, "Listing open alerts failed, nothing collected this cycle");
                AlertBatch::listing_failed()
            }
        }
    }

    /// Confirm the configured project id resolves to the expected name.
    pub async fn verify_project(&self, expected_name: &str) -> Result<ProjectInfo, StartupError> {
        let project = self.source.project(&self.endpoints).await?;
        if project.name != expected_name {
            return Err(StartupError::ProjectMismatch {
                expected: expected_name.to_string(),
                found: project.name,
            });
        }
        Ok(project)
    }
}
