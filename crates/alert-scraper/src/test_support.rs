//! Scripted in-memory alert source shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::api::{AlertRecord, AlertSource, Endpoints, HealthStatus, ProjectInfo};
use crate::error::FetchError;

/// Behaviour of the source for one cycle.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Healthy, listing returns these records
    Alerts(Vec<AlertRecord>),
    /// Health endpoint answers with a non-OK status
    Unhealthy,
    /// Health endpoint cannot be reached
    Unreachable,
    /// Healthy, but the listing answers 500
    ListingFails,
}

/// Plays one [`Step`] per health check; the last step repeats.
pub(crate) struct ScriptedSource {
    steps: Vec<Step>,
    project_name: Option<String>,
    delay: Option<Duration>,
    health_calls: AtomicUsize,
    listing_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            project_name: None,
            delay: None,
            health_calls: AtomicUsize::new(0),
            listing_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_project(mut self, name: &str) -> Self {
        self.project_name = Some(name.to_string());
        self
    }

    /// Make every health check take `delay`.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    /// Highest number of health checks observed running at once.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn current(&self) -> Step {
        let idx = self.health_calls().saturating_sub(1);
        self.steps
            .get(idx)
            .or_else(|| self.steps.last())
            .cloned()
            .unwrap_or(Step::Alerts(Vec::new()))
    }
}

#[async_trait]
impl AlertSource for ScriptedSource {
    async fn health(&self, _endpoints: &Endpoints) -> Result<HealthStatus, FetchError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.current() {
            Step::Unhealthy => Ok(HealthStatus {
                status: "DEAD".to_string(),
            }),
            Step::Unreachable => Err(FetchError::Unreachable("connection refused".to_string())),
            Step::Alerts(_) | Step::ListingFails => Ok(HealthStatus {
                status: "OK".to_string(),
            }),
        }
    }

    async fn open_alerts(&self, _endpoints: &Endpoints) -> Result<Vec<AlertRecord>, FetchError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        match self.current() {
            Step::Alerts(records) => Ok(records),
            Step::ListingFails => Err(FetchError::HttpError {
                status: 500,
                url: "http://om.local/alerts/".to_string(),
            }),
            Step::Unhealthy | Step::Unreachable => Ok(Vec::new()),
        }
    }

    async fn project(&self, _endpoints: &Endpoints) -> Result<ProjectInfo, FetchError> {
        match &self.project_name {
            Some(name) => Ok(ProjectInfo {
                id: Some("5f1a2b".to_string()),
                name: name.clone(),
            }),
            None => Err(FetchError::HttpError {
                status: 404,
                url: "http://om.local/groups/5f1a2b".to_string(),
            }),
        }
    }
}

/// A plain open alert.
pub(crate) fn alert(id: &str) -> AlertRecord {
    AlertRecord::from_value(json!({
        "id": id,
        "eventTypeName": "OUTSIDE_METRIC_THRESHOLD",
        "date": "2021-10-05T08:30:00Z",
        "status": "OPEN",
        "groupId": "5f1a2b"
    }))
    .unwrap()
}
