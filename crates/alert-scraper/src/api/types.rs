//! Ops Manager data types.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier reserved for synthetic health-check records.
pub const SENTINEL_ID: &str = "0";

/// Event type of the synthetic record emitted when the API is unhealthy.
pub const HEALTH_CHECK_EVENT: &str = "HEALTH_CHECK";

/// An alert as returned by the API.
///
/// The record is opaque apart from `id`, `eventTypeName` and `date`; every
/// other field is passed through untouched. Keys serialize in sorted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertRecord(Map<String, Value>);

impl AlertRecord {
    /// Wrap a JSON value, rejecting anything that is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Synthetic record standing in for a failed health check.
    #[must_use]
    pub fn health_check_failed(at: DateTime<Utc>) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::from(0));
        fields.insert(
            "eventTypeName".to_string(),
            Value::from(HEALTH_CHECK_EVENT),
        );
        fields.insert(
            "date".to_string(),
            Value::from(at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        fields.insert("status".to_string(), Value::Bool(false));
        Self(fields)
    }

    /// The alert identifier, normalized to a string.
    ///
    /// The API hands out hex strings; the synthetic record uses the number `0`.
    /// Both `0` and `"0"` normalize to [`SENTINEL_ID`].
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Whether this is a synthetic health-check record.
    pub fn is_sentinel(&self) -> bool {
        self.id().is_some_and(|id| id == SENTINEL_ID)
    }

    pub fn event_type_name(&self) -> Option<&str> {
        self.0.get("eventTypeName").and_then(Value::as_str)
    }

    pub fn date(&self) -> Option<&str> {
        self.0.get("date").and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Serialize as 4-space indented JSON.
    pub fn write_pretty<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        self.0.serialize(&mut serializer)
    }

    /// Serialize as a single compact JSON line (no trailing newline).
    pub fn write_compact<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(writer, &self.0)
    }
}

/// How a batch came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOrigin {
    /// Listing succeeded after a healthy health check
    Remote,
    /// Health check failed; the batch holds one synthetic record
    HealthCheckFailed,
    /// Health check passed but the listing failed; the batch is empty
    ListingFailed,
}

/// Records produced by one fetch.
#[derive(Debug, Clone)]
pub struct AlertBatch {
    origin: BatchOrigin,
    records: Vec<AlertRecord>,
}

impl AlertBatch {
    #[must_use]
    pub fn remote(records: Vec<AlertRecord>) -> Self {
        Self {
            origin: BatchOrigin::Remote,
            records,
        }
    }

    #[must_use]
    pub fn health_check_failed(at: DateTime<Utc>) -> Self {
        Self {
            origin: BatchOrigin::HealthCheckFailed,
            records: vec![AlertRecord::health_check_failed(at)],
        }
    }

    #[must_use]
    pub fn listing_failed() -> Self {
        Self {
            origin: BatchOrigin::ListingFailed,
            records: Vec::new(),
        }
    }

    pub fn origin(&self) -> BatchOrigin {
        self.origin
    }

    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Response of `GET /monitor/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    /// Only an explicit `OK` counts as healthy.
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

/// Response of `GET /groups/{projectId}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInfo {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// One page of `GET /groups/{projectId}/alerts/`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AlertPage {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub total_count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> AlertRecord {
        AlertRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_id_normalization() {
        assert_eq!(
            record(json!({"id": "5f1a2b"})).id().as_deref(),
            Some("5f1a2b")
        );
        assert_eq!(record(json!({"id": 0})).id().as_deref(), Some("0"));
        assert_eq!(record(json!({"id": 42})).id().as_deref(), Some("42"));
        assert_eq!(record(json!({"id": ""})).id(), None);
        assert_eq!(record(json!({"id": null})).id(), None);
        assert_eq!(record(json!({"eventTypeName": "X"})).id(), None);
    }

    #[test]
    fn test_sentinel_detection() {
        assert!(record(json!({"id": 0})).is_sentinel());
        assert!(record(json!({"id": "0"})).is_sentinel());
        assert!(!record(json!({"id": "00"})).is_sentinel());
        assert!(!record(json!({"id": "abc"})).is_sentinel());
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(AlertRecord::from_value(json!([1, 2])).is_none());
        assert!(AlertRecord::from_value(json!("id")).is_none());
    }

    #[test]
    fn test_health_check_record() {
        let at = DateTime::parse_from_rfc3339("2021-10-05T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let rec = AlertRecord::health_check_failed(at);
        assert!(rec.is_sentinel());
        assert_eq!(rec.event_type_name(), Some(HEALTH_CHECK_EVENT));
        assert_eq!(rec.date(), Some("2021-10-05T08:30:00.000000Z"));
        assert_eq!(rec.fields()["status"], json!(false));
    }

    #[test]
    fn test_pretty_output_sorted_and_indented() {
        let rec = record(json!({
            "id": "a1",
            "eventTypeName": "HOST_DOWN",
            "tags": [],
            "metric": {"name": "CPU"}
        }));
        let mut out = Vec::new();
        rec.write_pretty(&mut out).unwrap();
        let expected = "{\n    \"eventTypeName\": \"HOST_DOWN\",\n    \"id\": \"a1\",\n    \"metric\": {\n        \"name\": \"CPU\"\n    },\n    \"tags\": []\n}";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_health_status() {
        let ok: HealthStatus = serde_json::from_value(json!({"status": "OK"})).unwrap();
        let degraded: HealthStatus =
            serde_json::from_value(json!({"status": "DEGRADED"})).unwrap();
        assert!(ok.is_ok());
        assert!(!degraded.is_ok());
    }

    #[test]
    fn test_batch_constructors() {
        let failed = AlertBatch::health_check_failed(Utc::now());
        assert_eq!(failed.origin(), BatchOrigin::HealthCheckFailed);
        assert_eq!(failed.len(), 1);
        assert!(failed.records()[0].is_sentinel());

        let empty = AlertBatch::listing_failed();
        assert_eq!(empty.origin(), BatchOrigin::ListingFailed);
        assert!(empty.is_empty());
    }
}
