//! HTTP client for a Cognite Data Fusion style backend.
//!
//! Covers the time-series endpoints used by the emitter, initializer and
//! cleanup workflow, and the extraction-pipeline endpoints used for run
//! reporting. All calls are `POST`s under `/api/v1/projects/{project}`
//! authenticated with a bearer token supplied by configuration.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    CreateOutcome, Datapoint, DeleteOutcome, PipelineMonitor, PipelineSpec, RunReport,
    TimeSeriesBackend,
};
use crate::domain::SeriesDescriptor;
use crate::error::{Direction, SyncError};

/// Page size for series listing.
const LIST_LIMIT: u32 = 1000;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSeriesItem {
    external_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    is_step: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_set_id: Option<i64>,
}

impl From<&SeriesDescriptor> for TimeSeriesItem {
    fn from(d: &SeriesDescriptor) -> Self {
        Self {
            external_id: d.external_id.clone(),
            name: Some(d.name.clone()),
            unit: Some(d.unit.clone()),
            is_step: d.is_step,
            data_set_id: d.data_set_id,
        }
    }
}

impl From<TimeSeriesItem> for SeriesDescriptor {
    fn from(item: TimeSeriesItem) -> Self {
        Self {
            name: item.name.unwrap_or_else(|| item.external_id.clone()),
            external_id: item.external_id,
            unit: item.unit.unwrap_or_default(),
            is_step: item.is_step,
            data_set_id: item.data_set_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemsResponse<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Client for the backend's REST API.
#[derive(Debug, Clone)]
pub struct CdfClient {
    client: reqwest::Client,
    project_url: String,
    token: String,
}

impl CdfClient {
    /// Creates a client for `project` on the cluster at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, project: &str, token: &str) -> Self {
        Self {
            client,
            project_url: format!("{}/api/v1/projects/{project}", base_url.trim_end_matches('/')),
            token: token.to_string(),
        }
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, SyncError> {
        self.client
            .post(format!("{}{path}", self.project_url))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest(Direction::Write, &e))
    }

    /// Passes successful responses through and classifies the rest, using
    /// the backend's error message when the body has its error shape.
    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiErrorBody>(&text).map_or(text, |b| b.error.message);
        Err(SyncError::from_http_status(Direction::Write, status, detail))
    }
}

#[async_trait]
impl TimeSeriesBackend for CdfClient {
    async fn create_series(&self, series: &SeriesDescriptor) -> Result<CreateOutcome, SyncError> {
        let body = json!({ "items": [TimeSeriesItem::from(series)] });
        let response = self.post("/timeseries", &body).await?;
        if response.status() == StatusCode::CONFLICT {
            return Ok(CreateOutcome::AlreadyExists);
        }
        Self::expect_success(response).await?;
        Ok(CreateOutcome::Created)
    }

    async fn write_datapoint(&self, external_id: &str, point: &Datapoint) -> Result<(), SyncError> {
        // The datapoint API has no per-point metadata; it is kept in the log.
        tracing::trace!(
            external_id,
            timestamp = point.timestamp,
            metadata = ?point.metadata,
            "writing datapoint"
        );
        let body = json!({
            "items": [{
                "externalId": external_id,
                "datapoints": [{ "timestamp": point.timestamp, "value": point.value }],
            }]
        });
        let response = self.post("/timeseries/data", &body).await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn delete_series(&self, external_id: &str) -> Result<DeleteOutcome, SyncError> {
        let items = json!({ "items": [{ "externalId": external_id }], "ignoreUnknownIds": true });
        let response = Self::expect_success(self.post("/timeseries/byids", &items).await?).await?;
        let found: ItemsResponse<TimeSeriesItem> = response
            .json()
            .await
            .map_err(|e| SyncError::from_reqwest(Direction::Write, &e))?;
        if found.items.is_empty() {
            return Ok(DeleteOutcome::AlreadyAbsent);
        }
        Self::expect_success(self.post("/timeseries/delete", &items).await?).await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn list_series(&self, prefix: &str) -> Result<Vec<SeriesDescriptor>, SyncError> {
        let body = json!({ "filter": { "externalIdPrefix": prefix }, "limit": LIST_LIMIT });
        let response = Self::expect_success(self.post("/timeseries/list", &body).await?).await?;
        let items: ItemsResponse<TimeSeriesItem> = response
            .json()
            .await
            .map_err(|e| SyncError::from_reqwest(Direction::Write, &e))?;
        Ok(items.items.into_iter().map(SeriesDescriptor::from).collect())
    }
}

#[async_trait]
impl PipelineMonitor for CdfClient {
    async fn ensure_pipeline(&self, spec: &PipelineSpec) -> Result<CreateOutcome, SyncError> {
        let mut item = json!({
            "externalId": spec.external_id,
            "name": spec.name,
            "description": spec.description,
        });
        if let (Some(id), Some(obj)) = (spec.data_set_id, item.as_object_mut()) {
            obj.insert("dataSetId".to_string(), json!(id));
        }
        let response = self.post("/extpipes", &json!({ "items": [item] })).await?;
        if response.status() == StatusCode::CONFLICT {
            return Ok(CreateOutcome::AlreadyExists);
        }
        Self::expect_success(response).await?;
        Ok(CreateOutcome::Created)
    }

    async fn report_run(&self, report: &RunReport) -> Result<(), SyncError> {
        let body = json!({
            "items": [{
                "extpipeExternalId": report.pipeline_id,
                "status": report.status.as_str(),
                "message": report.message,
                "createdTime": report.reported_at.timestamp_millis(),
            }]
        });
        Self::expect_success(self.post("/extpipes/runs", &body).await?).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn project_url_strips_trailing_slash() {
        let client = CdfClient::new(
            reqwest::Client::new(),
            "https://api.example.com/",
            "chess",
            "t",
        );
        assert_eq!(client.project_url, "https://api.example.com/api/v1/projects/chess");
    }

    #[test]
    fn series_item_uses_camel_case() {
        let descriptor = SeriesDescriptor {
            external_id: "WORDFEUD/anne/rating".to_string(),
            name: "Wordfeud Rating - anne".to_string(),
            unit: "rating".to_string(),
            is_step: true,
            data_set_id: Some(7),
        };
        let Ok(value) = serde_json::to_value(TimeSeriesItem::from(&descriptor)) else {
            panic!("serialization failed");
        };
        assert_eq!(value["externalId"], "WORDFEUD/anne/rating");
        assert_eq!(value["isStep"], true);
        assert_eq!(value["dataSetId"], 7);
    }

    #[test]
    fn error_body_message_is_extracted() {
        let text = r#"{"error":{"code":400,"message":"Ids not found","missing":[{"externalId":"x"}]}}"#;
        let Ok(body) = serde_json::from_str::<ApiErrorBody>(text) else {
            panic!("error body should parse");
        };
        assert_eq!(body.error.message, "Ids not found");
    }

    #[test]
    fn listed_item_without_name_falls_back_to_external_id() {
        let text = r#"{"items":[{"externalId":"WORDFEUD/anne/rating","isStep":true}]}"#;
        let Ok(listed) = serde_json::from_str::<ItemsResponse<TimeSeriesItem>>(text) else {
            panic!("list body should parse");
        };
        let descriptors: Vec<SeriesDescriptor> =
            listed.items.into_iter().map(SeriesDescriptor::from).collect();
        assert_eq!(descriptors.first().map(|d| d.name.as_str()), Some("WORDFEUD/anne/rating"));
    }
}
