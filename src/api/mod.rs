//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health` sits at the
//! root. With the `swagger-ui` feature the OpenAPI document is served at
//! `/api-docs/openapi.json` and browsable under `/swagger-ui`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "wordfeud-sync",
        description = "Incremental, idempotent sync of Wordfeud match history into step time series"
    ),
    paths(
        handlers::system::health_handler,
        handlers::sync::run_sync,
        handlers::sync::init,
        handlers::checkpoint::get_checkpoint,
        handlers::checkpoint::reset_checkpoint,
        handlers::series::preview_cleanup,
        handlers::series::cleanup,
    ),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Sync", description = "Run triggers"),
        (name = "Checkpoint", description = "Sync progress"),
        (name = "Series", description = "Series preview and cleanup"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::SyncConfig;
    use crate::domain::{BoardType, MatchResult, RuleSet};
    use crate::persistence::{CheckpointStore, InMemoryCheckpointStore};
    use crate::retry::RetryPolicy;
    use crate::service::{CleanupWorkflow, DatapointEmitter, Initializer, SyncService};
    use crate::sink::{InMemoryMonitor, InMemoryTimeSeries, PipelineMonitor, TimeSeriesBackend};
    use crate::source::{CompletedMatchFetcher, InMemoryMatchSource, MatchSource, RawMatch};

    fn retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    async fn app() -> (Router, Arc<InMemoryTimeSeries>) {
        let config = SyncConfig::default();
        let source = Arc::new(InMemoryMatchSource::new());
        let Some(finished) = Utc.timestamp_millis_opt(1_000).single() else {
            panic!("valid timestamp");
        };
        source
            .push(
                "anne",
                [RawMatch {
                    id: 1,
                    finished_at: Some(finished),
                    opponent: "bo".to_string(),
                    result: Some(MatchResult::Won),
                    rating_before: 1_500.0,
                    rating_after: 1_512.0,
                    ruleset: RuleSet::Norwegian,
                    board: BoardType::Normal,
                }],
            )
            .await;
        let backend = Arc::new(InMemoryTimeSeries::new());
        let monitor: Arc<dyn PipelineMonitor> = Arc::new(InMemoryMonitor::new());
        let store: Arc<dyn CheckpointStore> = Arc::new(InMemoryCheckpointStore::new());
        let series: Arc<dyn TimeSeriesBackend> = Arc::clone(&backend) as Arc<dyn TimeSeriesBackend>;

        let sync_service = SyncService::new(
            store,
            CompletedMatchFetcher::new(source as Arc<dyn MatchSource>, retry()),
            DatapointEmitter::new(Arc::clone(&series), retry()),
            Arc::clone(&monitor),
            &config,
        );
        let state = AppState {
            username: Arc::from("anne"),
            sync_service: Arc::new(sync_service),
            initializer: Arc::new(Initializer::new(
                Arc::clone(&series),
                monitor,
                retry(),
                &config.series_namespace,
                None,
            )),
            cleanup: Arc::new(CleanupWorkflow::new(series, retry(), &config.series_namespace)),
        };
        (build_router().with_state(state), backend)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let payload = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let Ok(request) = builder.body(payload) else {
            panic!("valid request");
        };
        let Ok(response) = app.clone().oneshot(request).await else {
            panic!("router is infallible");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("readable body");
        };
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_username() {
        let (app, _) = app().await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "anne");
    }

    #[tokio::test]
    async fn sync_without_body_runs_incrementally() {
        let (app, backend) = app().await;
        let (status, body) = send(&app, "POST", "/api/v1/sync", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "incremental");
        assert_eq!(body["matches_processed"], 1);
        assert_eq!(backend.write_count().await, 6);

        let (status, body) = send(&app, "GET", "/api/v1/checkpoint", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["games_played"], 1);
    }

    #[tokio::test]
    async fn sync_with_kebab_case_payload_backfills() {
        let (app, _) = app().await;
        let payload = r#"{"start-time": 0}"#;
        let (status, body) = send(&app, "POST", "/api/v1/sync", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "backfill");
    }

    #[tokio::test]
    async fn invalid_payload_maps_to_error_envelope() {
        let (app, _) = app().await;
        let payload = r#"{"board-type": "hexagonal"}"#;
        let (status, body) = send(&app, "POST", "/api/v1/sync", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["classification"], "invalid_request");
    }

    #[tokio::test]
    async fn reset_checkpoint_reports_removal() {
        let (app, _) = app().await;
        let (_, _) = send(&app, "POST", "/api/v1/sync", None).await;
        let (status, body) = send(&app, "DELETE", "/api/v1/checkpoint", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], true);
        let (_, body) = send(&app, "DELETE", "/api/v1/checkpoint", None).await;
        assert_eq!(body["removed"], false);
    }

    #[tokio::test]
    async fn init_then_cleanup_requires_confirmation() {
        let (app, backend) = app().await;
        let (status, body) = send(&app, "POST", "/api/v1/init", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pipeline_id"], "extractors/wordfeud-anne");

        let (status, plan) = send(&app, "GET", "/api/v1/series", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(plan["series"][0]["exists"], true);

        let declined = r#"{"confirm": false}"#;
        let (status, _) = send(&app, "POST", "/api/v1/series/cleanup", Some(declined)).await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
        assert!(backend.contains("WORDFEUD/anne/rating").await);

        let confirmed = r#"{"confirm": true}"#;
        let (status, report) = send(&app, "POST", "/api/v1/series/cleanup", Some(confirmed)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["confirmed"], true);
        assert!(!backend.contains("WORDFEUD/anne/rating").await);
    }

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/v1/sync",
            "/api/v1/init",
            "/api/v1/checkpoint",
            "/api/v1/series",
            "/api/v1/series/cleanup",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
