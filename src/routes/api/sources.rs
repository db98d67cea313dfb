use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;

use crate::error::AppError;
use crate::ingest::health::{SourceHealth, health_listing};
use crate::ingest::runner::RunDispatch;
use crate::models::job_source::JobSource;
use crate::models::run_record::RunRecord;
use crate::routes::api::AppState;

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<i64>,
}

pub async fn health(State(state): State<AppState>) -> Result<Json<Vec<SourceHealth>>, AppError> {
    let listing = health_listing(
        state.registry.as_ref(),
        state.store.as_ref(),
        &state.health,
        Utc::now(),
    )
    .await?;
    Ok(Json(listing))
}

pub async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<JobSource>, AppError> {
    let source = state
        .registry
        .toggle_source(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job source {id} not found")))?;
    tracing::info!(
        "Source {id} {}",
        if source.is_enabled { "enabled" } else { "disabled" }
    );
    Ok(Json(source))
}

/// POST /api/v1/sources/{id}/run
///
/// Dispatches a background run and answers immediately. The outcome is only
/// visible through the run history.
pub async fn trigger_run(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<RunDispatch>), AppError> {
    let dispatch = state.runner.trigger_source_run(id).await?;
    Ok((StatusCode::ACCEPTED, Json(dispatch)))
}

pub async fn run_all(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    state.runner.trigger_all();
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "dispatched" })),
    )
}

pub async fn runs(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<RunRecord>>, AppError> {
    if state.registry.get_source(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Job source {id} not found")));
    }
    let limit = query.limit.unwrap_or(20).clamp(1, 200);
    let runs = state.store.recent_run_records(id, limit).await?;
    Ok(Json(runs))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::ingest::health::HealthEvaluator;
    use crate::ingest::runner::RunnerSettings;
    use crate::ingest::runner::tests::{Script, ashby_posting, ashby_source, setup};
    use crate::routes::api::router;

    fn app(sources: Vec<JobSource>) -> (axum::Router, Arc<crate::ingest::runner::tests::ScriptedFetcher>) {
        let (runner, store, fetcher) = setup(sources, RunnerSettings::default());
        let state = AppState {
            runner,
            registry: store.clone(),
            store,
            health: HealthEvaluator::default(),
        };
        (router(state), fetcher)
    }

    async fn send(app: axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_rerun_of_disabled_source_is_bad_request() {
        let (app, fetcher) = app(vec![ashby_source(1, false)]);
        let (status, body) = send(app, "POST", "/api/v1/sources/1/run").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("disabled"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rerun_of_unknown_source_is_not_found() {
        let (app, _) = app(vec![]);
        let (status, _) = send(app, "POST", "/api/v1/sources/42/run").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rerun_is_accepted() {
        let (app, fetcher) = app(vec![ashby_source(1, true)]);
        fetcher.script(1, Script::Postings(vec![ashby_posting("a", true, true)]));
        let (status, body) = send(app, "POST", "/api/v1/sources/1/run").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "dispatched");
        assert_eq!(body["source_id"], 1);
    }

    #[tokio::test]
    async fn test_toggle_then_health_listing() {
        let (app, _) = app(vec![ashby_source(1, true)]);
        let (status, body) = send(app.clone(), "POST", "/api/v1/sources/1/toggle").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_enabled"], false);

        let (status, body) = send(app, "GET", "/api/v1/sources").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["health"], "Unknown");
        assert_eq!(body[0]["source"]["provider_type"], "ashby");
        assert!(body[0]["latest_run"].is_null());
    }
}
