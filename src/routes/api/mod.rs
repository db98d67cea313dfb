pub mod jobs;
pub mod sources;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::ingest::health::HealthEvaluator;
use crate::ingest::runner::SourceRunner;
use crate::ingest::store::{JobStore, SourceRegistry};

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<SourceRunner>,
    pub registry: Arc<dyn SourceRegistry>,
    pub store: Arc<dyn JobStore>,
    pub health: HealthEvaluator,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Jobs
        .route("/jobs", get(jobs::list))
        // Sources
        .route("/sources", get(sources::health))
        .route("/sources/run", post(sources::run_all))
        .route("/sources/{id}/toggle", post(sources::toggle))
        .route("/sources/{id}/run", post(sources::trigger_run))
        .route("/sources/{id}/runs", get(sources::runs))
        .with_state(state);

    Router::new().nest("/api/v1", api)
}
