use axum::Json;
use axum::extract::{Query, State};

use crate::error::AppError;
use crate::models::job::{Job, JobFilters};
use crate::routes::api::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<JobFilters>,
) -> Result<Json<Vec<Job>>, AppError> {
    let jobs = state.store.list_jobs(&filters).await?;
    Ok(Json(jobs))
}
