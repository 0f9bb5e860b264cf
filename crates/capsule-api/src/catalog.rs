use axum::{Json, extract::State, response::IntoResponse};

use capsule_types::api::TagsResponse;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

/// GET /api/tags
pub async fn list_tags(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let tags = run_blocking(&state, |svc| svc.tags()).await?;
    Ok(Json(TagsResponse { tags }))
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = run_blocking(&state, |svc| svc.stats()).await?;
    Ok(Json(stats))
}
