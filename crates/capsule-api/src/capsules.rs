use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

use capsule_types::api::{
    CapsulesResponse, CreateCapsuleRequest, CreateCapsuleResponse, LimitQuery, ListCapsulesQuery,
    MessageResponse, UpdatePositionRequest,
};

use crate::error::ApiError;
use crate::{AppState, run_blocking};

fn bad_query(rejection: QueryRejection) -> ApiError {
    warn!("Rejected query string: {}", rejection.body_text());
    ApiError::validation("Invalid query parameters")
}

/// GET /api/capsules: public capsules, filtered and paginated.
pub async fn list_capsules(
    State(state): State<AppState>,
    query: Result<Query<ListCapsulesQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(bad_query)?;
    let page = run_blocking(&state, move |svc| svc.list(query)).await?;
    Ok(Json(page))
}

/// GET /api/capsules/unlocked: the collage feed, content included.
pub async fn list_unlocked(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(bad_query)?;
    let capsules = run_blocking(&state, move |svc| svc.list_unlocked(query.limit)).await?;
    Ok(Json(CapsulesResponse { capsules }))
}

/// GET /api/capsules/locked: upcoming unlocks with their countdowns.
pub async fn list_locked(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(bad_query)?;
    let capsules = run_blocking(&state, move |svc| svc.list_locked(query.limit)).await?;
    Ok(Json(CapsulesResponse { capsules }))
}

pub async fn get_capsule(
    State(state): State<AppState>,
    Path(capsule_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let capsule = run_blocking(&state, move |svc| svc.get(&capsule_id)).await?;
    Ok(Json(capsule))
}

pub async fn create_capsule(
    State(state): State<AppState>,
    body: Result<Json<CreateCapsuleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|rejection| {
        warn!("Rejected capsule body: {}", rejection.body_text());
        ApiError::validation("No data provided")
    })?;

    let capsule = run_blocking(&state, move |svc| svc.create(req))
        .await
        .inspect_err(|e| {
            if let ApiError::Validation(msg) = e {
                warn!("Capsule rejected: {}", msg);
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCapsuleResponse {
            message: "Capsule created successfully".to_string(),
            capsule,
        }),
    ))
}

pub async fn delete_capsule(
    State(state): State<AppState>,
    Path(capsule_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |svc| svc.delete(&capsule_id)).await?;
    Ok(Json(MessageResponse {
        message: "Capsule deleted successfully".to_string(),
    }))
}

/// PATCH /api/capsules/{id}/position: drag a capsule around the collage.
pub async fn update_position(
    State(state): State<AppState>,
    Path(capsule_id): Path<String>,
    body: Result<Json<UpdatePositionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|rejection| {
        warn!("Rejected position body: {}", rejection.body_text());
        ApiError::validation("Invalid position data")
    })?;

    let capsule = run_blocking(&state, move |svc| svc.update_position(&capsule_id, req.into())).await?;
    Ok(Json(capsule))
}
