pub mod capsules;
pub mod catalog;
pub mod error;
pub mod service;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch},
};
use tracing::error;

use crate::error::ApiError;
use crate::service::CapsuleService;

pub type AppState = Arc<CapsuleService>;

/// All `/api` routes. Static front-end serving and CORS are left to the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/capsules", get(capsules::list_capsules).post(capsules::create_capsule))
        .route("/api/capsules/unlocked", get(capsules::list_unlocked))
        .route("/api/capsules/locked", get(capsules::list_locked))
        .route(
            "/api/capsules/{capsule_id}",
            get(capsules::get_capsule).delete(capsules::delete_capsule),
        )
        .route("/api/capsules/{capsule_id}/position", patch(capsules::update_position))
        .route("/api/tags", get(catalog::list_tags))
        .route("/api/stats", get(catalog::stats))
        .with_state(state)
}

/// Runs a store operation off the async runtime; SQLite calls block.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&CapsuleService) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let service = state.clone();
    tokio::task::spawn_blocking(move || f(service.as_ref()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
}
