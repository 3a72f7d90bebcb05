//! Job status handler.

use axum::{
    extract::{Path, State},
    Json,
};
use soundshift_core::JobRecord;
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

/// Get the queue record of a push-mode job
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    state
        .queue()
        .get(&id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}
