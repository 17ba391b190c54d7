use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::StoreStats;
use crate::AppState;

use super::error::ApiError;

/// GET /api/admin/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<StoreStats>, ApiError> {
    let stats = StoreStats::collect(&state.db).await?;
    Ok(Json(stats))
}
