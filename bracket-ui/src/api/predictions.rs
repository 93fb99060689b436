//! Stored prediction listing
//!
//! Raw rows only, oldest first; no aggregation.

use axum::{
    extract::{Query, State},
    Json,
};
use bracket_common::PredictionRecord;
use serde::{Deserialize, Serialize};

use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct PredictionQuery {
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictionsResponse {
    pub count: usize,
    pub records: Vec<PredictionRecord>,
}

/// GET /api/predictions?username=
pub async fn list_predictions(
    State(state): State<AppState>,
    Query(query): Query<PredictionQuery>,
) -> ApiResult<Json<PredictionsResponse>> {
    let username = query
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    let records = state.gateway.history(username).await?;
    Ok(Json(PredictionsResponse {
        count: records.len(),
        records,
    }))
}
