//! Bracket session endpoints
//!
//! - `POST /api/sessions` starts a session (201)
//! - `GET /api/sessions/:id` returns the current view
//! - `POST /api/sessions/:id/events` applies one [`BracketEvent`]
//! - `DELETE /api/sessions/:id` ends the session (204)

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use bracket_common::bracket::dispatch;
use bracket_common::{BracketEvent, BracketSession, BracketView};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{ApiError, ApiResult, AppState};

/// Session view returned by every session endpoint
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub title: String,
    pub view: BracketView,
}

impl SessionResponse {
    fn new(state: &AppState, session_id: Uuid, view: BracketView) -> Self {
        Self {
            session_id,
            title: state.title.clone(),
            view,
        }
    }
}

/// POST /api/sessions
///
/// Confirms the predictions table exists before handing out a session.
pub async fn create_session(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    state.gateway.ensure_schema().await?;

    let session = BracketSession::new(state.entrants.clone())?;
    let view = session.view();
    let session_id = state.sessions.insert(session).await;
    info!("Session {} started", session_id);

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new(&state, session_id, view)),
    ))
}

/// GET /api/sessions/:id
///
/// Viewing counts as activity for idle reaping.
pub async fn get_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<SessionResponse>> {
    let Path(session_id) = path?;
    let guard = state
        .sessions
        .acquire(&session_id)
        .await
        .ok_or(ApiError::SessionNotFound(session_id))?;

    let view = guard.session.view();
    Ok(Json(SessionResponse::new(&state, session_id, view)))
}

/// POST /api/sessions/:id/events
pub async fn post_event(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<BracketEvent>, JsonRejection>,
) -> ApiResult<Json<SessionResponse>> {
    let Path(session_id) = path?;
    let Json(event) = payload?;

    let mut guard = state
        .sessions
        .acquire(&session_id)
        .await
        .ok_or(ApiError::SessionNotFound(session_id))?;
    debug!("Session {} event {:?}", session_id, event);

    let view = dispatch(&mut guard.session, &state.gateway, event).await?;
    Ok(Json(SessionResponse::new(&state, session_id, view)))
}

/// DELETE /api/sessions/:id
///
/// Ends the session; stored predictions are untouched.
pub async fn delete_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(session_id) = path?;
    if state.sessions.remove(&session_id).await {
        info!("Session {} ended", session_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(session_id))
    }
}
