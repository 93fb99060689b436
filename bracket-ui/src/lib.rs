//! bracket-ui library - web front end for bracket voting
//!
//! Serves the single-page UI and a JSON API that feeds user events into
//! per-session bracket state machines.

use axum::Router;
use bracket_common::bracket::EntrantList;
use bracket_common::PersistenceGateway;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod sessions;

pub use error::{ApiError, ApiResult};
pub use sessions::SessionRegistry;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Prediction store shared by all sessions
    pub gateway: PersistenceGateway,
    /// Live bracket sessions keyed by session id
    pub sessions: SessionRegistry,
    /// Entrants every new session starts from
    pub entrants: EntrantList,
    /// Title shown above the bracket
    pub title: String,
}

impl AppState {
    pub fn new(gateway: PersistenceGateway, entrants: EntrantList, title: impl Into<String>) -> Self {
        Self {
            gateway,
            sessions: SessionRegistry::new(),
            entrants,
            title: title.into(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/api/sessions", post(api::create_session))
        .route(
            "/api/sessions/:id",
            get(api::get_session).delete(api::delete_session),
        )
        .route("/api/sessions/:id/events", post(api::post_event))
        .route("/api/predictions", get(api::list_predictions))
        .route("/api/buildinfo", get(api::get_build_info));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .merge(api::health_routes());

    Router::new()
        .merge(api)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
