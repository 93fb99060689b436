//! HTTP API handlers for bracket-ui

pub mod buildinfo;
pub mod health;
pub mod predictions;
pub mod sessions;
pub mod ui;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use predictions::list_predictions;
pub use sessions::{create_session, delete_session, get_session, post_event};
pub use ui::{serve_app_js, serve_index};
