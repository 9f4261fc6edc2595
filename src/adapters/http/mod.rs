pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    routing::{get, patch, post},
    Router,
};
use crate::adapters::http::state::HttpState;
use crate::adapters::http::ws::ws_handler;

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/session", get(routes::get_session))
        .route("/api/mode", post(routes::set_mode))
        .route("/api/sidebar/toggle", post(routes::toggle_sidebar))
        .route("/api/frame", get(routes::current_frame))
        .route("/api/frame/reference", get(routes::reference_frame))
        .route(
            "/api/documents/:kind",
            get(routes::get_document)
                .patch(routes::merge_document)
                .put(routes::upload_document),
        )
        .route("/api/documents/:kind/raw", post(routes::raw_edit))
        .route("/api/documents/:kind/save", post(routes::save_document))
        .route("/api/documents/:kind/reload", post(routes::reload_document))
        .route("/api/editor/scene", get(routes::get_scene))
        .route("/api/editor/select", post(routes::select))
        .route("/api/editor/pointer", post(routes::pointer))
        .route("/api/editor/wheel", post(routes::wheel))
        .route("/api/editor/resize", post(routes::resize))
        .route("/api/editor/part", patch(routes::patch_part))
        .route("/api/save-json", post(routes::save_json))
        .route("/ws/camera", get(ws_handler))
        .with_state(state)
}
