//! In-memory scene management server.
//!
//! Speaks the scene API's JSON contract (`success` flag on every body,
//! snake_case fields) so the client can be developed and tested without a
//! rendering backend. Previews and exports return placeholder URLs; no files
//! are written.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

pub mod routes;
pub mod storage;
pub mod validate;

use storage::SceneStore;

/// Optional backend features, reported by `/api/health`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub preview: bool,
    pub export: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            preview: true,
            export: true,
        }
    }
}

impl Features {
    /// Read `SCENE_PREVIEW_AVAILABLE` / `SCENE_EXPORT_AVAILABLE` ("0" or "false" disables)
    pub fn from_env() -> Self {
        let enabled = |key: &str| {
            std::env::var(key)
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true)
        };
        Self {
            preview: enabled("SCENE_PREVIEW_AVAILABLE"),
            export: enabled("SCENE_EXPORT_AVAILABLE"),
        }
    }
}

#[derive(Clone, Default)]
pub struct AppState {
    pub store: SceneStore,
    pub features: Features,
}

impl AppState {
    pub fn new(features: Features) -> Self {
        Self {
            store: SceneStore::new(),
            features,
        }
    }
}

/// Build the API router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/scenes", get(routes::list_scenes).post(routes::create_scene))
        .route("/api/scenes/{scene_id}", get(routes::get_scene))
        .route("/api/scenes/{scene_id}/preview", post(routes::generate_preview))
        .route("/api/scenes/{scene_id}/export", post(routes::export_scene))
        .route("/api/scenes/{scene_id}/validate", post(routes::validate_scene))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
