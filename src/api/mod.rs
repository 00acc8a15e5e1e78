pub mod auth;
mod course_templates;
pub mod error;
mod extract;
pub mod media;
mod privacy_masks;
mod validation;
mod walk_sessions;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::CorsConfig;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes; me and logout read the token themselves
    let auth_routes = Router::new()
        .route("/register/", post(auth::register))
        .route("/login/", post(auth::login))
        .route("/logout/", post(auth::logout))
        .route("/me/", get(auth::me));

    // Catalog routes; reads are open to anonymous callers, writes take a token
    let catalog_routes = Router::new()
        .route("/course-modes/", get(course_templates::list_modes))
        .route(
            "/course-templates/",
            get(course_templates::list_templates).post(course_templates::create_template),
        )
        .route(
            "/course-templates/:id/",
            get(course_templates::get_template)
                .put(course_templates::update_template)
                .delete(course_templates::delete_template),
        );

    // Protected API routes
    let api_routes = Router::new()
        // Walk sessions
        .route(
            "/walk-sessions/",
            get(walk_sessions::list_sessions).post(walk_sessions::create_session),
        )
        .route(
            "/walk-sessions/:id/",
            get(walk_sessions::get_session)
                .put(walk_sessions::update_session)
                .delete(walk_sessions::delete_session),
        )
        .route("/walk-sessions/:id/finish/", post(walk_sessions::finish_session))
        .route(
            "/walk-sessions/:id/spot-visits/",
            get(walk_sessions::list_spot_visits).post(walk_sessions::add_spot_visit),
        )
        .route(
            "/walk-sessions/:id/photos/",
            get(walk_sessions::list_photos).post(walk_sessions::add_photo),
        )
        // Privacy masks
        .route(
            "/user-privacy-masks/",
            get(privacy_masks::list_masks).post(privacy_masks::create_mask),
        )
        .route(
            "/user-privacy-masks/:id/",
            get(privacy_masks::get_mask)
                .put(privacy_masks::update_mask)
                .delete(privacy_masks::delete_mask),
        )
        // Protected by auth
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let media = ServeDir::new(&state.config.server.upload_dir);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", catalog_routes.merge(api_routes))
        .nest_service("/media", media)
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes))
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Permissive when no origins are configured
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
