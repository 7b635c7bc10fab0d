//! API routes for usmn-cloud

pub mod health;
pub mod settings;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::admin_auth_middleware;
use crate::state::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Admin settings (bearer token)
    let admin = Router::new()
        .route(
            "/api/admin/settings",
            get(settings::get_admin_settings).post(settings::save_settings),
        )
        .route("/api/admin/settings/status", get(settings::secret_status))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    // Storefront (no auth)
    let public = Router::new().route("/api/settings", get(settings::get_public_settings));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(public)
        .merge(admin)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
