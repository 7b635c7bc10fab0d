//! Settings endpoints
//!
//! - `GET  /api/admin/settings` full record, secrets decrypted
//! - `POST /api/admin/settings` merge a partial update
//! - `GET  /api/admin/settings/status` which integrations are configured
//! - `GET  /api/settings` storefront view without secrets or revision

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use http::header;
use shared::error::{AppError, ErrorCode};
use shared::models::settings::{
    SaveSettingsRequest, SaveSettingsResponse, SecretStatusResponse, SettingsEnvelope,
};

use crate::error::ServiceResult;
use crate::state::AppState;
use crate::store::{public_view, split_revision};

/// Admin reads must never be served from a cache
const NO_STORE: &str = "no-store, no-cache, must-revalidate";

/// Storefront reads may be cached but must be revalidated
const REVALIDATE: &str = "public, no-cache";

/// GET /api/admin/settings
pub async fn get_admin_settings(State(state): State<AppState>) -> impl IntoResponse {
    let (settings, revision) = split_revision(state.settings.read(true).await);
    (
        [(header::CACHE_CONTROL, NO_STORE)],
        Json(SettingsEnvelope {
            success: true,
            settings,
            timestamp: chrono::Utc::now(),
            revision: Some(revision),
        }),
    )
}

/// POST /api/admin/settings
pub async fn save_settings(
    State(state): State<AppState>,
    payload: Result<Json<SaveSettingsRequest>, JsonRejection>,
) -> ServiceResult<Json<SaveSettingsResponse>> {
    let Json(req) = payload.map_err(rejection_error)?;
    let outcome = state
        .settings
        .save(&req.settings, req.expected_revision)
        .await?;

    tracing::info!(
        revision = outcome.revision,
        fields = req.settings.len(),
        "Settings saved"
    );

    Ok(Json(SaveSettingsResponse {
        success: true,
        revision: outcome.revision,
    }))
}

fn rejection_error(rejection: JsonRejection) -> AppError {
    let code = match &rejection {
        JsonRejection::JsonDataError(_) => ErrorCode::InvalidSettingValue,
        _ => ErrorCode::InvalidRequest,
    };
    AppError::with_message(code, rejection.body_text())
}

/// GET /api/admin/settings/status
pub async fn secret_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.settings.secret_status().await;
    (
        [(header::CACHE_CONTROL, NO_STORE)],
        Json(SecretStatusResponse {
            success: true,
            status,
        }),
    )
}

/// GET /api/settings
pub async fn get_public_settings(State(state): State<AppState>) -> impl IntoResponse {
    let record = state.settings.read(false).await;
    (
        [(header::CACHE_CONTROL, REVALIDATE)],
        Json(SettingsEnvelope {
            success: true,
            settings: public_view(&record),
            timestamp: chrono::Utc::now(),
            revision: None,
        }),
    )
}
