//! Unified service-layer error type
//!
//! `ServiceError` bridges store errors (`StoreError`) and the API-layer
//! error (`AppError`), so handlers can use `?` on store calls.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::store::{KvError, StoreError};

/// Service-layer error
///
/// - `Store`: persistence errors (infrastructure ones are auto-logged)
/// - `App`: business-rule errors (transparent pass-through to client)
#[derive(Debug)]
pub enum ServiceError {
    Store(StoreError),
    App(AppError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Store(StoreError::RevisionConflict { expected, actual }) => {
                AppError::revision_conflict(expected, actual)
            }
            ServiceError::Store(
                err @ StoreError::Backend {
                    source: KvError::Timeout,
                    ..
                },
            ) => {
                tracing::error!(error = %err, "Settings store timed out");
                AppError::new(ErrorCode::TimeoutError)
            }
            ServiceError::Store(err) => {
                tracing::error!(error = %err, "Settings store error");
                AppError::new(ErrorCode::SettingsSaveFailed)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;
