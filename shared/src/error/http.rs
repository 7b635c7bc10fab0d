//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::SettingsRevisionConflict => StatusCode::CONFLICT,

            Self::InvalidSettingValue => StatusCode::UNPROCESSABLE_ENTITY,

            Self::NotAuthenticated | Self::TokenInvalid => StatusCode::UNAUTHORIZED,

            // Transient, client can retry
            Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            Self::SettingsSaveFailed => StatusCode::INTERNAL_SERVER_ERROR,

            Self::InvalidRequest => StatusCode::BAD_REQUEST,
        }
    }
}
