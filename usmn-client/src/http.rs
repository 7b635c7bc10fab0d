//! HTTP client for the settings API

use crate::{ClientConfig, ClientError, ClientResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::error::ApiResponse;
use shared::models::settings::{
    SaveSettingsRequest, SaveSettingsResponse, SecretStatus, SecretStatusResponse,
    SettingsEnvelope, SettingsPatch,
};

/// HTTP client for making requests to usmn-cloud
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.authorized(self.client.get(self.url(path)));
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let request = self.authorized(self.client.post(self.url(path)).json(body));
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            // Prefer the server's message over the raw body
            let message = serde_json::from_str::<ApiResponse>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(message)),
                StatusCode::CONFLICT => Err(ClientError::Conflict(message)),
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    Err(ClientError::Validation(message))
                }
                StatusCode::SERVICE_UNAVAILABLE => Err(ClientError::Unavailable(message)),
                _ => Err(ClientError::Internal(message)),
            };
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // ========== Settings API ==========

    /// Fetch the full admin settings record, bypassing any HTTP cache
    pub async fn fetch_settings(&self) -> ClientResult<SettingsEnvelope> {
        let path = format!(
            "api/admin/settings?_t={}",
            chrono::Utc::now().timestamp_millis()
        );
        let request = self
            .authorized(self.client.get(self.url(&path)))
            .header(reqwest::header::CACHE_CONTROL, "no-cache");
        let response = request.send().await?;
        let envelope: SettingsEnvelope = Self::handle_response(response).await?;

        if !envelope.success {
            return Err(ClientError::InvalidResponse(
                "Settings read was not successful".to_string(),
            ));
        }
        Ok(envelope)
    }

    /// Fetch the storefront view (no secrets, no token needed)
    pub async fn fetch_public_settings(&self) -> ClientResult<SettingsEnvelope> {
        self.get("api/settings").await
    }

    /// Save a partial update
    ///
    /// Pass the revision the editor loaded to get [`ClientError::Conflict`]
    /// instead of overwriting someone else's save.
    pub async fn save_settings(
        &self,
        settings: SettingsPatch,
        expected_revision: Option<u64>,
    ) -> ClientResult<SaveSettingsResponse> {
        let request = SaveSettingsRequest {
            settings,
            expected_revision,
        };
        self.post("api/admin/settings", &request).await
    }

    /// Which integrations have credentials configured
    pub async fn secret_status(&self) -> ClientResult<SecretStatus> {
        self.get::<SecretStatusResponse>("api/admin/settings/status")
            .await
            .map(|body| body.status)
    }
}
