//! Storefront Settings Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single settings value
///
/// The record is flat apart from the logo, which is stored as a nested map
/// (`{"url": ..., "width": ...}`). Arrays and `null` are not valid values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Map(BTreeMap<String, SettingValue>),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// `""` counts as "no value" for protected fields
    pub fn is_empty_text(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u64> for SettingValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

/// The persisted storefront settings (field name → value)
pub type SettingsRecord = BTreeMap<String, SettingValue>;

/// Incoming partial update
///
/// A missing key leaves the field alone, an explicit JSON `null` is `None`.
pub type SettingsPatch = BTreeMap<String, Option<SettingValue>>;

/// Read endpoint response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsEnvelope {
    pub success: bool,
    pub settings: SettingsRecord,
    /// Server time, RFC 3339 on the wire
    pub timestamp: DateTime<Utc>,
    /// Stored revision; admin reads only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

/// Write endpoint request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSettingsRequest {
    pub settings: SettingsPatch,
    /// Revision the editor loaded; omit for last-write-wins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_revision: Option<u64>,
}

/// Write endpoint response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSettingsResponse {
    pub success: bool,
    pub revision: u64,
}

/// Which secrets are configured, without revealing them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretStatus {
    pub paypal_configured: bool,
    pub telegram_configured: bool,
    pub using_development_key: bool,
}

/// Status endpoint response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretStatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub status: SecretStatus,
}
