//! Field catalogue
//!
//! The protected list is a public contract: admin UIs rely on these fields
//! surviving a save that sends them blank.

use crate::models::settings::{SettingValue, SettingsRecord};

/// Fields an incoming `undefined`/`null`/`""` must never clear
pub const DEFAULT_PROTECTED_FIELDS: [&str; 10] = [
    "paypalClientId",
    "paypalClientSecret",
    "telegramBotToken",
    "telegramChatId",
    "contactEmail",
    "contactPhone",
    "contactAddress",
    "businessHours",
    "currency",
    "cryptoEnabled",
];

/// Feature toggles, always a concrete boolean after a merge
pub const TOGGLE_FIELDS: [&str; 4] = [
    "paypalEnabled",
    "cryptoEnabled",
    "autoApproveOrders",
    "emailNotifications",
];

/// Fields encrypted at rest
pub const SECRET_FIELDS: [&str; 2] = ["paypalClientSecret", "telegramBotToken"];

/// Companion-key suffix requesting deletion of a field
pub const REMOVE_SUFFIX: &str = "_remove";

/// Server-maintained save counter stored alongside the settings
pub const REVISION_FIELD: &str = "_revision";

/// Record served when no backend holds any settings
pub fn cold_store_defaults() -> SettingsRecord {
    SettingsRecord::from([
        ("paypalEnabled".to_string(), SettingValue::Bool(false)),
        ("cryptoEnabled".to_string(), SettingValue::Bool(false)),
        ("websiteName".to_string(), SettingValue::from("US Mobile Networks")),
        ("paypalMode".to_string(), SettingValue::from("sandbox")),
        ("cryptoGateway".to_string(), SettingValue::from("manual")),
    ])
}

/// Current save counter of a stored record (0 if never saved)
pub fn revision_of(record: &SettingsRecord) -> u64 {
    record
        .get(REVISION_FIELD)
        .and_then(SettingValue::as_u64)
        .unwrap_or(0)
}
