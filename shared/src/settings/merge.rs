//! Settings merge resolver
//!
//! Applies an admin's partial update on top of the stored record:
//!
//! - `<field>_remove: true` deletes `<field>`, whatever else the payload says
//! - other `*_remove` keys are metadata and ignored
//! - protected fields sent as `null` or `""` keep the stored value
//! - everything else overwrites (unprotected `null` removes the field)
//! - the four toggles always come out as a concrete boolean

use std::collections::HashSet;

use super::fields::{DEFAULT_PROTECTED_FIELDS, REMOVE_SUFFIX, TOGGLE_FIELDS};
use crate::models::settings::{SettingValue, SettingsPatch, SettingsRecord};

/// Merge `payload` into `server`, returning the new record
///
/// `extra_protected` extends [`DEFAULT_PROTECTED_FIELDS`]. Neither input is
/// modified, and the result does not depend on payload key order.
pub fn merge_settings(
    server: &SettingsRecord,
    payload: &SettingsPatch,
    extra_protected: &[&str],
) -> SettingsRecord {
    let protected: HashSet<&str> = DEFAULT_PROTECTED_FIELDS
        .iter()
        .chain(extra_protected.iter())
        .copied()
        .collect();

    let mut merged = server.clone();
    let mut removals = Vec::new();

    for (key, value) in payload {
        if let Some(name) = key.strip_suffix(REMOVE_SUFFIX) {
            if matches!(value, Some(SettingValue::Bool(true))) {
                removals.push(name);
            }
            continue;
        }

        let is_protected = protected.contains(key.as_str());
        match value {
            None if is_protected => {}
            Some(v) if is_protected && v.is_empty_text() => {}
            None => {
                merged.remove(key);
            }
            Some(v) => {
                merged.insert(key.clone(), v.clone());
            }
        }
    }

    // Deletions win over a value sent for the same field
    for name in removals {
        merged.remove(name);
    }

    for toggle in TOGGLE_FIELDS {
        let resolved = payload
            .get(toggle)
            .and_then(Option::as_ref)
            .and_then(SettingValue::as_bool)
            .or_else(|| server.get(toggle).and_then(SettingValue::as_bool))
            .unwrap_or(false);
        merged.insert(toggle.to_string(), SettingValue::Bool(resolved));
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entries: &[(&str, SettingValue)]) -> SettingsRecord {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn patch(entries: &[(&str, Option<SettingValue>)]) -> SettingsPatch {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_protected_field_kept_on_empty_string() {
        let server = record(&[("paypalClientId", "A".into())]);
        let merged = merge_settings(&server, &patch(&[("paypalClientId", Some("".into()))]), &[]);
        assert_eq!(merged["paypalClientId"].as_str(), Some("A"));
    }

    #[test]
    fn test_protected_field_kept_on_null() {
        let server = record(&[("telegramBotToken", "123:abc".into())]);
        let merged = merge_settings(&server, &patch(&[("telegramBotToken", None)]), &[]);
        assert_eq!(merged["telegramBotToken"].as_str(), Some("123:abc"));
    }

    #[test]
    fn test_protected_field_kept_when_missing() {
        let server = record(&[("contactEmail", "ops@example.com".into())]);
        let merged = merge_settings(&server, &patch(&[("websiteName", Some("Shop".into()))]), &[]);
        assert_eq!(merged["contactEmail"].as_str(), Some("ops@example.com"));
        assert_eq!(merged["websiteName"].as_str(), Some("Shop"));
    }

    #[test]
    fn test_explicit_override() {
        let server = record(&[("paypalClientId", "A".into())]);
        let merged = merge_settings(&server, &patch(&[("paypalClientId", Some("B".into()))]), &[]);
        assert_eq!(merged["paypalClientId"].as_str(), Some("B"));
    }

    #[test]
    fn test_explicit_removal() {
        let server = record(&[("paypalClientId", "A".into())]);
        let merged = merge_settings(
            &server,
            &patch(&[("paypalClientId_remove", Some(true.into()))]),
            &[],
        );
        assert!(!merged.contains_key("paypalClientId"));
        assert!(!merged.contains_key("paypalClientId_remove"));
    }

    #[test]
    fn test_removal_wins_over_value() {
        let server = record(&[("currency", "USD".into())]);
        let merged = merge_settings(
            &server,
            &patch(&[
                ("currency", Some("EUR".into())),
                ("currency_remove", Some(true.into())),
            ]),
            &[],
        );
        assert!(!merged.contains_key("currency"));
    }

    #[test]
    fn test_remove_flag_not_true_is_ignored() {
        let server = record(&[("currency", "USD".into())]);
        let merged = merge_settings(
            &server,
            &patch(&[
                ("currency_remove", Some(false.into())),
                ("contactPhone_remove", Some("true".into())),
            ]),
            &[],
        );
        assert_eq!(merged["currency"].as_str(), Some("USD"));
        assert!(!merged.contains_key("currency_remove"));
        assert!(!merged.contains_key("contactPhone_remove"));
    }

    #[test]
    fn test_toggles_default_false() {
        let merged = merge_settings(&SettingsRecord::new(), &SettingsPatch::new(), &[]);
        assert_eq!(merged.len(), TOGGLE_FIELDS.len());
        for toggle in TOGGLE_FIELDS {
            assert_eq!(merged[toggle], SettingValue::Bool(false), "{toggle}");
        }
    }

    #[test]
    fn test_toggles_prefer_payload_then_server() {
        let server = record(&[
            ("paypalEnabled", true.into()),
            ("autoApproveOrders", true.into()),
        ]);
        let merged = merge_settings(
            &server,
            &patch(&[
                ("paypalEnabled", Some(false.into())),
                ("emailNotifications", Some(true.into())),
            ]),
            &[],
        );
        assert_eq!(merged["paypalEnabled"], SettingValue::Bool(false));
        assert_eq!(merged["autoApproveOrders"], SettingValue::Bool(true));
        assert_eq!(merged["emailNotifications"], SettingValue::Bool(true));
        assert_eq!(merged["cryptoEnabled"], SettingValue::Bool(false));
    }

    #[test]
    fn test_unprotected_empty_string_passes_through() {
        let server = record(&[("websiteTagline", "Fast plans".into())]);
        let merged = merge_settings(&server, &patch(&[("websiteTagline", Some("".into()))]), &[]);
        assert_eq!(merged["websiteTagline"].as_str(), Some(""));
    }

    #[test]
    fn test_unprotected_null_removes() {
        let server = record(&[("heroImage", "/hero.jpg".into())]);
        let merged = merge_settings(&server, &patch(&[("heroImage", None)]), &[]);
        assert!(!merged.contains_key("heroImage"));
    }

    #[test]
    fn test_extra_protected_fields() {
        let server = record(&[("walletAddress", "bc1q".into())]);
        let payload = patch(&[("walletAddress", Some("".into()))]);

        let merged = merge_settings(&server, &payload, &["walletAddress"]);
        assert_eq!(merged["walletAddress"].as_str(), Some("bc1q"));

        let merged = merge_settings(&server, &payload, &[]);
        assert_eq!(merged["walletAddress"].as_str(), Some(""));
    }

    #[test]
    fn test_new_keys_added() {
        let merged = merge_settings(
            &SettingsRecord::new(),
            &patch(&[("paypalClientId", Some("A".into()))]),
            &[],
        );
        assert_eq!(merged["paypalClientId"].as_str(), Some("A"));
    }

    #[test]
    fn test_inputs_untouched() {
        let server = record(&[("currency", "USD".into())]);
        let payload = patch(&[("currency_remove", Some(true.into()))]);
        let server_before = server.clone();
        let payload_before = payload.clone();

        let _ = merge_settings(&server, &payload, &[]);
        assert_eq!(server, server_before);
        assert_eq!(payload, payload_before);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let server = record(&[("paypalClientId", "A".into()), ("websiteName", "X".into())]);
        let payload = patch(&[
            ("websiteName", Some("Y".into())),
            ("paypalClientId", Some("".into())),
        ]);
        let once = merge_settings(&server, &payload, &[]);
        let twice = merge_settings(&once, &payload, &[]);
        assert_eq!(once, twice);
    }
}
