// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification payload decoding.

use serde_json::Value;

/// What a notification row asks to send.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    pub message: String,
    /// Per-send provider fields. Always a JSON object.
    pub extra: Value,
}

impl NotificationPayload {
    /// Decode a stored payload.
    ///
    /// A JSON object contributes its `message` (or `text`) and `extra`
    /// members; anything else is sent verbatim as the message.
    pub fn parse(raw: &str) -> Self {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
            let message = map
                .get("message")
                .or_else(|| map.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let extra = match map.get("extra") {
                Some(Value::Object(extra)) => Value::Object(extra.clone()),
                _ => Value::Object(Default::default()),
            };
            return Self { message, extra };
        }
        Self {
            message: raw.to_string(),
            extra: Value::Object(Default::default()),
        }
    }
}

/// Overlay `overrides` onto `base`. Both are expected to be objects;
/// a non-object `overrides` leaves `base` untouched.
pub fn merge_extra(base: &Value, overrides: &Value) -> Value {
    let mut merged = match base {
        Value::Object(map) => map.clone(),
        _ => Default::default(),
    };
    if let Value::Object(overrides) = overrides {
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

/// Read a non-blank string member of `extra`.
pub fn extra_str<'a>(extra: &'a Value, key: &str) -> Option<&'a str> {
    extra
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
