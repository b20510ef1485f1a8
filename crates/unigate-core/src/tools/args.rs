// Argument extraction for handlers. Shapes are already checked against the
// input schema; these helpers enforce value-level rules.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::CoreError;

static MAC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{2}([:-][0-9A-Fa-f]{2}){5}$").expect("valid MAC regex")
});

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::Validation {
        message: message.into(),
    }
}

pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, CoreError> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(invalid(format!("argument '{key}' must not be empty"))),
        Some(Value::Null) | None => Err(invalid(format!("missing required argument '{key}'"))),
        Some(_) => Err(invalid(format!("argument '{key}' must be a string"))),
    }
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, CoreError> {
    match args.get(key) {
        Some(Value::Null) | None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(invalid(format!("argument '{key}' must be a string"))),
    }
}

pub(crate) fn optional_u64(args: &Value, key: &str) -> Result<Option<u64>, CoreError> {
    match args.get(key) {
        Some(Value::Null) | None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(format!("argument '{key}' must be a non-negative integer"))),
    }
}

/// MAC address, normalized to lowercase colon form.
pub(crate) fn mac(args: &Value, key: &str) -> Result<String, CoreError> {
    let raw = required_str(args, key)?;
    if !MAC.is_match(raw) {
        return Err(invalid(format!("argument '{key}' is not a MAC address: {raw}")));
    }
    Ok(raw.replace('-', ":").to_lowercase())
}

/// 802.1Q VLAN id.
pub(crate) fn vlan(args: &Value, key: &str) -> Result<Option<u16>, CoreError> {
    match optional_u64(args, key)? {
        None => Ok(None),
        Some(id @ 1..=4094) => Ok(u16::try_from(id).ok()),
        Some(id) => Err(invalid(format!("argument '{key}' must be between 1 and 4094, got {id}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn mac_normalization() {
        let args = json!({ "mac": "AA-BB-CC-00-11-22" });
        assert_eq!(mac(&args, "mac").unwrap(), "aa:bb:cc:00:11:22");
        assert!(mac(&json!({ "mac": "not-a-mac" }), "mac").is_err());
        assert!(mac(&json!({}), "mac").is_err());
    }

    #[test]
    fn vlan_bounds() {
        assert_eq!(vlan(&json!({ "vlan": 10 }), "vlan").unwrap(), Some(10));
        assert_eq!(vlan(&json!({}), "vlan").unwrap(), None);
        assert!(vlan(&json!({ "vlan": 0 }), "vlan").is_err());
        assert!(vlan(&json!({ "vlan": 4095 }), "vlan").is_err());
        assert!(vlan(&json!({ "vlan": -3 }), "vlan").is_err());
    }

    #[test]
    fn strings() {
        let args = json!({ "name": "  ", "purpose": 3 });
        assert!(required_str(&args, "name").is_err());
        assert!(optional_str(&args, "purpose").is_err());
        assert_eq!(optional_str(&args, "missing").unwrap(), None);
    }
}
