// Response envelope normalization
//
// Different device tiers answer equivalent endpoints with different
// payload shapes: the classic `{ meta: { rc, msg }, data: [...] }`
// envelope, a bare object, or a bare array. Everything is folded into
// the canonical envelope before the caller sees it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, body_preview};

/// Result code carried in `meta.rc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseCode {
    Ok,
    Error,
}

/// Metadata from the envelope. `rc == ok` means success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub rc: ResponseCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

/// Canonical response envelope.
///
/// ```json
/// { "meta": { "rc": "ok", "msg": "optional" }, "data": [...] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub meta: Meta,
    #[serde(default)]
    pub data: Vec<Value>,
}

impl Envelope {
    /// Build a successful envelope around `data`.
    pub fn ok(data: Vec<Value>) -> Self {
        Self {
            meta: Meta {
                rc: ResponseCode::Ok,
                msg: None,
            },
            data,
        }
    }

    /// Whether this envelope was synthesized from a non-envelope payload.
    pub fn is_synthetic(&self) -> bool {
        self.meta.msg.as_deref() == Some(SYNTHETIC_MSG)
    }

    /// The first data element, or `Value::Null` for an empty list.
    pub fn first(&self) -> &Value {
        self.data.first().unwrap_or(&Value::Null)
    }

    /// Consume into the data payload as a JSON array.
    pub fn into_data(self) -> Value {
        Value::Array(self.data)
    }
}

/// Marker placed in `meta.msg` of synthesized envelopes.
pub const SYNTHETIC_MSG: &str = "normalized";

/// Fold any successful response body into the canonical envelope.
///
/// - canonical envelope with `rc == "ok"`: passed through
/// - canonical envelope with `rc == "error"`: `Error::Controller`
/// - UniFi OS error wrapper `{"error": {"code", "message"}}`: mapped to an error
/// - bare array: becomes the data list
/// - any other value: wrapped as a single-element data list
/// - empty body: empty data list
pub fn normalize_body(body: &str) -> Result<Envelope, Error> {
    if body.trim().is_empty() {
        return Ok(synthetic(Vec::new()));
    }

    let value: Value = serde_json::from_str(body).map_err(|e| {
        let preview = body_preview(body);
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })?;

    normalize(value)
}

/// Value-level variant of [`normalize_body`].
pub fn normalize(value: Value) -> Result<Envelope, Error> {
    if let Some(err) = unifi_os_error(&value) {
        return Err(err);
    }

    if is_canonical(&value) {
        let envelope: Envelope =
            serde_json::from_value(value.clone()).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: value.to_string(),
            })?;
        return match envelope.meta.rc {
            ResponseCode::Ok => Ok(envelope),
            ResponseCode::Error => Err(Error::Controller {
                message: envelope
                    .meta
                    .msg
                    .unwrap_or_else(|| "rc=error".to_owned()),
            }),
        };
    }

    Ok(match value {
        Value::Array(items) => synthetic(items),
        Value::Null => synthetic(Vec::new()),
        other => synthetic(vec![other]),
    })
}

fn synthetic(data: Vec<Value>) -> Envelope {
    Envelope {
        meta: Meta {
            rc: ResponseCode::Ok,
            msg: Some(SYNTHETIC_MSG.to_owned()),
        },
        data,
    }
}

fn is_canonical(value: &Value) -> bool {
    let Some(meta) = value.get("meta").and_then(Value::as_object) else {
        return false;
    };
    matches!(meta.get("rc").and_then(Value::as_str), Some("ok" | "error"))
        && value.get("data").is_none_or(Value::is_array)
}

/// UniFi OS sometimes returns `{"error":{"code":N,"message":"..."}}` with HTTP 200.
fn unifi_os_error(value: &Value) -> Option<Error> {
    let inner = value.get("error")?.as_object()?;
    let code = inner.get("code").and_then(Value::as_u64)?;
    let message = inner
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    Some(if code == 401 {
        Error::Authentication { message }
    } else {
        Error::Controller {
            message: format!("UniFi OS error {code}: {message}"),
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn canonical_envelope_passes_through() {
        let body = json!({ "meta": { "rc": "ok" }, "data": [{ "version": "9.0.114" }] });
        let env = normalize(body).unwrap();
        assert!(!env.is_synthetic());
        assert_eq!(env.data, vec![json!({ "version": "9.0.114" })]);
    }

    #[test]
    fn direct_object_is_wrapped() {
        let env = normalize(json!({ "version": "8.6.9", "hostname": "udm" })).unwrap();
        assert!(env.is_synthetic());
        assert_eq!(env.meta.rc, ResponseCode::Ok);
        assert_eq!(env.data.len(), 1);
        assert_eq!(env.first()["hostname"], "udm");
    }

    #[test]
    fn bare_array_becomes_data() {
        let env = normalize(json!([{ "_id": "a" }, { "_id": "b" }])).unwrap();
        assert_eq!(env.data.len(), 2);
    }

    #[test]
    fn error_envelope_is_an_error() {
        let err = normalize(json!({ "meta": { "rc": "error", "msg": "api.err.NoSiteContext" }, "data": [] }))
            .unwrap_err();
        assert!(matches!(err, Error::Controller { ref message } if message.contains("NoSiteContext")));
    }

    #[test]
    fn unifi_os_wrapper_401_is_auth() {
        let err = normalize(json!({ "error": { "code": 401, "message": "Unauthorized" } })).unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }));
    }

    #[test]
    fn meta_without_rc_is_not_canonical() {
        let env = normalize(json!({ "meta": { "count": 3 }, "items": [] })).unwrap();
        assert!(env.is_synthetic());
        assert_eq!(env.data.len(), 1);
    }

    #[test]
    fn empty_and_invalid_bodies() {
        assert!(normalize_body("").unwrap().data.is_empty());
        assert!(matches!(
            normalize_body("<html>"),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn html_error_page_with_multibyte_text() {
        let body = format!("<html>{}é</html>", "x".repeat(193));
        match normalize_body(&body) {
            Err(Error::Deserialization { message, body: raw }) => {
                assert!(message.contains('é'));
                assert_eq!(raw, body);
            }
            other => panic!("expected Deserialization, got {other:?}"),
        }
    }
}
