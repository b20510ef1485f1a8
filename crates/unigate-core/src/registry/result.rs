// Invocation results: what `Dispatcher::invoke` hands back, success or not.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{CoreError, ErrorKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationError {
    pub code: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationMetadata {
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<InvocationError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub metadata: InvocationMetadata,
}

impl InvocationResult {
    pub fn ok(data: Value, warnings: Vec<String>, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            warnings,
            metadata: InvocationMetadata {
                execution_time_ms,
                timestamp: Utc::now(),
            },
        }
    }

    pub fn failed(err: &CoreError, warnings: Vec<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(InvocationError {
                code: err.kind(),
                message: err.to_string(),
                details: err.details(),
            }),
            warnings,
            metadata: InvocationMetadata {
                execution_time_ms,
                timestamp: Utc::now(),
            },
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.code)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_shape() {
        let ok = serde_json::to_value(InvocationResult::ok(json!([1]), vec![], 12)).unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["data"], json!([1]));
        assert_eq!(ok["metadata"]["executionTimeMs"], 12);
        assert!(ok.get("error").is_none());
        assert!(ok.get("warnings").is_none());

        let err = CoreError::OperationNotFound {
            name: "nope".into(),
        };
        let failed = serde_json::to_value(InvocationResult::failed(&err, vec![], 0)).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"]["code"], "OPERATION_NOT_FOUND");
        assert_eq!(failed["error"]["message"], "Operation 'nope' not found");
    }
}
