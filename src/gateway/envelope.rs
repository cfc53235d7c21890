//! Protocol request/response envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayRequest {
    /// Operation to perform.
    pub operation: String,

    /// Operation parameters.
    #[serde(default)]
    pub parameters: Map<String, Value>,

    /// Optional caller context (e.g., per-request credentials).
    #[serde(default)]
    pub context: Option<Value>,
}

impl GatewayRequest {
    pub fn new(operation: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            operation: operation.into(),
            parameters,
            context: None,
        }
    }
}

/// Outbound response envelope: `status` is "success" or "error", with
/// either a data payload or an error code plus message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GatewayResponse {
    pub fn success(data: Value) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error_code: None,
            message: Some("operation completed successfully".to_string()),
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error_code: Some(code.to_string()),
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_parameters_default_to_empty() {
        let request: GatewayRequest =
            serde_json::from_value(json!({"operation": "get_campaigns"})).unwrap();
        assert_eq!(request.operation, "get_campaigns");
        assert!(request.parameters.is_empty());
        assert!(request.context.is_none());
    }

    #[test]
    fn error_envelope_omits_data() {
        let envelope = GatewayResponse::error("rate_limited", "too many requests");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error_code"], "rate_limited");
        assert!(value.get("data").is_none());
    }
}
