// src/mcp/protocol.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
}

fn default_jsonrpc() -> String {
    JSONRPC_VERSION.to_string()
}

impl Request {
    pub fn is_notification(&self) -> bool {
        self.id.is_null()
    }
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(ErrorObject { code, message }),
        }
    }
}

/// `params` of a `tools/call` request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl ToolCallParams {
    /// The raw argument string for the tool.
    ///
    /// Accepts `{"input": "..."}`, a bare JSON string, or nothing at all (empty input).
    /// Only `input` may appear in the object; anything else is rejected rather than
    /// silently treated as empty input.
    pub fn input(&self) -> Result<String, String> {
        const SHAPE: &str = "'arguments' must be {\"input\": \"<space-separated arguments>\"}";

        match &self.arguments {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Object(map)) => {
                if let Some(key) = map.keys().find(|k| k.as_str() != "input") {
                    return Err(format!("{}; unexpected field '{}'", SHAPE, key));
                }
                match map.get("input") {
                    None | Some(Value::Null) => Ok(String::new()),
                    Some(Value::String(s)) => Ok(s.clone()),
                    Some(_) => Err(SHAPE.into()),
                }
            }
            Some(_) => Err("'arguments' must be an object or a string".into()),
        }
    }
}

/// Text content item of a tool result.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    pub content: Vec<TextContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text".to_string(),
                text,
            }],
            is_error,
        }
    }
}

// Standard JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(arguments: Value) -> ToolCallParams {
        serde_json::from_value(json!({"name": "withdraw", "arguments": arguments})).unwrap()
    }

    #[test]
    fn input_accepts_object_string_or_nothing() {
        assert_eq!(params(json!({"input": "0xabc 0.1"})).input().unwrap(), "0xabc 0.1");
        assert_eq!(params(json!("0xabc 0.1")).input().unwrap(), "0xabc 0.1");
        assert_eq!(params(json!({})).input().unwrap(), "");
        assert_eq!(params(Value::Null).input().unwrap(), "");

        let bare: ToolCallParams = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert_eq!(bare.input().unwrap(), "");
    }

    #[test]
    fn input_rejects_unexpected_shapes() {
        assert!(params(json!({"input": 5})).input().is_err());
        assert!(params(json!({"to": "0xabc", "amount": "1"})).input().is_err());
        assert!(params(json!({"foo": "x"})).input().is_err());
        assert!(params(json!({"input": "0.1", "value": "1"})).input().is_err());
        assert_eq!(params(json!({"input": null})).input().unwrap(), "");
        assert!(params(json!([1, 2])).input().is_err());
    }
}
