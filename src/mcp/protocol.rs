// src/mcp/protocol.rs — JSON-RPC 2.0 framing for the MCP stdio transport

use serde::Deserialize;
use serde_json::{json, Value};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

/// An incoming request or notification. Notifications carry no `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcMessage {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl RpcMessage {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

pub fn success(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

pub fn error(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() },
    })
}

/// Parse one line of input. On failure returns the error response to send.
pub fn parse(line: &str) -> Result<RpcMessage, Value> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| error(Value::Null, PARSE_ERROR, format!("Parse error: {e}")))?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let msg: RpcMessage = serde_json::from_value(value)
        .map_err(|e| error(id.clone(), INVALID_REQUEST, format!("Invalid request: {e}")))?;
    if msg.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
        return Err(error(id, INVALID_REQUEST, "Unsupported jsonrpc version"));
    }
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let msg = parse(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).unwrap();
        assert_eq!(msg.method, "tools/list");
        assert_eq!(msg.id, Some(json!(1)));
        assert!(!msg.is_notification());
    }

    #[test]
    fn test_parse_notification() {
        let msg = parse(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(msg.is_notification());
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse("{nope").unwrap_err();
        assert_eq!(err["error"]["code"], PARSE_ERROR);
        assert_eq!(err["id"], Value::Null);
    }

    #[test]
    fn test_missing_method_keeps_id() {
        let err = parse(r#"{"jsonrpc":"2.0","id":"abc"}"#).unwrap_err();
        assert_eq!(err["error"]["code"], INVALID_REQUEST);
        assert_eq!(err["id"], "abc");
    }
}
