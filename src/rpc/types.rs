//! JSON-RPC envelope types and transport errors.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// JSON-RPC protocol version sent on every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// An outbound JSON-RPC request.
///
/// Parameters are positional `serde_json::Value`s, so any JSON kind can be
/// forwarded without the gateway knowing the method's signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    jsonrpc: &'static str,
    method: String,
    params: Vec<Value>,
    id: u64,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
            id,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Errors that can occur while talking to a node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// Connection could not be established or broke mid-exchange.
    #[error("connection to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    /// Node did not answer in time.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Node answered with a non-2xx HTTP status.
    #[error("node returned HTTP {0}")]
    Status(u16),

    /// Node answered with a body that is not JSON.
    #[error("malformed response body: {0}")]
    Decode(String),

    /// The request could not be built (bad endpoint URL, etc.).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Outcome of one JSON-RPC call.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    /// Decoded reply from the node, kept verbatim (`result` or `error` shape).
    Reply(Value),
    /// The call never produced a reply.
    Failed(RpcError),
}

impl RpcResponse {
    /// The `result` member of a successful reply.
    pub fn result(&self) -> Option<&Value> {
        match self {
            RpcResponse::Reply(reply) => reply.get("result"),
            RpcResponse::Failed(_) => None,
        }
    }

    /// The `result` member as a string, if it is one.
    pub fn result_str(&self) -> Option<&str> {
        self.result().and_then(Value::as_str)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RpcResponse::Failed(_))
    }

    /// JSON body handed back to clients.
    ///
    /// Replies pass through unmodified; failures become `{"error": message}`.
    pub fn into_json(self) -> Value {
        match self {
            RpcResponse::Reply(reply) => reply,
            RpcResponse::Failed(e) => json!({ "error": e.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_envelope() {
        let request = RpcRequest::new(1, "eth_getBlockByNumber", vec![json!("0x5"), json!(true)]);
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(
            encoded,
            json!({
                "jsonrpc": "2.0",
                "method": "eth_getBlockByNumber",
                "params": ["0x5", true],
                "id": 1
            })
        );
    }

    #[test]
    fn test_empty_params_serialize_as_list() {
        let encoded = serde_json::to_value(RpcRequest::new(7, "eth_blockNumber", Vec::new())).unwrap();
        assert_eq!(encoded["params"], json!([]));
        assert_eq!(encoded["id"], json!(7));
    }

    #[test]
    fn test_reply_passthrough() {
        let reply = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32601, "message": "method not found"}});
        let response = RpcResponse::Reply(reply.clone());
        assert!(response.result().is_none());
        assert!(!response.is_failed());
        assert_eq!(response.into_json(), reply);
    }

    #[test]
    fn test_result_accessors() {
        let response = RpcResponse::Reply(json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"}));
        assert_eq!(response.result_str(), Some("0x10"));

        let null_block = RpcResponse::Reply(json!({"jsonrpc": "2.0", "id": 1, "result": null}));
        assert_eq!(null_block.result(), Some(&Value::Null));
        assert_eq!(null_block.result_str(), None);
    }

    #[test]
    fn test_failure_envelope() {
        let response = RpcResponse::Failed(RpcError::Timeout(10));
        assert!(response.is_failed());
        assert_eq!(response.into_json(), json!({"error": "RPC timeout after 10 seconds"}));
    }
}
