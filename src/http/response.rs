//! Response shaping.
//!
//! # Responsibilities
//! - Map gateway errors to `{"error": message}` with the right status code
//! - Shape the `/status` summary, decoding hex quantities to integers
//! - Attach permissive cross-origin headers to every response
//! - Turn handler panics into a generic 500
//!
//! # Design Decisions
//! - Backend replies (blocks, transactions, RPC results) pass through untouched
//! - Internal error details go to the log, never to the client

use std::any::Any;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tower_http::cors::{Any as CorsAny, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::CorsConfig;
use crate::rpc::RpcResponse;
use crate::topology::{EndpointRole, NetworkInstance};

pub const NO_INSTANCES_MESSAGE: &str = "No running enclaves found";

/// Errors a handler can answer with.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No running enclaves found")]
    NoActiveInstance,

    #[error("{}", endpoint_missing_message(.0))]
    EndpointNotResolved(EndpointRole),

    #[error("Invalid JSON in parameters")]
    MalformedParams,

    #[error("Endpoint not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request timed out")]
    Timeout,

    /// Details are logged, not returned.
    #[error("Internal server error")]
    Internal(String),
}

fn endpoint_missing_message(role: &EndpointRole) -> &'static str {
    match role {
        EndpointRole::Rpc => "RPC endpoint not found",
        EndpointRole::Explorer => "Block explorer not found",
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NoActiveInstance
            | GatewayError::EndpointNotResolved(_)
            | GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::MalformedParams => StatusCode::BAD_REQUEST,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Timeout => StatusCode::REQUEST_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let GatewayError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "Internal fault while handling request");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Panic handler for `CatchPanicLayer`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    GatewayError::Internal(detail).into_response()
}

/// Decode a JSON-RPC hex quantity such as `"0x10"`.
pub fn parse_hex_quantity(raw: &str) -> Option<u64> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Chain facts gathered for `/status`. Missing facts are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_count: Option<u64>,
}

impl NetworkInfo {
    /// Merge the replies of `eth_blockNumber`, `net_version` and `net_peerCount`.
    pub fn from_replies(block_number: &RpcResponse, net_version: &RpcResponse, peer_count: &RpcResponse) -> Self {
        Self {
            current_block: block_number.result_str().and_then(parse_hex_quantity),
            network_id: net_version.result().filter(|v| !v.is_null()).cloned(),
            peer_count: peer_count.result_str().and_then(parse_hex_quantity),
        }
    }
}

/// `/status` answer when an instance is running.
#[derive(Debug, Serialize)]
pub struct RunningStatus {
    pub status: &'static str,
    pub enclave: String,
    pub rpc_url: Option<String>,
    /// Explorer address under the key existing dashboards read.
    pub dora_url: Option<String>,
    pub explorer_url: Option<String>,
    pub network_info: NetworkInfo,
}

impl RunningStatus {
    pub fn new(enclave: String, rpc_url: Option<String>, explorer_url: Option<String>, network_info: NetworkInfo) -> Self {
        Self {
            status: "running",
            enclave,
            rpc_url,
            dora_url: explorer_url.clone(),
            explorer_url,
            network_info,
        }
    }
}

/// `/status` answer when nothing is running.
#[derive(Debug, Serialize)]
pub struct IdleStatus {
    pub status: &'static str,
    pub message: &'static str,
    pub enclaves: Vec<NetworkInstance>,
}

impl IdleStatus {
    pub fn new() -> Self {
        Self {
            status: "no_enclaves",
            message: NO_INSTANCES_MESSAGE,
            enclaves: Vec::new(),
        }
    }
}

impl Default for IdleStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// `/enclaves` answer.
#[derive(Debug, Serialize)]
pub struct InstanceList {
    pub count: usize,
    pub enclaves: Vec<NetworkInstance>,
}

impl From<Vec<NetworkInstance>> for InstanceList {
    fn from(enclaves: Vec<NetworkInstance>) -> Self {
        Self {
            count: enclaves.len(),
            enclaves,
        }
    }
}

/// `/explorer` answer.
#[derive(Debug, Serialize)]
pub struct ExplorerLocation {
    pub explorer_url: String,
}

/// Methods advertised to browsers.
const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
/// Request headers advertised to browsers.
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-Request-Id";

/// Wrap `router` with permissive cross-origin handling.
///
/// `CorsLayer` answers preflights; the header layers make sure plain
/// responses carry the same allowances.
pub fn with_cors<S>(router: Router<S>, config: &CorsConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if !config.enabled {
        return router;
    }

    let cors = CorsLayer::new()
        .allow_origin(CorsAny)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(CorsAny)
        .max_age(Duration::from_secs(config.max_age_secs));

    router
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcError;
    use serde_json::json;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_hex_quantities() {
        assert_eq!(parse_hex_quantity("0x10"), Some(16));
        assert_eq!(parse_hex_quantity("0X0"), Some(0));
        assert_eq!(parse_hex_quantity("ff"), Some(255));
        assert_eq!(parse_hex_quantity("0x"), None);
        assert_eq!(parse_hex_quantity("0xzz"), None);
        assert_eq!(parse_hex_quantity(""), None);
    }

    #[tokio::test]
    async fn test_error_envelopes() {
        let cases = [
            (GatewayError::NoActiveInstance, 404, "No running enclaves found"),
            (GatewayError::EndpointNotResolved(EndpointRole::Rpc), 404, "RPC endpoint not found"),
            (GatewayError::EndpointNotResolved(EndpointRole::Explorer), 404, "Block explorer not found"),
            (GatewayError::MalformedParams, 400, "Invalid JSON in parameters"),
            (GatewayError::NotFound, 404, "Endpoint not found"),
            (GatewayError::MethodNotAllowed, 405, "Method not allowed"),
            (GatewayError::Timeout, 408, "Request timed out"),
            (GatewayError::Internal("db exploded".into()), 500, "Internal server error"),
        ];

        for (error, status, message) in cases {
            let response = error.into_response();
            assert_eq!(response.status().as_u16(), status);
            assert_eq!(body_json(response).await, json!({ "error": message }));
        }
    }

    #[tokio::test]
    async fn test_panic_response_hides_detail() {
        let response = panic_response(Box::new("index out of bounds".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({"error": "Internal server error"}));
    }

    #[test]
    fn test_network_info_merges_results() {
        let info = NetworkInfo::from_replies(
            &RpcResponse::Reply(json!({"result": "0x10"})),
            &RpcResponse::Reply(json!({"result": "3151908"})),
            &RpcResponse::Reply(json!({"result": "0x2"})),
        );
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"current_block": 16, "network_id": "3151908", "peer_count": 2})
        );
    }

    #[test]
    fn test_network_info_omits_missing() {
        let info = NetworkInfo::from_replies(
            &RpcResponse::Failed(RpcError::Timeout(10)),
            &RpcResponse::Reply(json!({"error": {"code": -32601, "message": "nope"}})),
            &RpcResponse::Reply(json!({"result": "not hex"})),
        );
        assert_eq!(info, NetworkInfo::default());
        assert_eq!(serde_json::to_value(&info).unwrap(), json!({}));
    }

    #[test]
    fn test_idle_status_shape() {
        assert_eq!(
            serde_json::to_value(IdleStatus::new()).unwrap(),
            json!({"status": "no_enclaves", "message": "No running enclaves found", "enclaves": []})
        );
    }

    #[test]
    fn test_running_status_carries_both_explorer_keys() {
        let status = RunningStatus::new(
            "devnet".into(),
            Some("http://127.0.0.1:8545/".into()),
            Some("http://127.0.0.1:36000/".into()),
            NetworkInfo::default(),
        );
        let value = serde_json::to_value(status).unwrap();
        assert_eq!(value["dora_url"], "http://127.0.0.1:36000/");
        assert_eq!(value["explorer_url"], value["dora_url"]);
        assert_eq!(value["status"], "running");
    }
}
