//! JSON-RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - POST one JSON-RPC envelope to a node and decode the reply
//! - Bound every exchange with a timeout
//! - Fold every transport failure into [`RpcResponse::Failed`]

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::Value;
use tokio::time::timeout;
use url::Url;

use crate::observability::metrics;
use crate::rpc::types::{RpcError, RpcRequest, RpcResponse};

/// Largest reply body accepted from a node (full blocks can be large).
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Issues JSON-RPC calls against a node address.
///
/// Implementations never fail: transport problems come back as
/// [`RpcResponse::Failed`].
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn call(&self, endpoint: &Url, method: &str, params: Vec<Value>) -> RpcResponse;
}

/// [`RpcClient`] over plain HTTP using a pooled hyper client.
pub struct HttpRpcClient {
    client: Client<HttpConnector, Body>,
    timeout_duration: Duration,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(timeout_duration: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            timeout_duration,
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn exchange(&self, endpoint: &Url, request: &RpcRequest) -> Result<Value, RpcError> {
        if endpoint.scheme() != "http" {
            return Err(RpcError::InvalidRequest(format!(
                "unsupported scheme '{}' for {}, only plain http is spoken",
                endpoint.scheme(),
                endpoint
            )));
        }

        let body = serde_json::to_vec(request).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
        let http_request = Request::builder()
            .method(Method::POST)
            .uri(endpoint.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .body(Body::from(body))
            .map_err(|e| RpcError::InvalidRequest(e.to_string()))?;

        let connect_error = |reason: String| RpcError::Connect {
            endpoint: endpoint.to_string(),
            reason,
        };

        let response: hyper::Response<Incoming> = self
            .client
            .request(http_request)
            .await
            .map_err(|e| connect_error(error_chain(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }

        let bytes = axum::body::to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| connect_error(error_chain(&e)))?;

        serde_json::from_slice(&bytes).map_err(|e| RpcError::Decode(e.to_string()))
    }
}

/// `outer: cause: root cause`, so transport failures name the real reason.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn call(&self, endpoint: &Url, method: &str, params: Vec<Value>) -> RpcResponse {
        let request = RpcRequest::new(self.next_id(), method, params);

        tracing::debug!(
            endpoint = %endpoint,
            method = %request.method(),
            id = request.id(),
            "Forwarding RPC call"
        );

        let outcome = match timeout(self.timeout_duration, self.exchange(endpoint, &request)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout(self.timeout_duration.as_secs())),
        };

        match outcome {
            Ok(reply) => {
                metrics::record_rpc_call(method, "ok");
                RpcResponse::Reply(reply)
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, method = %method, error = %e, "RPC call failed");
                metrics::record_rpc_call(method, "failed");
                RpcResponse::Failed(e)
            }
        }
    }
}

impl std::fmt::Debug for HttpRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRpcClient")
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
