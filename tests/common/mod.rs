//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

use enclave_gateway::config::GatewayConfig;
use enclave_gateway::rpc::{RpcClient, RpcResponse};
use enclave_gateway::topology::{
    InstanceStatus, NetworkInstance, ServiceEndpoint, TopologyError, TopologyProvider, TopologyResult,
};
use enclave_gateway::{HttpServer, Shutdown};

/// Topology with a fixed set of instances and endpoints.
#[derive(Default)]
pub struct MockTopology {
    instances: Vec<NetworkInstance>,
    endpoints: HashMap<(String, String), Url>,
    fail: bool,
    pub list_calls: AtomicUsize,
}

impl MockTopology {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Listing fails as if the orchestration tool were broken.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_instance(mut self, name: &str, status: InstanceStatus) -> Self {
        self.instances.push(NetworkInstance::new(name, status));
        self
    }

    /// Register `url` for the default service of `port_label` in `instance`.
    pub fn with_endpoint(mut self, instance: &str, port_label: &str, url: &str) -> Self {
        let url = Url::parse(url).unwrap();
        self.endpoints.insert((instance.to_string(), port_label.to_string()), url);
        self
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TopologyProvider for MockTopology {
    async fn list_instances(&self) -> TopologyResult<Vec<NetworkInstance>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TopologyError::ToolMissing("kurtosis".into()));
        }
        Ok(self.instances.clone())
    }

    async fn resolve_endpoint(
        &self,
        instance: &str,
        service: &str,
        port_label: &str,
    ) -> TopologyResult<Option<ServiceEndpoint>> {
        Ok(self
            .endpoints
            .get(&(instance.to_string(), port_label.to_string()))
            .map(|url| ServiceEndpoint {
                instance: instance.to_string(),
                service: service.to_string(),
                port_label: port_label.to_string(),
                url: url.clone(),
            }))
    }
}

/// RPC client that records calls and answers from a method table.
#[derive(Default)]
pub struct MockRpc {
    replies: HashMap<String, RpcResponse>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    delay: Duration,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, method: &str, response: RpcResponse) -> Self {
        self.replies.insert(method.to_string(), response);
        self
    }

    /// Reply `{"jsonrpc":"2.0","id":1,"result":<result>}` to `method`.
    pub fn result(self, method: &str, result: Value) -> Self {
        self.reply(method, RpcResponse::Reply(json!({"jsonrpc": "2.0", "id": 1, "result": result})))
    }

    /// Answer every call only after `delay`.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RpcClient for MockRpc {
    async fn call(&self, _endpoint: &Url, method: &str, params: Vec<Value>) -> RpcResponse {
        self.calls.lock().unwrap().push((method.to_string(), params));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.replies
            .get(method)
            .cloned()
            .unwrap_or_else(|| RpcResponse::Reply(json!({"jsonrpc": "2.0", "id": 1, "result": null})))
    }
}

/// Start a JSON-RPC node on an ephemeral port that answers with `handler`.
pub async fn start_mock_node<F>(handler: F) -> SocketAddr
where
    F: Fn(Value) -> Value + Clone + Send + Sync + 'static,
{
    let app = Router::new().route(
        "/",
        post(move |Json(request): Json<Value>| {
            let handler = handler.clone();
            async move { Json(handler(request)) }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A running gateway and the handles needed to drive and stop it.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<GatewayConfig>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve a gateway with the given components on an ephemeral port.
pub async fn start_gateway(
    config: GatewayConfig,
    provider: Arc<dyn TopologyProvider>,
    rpc: Arc<dyn RpcClient>,
) -> TestGateway {
    let server = HttpServer::with_components(config, provider, rpc);
    start_server(server).await
}

/// Serve an already-built server on an ephemeral port.
pub async fn start_server(server: HttpServer) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, update_rx, server_shutdown).await;
    });

    // Listener is already bound; give the accept loop a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;
    TestGateway {
        addr,
        shutdown,
        config_updates: update_tx,
    }
}

/// One running instance with both endpoints registered.
pub fn running_topology(rpc_url: &str) -> MockTopology {
    MockTopology::empty()
        .with_instance("devnet", InstanceStatus::Running)
        .with_endpoint("devnet", "rpc", rpc_url)
        .with_endpoint("devnet", "http", "http://127.0.0.1:36000")
}
