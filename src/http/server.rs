//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS, limits, timeout, panics)
//! - Bind server to listener
//! - Swap discovery and RPC components on config reload
//! - Stop gracefully on shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::handlers;
use crate::http::request::{make_request_span, MakeRequestUuidV4};
use crate::http::response::{panic_response, with_cors, GatewayError};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::rpc::{HttpRpcClient, RpcClient};
use crate::topology::{provider_from_config, Resolver, TopologyProvider, TopologyResult};

/// Components a request needs, replaced as a unit on config reload.
pub struct GatewayState {
    pub resolver: Resolver,
    pub rpc: Arc<dyn RpcClient>,
}

impl GatewayState {
    /// Assemble from explicit components.
    pub fn new(config: &GatewayConfig, provider: Arc<dyn TopologyProvider>, rpc: Arc<dyn RpcClient>) -> Self {
        let mut resolver = Resolver::new(provider, &config.discovery);
        if config.cache.enabled {
            resolver = resolver.with_cache(Duration::from_secs(config.cache.ttl_secs));
        }
        Self { resolver, rpc }
    }

    /// Build the provider and RPC client described by `config`.
    pub fn from_config(config: &GatewayConfig) -> TopologyResult<Self> {
        let provider = provider_from_config(
            &config.discovery,
            Duration::from_secs(config.timeouts.discovery_secs),
        )?;
        let rpc = Arc::new(HttpRpcClient::new(Duration::from_secs(config.timeouts.rpc_secs)));
        Ok(Self::new(config, provider, rpc))
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<GatewayState>>,
}

impl AppState {
    pub fn new(gateway: GatewayState) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(gateway)),
        }
    }

    /// Snapshot of the current components. A reload never affects a request
    /// that already holds one.
    pub fn load(&self) -> Arc<GatewayState> {
        self.inner.load_full()
    }

    pub fn replace(&self, gateway: GatewayState) {
        self.inner.store(Arc::new(gateway));
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a server whose discovery and RPC components come from `config`.
    pub fn new(config: GatewayConfig) -> TopologyResult<Self> {
        let gateway = GatewayState::from_config(&config)?;
        Ok(Self::with_state(config, gateway))
    }

    /// Create a server around caller-supplied components.
    pub fn with_components(
        config: GatewayConfig,
        provider: Arc<dyn TopologyProvider>,
        rpc: Arc<dyn RpcClient>,
    ) -> Self {
        let gateway = GatewayState::new(&config, provider, rpc);
        Self::with_state(config, gateway)
    }

    fn with_state(config: GatewayConfig, gateway: GatewayState) -> Self {
        let state = AppState::new(gateway);
        let router = build_router(&config, state.clone());
        Self { router, config, state }
    }

    /// Run the server until `shutdown` fires, accepting connections on `listener`.
    ///
    /// Configs received on `config_updates` replace the discovery and RPC
    /// components. Listener, CORS and request timeout settings are fixed at
    /// startup. In-flight requests are drained before returning.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        tokio::spawn(apply_reloads(
            self.state.clone(),
            self.config.clone(),
            config_updates,
            shutdown.clone(),
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.signalled().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

}

/// Build the Axum router with all middleware layers.
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(handlers::index))
        .route("/status", get(handlers::status))
        .route("/enclaves", get(handlers::enclaves))
        .route("/rpc/{method}", get(handlers::rpc_call))
        .route("/block/{number}", get(handlers::block))
        .route("/transaction/{hash}", get(handlers::transaction))
        .route("/explorer", get(handlers::explorer))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(track_metrics))
        .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_concurrent_requests))
        .layer(middleware::from_fn_with_state(
            Duration::from_secs(config.timeouts.request_secs),
            enforce_deadline,
        ));

    with_cors(router, &config.cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
}

/// Answer `408 {"error": ...}` when the whole request exceeds `limit`.
async fn enforce_deadline(State(limit): State<Duration>, request: Request, next: Next) -> Response {
    let uri = request.uri().clone();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(uri = %uri, limit_secs = limit.as_secs(), "Request exceeded deadline");
            GatewayError::Timeout.into_response()
        }
    }
}

async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16(), start);
    response
}

async fn apply_reloads(
    state: AppState,
    startup: GatewayConfig,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    shutdown: Shutdown,
) {
    loop {
        let config = tokio::select! {
            update = updates.recv() => match update {
                Some(config) => config,
                None => return,
            },
            _ = shutdown.signalled() => return,
        };

        match GatewayState::from_config(&config) {
            Ok(gateway) => {
                state.replace(gateway);
                tracing::info!(
                    mode = ?config.discovery.mode,
                    cache = config.cache.enabled,
                    "Applied reloaded configuration"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Reloaded configuration rejected, keeping current components");
                continue;
            }
        }

        if config.listener != startup.listener
            || config.cors != startup.cors
            || config.timeouts.request_secs != startup.timeouts.request_secs
            || config.observability != startup.observability
        {
            tracing::warn!("Listener, CORS, request timeout and observability changes take effect after restart");
        }
    }
}
