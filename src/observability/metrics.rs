//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_rpc_calls_total` (counter): outbound calls by method (well-known
//!   methods only, the rest as `other`), outcome
//! - `gateway_discovery_total` (counter): discovery cycles by outcome
//! - `gateway_endpoint_cache_total` (counter): cache lookups by outcome
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one handled inbound request.
pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Methods labelled by name; anything else is counted as `other` so
/// client-chosen method names cannot grow the series count.
const LABELLED_RPC_METHODS: &[&str] = &[
    "eth_accounts",
    "eth_blockNumber",
    "eth_call",
    "eth_chainId",
    "eth_estimateGas",
    "eth_feeHistory",
    "eth_gasPrice",
    "eth_getBalance",
    "eth_getBlockByHash",
    "eth_getBlockByNumber",
    "eth_getCode",
    "eth_getLogs",
    "eth_getStorageAt",
    "eth_getTransactionByHash",
    "eth_getTransactionCount",
    "eth_getTransactionReceipt",
    "eth_maxPriorityFeePerGas",
    "eth_sendRawTransaction",
    "eth_syncing",
    "net_listening",
    "net_peerCount",
    "net_version",
    "web3_clientVersion",
];

/// Metric label for an RPC method name.
pub fn rpc_method_label(method: &str) -> &'static str {
    LABELLED_RPC_METHODS
        .iter()
        .find(|known| **known == method)
        .copied()
        .unwrap_or("other")
}

/// Record one outbound JSON-RPC call.
pub fn record_rpc_call(method: &str, outcome: &'static str) {
    counter!(
        "gateway_rpc_calls_total",
        "method" => rpc_method_label(method),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one instance listing.
pub fn record_discovery(outcome: &'static str) {
    counter!("gateway_discovery_total", "outcome" => outcome).increment(1);
}

/// Record one endpoint cache lookup.
pub fn record_cache_lookup(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!("gateway_endpoint_cache_total", "outcome" => outcome).increment(1);
}
