//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, concurrency).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Topology discovery settings.
    pub discovery: DiscoveryConfig,

    /// Endpoint cache settings.
    pub cache: CacheConfig,

    /// Cross-origin settings.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Maximum requests handled at once (backpressure).
    pub max_concurrent_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            max_concurrent_requests: 1024,
        }
    }
}

/// Timeout configuration for the blocking operations of a request.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one inbound request, in seconds.
    pub request_secs: u64,

    /// Outbound JSON-RPC call timeout in seconds.
    pub rpc_secs: u64,

    /// Orchestration tool invocation timeout in seconds.
    pub discovery_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            rpc_secs: 10,
            discovery_secs: 10,
        }
    }
}

/// Where the gateway learns about running network instances.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Ask the Kurtosis CLI on every discovery cycle.
    #[default]
    Kurtosis,
    /// Serve a fixed list of instances from this file.
    Static,
}

/// Topology discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub mode: DiscoveryMode,

    /// Path or name of the orchestration CLI binary.
    pub cli_path: String,

    /// Service that serves JSON-RPC inside an enclave.
    pub rpc_service: String,

    /// Port label of the JSON-RPC service.
    pub rpc_port: String,

    /// Block explorer service inside an enclave.
    pub explorer_service: String,

    /// Port label of the block explorer service.
    pub explorer_port: String,

    /// Instances served in `static` mode.
    pub static_instances: Vec<StaticInstanceConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            mode: DiscoveryMode::Kurtosis,
            cli_path: "kurtosis".to_string(),
            rpc_service: "el-1-geth-lighthouse".to_string(),
            rpc_port: "rpc".to_string(),
            explorer_service: "dora".to_string(),
            explorer_port: "http".to_string(),
            static_instances: Vec::new(),
        }
    }
}

/// A fixed network instance with known addresses.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StaticInstanceConfig {
    /// Instance name reported by `/enclaves`.
    pub name: String,

    /// JSON-RPC URL of the node (e.g., "http://127.0.0.1:8545").
    pub rpc_url: String,

    /// Optional block explorer URL.
    #[serde(default)]
    pub explorer_url: Option<String>,
}

/// Endpoint cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache resolved endpoints between requests.
    pub enabled: bool,

    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 5,
        }
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    /// Attach permissive CORS headers to every response.
    pub enabled: bool,

    /// How long browsers may cache a preflight answer.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_secs: 3600,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
