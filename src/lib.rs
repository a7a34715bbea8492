//! Enclave Gateway Library
//!
//! Discovers the running network instances of a Kurtosis-managed Ethereum
//! devnet and relays JSON-RPC and block/transaction lookups to their nodes.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rpc;
pub mod topology;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
