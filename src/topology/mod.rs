//! Topology discovery subsystem.
//!
//! # Data Flow
//! ```text
//! handler needs a node
//!     → resolver.rs (filter RUNNING, degrade errors)
//!         → cache.rs (optional short-TTL endpoint cache)
//!         → provider.rs (TopologyProvider trait)
//!             - kurtosis.rs (orchestration CLI subprocess, JSON output)
//!             - fixed.rs (instances listed in config)
//!     → ServiceEndpoint (url of the labelled port)
//! ```
//!
//! # Design Decisions
//! - Discovery failure is never fatal; it reads as an empty topology
//! - Endpoints are resolved per request unless the cache is enabled
//! - Providers are trait objects so tests swap in mocks

pub mod cache;
pub mod fixed;
pub mod kurtosis;
pub mod provider;
pub mod resolver;
pub mod types;

pub use cache::EndpointCache;
pub use fixed::StaticTopology;
pub use kurtosis::KurtosisCli;
pub use provider::{provider_from_config, TopologyProvider};
pub use resolver::{Resolver, ServiceRef};
pub use types::{
    EndpointRole, InstanceStatus, NetworkInstance, ServiceEndpoint, TopologyError, TopologyResult,
};
