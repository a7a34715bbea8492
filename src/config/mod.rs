//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to the request handlers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps its discovery and RPC components
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults so an empty file is a valid config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CacheConfig, CorsConfig, DiscoveryConfig, DiscoveryMode, GatewayConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, StaticInstanceConfig, TimeoutConfig,
};
pub use validation::ValidationError;
