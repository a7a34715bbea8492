//! Configuration validation.
//!
//! Serde handles the syntax; this module checks that values make sense
//! together. All problems are collected so one run reports every mistake.

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{DiscoveryMode, GatewayConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::new("listener.max_concurrent_requests", "must be greater than 0"));
    }

    for (field, value) in [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.rpc_secs", config.timeouts.rpc_secs),
        ("timeouts.discovery_secs", config.timeouts.discovery_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    let timeouts = &config.timeouts;
    if timeouts.request_secs > 0
        && timeouts.request_secs <= timeouts.discovery_secs.saturating_add(timeouts.rpc_secs)
    {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must exceed discovery_secs + rpc_secs ({} + {})",
                timeouts.discovery_secs, timeouts.rpc_secs
            ),
        ));
    }

    let discovery = &config.discovery;
    for (field, value) in [
        ("discovery.cli_path", &discovery.cli_path),
        ("discovery.rpc_service", &discovery.rpc_service),
        ("discovery.rpc_port", &discovery.rpc_port),
        ("discovery.explorer_service", &discovery.explorer_service),
        ("discovery.explorer_port", &discovery.explorer_port),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }

    if discovery.mode == DiscoveryMode::Static && discovery.static_instances.is_empty() {
        errors.push(ValidationError::new(
            "discovery.static_instances",
            "static mode needs at least one instance",
        ));
    }

    let mut seen = HashSet::new();
    for (i, instance) in discovery.static_instances.iter().enumerate() {
        let prefix = format!("discovery.static_instances[{}]", i);
        if instance.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.name", prefix), "must not be empty"));
        } else if !seen.insert(instance.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", prefix),
                format!("duplicate instance name '{}'", instance.name),
            ));
        }
        check_http_url(&mut errors, format!("{}.rpc_url", prefix), &instance.rpc_url);
        if let Some(explorer) = &instance.explorer_url {
            check_http_url(&mut errors, format!("{}.explorer_url", prefix), explorer);
        }
    }

    if config.cache.enabled && config.cache.ttl_secs == 0 {
        errors.push(ValidationError::new("cache.ttl_secs", "must be greater than 0 when the cache is enabled"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(errors: &mut Vec<ValidationError>, field: String, value: &str) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}', nodes are reached over plain http", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e))),
    }
}
