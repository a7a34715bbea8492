//! The topology capability the resolver depends on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{DiscoveryConfig, DiscoveryMode};
use crate::topology::fixed::StaticTopology;
use crate::topology::kurtosis::KurtosisCli;
use crate::topology::types::{NetworkInstance, ServiceEndpoint, TopologyResult};

/// Source of truth for which instances exist and where their services listen.
#[async_trait]
pub trait TopologyProvider: Send + Sync {
    /// Every instance the source knows about, whatever its status.
    async fn list_instances(&self) -> TopologyResult<Vec<NetworkInstance>>;

    /// Address of `port_label` on `service` inside `instance`.
    ///
    /// `Ok(None)` means the service or port does not exist.
    async fn resolve_endpoint(
        &self,
        instance: &str,
        service: &str,
        port_label: &str,
    ) -> TopologyResult<Option<ServiceEndpoint>>;
}

/// Build the provider selected by `discovery.mode`.
pub fn provider_from_config(
    config: &DiscoveryConfig,
    discovery_timeout: Duration,
) -> TopologyResult<Arc<dyn TopologyProvider>> {
    match config.mode {
        DiscoveryMode::Kurtosis => Ok(Arc::new(KurtosisCli::new(&config.cli_path, discovery_timeout))),
        DiscoveryMode::Static => Ok(Arc::new(StaticTopology::from_config(config)?)),
    }
}
