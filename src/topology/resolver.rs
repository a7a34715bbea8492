//! Discovery with graceful degradation.
//!
//! The resolver is the only caller of a [`TopologyProvider`]. Provider errors
//! stop here: a failed listing reads as "no running instances" and a failed
//! lookup reads as "endpoint absent".

use std::sync::Arc;
use std::time::Duration;

use crate::config::DiscoveryConfig;
use crate::observability::metrics;
use crate::topology::cache::EndpointCache;
use crate::topology::provider::TopologyProvider;
use crate::topology::types::{EndpointRole, NetworkInstance, ServiceEndpoint};

/// Service name and port label the resolver uses for a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRef {
    pub service: String,
    pub port_label: String,
}

#[derive(Clone)]
pub struct Resolver {
    provider: Arc<dyn TopologyProvider>,
    cache: Option<EndpointCache>,
    rpc: ServiceRef,
    explorer: ServiceRef,
}

impl Resolver {
    pub fn new(provider: Arc<dyn TopologyProvider>, discovery: &DiscoveryConfig) -> Self {
        Self {
            provider,
            cache: None,
            rpc: ServiceRef {
                service: discovery.rpc_service.clone(),
                port_label: discovery.rpc_port.clone(),
            },
            explorer: ServiceRef {
                service: discovery.explorer_service.clone(),
                port_label: discovery.explorer_port.clone(),
            },
        }
    }

    /// Cache resolved endpoints for `ttl`.
    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache = Some(EndpointCache::new(ttl));
        self
    }

    pub fn service_for(&self, role: EndpointRole) -> &ServiceRef {
        match role {
            EndpointRole::Rpc => &self.rpc,
            EndpointRole::Explorer => &self.explorer,
        }
    }

    /// Running instances, in the order the provider lists them.
    ///
    /// Any discovery failure yields an empty list.
    pub async fn list_active_instances(&self) -> Vec<NetworkInstance> {
        match self.provider.list_instances().await {
            Ok(instances) => {
                let running: Vec<_> = instances.into_iter().filter(NetworkInstance::is_running).collect();
                if let Some(cache) = &self.cache {
                    let names: Vec<&str> = running.iter().map(|i| i.name.as_str()).collect();
                    cache.retain_instances(&names);
                }
                metrics::record_discovery("ok");
                running
            }
            Err(e) => {
                tracing::warn!(error = %e, "Instance discovery failed, treating as no running instances");
                if let Some(cache) = &self.cache {
                    cache.clear();
                }
                metrics::record_discovery("failed");
                Vec::new()
            }
        }
    }

    /// The first running instance, if any.
    pub async fn first_active_instance(&self) -> Option<NetworkInstance> {
        self.list_active_instances().await.into_iter().next()
    }

    /// Address of a labelled port, or `None` when it cannot be found.
    pub async fn resolve_endpoint(
        &self,
        instance: &str,
        service: &str,
        port_label: &str,
    ) -> Option<ServiceEndpoint> {
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(instance, service, port_label)) {
            return Some(hit);
        }

        match self.provider.resolve_endpoint(instance, service, port_label).await {
            Ok(Some(endpoint)) => {
                if let Some(cache) = &self.cache {
                    cache.insert(endpoint.clone());
                }
                Some(endpoint)
            }
            Ok(None) => {
                tracing::debug!(
                    enclave = %instance,
                    service = %service,
                    port = %port_label,
                    "Service port not found"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    enclave = %instance,
                    service = %service,
                    port = %port_label,
                    error = %e,
                    "Endpoint resolution failed"
                );
                if let Some(cache) = &self.cache {
                    cache.invalidate_instance(instance);
                }
                None
            }
        }
    }

    /// Resolve the configured service for `role` inside `instance`.
    pub async fn resolve_role(&self, instance: &str, role: EndpointRole) -> Option<ServiceEndpoint> {
        let target = self.service_for(role);
        self.resolve_endpoint(instance, &target.service, &target.port_label).await
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("rpc", &self.rpc)
            .field("explorer", &self.explorer)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}
