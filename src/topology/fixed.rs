//! Topology provider serving a fixed list of instances from configuration.
//!
//! Used when nodes run at known local ports instead of inside an
//! orchestrated enclave. Every instance is reported as running.

use async_trait::async_trait;
use url::Url;

use crate::config::{DiscoveryConfig, StaticInstanceConfig};
use crate::topology::provider::TopologyProvider;
use crate::topology::types::{
    InstanceStatus, NetworkInstance, ServiceEndpoint, TopologyError, TopologyResult,
};

#[derive(Debug, Clone)]
struct FixedInstance {
    name: String,
    rpc_url: Url,
    explorer_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct StaticTopology {
    instances: Vec<FixedInstance>,
    rpc_port: String,
    explorer_port: String,
}

impl StaticTopology {
    /// Build from the discovery section.
    ///
    /// Validation has already checked the URLs; an unparsable one here is
    /// reported as malformed rather than silently skipped.
    pub fn from_config(config: &DiscoveryConfig) -> TopologyResult<Self> {
        let instances = config
            .static_instances
            .iter()
            .map(fixed_instance)
            .collect::<TopologyResult<Vec<_>>>()?;

        Ok(Self {
            instances,
            rpc_port: config.rpc_port.clone(),
            explorer_port: config.explorer_port.clone(),
        })
    }
}

fn fixed_instance(config: &StaticInstanceConfig) -> TopologyResult<FixedInstance> {
    let parse = |raw: &str| {
        Url::parse(raw).map_err(|e| TopologyError::Malformed(format!("instance '{}': {}", config.name, e)))
    };
    Ok(FixedInstance {
        name: config.name.clone(),
        rpc_url: parse(&config.rpc_url)?,
        explorer_url: config.explorer_url.as_deref().map(parse).transpose()?,
    })
}

#[async_trait]
impl TopologyProvider for StaticTopology {
    async fn list_instances(&self) -> TopologyResult<Vec<NetworkInstance>> {
        Ok(self
            .instances
            .iter()
            .map(|i| NetworkInstance::new(i.name.clone(), InstanceStatus::Running))
            .collect())
    }

    async fn resolve_endpoint(
        &self,
        instance: &str,
        service: &str,
        port_label: &str,
    ) -> TopologyResult<Option<ServiceEndpoint>> {
        let fixed = self
            .instances
            .iter()
            .find(|i| i.name == instance)
            .ok_or_else(|| TopologyError::UnknownInstance(instance.to_string()))?;

        // Service names are meaningless here; the port label picks the URL.
        let url = if port_label == self.rpc_port {
            Some(fixed.rpc_url.clone())
        } else if port_label == self.explorer_port {
            fixed.explorer_url.clone()
        } else {
            None
        };

        Ok(url.map(|url| ServiceEndpoint {
            instance: instance.to_string(),
            service: service.to_string(),
            port_label: port_label.to_string(),
            url,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology() -> StaticTopology {
        let config = DiscoveryConfig {
            static_instances: vec![
                StaticInstanceConfig {
                    name: "node-1".into(),
                    rpc_url: "http://127.0.0.1:8545".into(),
                    explorer_url: Some("http://127.0.0.1:8080".into()),
                },
                StaticInstanceConfig {
                    name: "node-2".into(),
                    rpc_url: "http://127.0.0.1:8546".into(),
                    explorer_url: None,
                },
            ],
            ..DiscoveryConfig::default()
        };
        StaticTopology::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_all_instances_running() {
        let instances = topology().list_instances().await.unwrap();
        let names: Vec<_> = instances.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["node-1", "node-2"]);
        assert!(instances.iter().all(NetworkInstance::is_running));
    }

    #[tokio::test]
    async fn test_resolves_by_port_label() {
        let topology = topology();

        let rpc = topology.resolve_endpoint("node-1", "anything", "rpc").await.unwrap().unwrap();
        assert_eq!(rpc.url.as_str(), "http://127.0.0.1:8545/");

        let explorer = topology.resolve_endpoint("node-1", "dora", "http").await.unwrap().unwrap();
        assert_eq!(explorer.url.port(), Some(8080));

        assert!(topology.resolve_endpoint("node-2", "dora", "http").await.unwrap().is_none());
        assert!(topology.resolve_endpoint("node-1", "x", "metrics").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_instance() {
        let err = topology().resolve_endpoint("node-9", "x", "rpc").await.unwrap_err();
        assert!(matches!(err, TopologyError::UnknownInstance(name) if name == "node-9"));
    }

    #[test]
    fn test_bad_url_rejected() {
        let config = DiscoveryConfig {
            static_instances: vec![StaticInstanceConfig {
                name: "broken".into(),
                rpc_url: "::".into(),
                explorer_url: None,
            }],
            ..DiscoveryConfig::default()
        };
        assert!(matches!(
            StaticTopology::from_config(&config),
            Err(TopologyError::Malformed(_))
        ));
    }
}
