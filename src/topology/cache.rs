//! Short-lived cache of resolved endpoints.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::observability::metrics;
use crate::topology::types::ServiceEndpoint;

/// (instance, service, port label)
type CacheKey = (String, String, String);

#[derive(Debug, Clone)]
struct CachedEndpoint {
    endpoint: ServiceEndpoint,
    resolved_at: Instant,
}

/// A thread-safe endpoint cache with a fixed time-to-live.
///
/// Addresses change when an enclave restarts, so entries expire quickly and
/// are dropped whenever discovery says their instance is gone.
#[derive(Debug, Clone)]
pub struct EndpointCache {
    inner: Arc<DashMap<CacheKey, CachedEndpoint>>,
    ttl: Duration,
}

impl EndpointCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    fn key(instance: &str, service: &str, port_label: &str) -> CacheKey {
        (instance.to_string(), service.to_string(), port_label.to_string())
    }

    /// Fresh entry for the key, if any. Expired entries are evicted.
    pub fn get(&self, instance: &str, service: &str, port_label: &str) -> Option<ServiceEndpoint> {
        let key = Self::key(instance, service, port_label);
        let fresh = match self.inner.get(&key) {
            Some(entry) if entry.resolved_at.elapsed() < self.ttl => Some(entry.endpoint.clone()),
            Some(_) => None,
            None => {
                metrics::record_cache_lookup(false);
                return None;
            }
        };

        if fresh.is_none() {
            self.inner.remove(&key);
        }
        metrics::record_cache_lookup(fresh.is_some());
        fresh
    }

    pub fn insert(&self, endpoint: ServiceEndpoint) {
        let key = Self::key(&endpoint.instance, &endpoint.service, &endpoint.port_label);
        self.inner.insert(
            key,
            CachedEndpoint {
                endpoint,
                resolved_at: Instant::now(),
            },
        );
    }

    /// Drop every entry of one instance.
    pub fn invalidate_instance(&self, instance: &str) {
        self.inner.retain(|(name, _, _), _| name != instance);
    }

    /// Keep only entries whose instance is in `running`.
    pub fn retain_instances(&self, running: &[&str]) {
        self.inner.retain(|(name, _, _), _| running.contains(&name.as_str()));
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
