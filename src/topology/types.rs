//! Network instance and endpoint types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

/// Lifecycle status reported by the orchestration tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceStatus {
    Running,
    Stopped,
    /// Any status the gateway does not act on, kept verbatim.
    Other(String),
}

impl From<String> for InstanceStatus {
    fn from(raw: String) -> Self {
        if raw.eq_ignore_ascii_case("RUNNING") {
            InstanceStatus::Running
        } else if raw.eq_ignore_ascii_case("STOPPED") {
            InstanceStatus::Stopped
        } else {
            InstanceStatus::Other(raw)
        }
    }
}

impl From<InstanceStatus> for String {
    fn from(status: InstanceStatus) -> Self {
        match status {
            InstanceStatus::Running => "RUNNING".to_string(),
            InstanceStatus::Stopped => "STOPPED".to_string(),
            InstanceStatus::Other(raw) => raw,
        }
    }
}

/// A running (or not) deployment of the network, as listed by the tool.
///
/// Fields the gateway does not use are kept in `extra` so `/enclaves` shows
/// the tool's full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInstance {
    pub name: String,
    pub status: InstanceStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NetworkInstance {
    pub fn new(name: impl Into<String>, status: InstanceStatus) -> Self {
        Self {
            name: name.into(),
            status,
            extra: Map::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == InstanceStatus::Running
    }
}

/// Logical role of a service the gateway resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRole {
    Rpc,
    Explorer,
}

impl EndpointRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointRole::Rpc => "rpc",
            EndpointRole::Explorer => "explorer-http",
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved address of one service port inside an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub instance: String,
    pub service: String,
    pub port_label: String,
    pub url: Url,
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Errors raised while asking a provider about the topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Orchestration binary not found.
    #[error("orchestration tool '{0}' not found")]
    ToolMissing(String),

    /// Binary exists but could not be started.
    #[error("failed to run orchestration tool: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("orchestration tool timed out after {0} seconds")]
    Timeout(u64),

    #[error("orchestration tool exited with {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    /// Output was not the JSON shape expected.
    #[error("malformed orchestration output: {0}")]
    Malformed(String),

    #[error("unknown instance '{0}'")]
    UnknownInstance(String),
}

pub type TopologyResult<T> = Result<T, TopologyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_parsing() {
        assert_eq!(InstanceStatus::from("RUNNING".to_string()), InstanceStatus::Running);
        assert_eq!(InstanceStatus::from("running".to_string()), InstanceStatus::Running);
        assert_eq!(InstanceStatus::from("STOPPED".to_string()), InstanceStatus::Stopped);
        assert_eq!(
            InstanceStatus::from("EMPTY".to_string()),
            InstanceStatus::Other("EMPTY".to_string())
        );
    }

    #[test]
    fn test_instance_keeps_extra_fields() {
        let raw = json!({"name": "devnet", "status": "RUNNING", "uuid": "af12", "creation_time": "2024-01-01"});
        let instance: NetworkInstance = serde_json::from_value(raw.clone()).unwrap();
        assert!(instance.is_running());
        assert_eq!(instance.extra["uuid"], json!("af12"));
        assert_eq!(serde_json::to_value(&instance).unwrap(), raw);
    }

    #[test]
    fn test_role_names() {
        assert_eq!(EndpointRole::Rpc.to_string(), "rpc");
        assert_eq!(EndpointRole::Explorer.as_str(), "explorer-http");
    }
}
