//! Topology provider backed by the Kurtosis CLI.
//!
//! Runs `kurtosis enclave ls --format json` to list enclaves and
//! `kurtosis service inspect <enclave> <service> --format json` to find a
//! service's ports. Every invocation is bounded by a timeout and the child is
//! killed if the deadline passes.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;
use url::Url;

use crate::topology::provider::TopologyProvider;
use crate::topology::types::{NetworkInstance, ServiceEndpoint, TopologyError, TopologyResult};

/// Keep at most this much stderr in error messages.
const STDERR_LIMIT: usize = 512;

#[derive(Debug, Clone)]
pub struct KurtosisCli {
    program: PathBuf,
    timeout_duration: Duration,
}

impl KurtosisCli {
    pub fn new(program: impl Into<PathBuf>, timeout_duration: Duration) -> Self {
        Self {
            program: program.into(),
            timeout_duration,
        }
    }

    async fn run(&self, args: &[&str]) -> TopologyResult<Vec<u8>> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(program = ?self.program, args = ?args, "Invoking orchestration tool");

        let output = match timeout(self.timeout_duration, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(TopologyError::ToolMissing(self.program.display().to_string()));
            }
            Ok(Err(e)) => return Err(TopologyError::Spawn(e)),
            Err(_) => return Err(TopologyError::Timeout(self.timeout_duration.as_secs())),
        };

        if !output.status.success() {
            let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.len() > STDERR_LIMIT {
                let mut cut = STDERR_LIMIT;
                while !stderr.is_char_boundary(cut) {
                    cut -= 1;
                }
                stderr.truncate(cut);
            }
            return Err(TopologyError::ExitStatus {
                code: output.status.code(),
                stderr,
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl TopologyProvider for KurtosisCli {
    async fn list_instances(&self) -> TopologyResult<Vec<NetworkInstance>> {
        let stdout = self.run(&["enclave", "ls", "--format", "json"]).await?;
        parse_enclave_list(&stdout)
    }

    async fn resolve_endpoint(
        &self,
        instance: &str,
        service: &str,
        port_label: &str,
    ) -> TopologyResult<Option<ServiceEndpoint>> {
        let stdout = self
            .run(&["service", "inspect", instance, service, "--format", "json"])
            .await?;
        let url = match find_port_url(&stdout, port_label)? {
            Some(url) => url,
            None => return Ok(None),
        };
        Ok(Some(ServiceEndpoint {
            instance: instance.to_string(),
            service: service.to_string(),
            port_label: port_label.to_string(),
            url,
        }))
    }
}

/// Parse the JSON array printed by `enclave ls`.
pub fn parse_enclave_list(stdout: &[u8]) -> TopologyResult<Vec<NetworkInstance>> {
    serde_json::from_slice(stdout).map_err(|e| TopologyError::Malformed(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct ServiceInspection {
    #[serde(default)]
    ports: Option<PortList>,
}

/// Ports appear either as a list of named entries or as a map keyed by name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortList {
    List(Vec<NamedPort>),
    Map(BTreeMap<String, PortInfo>),
}

#[derive(Debug, Deserialize)]
struct NamedPort {
    name: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PortInfo {
    #[serde(default)]
    url: Option<String>,
}

/// Find the URL of the port labelled `port_label` in `service inspect` output.
///
/// Returns `Ok(None)` when the service has no such port.
pub fn find_port_url(stdout: &[u8], port_label: &str) -> TopologyResult<Option<Url>> {
    let inspection: ServiceInspection =
        serde_json::from_slice(stdout).map_err(|e| TopologyError::Malformed(e.to_string()))?;

    let raw = match inspection.ports {
        Some(PortList::List(ports)) => ports
            .into_iter()
            .find(|p| p.name == port_label)
            .and_then(|p| p.url),
        Some(PortList::Map(mut ports)) => ports.remove(port_label).and_then(|p| p.url),
        None => None,
    };

    match raw {
        Some(raw) => Url::parse(&raw)
            .map(Some)
            .map_err(|e| TopologyError::Malformed(format!("port '{}' has invalid URL '{}': {}", port_label, raw, e))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::types::InstanceStatus;

    #[test]
    fn test_parse_enclave_list() {
        let stdout = br#"[
            {"name": "devnet", "status": "RUNNING", "uuid": "1"},
            {"name": "old", "status": "STOPPED", "uuid": "2"}
        ]"#;
        let instances = parse_enclave_list(stdout).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].name, "devnet");
        assert_eq!(instances[1].status, InstanceStatus::Stopped);
    }

    #[test]
    fn test_parse_enclave_list_rejects_garbage() {
        assert!(matches!(
            parse_enclave_list(b"Error: engine not running"),
            Err(TopologyError::Malformed(_))
        ));
    }

    #[test]
    fn test_find_port_in_list() {
        let stdout = br#"{"ports": [
            {"name": "engine-rpc", "url": "http://127.0.0.1:32770"},
            {"name": "rpc", "url": "http://127.0.0.1:32769"}
        ]}"#;
        let url = find_port_url(stdout, "rpc").unwrap().unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:32769/");
    }

    #[test]
    fn test_find_port_in_map() {
        let stdout = br#"{"name": "dora", "ports": {"http": {"url": "http://127.0.0.1:36000"}}}"#;
        let url = find_port_url(stdout, "http").unwrap().unwrap();
        assert_eq!(url.port(), Some(36000));
    }

    #[test]
    fn test_missing_port_is_absent() {
        assert_eq!(find_port_url(br#"{"ports": []}"#, "rpc").unwrap(), None);
        assert_eq!(find_port_url(br#"{"name": "x"}"#, "rpc").unwrap(), None);
        assert_eq!(
            find_port_url(br#"{"ports": [{"name": "rpc"}]}"#, "rpc").unwrap(),
            None
        );
    }

    #[test]
    fn test_invalid_port_url_is_malformed() {
        let stdout = br#"{"ports": [{"name": "rpc", "url": "not a url"}]}"#;
        assert!(matches!(find_port_url(stdout, "rpc"), Err(TopologyError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let cli = KurtosisCli::new("/nonexistent/kurtosis-binary", Duration::from_secs(5));
        let err = cli.list_instances().await.unwrap_err();
        assert!(matches!(err, TopologyError::ToolMissing(_)));
    }

    #[cfg(unix)]
    mod fake_tool {
        use super::*;
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        /// Write an executable shell script standing in for the CLI.
        fn script(dir: &tempfile::TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("kurtosis");
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "#!/bin/sh\n{}", body).unwrap();
            drop(file);
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_lists_and_resolves() {
            let dir = tempfile::tempdir().unwrap();
            let path = script(
                &dir,
                r#"case "$1" in
  enclave) echo '[{"name":"devnet","status":"RUNNING"}]' ;;
  service) echo "{\"ports\":[{\"name\":\"rpc\",\"url\":\"http://127.0.0.1:32769\"}],\"enclave\":\"$3\",\"service\":\"$4\"}" ;;
esac"#,
            );
            let cli = KurtosisCli::new(path, Duration::from_secs(5));

            let instances = cli.list_instances().await.unwrap();
            assert_eq!(instances, vec![NetworkInstance::new("devnet", InstanceStatus::Running)]);

            let endpoint = cli
                .resolve_endpoint("devnet", "el-1-geth-lighthouse", "rpc")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(endpoint.instance, "devnet");
            assert_eq!(endpoint.url.port(), Some(32769));

            let absent = cli.resolve_endpoint("devnet", "dora", "http").await.unwrap();
            assert!(absent.is_none());
        }

        #[tokio::test]
        async fn test_non_zero_exit() {
            let dir = tempfile::tempdir().unwrap();
            let path = script(&dir, "echo 'engine is stopped' >&2\nexit 3");
            let cli = KurtosisCli::new(path, Duration::from_secs(5));

            match cli.list_instances().await.unwrap_err() {
                TopologyError::ExitStatus { code, stderr } => {
                    assert_eq!(code, Some(3));
                    assert_eq!(stderr, "engine is stopped");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_hung_tool_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let path = script(&dir, "sleep 10");
            let cli = KurtosisCli::new(path, Duration::from_secs(1));

            let err = cli.list_instances().await.unwrap_err();
            assert!(matches!(err, TopologyError::Timeout(1)));
        }
    }
}
