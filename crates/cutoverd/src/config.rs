//! cutoverd.toml configuration.
//!
//! Every field is optional in the file; missing ones take the defaults
//! below.
//!
//! ```toml
//! port = 10234
//! config_dir = "/etc/traefik/conf"
//! docker_socket = "/var/run/docker.sock"
//! docker_timeout_secs = 10
//! network = "main"
//! cert_resolver = "letsencrypt"
//! default_delay_minutes = 5
//! runtime = "docker"
//! log_format = "text"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use cutover_rollout::JoinConfig;

/// Which container runtime backs discovery and teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Docker,
    /// In-process table with no replicas. Useful for dry runs.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub port: u16,
    /// Directory the proxy watches for routing documents.
    pub config_dir: PathBuf,
    pub docker_socket: PathBuf,
    /// Upper bound on one Docker Engine request.
    pub docker_timeout_secs: u64,
    /// Network whose address is used for replica endpoints.
    pub network: String,
    pub cert_resolver: String,
    pub default_delay_minutes: u64,
    pub runtime: RuntimeKind,
    pub log_format: LogFormat,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            port: 10234,
            config_dir: PathBuf::from("/etc/traefik/conf"),
            docker_socket: PathBuf::from(cutover_runtime::docker::DEFAULT_SOCKET),
            docker_timeout_secs: cutover_runtime::docker::DEFAULT_TIMEOUT.as_secs(),
            network: "main".to_string(),
            cert_resolver: "letsencrypt".to_string(),
            default_delay_minutes: 5,
            runtime: RuntimeKind::Docker,
            log_format: LogFormat::Text,
        }
    }
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DaemonConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn docker_timeout(&self) -> Duration {
        Duration::from_secs(self.docker_timeout_secs)
    }

    pub fn join_config(&self) -> anyhow::Result<JoinConfig> {
        let secs = self
            .default_delay_minutes
            .checked_mul(60)
            .context("default_delay_minutes is too large")?;
        Ok(JoinConfig {
            cert_resolver: self.cert_resolver.clone(),
            default_delay: Duration::from_secs(secs),
        })
    }
}
