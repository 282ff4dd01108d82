use crate::error::{Error, Result};
use crate::server::{Binding, ContainerSpec, NetworkMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Image used when the configuration does not name one
pub const DEFAULT_IMAGE: &str = "nginx:stable";

/// File name of the generated configuration inside `configDir`
pub const CONFIG_FILE_NAME: &str = "nginx.conf";

/// Path where the nginx image expects its main configuration file
pub const CONTAINER_CONFIG_PATH: &str = "/etc/nginx/nginx.conf";

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn default_name_prefix() -> String {
    "nginx-switch".to_string()
}

fn default_api_timeout_secs() -> u64 {
    120
}

fn default_pull_secs() -> u64 {
    600
}

fn default_operation_secs() -> u64 {
    30
}

/// How to reach the Docker daemon.
///
/// With neither `socketPath` nor `host` set, the local defaults are used:
/// `DOCKER_HOST` if present, otherwise `/var/run/docker.sock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerConfig {
    /// Path of the local administrative socket
    #[serde(default)]
    pub socket_path: Option<PathBuf>,

    /// Address of a remote daemon, e.g. `tcp://10.0.0.5:2375`
    #[serde(default)]
    pub host: Option<String>,

    /// Per-request timeout of the Docker client, in seconds
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,

    /// Prefix of the generated container name
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            host: None,
            api_timeout_secs: default_api_timeout_secs(),
            name_prefix: default_name_prefix(),
        }
    }
}

/// Upper bounds on runtime calls made by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutConfig {
    /// Bound on a complete image pull, in seconds
    #[serde(default = "default_pull_secs")]
    pub pull_secs: u64,

    /// Bound on every other runtime call, in seconds
    #[serde(default = "default_operation_secs")]
    pub operation_secs: u64,
}

impl TimeoutConfig {
    /// Image pull bound
    pub fn pull(&self) -> Duration {
        Duration::from_secs(self.pull_secs)
    }

    /// Bound for create/start/stop/kill/remove
    pub fn operation(&self) -> Duration {
        Duration::from_secs(self.operation_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            pull_secs: default_pull_secs(),
            operation_secs: default_operation_secs(),
        }
    }
}

/// Main configuration for nginx-switch.
///
/// # JSON Schema
///
/// Every field is optional:
///
/// ```json
/// {
///   "docker": { "socketPath": "/var/run/docker.sock" },
///   "image": "nginx:stable",
///   "port": 80,
///   "configDir": "/tmp/nginx-switch-1a2b3c",
///   "networkMode": "host",
///   "timeouts": { "pullSecs": 600, "operationSecs": 30 }
/// }
/// ```
///
/// `bindings` replaces the derived bindings entirely when present.
///
/// # Examples
///
/// ```
/// use nginx_switch::config::Config;
///
/// let config = Config::parse_from_str(r#"{ "configDir": "/tmp/switch" }"#).unwrap();
/// let spec = config.container_spec();
/// assert_eq!(spec.image, "nginx:stable");
/// assert_eq!(spec.binds(), vec!["/tmp/switch/nginx.conf:/etc/nginx/nginx.conf:ro".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Docker connection settings
    #[serde(default)]
    pub docker: DockerConfig,

    /// Image reference of the server
    #[serde(default = "default_image")]
    pub image: String,

    /// Port published by the server, mapped to the same host port
    #[serde(default)]
    pub port: Option<u16>,

    /// Directory holding the generated `nginx.conf`
    #[serde(default)]
    pub config_dir: Option<PathBuf>,

    /// Explicit mounts and port mappings
    #[serde(default)]
    pub bindings: Option<Vec<Binding>>,

    /// Network mode of the container
    #[serde(default)]
    pub network_mode: NetworkMode,

    /// Bounds on runtime calls
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docker: DockerConfig::default(),
            image: default_image(),
            port: None,
            config_dir: None,
            bindings: None,
            network_mode: NetworkMode::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] if the file cannot be read or is not a
    /// valid configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Bindings applied to the container.
    ///
    /// Explicit `bindings` win. Otherwise the generated configuration file is
    /// mounted read-only when `configDir` is set, and `port` is published
    /// when set.
    pub fn effective_bindings(&self) -> Vec<Binding> {
        if let Some(bindings) = &self.bindings {
            return bindings.clone();
        }

        let mut bindings = Vec::new();
        if let Some(dir) = &self.config_dir {
            bindings.push(Binding::read_only_mount(
                dir.join(CONFIG_FILE_NAME),
                CONTAINER_CONFIG_PATH,
            ));
        }
        if let Some(port) = self.port {
            bindings.push(Binding::tcp_port(port));
        }
        bindings
    }

    /// Build the container spec the controller is constructed with
    pub fn container_spec(&self) -> ContainerSpec {
        ContainerSpec {
            image: self.image.clone(),
            bindings: self.effective_bindings(),
            network_mode: self.network_mode.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse_from_str("{}").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.image, DEFAULT_IMAGE);
        assert_eq!(config.network_mode, NetworkMode::Host);
        assert_eq!(config.timeouts.operation(), Duration::from_secs(30));
        assert!(config.effective_bindings().is_empty());
    }

    #[test]
    fn test_port_and_config_dir_derive_bindings() {
        let config = Config::parse_from_str(
            r#"{ "port": 8080, "configDir": "/tmp/nginx-switch-x", "networkMode": "bridge" }"#,
        )
        .unwrap();

        let spec = config.container_spec();
        assert_eq!(spec.network_mode, NetworkMode::Bridge);
        assert_eq!(
            spec.bindings,
            vec![
                Binding::read_only_mount(
                    "/tmp/nginx-switch-x/nginx.conf",
                    "/etc/nginx/nginx.conf"
                ),
                Binding::tcp_port(8080),
            ]
        );
    }

    #[test]
    fn test_explicit_bindings_replace_derived_ones() {
        let config = Config::parse_from_str(
            r#"{
                "port": 80,
                "configDir": "/ignored",
                "bindings": [{ "type": "mount", "source": "/srv/conf.d", "target": "/etc/nginx/conf.d" }]
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.effective_bindings(),
            vec![Binding::Mount {
                source: PathBuf::from("/srv/conf.d"),
                target: "/etc/nginx/conf.d".to_string(),
                read_only: false,
            }]
        );
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = Config::parse_from_str("{ image: ").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
