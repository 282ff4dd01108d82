use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Transport protocol of a published port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP
    #[default]
    Tcp,
    /// UDP
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

/// A bind mount or port mapping applied when the container is created.
///
/// # JSON
///
/// ```json
/// [
///   { "type": "mount", "source": "/tmp/nginx/nginx.conf", "target": "/etc/nginx/nginx.conf", "readOnly": true },
///   { "type": "port", "containerPort": 80, "hostPort": 8080 }
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Binding {
    /// Bind-mount a host path into the container
    Mount {
        /// Path on the host
        source: PathBuf,
        /// Absolute path inside the container
        target: String,
        /// Mount read-only
        #[serde(default)]
        read_only: bool,
    },
    /// Publish a container port on the host
    Port {
        /// Port inside the container
        container_port: u16,
        /// Port on the host, defaults to the container port
        #[serde(default)]
        host_port: Option<u16>,
        /// Protocol of the port
        #[serde(default)]
        protocol: Protocol,
    },
}

impl Binding {
    /// Read-only bind mount of `source` at `target`
    pub fn read_only_mount(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Binding::Mount {
            source: source.into(),
            target: target.into(),
            read_only: true,
        }
    }

    /// TCP port published on the same host port
    pub fn tcp_port(port: u16) -> Self {
        Binding::Port {
            container_port: port,
            host_port: Some(port),
            protocol: Protocol::Tcp,
        }
    }

    /// Docker `-v` style bind string, `None` for port mappings
    pub fn bind_string(&self) -> Option<String> {
        match self {
            Binding::Mount {
                source,
                target,
                read_only,
            } => {
                let mode = if *read_only { ":ro" } else { "" };
                Some(format!("{}:{}{}", source.display(), target, mode))
            }
            Binding::Port { .. } => None,
        }
    }

    /// Docker port key (`80/tcp`) and host port, `None` for mounts
    pub fn port_mapping(&self) -> Option<(String, u16)> {
        match self {
            Binding::Port {
                container_port,
                host_port,
                protocol,
            } => Some((
                format!("{}/{}", container_port, protocol),
                host_port.unwrap_or(*container_port),
            )),
            Binding::Mount { .. } => None,
        }
    }
}

/// Network mode of the managed container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkMode {
    /// Share the host's network stack
    #[default]
    Host,
    /// Default Docker bridge network
    Bridge,
    /// No networking
    None,
    /// A named user-defined network
    Custom(String),
}

impl NetworkMode {
    /// Value passed to Docker's `NetworkMode` host setting
    pub fn as_str(&self) -> &str {
        match self {
            NetworkMode::Host => "host",
            NetworkMode::Bridge => "bridge",
            NetworkMode::None => "none",
            NetworkMode::Custom(name) => name,
        }
    }
}

impl From<String> for NetworkMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "host" => NetworkMode::Host,
            "bridge" => NetworkMode::Bridge,
            "none" => NetworkMode::None,
            _ => NetworkMode::Custom(value),
        }
    }
}

impl From<NetworkMode> for String {
    fn from(value: NetworkMode) -> Self {
        value.as_str().to_string()
    }
}

/// Everything needed to create the managed container.
///
/// Built once from configuration and never modified afterwards.
///
/// # Examples
///
/// ```
/// use nginx_switch::server::{Binding, ContainerSpec, NetworkMode};
///
/// let spec = ContainerSpec {
///     image: "nginx:stable".to_string(),
///     bindings: vec![Binding::read_only_mount("/tmp/nginx.conf", "/etc/nginx/nginx.conf")],
///     network_mode: NetworkMode::Host,
/// };
/// assert_eq!(spec.binds(), vec!["/tmp/nginx.conf:/etc/nginx/nginx.conf:ro".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    /// Image reference, e.g. `nginx:stable`
    pub image: String,
    /// Mounts and port mappings, in order
    #[serde(default)]
    pub bindings: Vec<Binding>,
    /// Network mode
    #[serde(default)]
    pub network_mode: NetworkMode,
}

impl ContainerSpec {
    /// Bind strings for all mounts, in binding order
    pub fn binds(&self) -> Vec<String> {
        self.bindings.iter().filter_map(Binding::bind_string).collect()
    }

    /// Port keys and host ports for all port mappings, in binding order
    pub fn port_mappings(&self) -> Vec<(String, u16)> {
        self.bindings.iter().filter_map(Binding::port_mapping).collect()
    }
}
