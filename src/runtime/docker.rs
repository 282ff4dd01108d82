use super::{ContainerId, ContainerRuntime, PullProgress, PullStream};
use crate::config::DockerConfig;
use crate::error::{Error, Result};
use crate::server::ContainerSpec;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, KillContainerOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding};
use bollard::{API_DEFAULT_VERSION, Docker};
use futures::StreamExt;
use std::collections::HashMap;
use uuid::Uuid;

/// Label set on every container this crate creates. Its value is the name prefix.
pub const MANAGED_LABEL: &str = "nginx-switch.managed";

/// [`ContainerRuntime`] backed by the Docker Engine API.
///
/// One runtime creates at most one container at a time, always under the same
/// name. A create that timed out on our side but completed in the daemon is
/// adopted by the next create instead of leaving an orphan behind.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
    name_prefix: String,
    container_name: String,
}

impl DockerRuntime {
    /// Connect to the Docker daemon described by `config`.
    ///
    /// An explicit `host` wins over `socketPath`. With neither set, the
    /// local defaults apply (`DOCKER_HOST`, then `/var/run/docker.sock`).
    /// Connecting does not contact the daemon; the first request does.
    #[tracing::instrument(skip(config))]
    pub fn connect(config: &DockerConfig) -> Result<Self> {
        let docker = if let Some(host) = &config.host {
            tracing::debug!(host = %host, "Connecting to Docker over HTTP");
            Docker::connect_with_http(host, config.api_timeout_secs, API_DEFAULT_VERSION)
        } else if let Some(path) = &config.socket_path {
            tracing::debug!(socket = %path.display(), "Connecting to Docker socket");
            Docker::connect_with_socket(
                &path.to_string_lossy(),
                config.api_timeout_secs,
                API_DEFAULT_VERSION,
            )
        } else {
            tracing::debug!("Connecting to Docker with local defaults");
            Docker::connect_with_local_defaults()
        }
        .map_err(|e| Error::RuntimeUnavailable(format!("Failed to connect to Docker: {}", e)))?;

        Ok(Self::new(docker, config.name_prefix.clone()))
    }

    /// Wrap an existing bollard client
    pub fn new(docker: Docker, name_prefix: String) -> Self {
        let container_name = format!("{}-{}", name_prefix, Uuid::new_v4().simple());
        Self {
            docker,
            name_prefix,
            container_name,
        }
    }

    /// Name given to the container this runtime creates
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Identifier of the existing container carrying our name
    async fn adopt_existing(&self) -> Result<ContainerId> {
        let existing = self
            .docker
            .inspect_container(&self.container_name, None::<InspectContainerOptions>)
            .await
            .map_err(classify)?;

        let id = existing.id.ok_or_else(|| {
            Error::RuntimeOperationFailed(format!(
                "Container '{}' exists but has no id",
                self.container_name
            ))
        })?;
        tracing::warn!(
            container = %self.container_name,
            container_id = %id,
            "Adopting container left over from an earlier create"
        );
        Ok(ContainerId::new(id))
    }
}

/// Append `:latest` when the reference carries neither tag nor digest,
/// otherwise Docker pulls every tag of the repository.
fn image_with_tag(image: &str) -> String {
    let name = image.rsplit('/').next().unwrap_or(image);
    if name.contains(':') || name.contains('@') {
        image.to_string()
    } else {
        format!("{}:latest", image)
    }
}

/// Split bollard errors into "engine said no" and "could not reach engine".
fn classify(err: DockerError) -> Error {
    match err {
        DockerError::DockerResponseServerError {
            status_code,
            message,
        } => Error::RuntimeOperationFailed(format!("{} ({})", message, status_code)),
        DockerError::RequestTimeoutError => {
            Error::Timeout("Docker request timed out".to_string())
        }
        other => Error::RuntimeUnavailable(other.to_string()),
    }
}

fn status_code(err: &DockerError) -> Option<u16> {
    match err {
        DockerError::DockerResponseServerError { status_code, .. } => Some(*status_code),
        _ => None,
    }
}

fn create_config(spec: &ContainerSpec, name_prefix: &str) -> Config<String> {
    let mappings = spec.port_mappings();

    let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
    let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
    for (key, host_port) in mappings {
        exposed_ports.insert(key.clone(), HashMap::new());
        port_bindings
            .entry(key)
            .or_insert_with(|| Some(Vec::new()))
            .get_or_insert_with(Vec::new)
            .push(PortBinding {
                host_ip: None,
                host_port: Some(host_port.to_string()),
            });
    }

    let binds = spec.binds();

    Config {
        image: Some(spec.image.clone()),
        labels: Some(HashMap::from([(
            MANAGED_LABEL.to_string(),
            name_prefix.to_string(),
        )])),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        host_config: Some(HostConfig {
            binds: (!binds.is_empty()).then_some(binds),
            port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
            network_mode: Some(spec.network_mode.as_str().to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    fn pull_image(&self, image: &str) -> PullStream {
        let docker = self.docker.clone();
        let from_image = image_with_tag(image);

        Box::pin(async_stream::stream! {
            let options = CreateImageOptions {
                from_image: from_image.clone(),
                ..Default::default()
            };
            let mut stream = docker.create_image(Some(options), None, None);

            while let Some(item) = stream.next().await {
                match item {
                    Ok(info) if info.error.is_some() => {
                        let msg = info.error.unwrap_or_default();
                        yield Err(Error::ImagePullFailed(format!("{}: {}", from_image, msg)));
                        break;
                    }
                    Ok(info) => {
                        yield Ok(PullProgress {
                            layer: info.id,
                            status: info.status,
                            progress: info.progress,
                        });
                    }
                    Err(e) => {
                        let is_stream_error = matches!(e, DockerError::DockerStreamError { .. });
                        let err = match classify(e) {
                            Error::RuntimeUnavailable(msg) if is_stream_error => {
                                Error::ImagePullFailed(format!("{}: {}", from_image, msg))
                            }
                            Error::RuntimeOperationFailed(msg) => {
                                Error::ImagePullFailed(format!("{}: {}", from_image, msg))
                            }
                            other => other,
                        };
                        yield Err(err);
                        break;
                    }
                }
            }
        })
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        let options = CreateContainerOptions {
            name: self.container_name.clone(),
            platform: None,
        };

        let response = match self
            .docker
            .create_container(Some(options), create_config(spec, &self.name_prefix))
            .await
        {
            Ok(response) => response,
            // 409: a container with our name survived an earlier timed-out create
            Err(e) if status_code(&e) == Some(409) => return self.adopt_existing().await,
            Err(e) => return Err(classify(e)),
        };

        for warning in &response.warnings {
            tracing::warn!(warning = %warning, "Docker warning while creating container");
        }

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        match self
            .docker
            .start_container(id.as_str(), None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            // 304: already started
            Err(e) if status_code(&e) == Some(304) => Ok(()),
            Err(e) => Err(classify(e)),
        }
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<()> {
        match self
            .docker
            .stop_container(id.as_str(), None::<StopContainerOptions>)
            .await
        {
            Ok(()) => Ok(()),
            // 304: already stopped
            Err(e) if status_code(&e) == Some(304) => Ok(()),
            Err(e) => Err(classify(e)),
        }
    }

    async fn kill_container(&self, id: &ContainerId, signal: i32) -> Result<()> {
        let options = KillContainerOptions {
            signal: signal.to_string(),
        };
        self.docker
            .kill_container(id.as_str(), Some(options))
            .await
            .map_err(classify)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        match self.docker.remove_container(id.as_str(), Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if status_code(&e) == Some(404) => {
                tracing::debug!(container_id = %id, "Container already removed");
                Ok(())
            }
            Err(e) => Err(classify(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{Binding, NetworkMode};

    #[test]
    fn test_image_with_tag() {
        assert_eq!(image_with_tag("nginx"), "nginx:latest");
        assert_eq!(image_with_tag("nginx:stable"), "nginx:stable");
        assert_eq!(
            image_with_tag("localhost:5000/nginx"),
            "localhost:5000/nginx:latest"
        );
        assert_eq!(image_with_tag("nginx@sha256:abc"), "nginx@sha256:abc");
    }

    #[test]
    fn test_create_config_maps_bindings() {
        let spec = ContainerSpec {
            image: "nginx:stable".to_string(),
            bindings: vec![
                Binding::read_only_mount("/tmp/nginx.conf", "/etc/nginx/nginx.conf"),
                Binding::tcp_port(80),
            ],
            network_mode: NetworkMode::Host,
        };

        let config = create_config(&spec, "switch");
        let host = config.host_config.unwrap();

        assert_eq!(
            config.labels.as_ref().and_then(|labels| labels.get(MANAGED_LABEL)),
            Some(&"switch".to_string())
        );
        assert_eq!(config.image.as_deref(), Some("nginx:stable"));
        assert_eq!(
            host.binds,
            Some(vec!["/tmp/nginx.conf:/etc/nginx/nginx.conf:ro".to_string()])
        );
        assert_eq!(host.network_mode.as_deref(), Some("host"));

        let ports = host.port_bindings.unwrap();
        let binding = ports["80/tcp"].as_ref().unwrap();
        assert_eq!(binding[0].host_port.as_deref(), Some("80"));
        assert!(config.exposed_ports.unwrap().contains_key("80/tcp"));
    }

    #[tokio::test]
    async fn test_container_name_is_stable_per_runtime() {
        let docker =
            Docker::connect_with_http("http://127.0.0.1:2375", 5, API_DEFAULT_VERSION).unwrap();
        let runtime = DockerRuntime::new(docker.clone(), "switch".to_string());
        let other = DockerRuntime::new(docker, "switch".to_string());

        assert!(runtime.container_name().starts_with("switch-"));
        // A retried create reuses the name, so a leftover container conflicts
        assert_eq!(runtime.clone().container_name(), runtime.container_name());
        assert_ne!(runtime.container_name(), other.container_name());
    }

    #[test]
    fn test_classify_server_error() {
        let err = classify(DockerError::DockerResponseServerError {
            status_code: 409,
            message: "conflict".to_string(),
        });
        assert!(matches!(err, Error::RuntimeOperationFailed(_)));
    }
}
