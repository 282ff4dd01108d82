use crate::config::Config;
use crate::error::{Error, Result};
use crate::server::Binding;
use std::collections::HashSet;

/// Validates container bindings
pub fn validate_bindings(bindings: &[Binding]) -> Result<()> {
    let mut targets = HashSet::new();
    let mut ports = HashSet::new();

    for binding in bindings {
        match binding {
            Binding::Mount { target, .. } => {
                if !target.starts_with('/') {
                    return Err(Error::ConfigInvalid(format!(
                        "Mount target '{}' must be an absolute path",
                        target
                    )));
                }
                if !targets.insert(target.as_str()) {
                    return Err(Error::ConfigInvalid(format!(
                        "Mount target '{}' is bound more than once",
                        target
                    )));
                }
            }
            Binding::Port {
                container_port,
                host_port,
                protocol,
            } => {
                if *container_port == 0 || *host_port == Some(0) {
                    return Err(Error::ConfigInvalid("Port 0 cannot be published".to_string()));
                }
                if !ports.insert((*container_port, *protocol)) {
                    return Err(Error::ConfigInvalid(format!(
                        "Port {}/{} is published more than once",
                        container_port, protocol
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Full configuration validation
pub fn validate_config(config: &Config) -> Result<()> {
    if config.image.trim().is_empty() {
        return Err(Error::ConfigInvalid("Image reference is empty".to_string()));
    }

    if config.config_dir.is_none() && config.bindings.is_none() {
        return Err(Error::ConfigInvalid(
            "Either configDir or bindings must be set, otherwise nginx runs without configuration"
                .to_string(),
        ));
    }

    if config.docker.socket_path.is_some() && config.docker.host.is_some() {
        tracing::warn!("Both docker.socketPath and docker.host are set; host takes precedence");
    }

    if config.timeouts.pull_secs == 0 || config.timeouts.operation_secs == 0 {
        return Err(Error::ConfigInvalid("Timeouts must be greater than zero".to_string()));
    }

    validate_bindings(&config.effective_bindings())
}
