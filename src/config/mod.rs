//! Configuration module for nginx-switch.
//!
//! This module handles parsing, validation, and access to the settings the
//! lifecycle controller is built from: how to reach Docker, which image to
//! run, what to mount and publish, and how long runtime calls may take.
//! Configurations are JSON, loaded from a file or a string.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use nginx_switch::config::{Config, validate_config};
//!
//! let config = Config::from_file("nginx-switch.json").unwrap();
//! validate_config(&config).unwrap();
//! println!("Managing image {}", config.image);
//! ```
//!
//! Creating a configuration programmatically:
//!
//! ```
//! use nginx_switch::config::Config;
//! use nginx_switch::server::NetworkMode;
//!
//! let config = Config {
//!     port: Some(8080),
//!     network_mode: NetworkMode::Bridge,
//!     ..Config::default()
//! };
//! assert_eq!(config.container_spec().port_mappings(), vec![("8080/tcp".to_string(), 8080)]);
//! ```
mod parser;
pub mod validator;

pub use parser::{
    CONFIG_FILE_NAME, CONTAINER_CONFIG_PATH, Config, DEFAULT_IMAGE, DockerConfig, TimeoutConfig,
};
pub use validator::validate_config;
