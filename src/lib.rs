/*!
 # nginx-switch

 A Rust library for running and controlling an nginx server inside a Docker container.

 ## Overview

 nginx-switch provides functionality to:
 - Pull the nginx image and create its container with the generated configuration mounted
 - Start, stop, restart and reload the server through a guarded state machine
 - Notify a host UI about every status change
 - Remove the container when the host exits

 ## Basic Usage

 ```no_run
 use nginx_switch::{Result, ServerController};
 use nginx_switch::presentation::{ActionState, Intent, dispatch, shutdown};
 use std::sync::Arc;

 #[tokio::main]
 async fn main() -> Result<()> {
     // Create a controller from config file
     let controller = ServerController::from_config_file("nginx-switch.json")?;

     // Keep menu state in sync with the controller
     let actions = Arc::new(ActionState::new(controller.status()));
     controller.subscribe_shared(actions.clone());

     // Forward user intents
     dispatch(&controller, Intent::Start).await?;
     dispatch(&controller, Intent::Reload).await?;

     println!("Stop enabled: {}", actions.is_enabled(Intent::Stop));

     // Remove the container before exiting
     shutdown(&controller).await;
     Ok(())
 }
 ```

 ## Features

 - **Lifecycle Control**: Start, stop, restart and reload with status guards
 - **Container Reuse**: The image is pulled and the container created once per process
 - **Notifications**: Typed, ordered status change observers
 - **Configuration**: JSON config files with sensible defaults
 - **Bounded Calls**: Every Docker call is subject to a timeout

 ## License

 This project is licensed under the MIT license.
*/

pub mod config;
pub mod error;
pub mod presentation;
pub mod runtime;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
pub use runtime::{ContainerId, ContainerRuntime, DockerRuntime};
pub use server::{ServerController, ServerStatus, StatusChanged, StatusObserver};
