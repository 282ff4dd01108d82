// Shared test doubles for the integration test crates.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use mockall::mock;
use nginx_switch::config::TimeoutConfig;
use nginx_switch::error::Result;
use nginx_switch::runtime::{ContainerId, ContainerRuntime, PullProgress, PullStream};
use nginx_switch::server::{
    Binding, ContainerSpec, NetworkMode, ServerController, ServerStatus, StatusChanged,
};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// Define a mock for the ContainerRuntime trait
mock! {
    pub Runtime {}

    #[async_trait]
    impl ContainerRuntime for Runtime {
        fn pull_image(&self, image: &str) -> PullStream;
        async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId>;
        async fn start_container(&self, id: &ContainerId) -> Result<()>;
        async fn stop_container(&self, id: &ContainerId) -> Result<()>;
        async fn kill_container(&self, id: &ContainerId, signal: i32) -> Result<()>;
        async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()>;
    }
}

pub const IMAGE: &str = "nginx:stable";

pub fn test_spec() -> ContainerSpec {
    ContainerSpec {
        image: IMAGE.to_string(),
        bindings: vec![Binding::read_only_mount(
            "/tmp/nginx-switch-test/nginx.conf",
            "/etc/nginx/nginx.conf",
        )],
        network_mode: NetworkMode::Host,
    }
}

pub fn controller<R: ContainerRuntime>(runtime: R) -> ServerController<R> {
    ServerController::new(runtime, test_spec(), TimeoutConfig::default())
}

/// A pull that reports two layers and completes
pub fn successful_pull() -> PullStream {
    let progress: Vec<Result<PullProgress>> = vec![
        Ok(PullProgress {
            layer: Some("a1b2".to_string()),
            status: Some("Downloading".to_string()),
            progress: Some("[=====>   ]".to_string()),
        }),
        Ok(PullProgress {
            layer: Some("a1b2".to_string()),
            status: Some("Pull complete".to_string()),
            progress: None,
        }),
    ];
    Box::pin(stream::iter(progress))
}

pub fn is_c1(id: &ContainerId) -> bool {
    id.as_str() == "c1"
}

/// Expect one pull and one create returning `c1`
pub fn expect_pull_and_create(runtime: &mut MockRuntime) {
    runtime
        .expect_pull_image()
        .withf(|image| image == IMAGE)
        .times(1)
        .returning(|_| successful_pull());
    runtime
        .expect_create_container()
        .withf(|spec| spec.image == IMAGE)
        .times(1)
        .returning(|_| Ok(ContainerId::new("c1")));
}

/// Record every status the controller reports
pub fn record_statuses<R: ContainerRuntime>(
    controller: &ServerController<R>,
) -> Arc<Mutex<Vec<ServerStatus>>> {
    let history = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&history);
    controller.subscribe(move |event: &StatusChanged| {
        sink.lock().unwrap().push(event.status);
    });
    history
}

/// Take everything recorded so far
pub fn drain(history: &Arc<Mutex<Vec<ServerStatus>>>) -> Vec<ServerStatus> {
    std::mem::take(&mut *history.lock().unwrap())
}

/// Runtime call that [`GatedRuntime`] holds back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Start,
    Stop,
    Kill,
    Remove,
}

/// Wraps a mock and parks one kind of call until the test opens the gate.
///
/// `entered` is notified when the parked call arrives, so a test can act
/// while the controller is mid-operation.
pub struct GatedRuntime {
    inner: MockRuntime,
    gate: Gate,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GatedRuntime {
    pub fn new(inner: MockRuntime, gate: Gate) -> Self {
        Self {
            inner,
            gate,
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    async fn pass(&self, gate: Gate) {
        if self.gate == gate {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl ContainerRuntime for GatedRuntime {
    fn pull_image(&self, image: &str) -> PullStream {
        self.inner.pull_image(image)
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        self.inner.create_container(spec).await
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        self.pass(Gate::Start).await;
        self.inner.start_container(id).await
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<()> {
        self.pass(Gate::Stop).await;
        self.inner.stop_container(id).await
    }

    async fn kill_container(&self, id: &ContainerId, signal: i32) -> Result<()> {
        self.pass(Gate::Kill).await;
        self.inner.kill_container(id, signal).await
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()> {
        self.pass(Gate::Remove).await;
        self.inner.remove_container(id, force).await
    }
}
