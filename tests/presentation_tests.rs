mod common;

use common::*;
use nginx_switch::error::{Error, Result};
use nginx_switch::presentation::{ActionState, Intent, IntentAvailability, dispatch, shutdown};
use nginx_switch::server::ServerStatus;
use std::sync::Arc;

#[tokio::test]
async fn test_menu_follows_controller() -> Result<()> {
    let mut runtime = MockRuntime::new();
    expect_pull_and_create(&mut runtime);
    runtime
        .expect_start_container()
        .times(1)
        .returning(|_| Ok(()));
    runtime
        .expect_kill_container()
        .withf(|id, signal| is_c1(id) && *signal == 1)
        .times(1)
        .returning(|_, _| Ok(()));
    runtime
        .expect_stop_container()
        .times(1)
        .returning(|_| Ok(()));

    let controller = controller(runtime);
    let actions = Arc::new(ActionState::new(controller.status()));
    controller.subscribe_shared(actions.clone());

    assert_eq!(
        actions.availability(),
        IntentAvailability::for_status(ServerStatus::Stopped)
    );

    dispatch(&controller, Intent::Start).await?;
    assert!(!actions.is_enabled(Intent::Start));
    assert!(actions.is_enabled(Intent::Stop));
    assert!(actions.is_enabled(Intent::Restart));
    assert!(actions.is_enabled(Intent::Reload));

    dispatch(&controller, Intent::Reload).await?;
    assert!(actions.is_enabled(Intent::Reload));

    dispatch(&controller, Intent::Stop).await?;
    assert!(actions.is_enabled(Intent::Start));
    assert!(!actions.is_enabled(Intent::Stop));
    Ok(())
}

#[tokio::test]
async fn test_disabled_intent_is_rejected() {
    let controller = controller(MockRuntime::new());

    let err = dispatch(&controller, Intent::Restart).await.unwrap_err();

    assert!(matches!(err, Error::InvalidTransition { operation: "restart", .. }));
}

#[tokio::test]
async fn test_actions_disabled_while_operation_in_flight() -> Result<()> {
    let mut runtime = MockRuntime::new();
    expect_pull_and_create(&mut runtime);
    runtime
        .expect_start_container()
        .times(1)
        .returning(|_| Ok(()));

    let controller = controller(runtime);
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    controller.subscribe(move |event: &nginx_switch::StatusChanged| {
        sink.lock()
            .unwrap()
            .push(IntentAvailability::for_status(event.status));
    });

    dispatch(&controller, Intent::Start).await?;

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            IntentAvailability::for_status(ServerStatus::Starting),
            IntentAvailability::for_status(ServerStatus::Running),
        ]
    );
    assert!(Intent::ALL.iter().all(|i| !seen[0].is_enabled(*i)));
    Ok(())
}

#[tokio::test]
async fn test_shutdown_swallows_clean_failure() -> Result<()> {
    let mut runtime = MockRuntime::new();
    expect_pull_and_create(&mut runtime);
    runtime
        .expect_start_container()
        .times(1)
        .returning(|_| Ok(()));
    runtime
        .expect_remove_container()
        .times(1)
        .returning(|_, _| Err(Error::RuntimeUnavailable("daemon gone".to_string())));

    let controller = controller(runtime);
    dispatch(&controller, Intent::Start).await?;

    shutdown(&controller).await;

    // Removal failed, so the container is still recorded
    assert!(controller.container_id().is_some());
    Ok(())
}
