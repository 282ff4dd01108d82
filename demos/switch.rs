use nginx_switch::error::Result;
use nginx_switch::presentation::{ActionState, Intent, dispatch, shutdown};
use nginx_switch::server::ChannelObserver;
use nginx_switch::{Config, ServerController};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    // `RUST_LOG=nginx_switch=debug` shows status changes and pull progress
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/config.json".to_string());
    tracing::info!(config = %config_path, "Starting switch demo");

    let config = Config::from_file(&config_path)?;
    let controller = Arc::new(ServerController::from_config(&config)?);

    let actions = Arc::new(ActionState::new(controller.status()));
    controller.subscribe_shared(actions.clone());

    let (observer, mut events) = ChannelObserver::new();
    controller.subscribe(observer);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("nginx: {} -> {}", event.previous, event.status);
        }
    });

    if let Err(e) = dispatch(&controller, Intent::Start).await {
        eprintln!("Failed to start nginx: {}", e);
        shutdown(&controller).await;
        return Err(e);
    }

    println!("nginx is running. Send SIGHUP to reload, Ctrl-C to quit.");

    let mut hangup = signal(SignalKind::hangup())
        .map_err(|e| nginx_switch::Error::Other(format!("Failed to install SIGHUP handler: {}", e)))?;

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                if actions.is_enabled(Intent::Reload) {
                    if let Err(e) = dispatch(&controller, Intent::Reload).await {
                        eprintln!("Reload failed: {}", e);
                    }
                } else {
                    println!("Reload is not available right now");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if actions.is_enabled(Intent::Stop) {
        if let Err(e) = dispatch(&controller, Intent::Stop).await {
            eprintln!("Stop failed: {}", e);
        }
    }
    shutdown(&controller).await;

    println!("Container removed, bye.");
    Ok(())
}
