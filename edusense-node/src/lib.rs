use std::sync::Arc;

use crate::app::{build_sensors, create_app};
use crate::configs::settings::Settings;
use crate::errors::NodeError;

pub mod app;
pub mod configs;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;

pub async fn run(settings: &Arc<Settings>) -> Result<(), NodeError> {
    let app = Arc::new(create_app(settings).await?);

    // publish whatever an earlier run left in the local queue
    app.flush().await;

    let scheduler = app.schedule(build_sensors(settings)?)?;
    tracing::info!(
        "node {} in room {} running jobs {:?}",
        settings.node.device,
        settings.node.room,
        scheduler.job_names()
    );

    shutdown_signal().await?;
    tracing::info!("shutting down");

    scheduler.shutdown().await;
    app.flush().await;
    app.stop().await;

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<(), NodeError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }

    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<(), NodeError> {
    tokio::signal::ctrl_c().await?;

    Ok(())
}
