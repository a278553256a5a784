//! Daemon mode: start the controller and log health changes until a
//! shutdown signal arrives.

use tracing::info;

use surfcontrol_core::{Controller, HealthState};

use crate::error::CliError;

pub async fn handle(controller: &Controller) -> Result<(), CliError> {
    controller.start().await?;
    info!(generation = %controller.active_generation(), "surfcontrol running");

    let mut snapshots = controller.snapshots();
    let mut last: Option<HealthState> = None;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                if last != Some(snap.health.overall) {
                    info!(
                        health = %snap.health.overall,
                        radios = snap.radios.len(),
                        devices = snap.devices.len(),
                        "core health changed"
                    );
                    last = Some(snap.health.overall);
                }
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
