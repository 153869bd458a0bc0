//! SIGINT/SIGTERM/SIGQUIT handling.
//!
//! Waits for the first of the three signals, then resolves. A second SIGINT received while the
//! caller is still tearing down forces an immediate process exit, since the orderly shutdown
//! sequence (bridge dispose, offline publication, MQTT disconnect, session dispose) is itself
//! just a sequence of awaits that a stuck daemon call could hang forever.

use tokio::signal::unix::{signal, SignalKind};

/// Resolves once SIGINT, SIGTERM or SIGQUIT is received. While awaited a second time (i.e. called
/// again after the caller starts its shutdown sequence), a second SIGINT exits the process
/// immediately rather than resolving normally.
pub async fn wait_for_shutdown_signal() {
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigquit = signal(SignalKind::quit()).expect("failed to install SIGQUIT handler");

    tokio::select! {
        _ = sigint.recv() => log::info!("received SIGINT, shutting down"),
        _ = sigterm.recv() => log::info!("received SIGTERM, shutting down"),
        _ = sigquit.recv() => log::info!("received SIGQUIT, shutting down"),
    }

    tokio::spawn(async move {
        sigint.recv().await;
        log::warn!("received a second SIGINT during shutdown, exiting immediately");
        std::process::exit(130);
    });
}
