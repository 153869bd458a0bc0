mod bridge;
mod cli;
mod config;
mod discovery;
mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Report, WrapErr};
use rumqttc::{AsyncClient, Event, Incoming, Outgoing};
use smartblinds::{BluetoothSession, SessionConfig, SessionManager, StartOptions};

use crate::bridge::Bridge;
use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Report> {
    stable_eyre::install()?;
    color_backtrace::install();

    let cli = Cli::parse();
    match cli.command {
        Command::ListAdapters => list_adapters().await,
        Command::Start {
            config,
            debug,
            verbose,
        } => {
            init_logging(debug, verbose);
            start(&config).await
        }
    }
}

fn init_logging(debug: bool, verbose: bool) {
    let default_filter = if verbose {
        "trace"
    } else if debug {
        "debug"
    } else {
        "info"
    };
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_owned()))
        .init();
}

async fn list_adapters() -> Result<(), Report> {
    pretty_env_logger::init();
    let (dbus_handle, bt_session) = BluetoothSession::new()
        .await
        .wrap_err("connecting to the system D-Bus")?;
    tokio::spawn(dbus_handle);

    for adapter in bt_session.get_adapters().await.wrap_err("listing adapters")? {
        println!("{}", adapter.id);
    }
    Ok(())
}

/// Run the bridge until a termination signal is received, then tear everything down in the
/// order spec.md §5 requires: bridge disposed (all devices' "offline" published), MQTT
/// disconnected, session manager disposed.
async fn start(config_path: &str) -> Result<(), Report> {
    let config = Config::from_file(config_path)?;
    let blinds = config.smart_blinds.resolved_blinds()?;

    let (dbus_handle, bt_session) = BluetoothSession::new()
        .await
        .wrap_err("connecting to the system D-Bus")?;

    let session_manager = Arc::new(SessionManager::new(
        bt_session.clone(),
        SessionConfig {
            max_connect_retries: config.smart_blinds.max_connect_retries,
            discovery_poll_interval: config.bluetooth.device_discovery_interval(),
            connect_retry_interval: config.smart_blinds.connect_retry_interval(),
        },
    ));

    let (mqtt_client, mut event_loop) = AsyncClient::new(config.mqtt.mqtt_options(), 64);
    let bridge = Arc::new(Bridge::new(mqtt_client.clone(), config.homeassistant.clone()));

    for blind in &blinds {
        let supervisor = smartblinds::BlindDeviceSupervisor::new(
            blind.mac,
            blind.passkey.clone(),
            config.smart_blinds.max_unlock_retries,
            bt_session.clone(),
            Arc::downgrade(&session_manager),
            bridge.clone(),
        );
        bridge.register(blind.mac, blind.name.clone(), supervisor.clone());
        session_manager
            .add_device(blind.mac, supervisor as Arc<dyn smartblinds::DeviceHandle>)
            .await;
    }

    bridge
        .publish_startup()
        .await
        .wrap_err("publishing MQTT discovery/availability and subscribing to command topics")?;

    // Signals once the event loop has actually written the disconnect frame to the wire, so
    // shutdown can wait for the "offline" publishes (and the disconnect itself) to flush instead
    // of racing them with `mqtt_task.abort()`.
    let (disconnected_tx, disconnected_rx) = tokio::sync::oneshot::channel();
    let mqtt_task = tokio::spawn({
        let bridge = bridge.clone();
        async move {
            let mut disconnected_tx = Some(disconnected_tx);
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        bridge.handle_incoming(publish).await;
                    }
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                        if let Some(tx) = disconnected_tx.take() {
                            let _ = tx.send(());
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        log::warn!("MQTT connection error: {}", err);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    });

    session_manager
        .start(StartOptions {
            adapter_name: config.adapter.name.clone(),
            desired_macs: blinds.iter().map(|blind| blind.mac).collect(),
            discovery_timeout: config.bluetooth.device_discovery_timeout(),
        })
        .await
        .wrap_err("starting BLE discovery")?;

    log::info!("bt2mqtt running with {} configured blind(s)", blinds.len());

    tokio::pin!(dbus_handle);
    tokio::select! {
        () = shutdown::wait_for_shutdown_signal() => {}
        result = &mut dbus_handle => {
            log::error!("lost the D-Bus connection: {:?}", result);
        }
    }

    log::info!("shutting down");
    bridge.publish_all_offline().await;
    mqtt_client
        .disconnect()
        .await
        .unwrap_or_else(|err| log::warn!("error disconnecting from MQTT broker: {}", err));
    // `disconnect()` only enqueues the request; wait for the event loop to actually write it (and,
    // transitively, the offline publishes queued ahead of it) to the wire before tearing it down.
    match tokio::time::timeout(Duration::from_secs(5), disconnected_rx).await {
        Ok(_) => mqtt_task.abort(),
        Err(_) => {
            log::warn!("timed out waiting for MQTT disconnect to flush, aborting anyway");
            mqtt_task.abort();
        }
    }
    session_manager
        .dispose()
        .await
        .unwrap_or_else(|err| log::warn!("error disposing session manager: {}", err));

    Ok(())
}
