//! Adapter selection, device discovery, and per-device connection lifecycle.
//!
//! [`SessionManager`] owns the single Bluetooth adapter the bridge uses, the command queue that
//! serializes GATT writes across every device on it, and the per-MAC reconnect retry counters. It
//! never owns a `BlindDevice` directly: callers register a [`DeviceHandle`] per MAC and the
//! manager calls back into it as D-Bus events arrive, which keeps the adapter/device ownership
//! acyclic (the handle impl holds a `Weak<SessionManager>` if it needs to call back in, e.g. to
//! enqueue writes or request a reconnect).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bluez_async::{
    AdapterId, BluetoothError, BluetoothEvent, BluetoothSession, CharacteristicId, DeviceEvent,
    DeviceId, DiscoveryFilter, MacAddress, Transport,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::queue::{CommandQueue, QueuedCommand};

/// Errors raised by [`SessionManager`] itself, as opposed to the underlying D-Bus transport.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no Bluetooth adapters were found on the system")]
    NoAdaptersFound,
    #[error("no adapter named {0:?} was found")]
    AdapterNotFound(String),
    #[error(transparent)]
    Bluetooth(#[from] BluetoothError),
}

/// Options for [`SessionManager::start`].
#[derive(Clone, Debug)]
pub struct StartOptions {
    /// Adapter to use, e.g. `"hci0"`. The first adapter on the system is used if unset.
    pub adapter_name: Option<String>,
    /// MAC addresses `start` waits to observe before returning (subject to `discovery_timeout`).
    pub desired_macs: Vec<MacAddress>,
    /// Wall-clock budget for `desired_macs` to appear. Discovery is left running past this point;
    /// `start` simply stops waiting and returns.
    pub discovery_timeout: Duration,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            adapter_name: None,
            desired_macs: Vec::new(),
            discovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Configuration governing the manager's reconnect policy.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Cap on `reconnect_device` attempts per MAC. `-1` means unlimited.
    pub max_connect_retries: i32,
    /// Delay between discovery-poll ticks while `start` is waiting for `desired_macs`.
    pub discovery_poll_interval: Duration,
    /// Delay `reconnect_device` waits before acting, so a persistently-failing device isn't
    /// hammered with back-to-back connect attempts.
    pub connect_retry_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_connect_retries: 5,
            discovery_poll_interval: Duration::from_millis(500),
            connect_retry_interval: Duration::from_secs(1),
        }
    }
}

/// Callback interface a registered device implements so the manager can reach it without owning
/// it. All methods are invoked with the manager's device-table lock already released, so an
/// implementation is free to call back into `SessionManager` (e.g. `execute_command`).
#[async_trait]
pub trait DeviceHandle: Send + Sync {
    /// The device has connected (or was already present when `start` observed it). `device_id`
    /// is not cached by the manager; implementations that need it again should hold onto it.
    async fn on_device_added(&self, device_id: DeviceId);
    /// A subscribed characteristic produced a new value.
    async fn on_characteristic_value(&self, id: &CharacteristicId, value: &[u8]);
    /// The underlying `Device1` reported an RSSI update.
    async fn on_rssi(&self, rssi: i16);
    /// The underlying `Device1` reported a disconnect.
    async fn on_disconnected(&self);
    /// The manager is disposing; release whatever resources this handle holds. Best-effort: the
    /// manager proceeds regardless of what this does.
    async fn dispose(&self);
}

struct Inner {
    adapter_id: Option<AdapterId>,
    devices: HashMap<MacAddress, Arc<dyn DeviceHandle>>,
    reconnect_attempts: HashMap<MacAddress, u32>,
    announced: HashSet<MacAddress>,
    discovery_stopped: bool,
    disposed: bool,
    event_task: Option<JoinHandle<()>>,
}

/// BLE session/connection lifecycle manager. See the module documentation.
pub struct SessionManager {
    bt_session: BluetoothSession,
    config: SessionConfig,
    command_queue: CommandQueue,
    inner: Arc<Mutex<Inner>>,
}

impl SessionManager {
    pub fn new(bt_session: BluetoothSession, config: SessionConfig) -> Self {
        Self {
            bt_session,
            config,
            command_queue: CommandQueue::new(),
            inner: Arc::new(Mutex::new(Inner {
                adapter_id: None,
                devices: HashMap::new(),
                reconnect_attempts: HashMap::new(),
                announced: HashSet::new(),
                discovery_stopped: false,
                disposed: false,
                event_task: None,
            })),
        }
    }

    /// Enumerate adapter names available on the system, e.g. `["hci0"]`.
    pub async fn get_adapters(&self) -> Result<Vec<String>, SessionError> {
        Ok(self
            .bt_session
            .get_adapters()
            .await?
            .into_iter()
            .map(|adapter| adapter.id.to_string())
            .collect())
    }

    /// Register a device by MAC. Duplicate registrations are ignored with a warning.
    pub async fn add_device(&self, mac: MacAddress, handle: Arc<dyn DeviceHandle>) {
        let mut inner = self.inner.lock().await;
        if inner.devices.contains_key(&mac) {
            log::warn!("ignoring duplicate registration for {}", mac);
            return;
        }
        inner.devices.insert(mac, handle);
    }

    /// Unregister a device by MAC and clear its reconnect counter.
    pub async fn remove_device(&self, mac: &MacAddress) {
        let mut inner = self.inner.lock().await;
        inner.devices.remove(mac);
        inner.reconnect_attempts.remove(mac);
        inner.announced.remove(mac);
    }

    /// Enqueue a command on the single-flight pump.
    pub async fn execute_command(&self, command: QueuedCommand) {
        self.command_queue.push(command).await;
    }

    /// Select an adapter, start LE discovery, and wait for every address in
    /// `options.desired_macs` to be observed (or for `options.discovery_timeout` to elapse).
    /// Discovery is left running either way.
    pub async fn start(&self, options: StartOptions) -> Result<(), SessionError> {
        let adapter_id = self.select_adapter(options.adapter_name.as_deref()).await?;
        {
            let mut inner = self.inner.lock().await;
            inner.adapter_id = Some(adapter_id.clone());
            inner.discovery_stopped = false;
        }

        self.bt_session
            .start_discovery_on_adapter_with_filter(
                &adapter_id,
                &DiscoveryFilter {
                    transport: Some(Transport::Le),
                    ..Default::default()
                },
            )
            .await?;

        self.spawn_event_listener().await;

        let desired: HashSet<MacAddress> = options.desired_macs.into_iter().collect();
        let deadline = tokio::time::Instant::now() + options.discovery_timeout;
        loop {
            let found = self.bt_session.get_devices_on_adapter(&adapter_id).await?;
            for device in &found {
                announce_if_new(&self.inner, device.id.clone(), device.mac_address).await;
            }
            let all_present = desired.iter().all(|mac| {
                found
                    .iter()
                    .any(|device| device.mac_address == *mac)
            });
            if all_present || desired.is_empty() {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                log::warn!(
                    "discovery timed out before all configured devices were found; continuing in the background"
                );
                break;
            }
            tokio::time::sleep(self.config.discovery_poll_interval).await;
        }

        Ok(())
    }

    async fn select_adapter(&self, adapter_name: Option<&str>) -> Result<AdapterId, SessionError> {
        let adapters = self.bt_session.get_adapters().await?;
        if adapters.is_empty() {
            return Err(SessionError::NoAdaptersFound);
        }
        match adapter_name {
            Some(name) => adapters
                .into_iter()
                .find(|adapter| adapter.id.to_string() == name)
                .map(|adapter| adapter.id)
                .ok_or_else(|| SessionError::AdapterNotFound(name.to_owned())),
            None => Ok(adapters.into_iter().next().unwrap().id),
        }
    }

    async fn spawn_event_listener(&self) {
        let already_running = {
            let inner = self.inner.lock().await;
            inner.event_task.is_some()
        };
        if already_running {
            return;
        }

        let bt_session = self.bt_session.clone();
        let stream = match bt_session.event_stream().await {
            Ok(stream) => stream,
            Err(err) => {
                log::error!("failed to subscribe to Bluetooth events: {}", err);
                return;
            }
        };

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            use futures::StreamExt;
            tokio::pin!(stream);
            while let Some(event) = stream.next().await {
                handle_bluetooth_event(&bt_session, &inner, event).await;
            }
        });

        self.inner.lock().await.event_task = Some(handle);
    }

    /// Stop discovery on the selected adapter. Idempotent.
    pub async fn stop_discovery(&self) -> Result<(), SessionError> {
        let adapter_id = {
            let mut inner = self.inner.lock().await;
            if inner.discovery_stopped {
                return Ok(());
            }
            inner.discovery_stopped = true;
            inner.adapter_id.clone()
        };
        if let Some(adapter_id) = adapter_id {
            self.bt_session.stop_discovery_on_adapter(&adapter_id).await?;
        }
        Ok(())
    }

    /// Increment the retry counter for `mac` and, if still under the configured cap, either
    /// re-announce the device directly (if it is still in the adapter's available set) or kick
    /// off a fresh discovery round. The counter is deliberately never reset on success (see
    /// module documentation); it is only cleared by `remove_device`.
    ///
    /// The actual reconnect attempt (after `connect_retry_interval`'s delay) runs on a spawned
    /// task rather than inline: `on_device_added` can itself call back into `reconnect_device` on
    /// failure, and a device that never manages to connect would otherwise both block whichever
    /// task called in (the shared event listener, in the common case) for the delay and grow its
    /// call stack by one frame per attempt.
    pub async fn reconnect_device(&self, mac: &MacAddress) {
        let (attempts, adapter_id) = {
            let mut inner = self.inner.lock().await;
            let attempts = inner.reconnect_attempts.entry(*mac).or_insert(0);
            *attempts += 1;
            (*attempts, inner.adapter_id.clone())
        };

        if self.config.max_connect_retries >= 0 && attempts as i32 > self.config.max_connect_retries {
            log::error!(
                "{} exhausted its reconnect attempts ({}), giving up",
                mac,
                self.config.max_connect_retries
            );
            return;
        }

        let Some(adapter_id) = adapter_id else {
            log::warn!("reconnect requested for {} before the session was started", mac);
            return;
        };

        let bt_session = self.bt_session.clone();
        let inner = self.inner.clone();
        let retry_interval = self.config.connect_retry_interval;
        let mac = *mac;
        tokio::spawn(async move {
            tokio::time::sleep(retry_interval).await;

            match bt_session.get_devices_on_adapter(&adapter_id).await {
                Ok(devices) => {
                    if let Some(device) = devices.iter().find(|device| device.mac_address == mac) {
                        inner.lock().await.announced.remove(&mac);
                        announce_if_new(&inner, device.id.clone(), mac).await;
                        return;
                    }
                }
                Err(err) => log::warn!("failed to list devices while reconnecting {}: {}", mac, err),
            }

            log::debug!("{} not currently visible, restarting discovery", mac);
            if let Err(err) = bt_session
                .start_discovery_on_adapter_with_filter(
                    &adapter_id,
                    &DiscoveryFilter {
                        transport: Some(Transport::Le),
                        ..Default::default()
                    },
                )
                .await
            {
                log::warn!("failed to restart discovery for {}: {}", mac, err);
            }
        });
    }

    /// Idempotent teardown: stops discovery, disposes every registered device, clears the
    /// command queue, and aborts the event listener. Proceeds through every step even if an
    /// earlier one fails.
    pub async fn dispose(&self) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.disposed {
                return Ok(());
            }
            inner.disposed = true;
        }

        if let Err(err) = self.stop_discovery().await {
            log::warn!("error stopping discovery during dispose: {}", err);
        }

        let (handles, event_task) = {
            let mut inner = self.inner.lock().await;
            (
                inner.devices.drain().map(|(_, handle)| handle).collect::<Vec<_>>(),
                inner.event_task.take(),
            )
        };
        for handle in handles {
            handle.dispose().await;
        }

        self.command_queue.dispose().await;

        if let Some(event_task) = event_task {
            event_task.abort();
        }

        Ok(())
    }
}

/// Notify the registered handle for `mac`, if any, that its device is present — but only the
/// first time this is observed, whether that is via the initial discovery poll in `start` or a
/// later `Discovered`/`Connected` event. A free function (rather than a `SessionManager` method)
/// so the spawned event-listener task can call it while only holding the shared `Inner` state.
async fn announce_if_new(inner: &Mutex<Inner>, device_id: DeviceId, mac: MacAddress) {
    let handle = {
        let mut inner = inner.lock().await;
        if !inner.announced.insert(mac) {
            return;
        }
        inner.devices.get(&mac).cloned()
    };
    if let Some(handle) = handle {
        handle.on_device_added(device_id).await;
    }
}

async fn handle_bluetooth_event(bt_session: &BluetoothSession, inner: &Mutex<Inner>, event: BluetoothEvent) {
    match event {
        BluetoothEvent::Device { id, event } => match event {
            DeviceEvent::Discovered | DeviceEvent::Connected { connected: true } => {
                match bt_session.get_device_info(&id).await {
                    Ok(info) => announce_if_new(inner, id, info.mac_address).await,
                    Err(err) => log::warn!("failed to resolve device info for {}: {}", id, err),
                }
            }
            DeviceEvent::Connected { connected: false } => {
                if let Some(mac) = mac_from_device_id(&id) {
                    let handle = inner.lock().await.devices.get(&mac).cloned();
                    if let Some(handle) = handle {
                        handle.on_disconnected().await;
                    }
                }
            }
            DeviceEvent::RSSI { rssi } => {
                if let Some(mac) = mac_from_device_id(&id) {
                    let handle = inner.lock().await.devices.get(&mac).cloned();
                    if let Some(handle) = handle {
                        handle.on_rssi(rssi).await;
                    }
                }
            }
            _ => {}
        },
        BluetoothEvent::Characteristic { id, event } => {
            let bluez_async::CharacteristicEvent::Value { value } = event;
            let device_id = id.service().device();
            if let Some(mac) = mac_from_device_id(&device_id) {
                let handle = inner.lock().await.devices.get(&mac).cloned();
                if let Some(handle) = handle {
                    handle.on_characteristic_value(&id, &value).await;
                }
            }
        }
        BluetoothEvent::Adapter { .. } => {}
    }
}

/// Recover a device's MAC address from its opaque id without a round trip to the daemon. Relies
/// on BlueZ's `dev_XX_XX_XX_XX_XX_XX` object-path naming convention.
fn mac_from_device_id(device_id: &DeviceId) -> Option<MacAddress> {
    let displayed = device_id.to_string();
    let last_segment = displayed.rsplit('/').next()?;
    let hex = last_segment.strip_prefix("dev_")?;
    hex.replace('_', ":").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_from_device_id_round_trips() {
        let device_id = DeviceId::new("/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF");
        let mac = mac_from_device_id(&device_id).unwrap();
        assert_eq!(mac, "AA:BB:CC:DD:EE:FF".parse().unwrap());
    }

    #[test]
    fn mac_from_device_id_rejects_non_device_paths() {
        let adapter_only = DeviceId::new("/org/bluez/hci0");
        assert_eq!(mac_from_device_id(&adapter_only), None);
    }

    struct RecordingHandle {
        added: Mutex<Vec<DeviceId>>,
    }

    #[async_trait]
    impl DeviceHandle for RecordingHandle {
        async fn on_device_added(&self, device_id: DeviceId) {
            self.added.lock().await.push(device_id);
        }
        async fn on_characteristic_value(&self, _id: &CharacteristicId, _value: &[u8]) {}
        async fn on_rssi(&self, _rssi: i16) {}
        async fn on_disconnected(&self) {}
        async fn dispose(&self) {}
    }

    #[tokio::test]
    async fn duplicate_add_device_is_ignored() {
        // A Mutex<Inner> in isolation, without a live BluetoothSession, is enough to exercise the
        // registration bookkeeping that `add_device`/`remove_device` perform.
        let inner = Mutex::new(Inner {
            adapter_id: None,
            devices: HashMap::new(),
            reconnect_attempts: HashMap::new(),
            announced: HashSet::new(),
            discovery_stopped: false,
            disposed: false,
            event_task: None,
        });

        let mac: MacAddress = "00:11:22:33:44:55".parse().unwrap();
        let handle_a: Arc<dyn DeviceHandle> = Arc::new(RecordingHandle {
            added: Mutex::new(Vec::new()),
        });
        let handle_b: Arc<dyn DeviceHandle> = Arc::new(RecordingHandle {
            added: Mutex::new(Vec::new()),
        });

        {
            let mut guard = inner.lock().await;
            guard.devices.insert(mac, handle_a);
        }
        {
            let mut guard = inner.lock().await;
            if guard.devices.contains_key(&mac) {
                // Mirrors `SessionManager::add_device`'s duplicate check.
            } else {
                guard.devices.insert(mac, handle_b);
            }
        }

        assert_eq!(inner.lock().await.devices.len(), 1);
    }

    #[test]
    fn reconnect_counter_policy_unlimited_when_negative() {
        let config = SessionConfig {
            max_connect_retries: -1,
            ..Default::default()
        };
        assert!(config.max_connect_retries < 0);
    }
}
