//! Wires a single [`BlindDevice`] into a [`SessionManager`] registration.
//!
//! `BlindDeviceSupervisor` is the [`DeviceHandle`] the bridge registers per configured MAC: it
//! owns the `BlindDevice` protocol state, drives connect/bind/unlock on discovery, retries the
//! unlock handshake on its own timer, and forwards decoded events to a [`BlindDeviceObserver`]
//! (the bridge's MQTT glue). It holds a `Weak<SessionManager>` rather than an `Arc`, since the
//! manager is what owns this handle in the first place.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use bluez_async::{BluetoothSession, CharacteristicId, DeviceId, MacAddress, WriteOptions, WriteType};
use tokio::sync::Mutex;

use crate::device::{BlindDevice, BlindDeviceEvent, BlindDeviceObserver};
use crate::queue::QueuedCommand;
use crate::session::{DeviceHandle, SessionManager};
use crate::unlock::{UnlockState, UNLOCK_RETRY_INTERVAL};

/// Binds a configured blind's connection lifecycle to a `SessionManager` registration.
pub struct BlindDeviceSupervisor {
    mac: MacAddress,
    passkey: String,
    max_unlock_attempts: u32,
    bt_session: BluetoothSession,
    session: Weak<SessionManager>,
    observer: Arc<dyn BlindDeviceObserver>,
    device: Mutex<Option<BlindDevice>>,
    // Populated right after construction so methods that only borrow `&self` (the `DeviceHandle`
    // trait gives us nothing else) can still spawn tasks holding a clone of the owning `Arc`.
    self_weak: Mutex<Weak<BlindDeviceSupervisor>>,
    // Guards against spawning more than one periodic unlock-retry timer at a time: `drive_unlock`
    // is called both for the initial attempt and for each subsequent retry tick, but only the
    // former should ever start a new timer task.
    unlock_timer_running: Mutex<bool>,
}

impl BlindDeviceSupervisor {
    pub fn new(
        mac: MacAddress,
        passkey: String,
        max_unlock_attempts: u32,
        bt_session: BluetoothSession,
        session: Weak<SessionManager>,
        observer: Arc<dyn BlindDeviceObserver>,
    ) -> Arc<Self> {
        let supervisor = Arc::new(Self {
            mac,
            passkey,
            max_unlock_attempts,
            bt_session,
            session,
            observer,
            device: Mutex::new(None),
            self_weak: Mutex::new(Weak::new()),
            unlock_timer_running: Mutex::new(false),
        });
        *supervisor
            .self_weak
            .try_lock()
            .expect("uncontended at construction time") = Arc::downgrade(&supervisor);
        supervisor
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    /// Validate and enqueue a new target angle. A no-op (logged) if the device hasn't bound its
    /// characteristics yet.
    pub async fn set_angle(&self, value: u8) {
        let prepared = {
            let device = self.device.lock().await;
            match device.as_ref() {
                Some(device) => device.prepare_set_angle(value),
                None => {
                    log::warn!("{} ignoring setAngle({}): not yet connected", self.mac, value);
                    return;
                }
            }
        };
        match prepared {
            Ok((id, payload)) => self.enqueue_write(id, payload, "setAngle").await,
            Err(err) => log::warn!("{} rejected setAngle({}): {}", self.mac, value, err),
        }
    }

    /// Both the Angle and Passkey writes this bridge issues are specified as write-with-response
    /// (`writeValueWithResponse` / "request write"), so the write type is set explicitly rather
    /// than left to BlueZ's own default (which falls back to "reliable").
    async fn enqueue_write(&self, id: CharacteristicId, payload: Vec<u8>, label: &str) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let bt_session = self.bt_session.clone();
        let description = format!("{} {} -> {:?}", self.mac, label, id);
        session
            .execute_command(QueuedCommand::new(description, move || {
                let bt_session = bt_session.clone();
                let id = id.clone();
                let payload = payload.clone();
                async move {
                    bt_session
                        .write_characteristic_value_with_options(
                            &id,
                            payload,
                            WriteOptions {
                                offset: 0,
                                write_type: Some(WriteType::WithResponse),
                            },
                        )
                        .await
                }
            }))
            .await;
    }

    async fn enqueue_read(&self, id: CharacteristicId, label: &str) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let bt_session = self.bt_session.clone();
        let description = format!("{} {} <- {:?}", self.mac, label, id);
        session
            .execute_command(QueuedCommand::new(description, move || {
                let bt_session = bt_session.clone();
                let id = id.clone();
                async move { bt_session.read_characteristic_value(&id).await.map(|_| ()) }
            }))
            .await;
    }

    /// Issue (or retry) the passkey write + forcing read. Does not itself manage the periodic
    /// retry timer; see [`Self::spawn_unlock_retry_timer`], which is the timer loop's only caller
    /// for retries after the first attempt.
    async fn drive_unlock(&self) {
        let attempt = {
            let mut device = self.device.lock().await;
            match device.as_mut() {
                Some(device) => device.begin_unlock(),
                None => return,
            }
        };
        match attempt {
            Ok(Some((write_id, payload, read_id))) => {
                self.enqueue_write(write_id, payload, "unlock").await;
                self.enqueue_read(read_id, "unlock-echo").await;
            }
            Ok(None) => {
                self.observer
                    .on_blind_event(self.mac, BlindDeviceEvent::UnlockFailed);
            }
            Err(err) => log::error!("{} could not begin unlock: {}", self.mac, err),
        }
    }

    /// Start the single 1-second periodic timer that drives unlock retries, unless one is already
    /// running. The timer calls `drive_unlock` on each tick while the handshake is still
    /// `Unlocking`, and exits (clearing the guard so a later connection can start a fresh timer)
    /// as soon as it isn't.
    async fn spawn_unlock_retry_timer(&self) {
        {
            let mut running = self.unlock_timer_running.lock().await;
            if *running {
                return;
            }
            *running = true;
        }
        let Some(this) = self.self_weak.lock().await.upgrade() else {
            *self.unlock_timer_running.lock().await = false;
            return;
        };
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(UNLOCK_RETRY_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let state = {
                    let device = this.device.lock().await;
                    device.as_ref().map(|device| device.unlock_state())
                };
                match state {
                    Some(UnlockState::Unlocking) => this.drive_unlock().await,
                    _ => break,
                }
            }
            *this.unlock_timer_running.lock().await = false;
        });
    }
}

#[async_trait]
impl DeviceHandle for BlindDeviceSupervisor {
    async fn on_device_added(&self, device_id: DeviceId) {
        if let Err(err) = self.bt_session.connect(&device_id).await {
            log::error!("{} failed to connect: {}", self.mac, err);
            if let Some(session) = self.session.upgrade() {
                session.reconnect_device(&self.mac).await;
            }
            return;
        }

        let mut device = BlindDevice::new(
            self.mac,
            device_id,
            self.passkey.clone(),
            self.max_unlock_attempts,
        );
        if let Err(err) = device.bind(&self.bt_session).await {
            log::error!("{} failed to bind characteristics: {}", self.mac, err);
            if let Some(session) = self.session.upgrade() {
                session.reconnect_device(&self.mac).await;
            }
            return;
        }

        *self.device.lock().await = Some(device);
        log::debug!("{} connected and bound, beginning unlock", self.mac);
        self.drive_unlock().await;
        self.spawn_unlock_retry_timer().await;
    }

    async fn on_characteristic_value(&self, id: &CharacteristicId, value: &[u8]) {
        let events = {
            let mut device = self.device.lock().await;
            match device.as_mut() {
                Some(device) => device.on_characteristic_value(id, value),
                None => return,
            }
        };
        for event in events {
            self.observer.on_blind_event(self.mac, event);
        }
    }

    async fn on_rssi(&self, rssi: i16) {
        self.observer
            .on_blind_event(self.mac, BlindDeviceEvent::Rssi(rssi));
    }

    async fn on_disconnected(&self) {
        let had_device = {
            let mut device = self.device.lock().await;
            if let Some(device) = device.as_mut() {
                device.on_disconnect();
                true
            } else {
                false
            }
        };
        if had_device {
            self.observer
                .on_blind_event(self.mac, BlindDeviceEvent::Disconnected);
            if let Some(session) = self.session.upgrade() {
                session.reconnect_device(&self.mac).await;
            }
        }
    }

    async fn dispose(&self) {
        let mut device = self.device.lock().await;
        if let Some(mut device) = device.take() {
            device.dispose(&self.bt_session).await;
        }
    }
}
