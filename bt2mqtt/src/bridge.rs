//! Declarative wiring between decoded [`BlindDeviceEvent`]s and MQTT topic/payload pairs, and
//! between inbound `set`/`tilt/set` messages and queued `BlindDevice` writes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rumqttc::{AsyncClient, Publish, QoS};
use smartblinds::{BlindDeviceEvent, BlindDeviceObserver, BlindDeviceSupervisor, MacAddress, MAX_ANGLE};

use crate::config::HomeAssistantConfig;
use crate::discovery::{
    BinarySensorDiscovery, CoverDiscovery, SensorDiscovery, BINARY_SENSOR_SLOTS, SENSOR_SLOTS,
};

const TOPIC_PREFIX: &str = "bt2mqtt";

fn sanitized_mac(mac: MacAddress) -> String {
    mac.to_string().replace(':', "_")
}

/// Charge-source flags arrive as two independent booleans from the vendor protocol but are
/// surfaced under a single `charging` topic; this tracks both halves per device so either one
/// changing republishes the combined value.
#[derive(Clone, Copy, Debug, Default)]
struct ChargeState {
    solar: bool,
    usb: bool,
}

struct DeviceEntry {
    name: String,
    supervisor: Arc<BlindDeviceSupervisor>,
    charge: Mutex<ChargeState>,
}

/// Publishes blind state to MQTT and routes inbound commands back to the matching
/// [`BlindDeviceSupervisor`]. One instance serves every configured blind.
pub struct Bridge {
    client: AsyncClient,
    ha_config: HomeAssistantConfig,
    // A `Mutex` rather than `&mut self` registration: each registered `BlindDeviceSupervisor`
    // needs an `Arc<dyn BlindDeviceObserver>` pointing back at this same `Bridge`, so the `Bridge`
    // itself must already be behind its own `Arc` before any device can be registered.
    devices: Mutex<HashMap<MacAddress, DeviceEntry>>,
}

impl Bridge {
    pub fn new(client: AsyncClient, ha_config: HomeAssistantConfig) -> Self {
        Self {
            client,
            ha_config,
            devices: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, mac: MacAddress, name: String, supervisor: Arc<BlindDeviceSupervisor>) {
        self.devices.lock().expect("device map mutex poisoned").insert(
            mac,
            DeviceEntry {
                name,
                supervisor,
                charge: Mutex::new(ChargeState::default()),
            },
        );
    }

    /// Publish auto-discovery payloads (if enabled) and subscribe to the command topics for
    /// every registered device. Call once after all devices are registered, before
    /// `SessionManager::start`.
    pub async fn publish_startup(&self) -> Result<(), rumqttc::ClientError> {
        let macs: Vec<MacAddress> = self
            .devices
            .lock()
            .expect("device map mutex poisoned")
            .keys()
            .copied()
            .collect();
        for mac in macs {
            let sanitized = sanitized_mac(mac);

            if self.ha_config.discovery_enabled {
                self.publish_discovery(mac, &sanitized).await?;
            }

            self.client
                .subscribe(
                    format!("{TOPIC_PREFIX}/cover/{sanitized}/set"),
                    QoS::AtLeastOnce,
                )
                .await?;
            self.client
                .subscribe(
                    format!("{TOPIC_PREFIX}/cover/{sanitized}/tilt/set"),
                    QoS::AtLeastOnce,
                )
                .await?;
        }
        Ok(())
    }

    async fn publish_discovery(
        &self,
        mac: MacAddress,
        sanitized: &str,
    ) -> Result<(), rumqttc::ClientError> {
        let name = self
            .devices
            .lock()
            .expect("device map mutex poisoned")
            .get(&mac)
            .expect("device registered before publish_startup is called")
            .name
            .clone();
        let prefix = &self.ha_config.discovery_prefix;

        let cover = CoverDiscovery::new(mac, &name, TOPIC_PREFIX, sanitized);
        self.publish_retained_json(
            format!("{prefix}/cover/{sanitized}/cover/config"),
            &cover,
        )
        .await?;

        for slot in SENSOR_SLOTS {
            let discovery = SensorDiscovery::new(mac, &name, TOPIC_PREFIX, sanitized, slot);
            self.publish_retained_json(
                format!("{prefix}/sensor/{sanitized}/{}/config", slot.key),
                &discovery,
            )
            .await?;
        }

        for slot in BINARY_SENSOR_SLOTS {
            let discovery = BinarySensorDiscovery::new(mac, &name, TOPIC_PREFIX, sanitized, slot);
            self.publish_retained_json(
                format!("{prefix}/binary_sensor/{sanitized}/{}/config", slot.key),
                &discovery,
            )
            .await?;
        }

        Ok(())
    }

    async fn publish_retained_json(
        &self,
        topic: String,
        payload: &impl serde::Serialize,
    ) -> Result<(), rumqttc::ClientError> {
        let bytes = serde_json::to_vec(payload).expect("discovery payload is always serializable");
        self.client
            .publish(topic, QoS::AtMostOnce, true, bytes)
            .await
    }

    /// Publish retained "offline" for every device. Called before the command queue is cleared
    /// during shutdown, per the availability ordering guarantee.
    pub async fn publish_all_offline(&self) {
        let macs: Vec<MacAddress> = self
            .devices
            .lock()
            .expect("device map mutex poisoned")
            .keys()
            .copied()
            .collect();
        for mac in macs {
            if let Err(err) = self.publish_availability(mac, false).await {
                log::warn!("failed to publish offline availability for {}: {}", mac, err);
            }
        }
    }

    async fn publish_availability(&self, mac: MacAddress, online: bool) -> Result<(), rumqttc::ClientError> {
        let sanitized = sanitized_mac(mac);
        self.client
            .publish(
                format!("{TOPIC_PREFIX}/cover/{sanitized}/availability"),
                QoS::AtLeastOnce,
                true,
                if online { "online" } else { "offline" },
            )
            .await
    }

    /// Route one inbound MQTT publish to the matching device's command, if any.
    pub async fn handle_incoming(&self, publish: Publish) {
        let Some(rest) = publish.topic.strip_prefix(&format!("{TOPIC_PREFIX}/cover/")) else {
            return;
        };
        let Some((sanitized, suffix)) = rest.split_once('/') else {
            return;
        };
        let Some((mac, supervisor)) = self.devices.lock().expect("device map mutex poisoned").iter().find_map(
            |(mac, entry)| (sanitized_mac(*mac) == sanitized).then(|| (*mac, entry.supervisor.clone())),
        ) else {
            return;
        };

        let payload = String::from_utf8_lossy(&publish.payload);
        match suffix {
            "tilt/set" => match payload.trim().parse::<u8>() {
                Ok(angle) => supervisor.set_angle(angle).await,
                Err(_) => log::warn!("{} ignoring non-numeric tilt/set payload {:?}", mac, payload),
            },
            "set" => match payload.trim() {
                "OPEN" => supervisor.set_angle(MAX_ANGLE / 2).await,
                "CLOSE" => supervisor.set_angle(0).await,
                other => log::warn!("{} ignoring invalid /set payload {:?}", mac, other),
            },
            _ => {}
        }
    }
}

impl BlindDeviceObserver for Bridge {
    fn on_blind_event(&self, mac: MacAddress, event: BlindDeviceEvent) {
        let devices = self.devices.lock().expect("device map mutex poisoned");
        let Some(entry) = devices.get(&mac) else {
            return;
        };
        let sanitized = sanitized_mac(mac);
        let client = self.client.clone();

        match event {
            BlindDeviceEvent::Angle(angle) => {
                let cover_state = if angle <= 10 || angle >= 190 { "closed" } else { "open" };
                let snapped = if angle <= 10 {
                    0
                } else if angle >= 190 {
                    MAX_ANGLE
                } else {
                    angle
                };
                try_publish(&client, format!("{TOPIC_PREFIX}/cover/{sanitized}/state"), cover_state);
                try_publish_json(&client, format!("{TOPIC_PREFIX}/cover/{sanitized}/tilt/state"), snapped);
            }
            BlindDeviceEvent::BatteryPercentage(value) => {
                try_publish_json(&client, format!("{TOPIC_PREFIX}/cover/{sanitized}/battery/state"), value);
            }
            BlindDeviceEvent::SolarPanelVoltageMillivolts(value) => {
                try_publish_json(
                    &client,
                    format!("{TOPIC_PREFIX}/cover/{sanitized}/solar_panel/state"),
                    value,
                );
            }
            BlindDeviceEvent::InteriorTemperatureCelsius(value) => {
                try_publish_json(
                    &client,
                    format!("{TOPIC_PREFIX}/cover/{sanitized}/interior_temperature/state"),
                    value,
                );
            }
            BlindDeviceEvent::IlluminanceLux(value) => {
                try_publish_json(&client, format!("{TOPIC_PREFIX}/cover/{sanitized}/illuminance/state"), value);
            }
            BlindDeviceEvent::IsOverTemperature(value) => {
                try_publish_json(
                    &client,
                    format!("{TOPIC_PREFIX}/cover/{sanitized}/is_over_temperature/state"),
                    value,
                );
            }
            BlindDeviceEvent::IsUnderVoltageLockout(value) => {
                try_publish_json(
                    &client,
                    format!("{TOPIC_PREFIX}/cover/{sanitized}/is_under_voltage_lockout/state"),
                    value,
                );
            }
            BlindDeviceEvent::Rssi(value) => {
                try_publish_json(&client, format!("{TOPIC_PREFIX}/cover/{sanitized}/rssi/state"), value);
            }
            BlindDeviceEvent::IsSolarCharging(solar) => {
                let charging = {
                    let mut charge = entry.charge.lock().expect("charge state mutex poisoned");
                    charge.solar = solar;
                    charge.solar || charge.usb
                };
                try_publish_json(&client, format!("{TOPIC_PREFIX}/cover/{sanitized}/charging/state"), charging);
            }
            BlindDeviceEvent::IsUsbCharging(usb) => {
                let charging = {
                    let mut charge = entry.charge.lock().expect("charge state mutex poisoned");
                    charge.usb = usb;
                    charge.solar || charge.usb
                };
                try_publish_json(&client, format!("{TOPIC_PREFIX}/cover/{sanitized}/charging/state"), charging);
            }
            BlindDeviceEvent::Unlocked => {
                try_publish(&client, format!("{TOPIC_PREFIX}/cover/{sanitized}/availability"), "online");
            }
            BlindDeviceEvent::UnlockFailed => {
                log::error!("{} failed to unlock after exhausting its retry budget", mac);
            }
            BlindDeviceEvent::Disconnected => {
                try_publish(&client, format!("{TOPIC_PREFIX}/cover/{sanitized}/availability"), "offline");
            }
            BlindDeviceEvent::BatteryVoltageMillivolts(_)
            | BlindDeviceEvent::BatteryCharge(_)
            | BlindDeviceEvent::BatteryTemperatureCelsius(_)
            | BlindDeviceEvent::IsReversed(_)
            | BlindDeviceEvent::IsCalibrated(_)
            | BlindDeviceEvent::HasSolar(_) => {
                // Decoded but not part of the published topic set (see §6 of the external
                // interface spec); kept here so the match stays exhaustive as new fields land.
            }
        }
    }
}

/// `AsyncClient::publish` is a `Future`; `BlindDeviceObserver::on_blind_event` is sync, so a
/// retained "availability" publish or a per-metric state publish is fired via `try_publish`
/// (which enqueues onto rumqttc's internal request channel without awaiting) rather than
/// spawning a task per event.
fn try_publish(client: &AsyncClient, topic: String, payload: impl Into<Vec<u8>>) {
    if let Err(err) = client.try_publish(topic.clone(), QoS::AtLeastOnce, false, payload) {
        log::warn!("failed to publish {}: {}", topic, err);
    }
}

fn try_publish_json(client: &AsyncClient, topic: String, payload: impl serde::Serialize) {
    match serde_json::to_vec(&payload) {
        Ok(bytes) => try_publish(client, topic, bytes),
        Err(err) => log::warn!("failed to serialize payload for {}: {}", topic, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_mac_replaces_colons() {
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(sanitized_mac(mac), "AA_BB_CC_DD_EE_FF");
    }

    #[test]
    fn charge_state_combines_solar_and_usb() {
        let mut charge = ChargeState::default();
        charge.solar = true;
        assert!(charge.solar || charge.usb);
        charge.solar = false;
        charge.usb = true;
        assert!(charge.solar || charge.usb);
        charge.usb = false;
        assert!(!(charge.solar || charge.usb));
    }
}
