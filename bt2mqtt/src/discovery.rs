//! Home Assistant MQTT discovery payloads.
//!
//! One `DeviceConfig` (shared `device{}` block) plus one payload struct per entity class the
//! bridge advertises for a blind: a `cover` for tilt control, `sensor`s for scalar telemetry, and
//! `binary_sensor`s for the flag-shaped status fields.

use serde::Serialize;
use smartblinds::{MacAddress, MAX_ANGLE, MIN_ANGLE};

#[derive(Clone, Debug, Serialize)]
pub struct Availability {
    pub topic: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Device {
    pub connections: Vec<(String, String)>,
    pub identifiers: Vec<String>,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
}

impl Device {
    pub fn for_blind(mac: MacAddress, name: &str) -> Self {
        let mac_string = mac.to_string();
        Self {
            connections: vec![("mac".to_owned(), mac_string.clone())],
            identifiers: vec![mac_string],
            manufacturer: "unknown".to_owned(),
            model: "smart blind".to_owned(),
            name: name.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CoverDiscovery {
    pub availability: Vec<Availability>,
    pub device: Device,
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    pub command_topic: String,
    pub tilt_status_topic: String,
    pub tilt_command_topic: String,
    pub tilt_min: u8,
    pub tilt_max: u8,
    pub tilt_opened_value: u8,
    pub tilt_closed_value: u8,
    pub payload_open: &'static str,
    pub payload_close: &'static str,
}

impl CoverDiscovery {
    pub fn new(mac: MacAddress, name: &str, prefix: &str, sanitized_mac: &str) -> Self {
        Self {
            availability: vec![Availability {
                topic: format!("{prefix}/cover/{sanitized_mac}/availability"),
            }],
            device: Device::for_blind(mac, name),
            name: name.to_owned(),
            unique_id: format!("{sanitized_mac}_cover"),
            state_topic: format!("{prefix}/cover/{sanitized_mac}/state"),
            command_topic: format!("{prefix}/cover/{sanitized_mac}/set"),
            tilt_status_topic: format!("{prefix}/cover/{sanitized_mac}/tilt/state"),
            tilt_command_topic: format!("{prefix}/cover/{sanitized_mac}/tilt/set"),
            tilt_min: MIN_ANGLE,
            tilt_max: MAX_ANGLE,
            tilt_opened_value: MAX_ANGLE / 2,
            tilt_closed_value: MIN_ANGLE,
            payload_open: "OPEN",
            payload_close: "CLOSE",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SensorDiscovery {
    pub availability: Vec<Availability>,
    pub device: Device,
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_template: Option<&'static str>,
}

/// One row of the fixed table of sensor slots this bridge advertises. `key` is the path segment
/// used both in the discovery topic and the state topic (`.../<key>/state`).
pub struct SensorSlot {
    pub key: &'static str,
    pub friendly_name: &'static str,
    pub unit_of_measurement: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
}

pub const SENSOR_SLOTS: &[SensorSlot] = &[
    SensorSlot {
        key: "battery",
        friendly_name: "Battery",
        unit_of_measurement: Some("%"),
        device_class: Some("battery"),
        state_class: Some("measurement"),
    },
    SensorSlot {
        key: "illuminance",
        friendly_name: "Illuminance",
        unit_of_measurement: Some("lx"),
        device_class: Some("illuminance"),
        state_class: Some("measurement"),
    },
    SensorSlot {
        key: "interior_temperature",
        friendly_name: "Interior temperature",
        unit_of_measurement: Some("\u{b0}C"),
        device_class: Some("temperature"),
        state_class: Some("measurement"),
    },
    SensorSlot {
        key: "solar_panel",
        friendly_name: "Solar panel voltage",
        unit_of_measurement: Some("mV"),
        device_class: Some("voltage"),
        state_class: Some("measurement"),
    },
    SensorSlot {
        key: "rssi",
        friendly_name: "Signal strength",
        unit_of_measurement: Some("dBm"),
        device_class: Some("signal_strength"),
        state_class: Some("measurement"),
    },
];

impl SensorDiscovery {
    pub fn new(mac: MacAddress, name: &str, prefix: &str, sanitized_mac: &str, slot: &SensorSlot) -> Self {
        Self {
            availability: vec![Availability {
                topic: format!("{prefix}/cover/{sanitized_mac}/availability"),
            }],
            device: Device::for_blind(mac, name),
            name: format!("{name} {}", slot.friendly_name),
            unique_id: format!("{sanitized_mac}_{}", slot.key),
            state_topic: format!("{prefix}/cover/{sanitized_mac}/{}/state", slot.key),
            unit_of_measurement: slot.unit_of_measurement,
            device_class: slot.device_class,
            state_class: slot.state_class,
            value_template: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BinarySensorDiscovery {
    pub availability: Vec<Availability>,
    pub device: Device,
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    pub payload_on: &'static str,
    pub payload_off: &'static str,
}

pub struct BinarySensorSlot {
    pub key: &'static str,
    pub friendly_name: &'static str,
    pub device_class: Option<&'static str>,
}

pub const BINARY_SENSOR_SLOTS: &[BinarySensorSlot] = &[
    BinarySensorSlot {
        key: "charging",
        friendly_name: "Charging",
        device_class: Some("battery_charging"),
    },
    BinarySensorSlot {
        key: "is_over_temperature",
        friendly_name: "Over temperature",
        device_class: Some("problem"),
    },
    BinarySensorSlot {
        key: "is_under_voltage_lockout",
        friendly_name: "Under-voltage lockout",
        device_class: Some("problem"),
    },
];

impl BinarySensorDiscovery {
    pub fn new(
        mac: MacAddress,
        name: &str,
        prefix: &str,
        sanitized_mac: &str,
        slot: &BinarySensorSlot,
    ) -> Self {
        Self {
            availability: vec![Availability {
                topic: format!("{prefix}/cover/{sanitized_mac}/availability"),
            }],
            device: Device::for_blind(mac, name),
            name: format!("{name} {}", slot.friendly_name),
            unique_id: format!("{sanitized_mac}_{}", slot.key),
            state_topic: format!("{prefix}/cover/{sanitized_mac}/{}/state", slot.key),
            device_class: slot.device_class,
            payload_on: "true",
            payload_off: "false",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_discovery_topics_use_sanitized_mac() {
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let discovery = CoverDiscovery::new(mac, "Living room", "bt2mqtt", "AA_BB_CC_DD_EE_FF");
        assert_eq!(discovery.state_topic, "bt2mqtt/cover/AA_BB_CC_DD_EE_FF/state");
        assert_eq!(
            discovery.tilt_command_topic,
            "bt2mqtt/cover/AA_BB_CC_DD_EE_FF/tilt/set"
        );
        assert_eq!(discovery.tilt_min, 0);
        assert_eq!(discovery.tilt_max, 200);
    }

    #[test]
    fn sensor_slot_table_has_no_duplicate_keys() {
        for (i, a) in SENSOR_SLOTS.iter().enumerate() {
            for (j, b) in SENSOR_SLOTS.iter().enumerate() {
                assert!(i == j || a.key != b.key);
            }
        }
    }
}
