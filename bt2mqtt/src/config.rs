//! YAML configuration schema, environment variable overrides, and blind entry validation.

use std::fs::read_to_string;
use std::time::Duration;

use base64::Engine as _;
use eyre::{bail, Report, WrapErr};
use rumqttc::MqttOptions;
use serde_derive::Deserialize;
use smartblinds::MacAddress;

const CONFIG_ENV_PREFIX: &str = "BT2MQTT";
const DEFAULT_MQTT_HOST: &str = "localhost";
const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";
const DEFAULT_DEVICE_DISCOVERY_INTERVAL_SECS: u64 = 20;
const DEFAULT_DEVICE_DISCOVERY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_CONNECT_RETRIES: i32 = 5;
const DEFAULT_CONNECT_RETRY_INTERVAL_SECS: u64 = 1;
const DEFAULT_MAX_UNLOCK_RETRIES: u32 = 3;

fn env_override(section: &str, key: &str) -> Option<String> {
    std::env::var(format!(
        "{CONFIG_ENV_PREFIX}_{}_{}",
        section.to_uppercase(),
        key.to_uppercase()
    ))
    .ok()
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub adapter: AdapterConfig,
    pub bluetooth: BluetoothConfig,
    pub mqtt: MqttConfig,
    pub homeassistant: HomeAssistantConfig,
    pub smart_blinds: SmartBlindsConfig,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Config, Report> {
        let raw = read_to_string(path).wrap_err_with(|| format!("reading {path}"))?;
        let mut config: Config =
            serde_yaml::from_str(&raw).wrap_err_with(|| format!("parsing {path}"))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(name) = env_override("adapter", "name") {
            self.adapter.name = Some(name);
        }
        if let Some(value) = env_override("bluetooth", "device_discovery_interval") {
            if let Ok(parsed) = value.parse() {
                self.bluetooth.device_discovery_interval_secs = parsed;
            }
        }
        if let Some(value) = env_override("bluetooth", "device_discovery_timeout") {
            if let Ok(parsed) = value.parse() {
                self.bluetooth.device_discovery_timeout_secs = parsed;
            }
        }
        if let Some(value) = env_override("mqtt", "client_id") {
            self.mqtt.client_id = Some(value);
        }
        if let Some(value) = env_override("mqtt", "host") {
            self.mqtt.host = value;
        }
        if let Some(value) = env_override("mqtt", "port") {
            if let Ok(parsed) = value.parse() {
                self.mqtt.port = parsed;
            }
        }
        if let Some(value) = env_override("mqtt", "username") {
            self.mqtt.username = Some(value);
        }
        if let Some(value) = env_override("mqtt", "password") {
            self.mqtt.password = Some(value);
        }
        if let Some(value) = env_override("homeassistant", "discovery_enabled") {
            if let Ok(parsed) = value.parse() {
                self.homeassistant.discovery_enabled = parsed;
            }
        }
        if let Some(value) = env_override("homeassistant", "discovery_prefix") {
            self.homeassistant.discovery_prefix = value;
        }
        if let Some(value) = env_override("smart_blinds", "max_connect_retries") {
            if let Ok(parsed) = value.parse() {
                self.smart_blinds.max_connect_retries = parsed;
            }
        }
        if let Some(value) = env_override("smart_blinds", "connect_retry_interval") {
            if let Ok(parsed) = value.parse() {
                self.smart_blinds.connect_retry_interval_secs = parsed;
            }
        }
        if let Some(value) = env_override("smart_blinds", "max_unlock_retries") {
            if let Ok(parsed) = value.parse() {
                self.smart_blinds.max_unlock_retries = parsed;
            }
        }
    }

    /// Resolve every configured blind's `mac`/`passkey` pair up front, so a malformed entry is
    /// reported before any D-Bus or MQTT connection is attempted.
    fn validate(&self) -> Result<(), Report> {
        for entry in &self.smart_blinds.blinds {
            entry.resolve().wrap_err_with(|| {
                format!("validating smart_blinds.blinds entry {:?}", entry.name)
            })?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    pub device_discovery_interval_secs: u64,
    pub device_discovery_timeout_secs: u64,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            device_discovery_interval_secs: DEFAULT_DEVICE_DISCOVERY_INTERVAL_SECS,
            device_discovery_timeout_secs: DEFAULT_DEVICE_DISCOVERY_TIMEOUT_SECS,
        }
    }
}

impl BluetoothConfig {
    pub fn device_discovery_interval(&self) -> Duration {
        Duration::from_secs(self.device_discovery_interval_secs)
    }

    pub fn device_discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.device_discovery_timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub client_id: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            host: DEFAULT_MQTT_HOST.to_owned(),
            port: DEFAULT_MQTT_PORT,
            username: None,
            password: None,
        }
    }
}

impl MqttConfig {
    /// Build the `rumqttc` connection options for this config, falling back to a fixed default
    /// client id (`bt2mqtt`) when none is configured.
    pub fn mqtt_options(&self) -> MqttOptions {
        let client_id = self.client_id.clone().unwrap_or_else(|| "bt2mqtt".to_owned());
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(5));
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            options.set_credentials(username, password);
        }
        options
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HomeAssistantConfig {
    pub discovery_enabled: bool,
    pub discovery_prefix: String,
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            discovery_enabled: true,
            discovery_prefix: DEFAULT_DISCOVERY_PREFIX.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SmartBlindsConfig {
    pub max_connect_retries: i32,
    pub connect_retry_interval_secs: u64,
    pub max_unlock_retries: u32,
    pub blinds: Vec<BlindEntry>,
}

impl Default for SmartBlindsConfig {
    fn default() -> Self {
        Self {
            max_connect_retries: DEFAULT_MAX_CONNECT_RETRIES,
            connect_retry_interval_secs: DEFAULT_CONNECT_RETRY_INTERVAL_SECS,
            max_unlock_retries: DEFAULT_MAX_UNLOCK_RETRIES,
            blinds: Vec::new(),
        }
    }
}

impl SmartBlindsConfig {
    pub fn connect_retry_interval(&self) -> Duration {
        Duration::from_secs(self.connect_retry_interval_secs)
    }

    pub fn resolved_blinds(&self) -> Result<Vec<BlindConfig>, Report> {
        self.blinds.iter().map(BlindEntry::resolve).collect()
    }
}

/// Raw, as-deserialized form of a blind entry: exactly one of the plain or `encoded_*` pairs
/// must be present.
#[derive(Clone, Debug, Deserialize)]
pub struct BlindEntry {
    pub name: String,
    pub mac: Option<String>,
    pub passkey: Option<String>,
    pub encoded_mac: Option<String>,
    pub encoded_passkey: Option<String>,
}

/// A blind entry after resolving whichever representation configured it to a single shape.
#[derive(Clone, Debug)]
pub struct BlindConfig {
    pub name: String,
    pub mac: MacAddress,
    pub passkey: String,
}

impl BlindEntry {
    pub fn resolve(&self) -> Result<BlindConfig, Report> {
        match (
            &self.mac,
            &self.passkey,
            &self.encoded_mac,
            &self.encoded_passkey,
        ) {
            (Some(mac), Some(passkey), None, None) => Ok(BlindConfig {
                name: self.name.clone(),
                mac: mac
                    .parse()
                    .wrap_err_with(|| format!("parsing mac {mac:?}"))?,
                passkey: passkey.clone(),
            }),
            (None, None, Some(encoded_mac), Some(encoded_passkey)) => Ok(BlindConfig {
                name: self.name.clone(),
                mac: decode_encoded_mac(encoded_mac)?,
                passkey: decode_encoded_passkey(encoded_passkey)?,
            }),
            _ => bail!(
                "blind {:?} must set exactly one of (mac, passkey) or (encoded_mac, encoded_passkey)",
                self.name
            ),
        }
    }
}

/// `encoded_mac` is base64 of the 6 raw MAC bytes, stored address-reversed relative to the
/// canonical uppercase colon-separated form.
fn decode_encoded_mac(encoded: &str) -> Result<MacAddress, Report> {
    let mut bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .wrap_err("decoding encoded_mac as base64")?;
    if bytes.len() != 6 {
        bail!("encoded_mac decodes to {} bytes, expected 6", bytes.len());
    }
    bytes.reverse();
    let mac = bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(":");
    mac.parse()
        .wrap_err_with(|| format!("parsing decoded mac {mac:?}"))
}

/// `encoded_passkey` is base64 of the raw passkey bytes, stored as concatenated uppercase hex
/// once decoded (the same shape `passkey` is given in directly).
fn decode_encoded_passkey(encoded: &str) -> Result<String, Report> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .wrap_err("decoding encoded_passkey as base64")?;
    Ok(bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_blind_entry_resolves() {
        let entry = BlindEntry {
            name: "Living room".to_owned(),
            mac: Some("AA:BB:CC:DD:EE:FF".to_owned()),
            passkey: Some("000102030405".to_owned()),
            encoded_mac: None,
            encoded_passkey: None,
        };
        let resolved = entry.resolve().unwrap();
        assert_eq!(resolved.mac, "AA:BB:CC:DD:EE:FF".parse().unwrap());
        assert_eq!(resolved.passkey, "000102030405");
    }

    #[test]
    fn encoded_blind_entry_reverses_mac_bytes() {
        let raw_mac = [0xFFu8, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA];
        let encoded_mac = base64::engine::general_purpose::STANDARD.encode(raw_mac);
        let encoded_passkey =
            base64::engine::general_purpose::STANDARD.encode([0x00, 0x01, 0x02, 0x03, 0x04, 0x05]);
        let entry = BlindEntry {
            name: "Bedroom".to_owned(),
            mac: None,
            passkey: None,
            encoded_mac: Some(encoded_mac),
            encoded_passkey: Some(encoded_passkey),
        };
        let resolved = entry.resolve().unwrap();
        assert_eq!(resolved.mac, "AA:BB:CC:DD:EE:FF".parse().unwrap());
        assert_eq!(resolved.passkey, "000102030405");
    }

    #[test]
    fn entry_with_no_mac_pair_fails_validation() {
        let entry = BlindEntry {
            name: "Broken".to_owned(),
            mac: None,
            passkey: None,
            encoded_mac: None,
            encoded_passkey: None,
        };
        assert!(entry.resolve().is_err());
    }

    #[test]
    fn entry_mixing_both_pairs_fails_validation() {
        let entry = BlindEntry {
            name: "Broken".to_owned(),
            mac: Some("AA:BB:CC:DD:EE:FF".to_owned()),
            passkey: Some("000102030405".to_owned()),
            encoded_mac: Some("AAAAAAAAAAA=".to_owned()),
            encoded_passkey: None,
        };
        assert!(entry.resolve().is_err());
    }

    #[test]
    fn default_config_has_no_blinds_and_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.smart_blinds.blinds.is_empty());
    }
}
