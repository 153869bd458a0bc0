use std::collections::HashMap;

use bluez_async::{BluetoothError, BluetoothSession, CharacteristicId, DeviceId, MacAddress};
use thiserror::Error;

use crate::decode::{SensorReading, Status};
use crate::unlock::{self, UnlockHandshake, UnlockState};
use crate::uuids::{Slot, MAX_ANGLE, MIN_ANGLE};

/// Errors specific to a single blind's protocol handling.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device is missing the {0:?} characteristic")]
    CharacteristicMissing(Slot),
    #[error("angle {0} is outside the valid range {MIN_ANGLE}..={MAX_ANGLE}")]
    InvalidAngle(u8),
    #[error(transparent)]
    Bluetooth(#[from] BluetoothError),
}

/// A change observed on a bound [`BlindDevice`], delivered after the state that produced it has
/// already been updated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BlindDeviceEvent {
    Angle(u8),
    BatteryPercentage(u8),
    BatteryVoltageMillivolts(u16),
    BatteryCharge(u16),
    SolarPanelVoltageMillivolts(u16),
    InteriorTemperatureCelsius(f32),
    BatteryTemperatureCelsius(f32),
    IlluminanceLux(f32),
    IsReversed(bool),
    IsCalibrated(bool),
    HasSolar(bool),
    IsSolarCharging(bool),
    IsUsbCharging(bool),
    IsUnderVoltageLockout(bool),
    IsOverTemperature(bool),
    Rssi(i16),
    Unlocked,
    UnlockFailed,
    Disconnected,
}

/// Receives the events a [`BlindDevice`] emits. Implemented by the bridge layer.
pub trait BlindDeviceObserver: Send + Sync {
    fn on_blind_event(&self, mac: MacAddress, event: BlindDeviceEvent);
}

/// Protocol state for one physical blind, bound to a BlueZ `Device1` object.
pub struct BlindDevice {
    mac: MacAddress,
    device_id: DeviceId,
    passkey: String,
    characteristics: HashMap<Slot, CharacteristicId>,
    unlock: UnlockHandshake,
    angle: Option<u8>,
    status: Status,
    sensors: SensorReading,
}

impl BlindDevice {
    pub fn new(mac: MacAddress, device_id: DeviceId, passkey: String, max_unlock_attempts: u32) -> Self {
        Self {
            mac,
            device_id,
            passkey,
            characteristics: HashMap::new(),
            unlock: UnlockHandshake::new(max_unlock_attempts),
            angle: None,
            status: Status::default(),
            sensors: SensorReading::default(),
        }
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn unlock_state(&self) -> UnlockState {
        self.unlock.state()
    }

    pub fn angle(&self) -> Option<u8> {
        self.angle
    }

    /// Enumerate services and characteristics on the connected device, bind the known slots, and
    /// subscribe to notifications on those that notify as soon as they are bound. Any failure
    /// disconnects the device and retains no partial bindings.
    pub async fn bind(&mut self, session: &BluetoothSession) -> Result<(), DeviceError> {
        match self.try_bind(session).await {
            Ok(()) => Ok(()),
            Err(err) => {
                log::error!("binding {} failed, disconnecting: {}", self.mac, err);
                self.characteristics.clear();
                let _ = session.disconnect(&self.device_id).await;
                Err(err)
            }
        }
    }

    async fn try_bind(&mut self, session: &BluetoothSession) -> Result<(), DeviceError> {
        let mut found = HashMap::new();
        for service in session.get_services(&self.device_id).await? {
            for characteristic in session.get_characteristics(&service.id).await? {
                if let Some(slot) = Slot::from_uuid(characteristic.uuid) {
                    found.insert(slot, characteristic.id);
                }
            }
        }

        for slot in Slot::ALL {
            if slot.is_required() && !found.contains_key(&slot) {
                return Err(DeviceError::CharacteristicMissing(slot));
            }
        }

        for (&slot, id) in &found {
            if slot.notifies_on_bind() {
                session.start_notify(id).await?;
            }
        }

        self.characteristics = found;
        log::debug!("{} bound all characteristics", self.mac);
        Ok(())
    }

    fn characteristic(&self, slot: Slot) -> Result<&CharacteristicId, DeviceError> {
        self.characteristics
            .get(&slot)
            .ok_or(DeviceError::CharacteristicMissing(slot))
    }

    /// Write a new target angle. Enqueuing the write itself is the session manager's job; this
    /// only validates the range and returns the payload to enqueue.
    pub fn prepare_set_angle(&self, value: u8) -> Result<(CharacteristicId, Vec<u8>), DeviceError> {
        if !(MIN_ANGLE..=MAX_ANGLE).contains(&value) {
            return Err(DeviceError::InvalidAngle(value));
        }
        let id = self.characteristic(Slot::Angle)?.clone();
        Ok((id, vec![value]))
    }

    /// Begin (or retry) the passkey unlock handshake. Returns the characteristic writes to
    /// enqueue: a passkey write followed by a forcing read, or `None` if the attempt cap has been
    /// reached.
    pub fn begin_unlock(&mut self) -> Result<Option<(CharacteristicId, Vec<u8>, CharacteristicId)>, DeviceError> {
        if !self.unlock.begin_attempt() {
            log::warn!("{} exhausted its unlock attempts", self.mac);
            return Ok(None);
        }
        let payload = unlock::encode_passkey(&self.passkey).map_err(|_| {
            DeviceError::CharacteristicMissing(Slot::Passkey)
        })?;
        let passkey_id = self.characteristic(Slot::Passkey)?.clone();
        Ok(Some((passkey_id.clone(), payload, passkey_id)))
    }

    /// Dispatch a characteristic value notification (or read response) to the right decoder,
    /// returning the events the state transition produced.
    pub fn on_characteristic_value(
        &mut self,
        id: &CharacteristicId,
        value: &[u8],
    ) -> Vec<BlindDeviceEvent> {
        let Some(slot) = self
            .characteristics
            .iter()
            .find(|&(_, candidate)| candidate == id)
            .map(|(slot, _)| *slot)
        else {
            return Vec::new();
        };

        match slot {
            Slot::Angle => self.on_angle_value(value),
            Slot::Status => self.on_status_value(value),
            Slot::Sensors => self.on_sensors_value(value),
            Slot::Passkey => self.on_passkey_value(value),
            _ => Vec::new(),
        }
    }

    fn on_angle_value(&mut self, value: &[u8]) -> Vec<BlindDeviceEvent> {
        let Some(&angle) = value.first() else {
            return Vec::new();
        };
        if self.angle == Some(angle) {
            return Vec::new();
        }
        self.angle = Some(angle);
        vec![BlindDeviceEvent::Angle(angle)]
    }

    fn on_passkey_value(&mut self, value: &[u8]) -> Vec<BlindDeviceEvent> {
        // `UnlockFailed` is reported once, from `begin_unlock` at the moment the attempt cap is
        // reached (see `BlindDeviceSupervisor::drive_unlock`); a stray Passkey notification
        // arriving afterwards, while the handshake is already `Failed`, is not a new failure.
        let Ok(expected) = unlock::expected_echo(&self.passkey) else {
            return Vec::new();
        };
        if self.unlock.on_passkey_echo(value, &expected) {
            vec![BlindDeviceEvent::Unlocked]
        } else {
            Vec::new()
        }
    }

    fn on_status_value(&mut self, value: &[u8]) -> Vec<BlindDeviceEvent> {
        let Some(decoded) = Status::decode_bytes(value) else {
            return Vec::new();
        };
        let previous = self.status;

        // Two-phase update: record every emission the comparisons demand before touching
        // `self.status`, so an observer reacting to one event never sees a half-updated state.
        let mut pending: Vec<BlindDeviceEvent> = Vec::new();
        if decoded.is_reversed != previous.is_reversed {
            pending.push(BlindDeviceEvent::IsReversed(decoded.is_reversed));
        }
        if decoded.is_calibrated != previous.is_calibrated {
            pending.push(BlindDeviceEvent::IsCalibrated(decoded.is_calibrated));
        }
        if decoded.has_solar != previous.has_solar {
            pending.push(BlindDeviceEvent::HasSolar(decoded.has_solar));
        }
        if decoded.is_solar_charging != previous.is_solar_charging {
            pending.push(BlindDeviceEvent::IsSolarCharging(decoded.is_solar_charging));
        }
        if decoded.is_usb_charging != previous.is_usb_charging {
            pending.push(BlindDeviceEvent::IsUsbCharging(decoded.is_usb_charging));
        }
        if decoded.is_under_voltage_lockout != previous.is_under_voltage_lockout {
            pending.push(BlindDeviceEvent::IsUnderVoltageLockout(
                decoded.is_under_voltage_lockout,
            ));
        }
        if decoded.is_over_temperature != previous.is_over_temperature {
            pending.push(BlindDeviceEvent::IsOverTemperature(
                decoded.is_over_temperature,
            ));
        }

        self.status = decoded;
        pending
    }

    fn on_sensors_value(&mut self, value: &[u8]) -> Vec<BlindDeviceEvent> {
        let Some(decoded) = SensorReading::decode(value) else {
            return Vec::new();
        };
        let previous = self.sensors;

        let mut pending: Vec<BlindDeviceEvent> = Vec::new();
        if decoded.battery_percentage != previous.battery_percentage {
            pending.push(BlindDeviceEvent::BatteryPercentage(
                decoded.battery_percentage,
            ));
        }
        if decoded.battery_voltage_mv != previous.battery_voltage_mv {
            pending.push(BlindDeviceEvent::BatteryVoltageMillivolts(
                decoded.battery_voltage_mv,
            ));
        }
        if decoded.battery_charge != previous.battery_charge {
            pending.push(BlindDeviceEvent::BatteryCharge(decoded.battery_charge));
        }
        if decoded.solar_panel_voltage_mv != previous.solar_panel_voltage_mv {
            pending.push(BlindDeviceEvent::SolarPanelVoltageMillivolts(
                decoded.solar_panel_voltage_mv,
            ));
        }
        if decoded.interior_temperature_celsius != previous.interior_temperature_celsius {
            pending.push(BlindDeviceEvent::InteriorTemperatureCelsius(
                decoded.interior_temperature_celsius,
            ));
        }
        if decoded.battery_temperature_celsius != previous.battery_temperature_celsius {
            pending.push(BlindDeviceEvent::BatteryTemperatureCelsius(
                decoded.battery_temperature_celsius,
            ));
        }
        if decoded.illuminance_lux != previous.illuminance_lux {
            pending.push(BlindDeviceEvent::IlluminanceLux(decoded.illuminance_lux));
        }

        self.sensors = decoded;
        pending
    }

    /// Reset handshake state on disconnect; this does not reset the reconnect retry counter,
    /// which lives in the session manager.
    pub fn on_disconnect(&mut self) {
        self.unlock.on_disconnect();
    }

    /// Stop notifications on every bound characteristic (best-effort), then forget them.
    pub async fn dispose(&mut self, session: &BluetoothSession) {
        for (slot, id) in self.characteristics.drain() {
            if slot.notifies_on_bind() {
                if let Err(err) = session.stop_notify(&id).await {
                    log::warn!("{} failed to stop notifying on {:?}: {}", self.mac, slot, err);
                }
            }
        }
        if let Err(err) = session.disconnect(&self.device_id).await {
            log::warn!("{} failed to disconnect cleanly: {}", self.mac, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> BlindDevice {
        BlindDevice::new(
            "00:11:22:33:44:55".parse().unwrap(),
            DeviceId::new("/org/bluez/hci0/dev_00_11_22_33_44_55"),
            "000102030405".to_string(),
            3,
        )
    }

    #[test]
    fn rejects_angle_out_of_range() {
        let mut dev = device();
        dev.characteristics
            .insert(Slot::Angle, CharacteristicId::new("/org/bluez/hci0/dev_00_11_22_33_44_55/service0001/char0001"));
        assert!(matches!(
            dev.prepare_set_angle(201),
            Err(DeviceError::InvalidAngle(201))
        ));
        assert!(dev.prepare_set_angle(200).is_ok());
    }

    #[test]
    fn angle_notification_emits_once_per_change() {
        let mut dev = device();
        let id = CharacteristicId::new("/org/bluez/hci0/dev_00_11_22_33_44_55/service0001/char0001");
        dev.characteristics.insert(Slot::Angle, id.clone());

        let events = dev.on_characteristic_value(&id, &[50]);
        assert_eq!(events, vec![BlindDeviceEvent::Angle(50)]);

        // Repeating the identical notification must not re-emit.
        let events = dev.on_characteristic_value(&id, &[50]);
        assert!(events.is_empty());
    }

    #[test]
    fn status_notification_emits_only_changed_fields() {
        let mut dev = device();
        let id = CharacteristicId::new("/org/bluez/hci0/dev_00_11_22_33_44_55/service0001/char0002");
        dev.characteristics.insert(Slot::Status, id.clone());

        // 0x0001_0000 -> isCalibrated only.
        let events = dev.on_characteristic_value(&id, &[0x00, 0x00, 0x01, 0x00]);
        assert_eq!(events, vec![BlindDeviceEvent::IsCalibrated(true)]);

        // Unchanged payload emits nothing.
        assert!(dev.on_characteristic_value(&id, &[0x00, 0x00, 0x01, 0x00]).is_empty());
    }

    #[test]
    fn passkey_echo_completes_unlock() {
        let mut dev = device();
        let id = CharacteristicId::new("/org/bluez/hci0/dev_00_11_22_33_44_55/service0001/char0003");
        dev.characteristics.insert(Slot::Passkey, id.clone());

        let (write_id, payload, read_id) = dev.begin_unlock().unwrap().unwrap();
        assert_eq!(write_id, id);
        assert_eq!(read_id, id);
        assert_eq!(payload, vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x01]);
        assert_eq!(dev.unlock_state(), UnlockState::Unlocking);

        let echo = unlock::expected_echo("000102030405").unwrap();
        let events = dev.on_characteristic_value(&id, &echo);
        assert_eq!(events, vec![BlindDeviceEvent::Unlocked]);
        assert_eq!(dev.unlock_state(), UnlockState::Unlocked);
    }

    #[test]
    fn binding_fails_closed_when_a_slot_is_missing() {
        let dev = device();
        assert!(matches!(
            dev.characteristic(Slot::Status),
            Err(DeviceError::CharacteristicMissing(Slot::Status))
        ));
    }

    #[test]
    fn binding_tolerates_missing_unused_slots() {
        // Mirrors the `for slot in Slot::ALL` check in `try_bind`: a device exposing only the
        // slots this bridge actually uses (everything but Calibration/Rx/Tx/Schedule/Time) must
        // bind successfully.
        let found: HashMap<Slot, CharacteristicId> = Slot::ALL
            .into_iter()
            .filter(|slot| slot.is_required())
            .map(|slot| {
                (
                    slot,
                    CharacteristicId::new("/org/bluez/hci0/dev_00_11_22_33_44_55/service0001/char0001"),
                )
            })
            .collect();
        let missing_required = Slot::ALL
            .into_iter()
            .find(|slot| slot.is_required() && !found.contains_key(slot));
        assert_eq!(missing_required, None);
    }
}
