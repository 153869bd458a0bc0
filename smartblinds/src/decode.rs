/// Decoded form of the 32-bit little-endian status word delivered by the Status characteristic.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Status {
    pub is_reversed: bool,
    pub is_bonding: bool,
    pub is_calibrated: bool,
    pub has_solar: bool,
    pub is_solar_charging: bool,
    pub is_usb_charging: bool,
    pub is_time_valid: bool,
    pub is_under_voltage_lockout: bool,
    pub is_over_temperature: bool,
    pub temp_override: bool,
    pub is_passkey_valid: bool,
    // Hard-coded false pending confirmation of the vendor's bit assignment.
    pub is_paired: bool,
    pub is_passkey_invalid: bool,
}

const MASK_IS_REVERSED: u32 = 0x0000_0001;
const MASK_IS_BONDING: u32 = 0x0000_0002;
const MASK_IS_CALIBRATED: u32 = 0x0001_0000;
const MASK_HAS_SOLAR: u32 = 0x0002_0000;
const MASK_IS_SOLAR_CHARGING: u32 = 0x0004_0000;
const MASK_IS_USB_CHARGING: u32 = 0x0008_0000;
const MASK_IS_TIME_VALID: u32 = 0x0010_0000;
const MASK_IS_UNDER_VOLTAGE_LOCKOUT: u32 = 0x0020_0000;
const MASK_IS_OVER_TEMPERATURE: u32 = 0x0040_0000;
const MASK_TEMP_OVERRIDE: u32 = 0x0080_0000;
const MASK_IS_PASSKEY_VALID: u32 = 0x8000_0000;

impl Status {
    pub fn decode(word: u32) -> Self {
        Self {
            is_reversed: word & MASK_IS_REVERSED != 0,
            is_bonding: word & MASK_IS_BONDING != 0,
            is_calibrated: word & MASK_IS_CALIBRATED != 0,
            has_solar: word & MASK_HAS_SOLAR != 0,
            is_solar_charging: word & MASK_IS_SOLAR_CHARGING != 0,
            is_usb_charging: word & MASK_IS_USB_CHARGING != 0,
            is_time_valid: word & MASK_IS_TIME_VALID != 0,
            is_under_voltage_lockout: word & MASK_IS_UNDER_VOLTAGE_LOCKOUT != 0,
            is_over_temperature: word & MASK_IS_OVER_TEMPERATURE != 0,
            temp_override: word & MASK_TEMP_OVERRIDE != 0,
            is_passkey_valid: word & MASK_IS_PASSKEY_VALID != 0,
            is_paired: false,
            is_passkey_invalid: false,
        }
    }

    pub fn encode(self) -> u32 {
        let mut word = 0u32;
        word |= if self.is_reversed { MASK_IS_REVERSED } else { 0 };
        word |= if self.is_bonding { MASK_IS_BONDING } else { 0 };
        word |= if self.is_calibrated { MASK_IS_CALIBRATED } else { 0 };
        word |= if self.has_solar { MASK_HAS_SOLAR } else { 0 };
        word |= if self.is_solar_charging {
            MASK_IS_SOLAR_CHARGING
        } else {
            0
        };
        word |= if self.is_usb_charging {
            MASK_IS_USB_CHARGING
        } else {
            0
        };
        word |= if self.is_time_valid { MASK_IS_TIME_VALID } else { 0 };
        word |= if self.is_under_voltage_lockout {
            MASK_IS_UNDER_VOLTAGE_LOCKOUT
        } else {
            0
        };
        word |= if self.is_over_temperature {
            MASK_IS_OVER_TEMPERATURE
        } else {
            0
        };
        word |= if self.temp_override { MASK_TEMP_OVERRIDE } else { 0 };
        word |= if self.is_passkey_valid {
            MASK_IS_PASSKEY_VALID
        } else {
            0
        };
        word
    }

    /// Decode a Status notification payload: a 32-bit little-endian word.
    pub fn decode_bytes(value: &[u8]) -> Option<Self> {
        let word = u32::from_le_bytes(value.get(0..4)?.try_into().ok()?);
        Some(Self::decode(word))
    }
}

/// Decoded form of a Sensors characteristic notification.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensorReading {
    pub battery_percentage: u8,
    pub battery_voltage_mv: u16,
    pub battery_charge: u16,
    pub solar_panel_voltage_mv: u16,
    pub interior_temperature_celsius: f32,
    pub battery_temperature_celsius: f32,
    pub illuminance_lux: f32,
}

impl SensorReading {
    /// Decode a Sensors notification payload. The payload must be at least 14 bytes.
    pub fn decode(value: &[u8]) -> Option<Self> {
        if value.len() < 14 {
            return None;
        }
        let u16_at = |offset: usize| u16::from_le_bytes([value[offset], value[offset + 1]]);
        Some(Self {
            battery_percentage: value[0],
            battery_voltage_mv: u16_at(2),
            battery_charge: u16_at(4),
            solar_panel_voltage_mv: u16_at(6),
            interior_temperature_celsius: u16_at(8) as f32 / 10.0,
            battery_temperature_celsius: u16_at(10) as f32 / 10.0,
            illuminance_lux: u16_at(12) as f32 / 10.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_decode_scenario() {
        // 01 00 02 80 little-endian -> 0x8002_0001
        let status = Status::decode_bytes(&[0x01, 0x00, 0x02, 0x80]).unwrap();
        assert!(status.is_reversed);
        assert!(!status.is_bonding);
        assert!(status.has_solar);
        assert!(status.is_passkey_valid);
        assert!(!status.is_calibrated);
        assert!(!status.is_solar_charging);
        assert!(!status.is_usb_charging);
        assert!(!status.is_time_valid);
        assert!(!status.is_under_voltage_lockout);
        assert!(!status.is_over_temperature);
        assert!(!status.temp_override);
    }

    #[test]
    fn status_round_trips_through_encode() {
        for word in [0u32, 0xFFFF_FFFF, 0x8002_0001, 0x0012_0003] {
            // Only the defined bit positions are guaranteed to survive the round trip.
            const DEFINED_MASK: u32 = MASK_IS_REVERSED
                | MASK_IS_BONDING
                | MASK_IS_CALIBRATED
                | MASK_HAS_SOLAR
                | MASK_IS_SOLAR_CHARGING
                | MASK_IS_USB_CHARGING
                | MASK_IS_TIME_VALID
                | MASK_IS_UNDER_VOLTAGE_LOCKOUT
                | MASK_IS_OVER_TEMPERATURE
                | MASK_TEMP_OVERRIDE
                | MASK_IS_PASSKEY_VALID;
            let decoded = Status::decode(word);
            assert_eq!(decoded.encode(), word & DEFINED_MASK);
        }
    }

    #[test]
    fn status_decode_too_short_is_none() {
        assert_eq!(Status::decode_bytes(&[0x01, 0x02]), None);
    }

    #[test]
    fn sensor_decode_scenario() {
        let reading = SensorReading::decode(&[
            0x55, 0x00, 0xC4, 0x0E, 0x00, 0x00, 0x00, 0x00, 0xE0, 0x00, 0xD4, 0x00, 0x32, 0x00,
        ])
        .unwrap();
        assert_eq!(reading.battery_percentage, 85);
        assert_eq!(reading.battery_voltage_mv, 3780);
        assert_eq!(reading.battery_charge, 0);
        assert_eq!(reading.solar_panel_voltage_mv, 0);
        assert_eq!(reading.interior_temperature_celsius, 22.4);
        assert_eq!(reading.battery_temperature_celsius, 21.2);
        assert_eq!(reading.illuminance_lux, 5.0);
    }

    #[test]
    fn sensor_decode_too_short_is_none() {
        assert_eq!(SensorReading::decode(&[0x55, 0x00]), None);
    }
}
