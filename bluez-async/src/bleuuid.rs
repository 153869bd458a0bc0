use uuid::Uuid;

/// The Bluetooth base UUID, against which all 16-bit and 32-bit "short form" UUIDs are expanded.
/// See Bluetooth Core Specification Supplement, Part A, section 1.1.
const BLUETOOTH_BASE_UUID: Uuid = Uuid::from_bytes([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0x80, 0x5f, 0x9b, 0x34, 0xfb,
]);

/// Convenience conversions between the short forms of Bluetooth UUIDs used in specifications and
/// vendor documentation, and the full 128-bit `Uuid` that BlueZ deals in.
pub trait BleUuid {
    /// Get the 128-bit UUID equivalent to this one.
    fn into_uuid(self) -> Uuid;
}

impl BleUuid for Uuid {
    fn into_uuid(self) -> Uuid {
        self
    }
}

/// Expand a 16-bit "short form" Bluetooth UUID (such as `0x1800`) to its full 128-bit form.
pub fn uuid_from_u16(short: u16) -> Uuid {
    uuid_from_u32(short.into())
}

/// Expand a 32-bit "short form" Bluetooth UUID to its full 128-bit form.
pub fn uuid_from_u32(short: u32) -> Uuid {
    let (_, d2, d3, d4) = BLUETOOTH_BASE_UUID.as_fields();
    Uuid::from_fields(short, d2, d3, d4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_16_bit_uuid() {
        assert_eq!(
            uuid_from_u16(0x1800),
            Uuid::parse_str("00001800-0000-1000-8000-00805f9b34fb").unwrap()
        );
    }

    #[test]
    fn expands_32_bit_uuid() {
        assert_eq!(
            uuid_from_u32(0x00001403),
            Uuid::parse_str("00001403-0000-1000-8000-00805f9b34fb").unwrap()
        );
    }
}
