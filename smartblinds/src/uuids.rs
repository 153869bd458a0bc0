use uuid::Uuid;

/// One of the named GATT characteristics a [`crate::device::BlindDevice`] binds to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Slot {
    Ack,
    Angle,
    Calibration,
    Name,
    Passkey,
    RxTx,
    Schedule,
    Sensors,
    Status,
    Time,
    VersionInfo,
}

impl Slot {
    pub const ALL: [Slot; 11] = [
        Slot::Ack,
        Slot::Angle,
        Slot::Calibration,
        Slot::Name,
        Slot::Passkey,
        Slot::RxTx,
        Slot::Schedule,
        Slot::Sensors,
        Slot::Status,
        Slot::Time,
        Slot::VersionInfo,
    ];

    fn uuid_prefix(self) -> &'static str {
        match self {
            Slot::Ack => "00001503",
            Slot::Angle => "00001403",
            Slot::Calibration => "0000140a",
            Slot::Name => "00001401",
            Slot::Passkey => "00001409",
            Slot::RxTx => "00001407",
            Slot::Schedule => "00001501",
            Slot::Sensors => "00001651",
            Slot::Status => "00001402",
            Slot::Time => "00001405",
            Slot::VersionInfo => "00001404",
        }
    }

    /// The full 128-bit UUID this slot's characteristic is matched against.
    pub fn uuid(self) -> Uuid {
        Uuid::parse_str(&format!("{}-1212-efde-1600-785feabcd123", self.uuid_prefix()))
            .expect("vendor characteristic UUID constant is malformed")
    }

    /// Look up which slot, if any, a discovered characteristic UUID corresponds to.
    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.uuid() == uuid)
    }

    /// The characteristics that are subscribed to notifications as soon as they are bound.
    pub fn notifies_on_bind(self) -> bool {
        matches!(self, Slot::Angle | Slot::Passkey | Slot::Sensors | Slot::Status)
    }

    /// Whether this slot is one the bridge actually reads from or writes to. Calibration, Rx/Tx,
    /// Schedule and Time are part of the vendor's characteristic table but unused by any operation
    /// this bridge performs, so a device that doesn't expose them should still bind successfully.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Slot::Ack
                | Slot::Angle
                | Slot::Name
                | Slot::Passkey
                | Slot::Sensors
                | Slot::Status
                | Slot::VersionInfo
        )
    }
}

/// The inclusive range of valid tilt angles.
pub const MIN_ANGLE: u8 = 0;
pub const MAX_ANGLE: u8 = 200;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_slot_has_a_distinct_uuid() {
        let uuids: Vec<Uuid> = Slot::ALL.iter().map(|slot| slot.uuid()).collect();
        for (i, a) in uuids.iter().enumerate() {
            for (j, b) in uuids.iter().enumerate() {
                assert!(i == j || a != b);
            }
        }
    }

    #[test]
    fn from_uuid_roundtrips() {
        for slot in Slot::ALL {
            assert_eq!(Slot::from_uuid(slot.uuid()), Some(slot));
        }
    }

    #[test]
    fn unknown_uuid_has_no_slot() {
        assert_eq!(Slot::from_uuid(Uuid::nil()), None);
    }

    #[test]
    fn only_the_slots_this_bridge_acts_on_are_required() {
        for slot in [
            Slot::Ack,
            Slot::Angle,
            Slot::Name,
            Slot::Passkey,
            Slot::Sensors,
            Slot::Status,
            Slot::VersionInfo,
        ] {
            assert!(slot.is_required(), "{slot:?} should be required");
        }
        for slot in [Slot::Calibration, Slot::RxTx, Slot::Schedule, Slot::Time] {
            assert!(!slot.is_required(), "{slot:?} should not be required");
        }
    }
}
