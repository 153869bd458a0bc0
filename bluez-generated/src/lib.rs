//! Generated async D-Bus client bindings for the subset of `org.bluez` interfaces
//! used by the rest of this workspace. Each module corresponds to one D-Bus
//! introspection file and was produced in the style of
//! `dbus-codegen-rust --client=nonblock --methodtype=none --prop-newtype`.

mod adapter1;
mod device1;
mod gattcharacteristic1;
mod gattdescriptor1;
mod gattmanager1;
mod gattservice1;

pub use adapter1::{OrgBluezAdapter1, OrgBluezAdapter1Properties, ORG_BLUEZ_ADAPTER1_NAME};
pub use device1::{OrgBluezDevice1, OrgBluezDevice1Properties, ORG_BLUEZ_DEVICE1_NAME};
pub use gattcharacteristic1::{
    OrgBluezGattCharacteristic1, OrgBluezGattCharacteristic1Properties,
    ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME,
};
pub use gattdescriptor1::{OrgBluezGattDescriptor1, ORG_BLUEZ_GATT_DESCRIPTOR1_NAME};
pub use gattmanager1::{OrgBluezGattManager1, ORG_BLUEZ_GATT_MANAGER1_NAME};
pub use gattservice1::{OrgBluezGattService1, ORG_BLUEZ_GATT_SERVICE1_NAME};
