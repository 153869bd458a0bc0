// This code was autogenerated with `dbus-codegen-rust --file=specs/org.bluez.GattCharacteristic1.xml --interfaces=org.bluez.GattCharacteristic1 --client=nonblock --methodtype=none --prop-newtype`, see https://github.com/diwic/dbus-rs
#[allow(unused_imports)]
use dbus::arg;
use dbus::nonblock;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;

pub const ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME: &str = "org.bluez.GattCharacteristic1";

pub trait OrgBluezGattCharacteristic1 {
    fn read_value(&self, options: arg::PropMap) -> nonblock::MethodReply<Vec<u8>>;
    fn write_value(
        &self,
        value: Vec<u8>,
        options: arg::PropMap,
    ) -> nonblock::MethodReply<()>;
    fn start_notify(&self) -> nonblock::MethodReply<()>;
    fn stop_notify(&self) -> nonblock::MethodReply<()>;

    fn uuid(&self) -> nonblock::MethodReply<String>;
    fn service(&self) -> nonblock::MethodReply<dbus::Path<'static>>;
    fn flags(&self) -> nonblock::MethodReply<Vec<String>>;
    fn notifying(&self) -> nonblock::MethodReply<bool>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezGattCharacteristic1
    for nonblock::Proxy<'a, C>
{
    fn read_value(&self, options: arg::PropMap) -> nonblock::MethodReply<Vec<u8>> {
        self.method_call("org.bluez.GattCharacteristic1", "ReadValue", (options,))
    }

    fn write_value(&self, value: Vec<u8>, options: arg::PropMap) -> nonblock::MethodReply<()> {
        self.method_call(
            "org.bluez.GattCharacteristic1",
            "WriteValue",
            (value, options),
        )
    }

    fn start_notify(&self) -> nonblock::MethodReply<()> {
        self.method_call("org.bluez.GattCharacteristic1", "StartNotify", ())
    }

    fn stop_notify(&self) -> nonblock::MethodReply<()> {
        self.method_call("org.bluez.GattCharacteristic1", "StopNotify", ())
    }

    fn uuid(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, "org.bluez.GattCharacteristic1", "UUID")
    }

    fn service(&self) -> nonblock::MethodReply<dbus::Path<'static>> {
        <Self as Properties>::get(self, "org.bluez.GattCharacteristic1", "Service")
    }

    fn flags(&self) -> nonblock::MethodReply<Vec<String>> {
        <Self as Properties>::get(self, "org.bluez.GattCharacteristic1", "Flags")
    }

    fn notifying(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, "org.bluez.GattCharacteristic1", "Notifying")
    }
}

/// Typed read-only access to the properties carried by an `org.bluez.GattCharacteristic1`
/// `PropertiesChanged` payload.
#[derive(Debug, Default)]
pub struct OrgBluezGattCharacteristic1Properties<'a>(pub &'a arg::PropMap);

impl<'a> OrgBluezGattCharacteristic1Properties<'a> {
    pub const INTERFACE_NAME: &'static str = ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME;

    pub fn from_interfaces(
        interfaces: &'a ::std::collections::HashMap<String, arg::PropMap>,
    ) -> Option<Self> {
        interfaces.get(ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME).map(Self)
    }

    pub fn value(&self) -> Option<&Vec<u8>> {
        arg::prop_cast::<Vec<u8>>(self.0, "Value")
    }

    pub fn notifying(&self) -> Option<bool> {
        arg::prop_cast::<bool>(self.0, "Notifying").copied()
    }
}
