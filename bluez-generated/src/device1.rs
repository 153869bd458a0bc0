// This code was autogenerated with `dbus-codegen-rust --file=specs/org.bluez.Device1.xml --interfaces=org.bluez.Device1 --client=nonblock --methodtype=none --prop-newtype`, see https://github.com/diwic/dbus-rs
#[allow(unused_imports)]
use dbus::arg;
use dbus::arg::{PropMap, RefArg, Variant};
use dbus::nonblock;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;
use std::collections::HashMap;

pub const ORG_BLUEZ_DEVICE1_NAME: &str = "org.bluez.Device1";

pub trait OrgBluezDevice1 {
    fn connect(&self) -> nonblock::MethodReply<()>;
    fn disconnect(&self) -> nonblock::MethodReply<()>;
    fn pair(&self) -> nonblock::MethodReply<()>;
    fn cancel_pairing(&self) -> nonblock::MethodReply<()>;

    fn address(&self) -> nonblock::MethodReply<String>;
    fn address_type(&self) -> nonblock::MethodReply<String>;
    fn name(&self) -> nonblock::MethodReply<String>;
    fn alias(&self) -> nonblock::MethodReply<String>;
    fn appearance(&self) -> nonblock::MethodReply<u16>;
    fn uuids(&self) -> nonblock::MethodReply<Vec<String>>;
    fn paired(&self) -> nonblock::MethodReply<bool>;
    fn trusted(&self) -> nonblock::MethodReply<bool>;
    fn set_trusted(&self, value: bool) -> nonblock::MethodReply<()>;
    fn connected(&self) -> nonblock::MethodReply<bool>;
    fn rssi(&self) -> nonblock::MethodReply<i16>;
    fn tx_power(&self) -> nonblock::MethodReply<i16>;
    fn manufacturer_data(&self) -> nonblock::MethodReply<HashMap<u16, Variant<Box<dyn RefArg>>>>;
    fn service_data(&self) -> nonblock::MethodReply<PropMap>;
    fn services_resolved(&self) -> nonblock::MethodReply<bool>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezDevice1
    for nonblock::Proxy<'a, C>
{
    fn connect(&self) -> nonblock::MethodReply<()> {
        self.method_call("org.bluez.Device1", "Connect", ())
    }

    fn disconnect(&self) -> nonblock::MethodReply<()> {
        self.method_call("org.bluez.Device1", "Disconnect", ())
    }

    fn pair(&self) -> nonblock::MethodReply<()> {
        self.method_call("org.bluez.Device1", "Pair", ())
    }

    fn cancel_pairing(&self) -> nonblock::MethodReply<()> {
        self.method_call("org.bluez.Device1", "CancelPairing", ())
    }

    fn address(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, "org.bluez.Device1", "Address")
    }

    fn address_type(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, "org.bluez.Device1", "AddressType")
    }

    fn name(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, "org.bluez.Device1", "Name")
    }

    fn alias(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, "org.bluez.Device1", "Alias")
    }

    fn appearance(&self) -> nonblock::MethodReply<u16> {
        <Self as Properties>::get(self, "org.bluez.Device1", "Appearance")
    }

    fn uuids(&self) -> nonblock::MethodReply<Vec<String>> {
        <Self as Properties>::get(self, "org.bluez.Device1", "UUIDs")
    }

    fn paired(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, "org.bluez.Device1", "Paired")
    }

    fn trusted(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, "org.bluez.Device1", "Trusted")
    }

    fn set_trusted(&self, value: bool) -> nonblock::MethodReply<()> {
        <Self as Properties>::set(self, "org.bluez.Device1", "Trusted", value)
    }

    fn connected(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, "org.bluez.Device1", "Connected")
    }

    fn rssi(&self) -> nonblock::MethodReply<i16> {
        <Self as Properties>::get(self, "org.bluez.Device1", "RSSI")
    }

    fn tx_power(&self) -> nonblock::MethodReply<i16> {
        <Self as Properties>::get(self, "org.bluez.Device1", "TxPower")
    }

    fn manufacturer_data(&self) -> nonblock::MethodReply<HashMap<u16, Variant<Box<dyn RefArg>>>> {
        <Self as Properties>::get(self, "org.bluez.Device1", "ManufacturerData")
    }

    fn service_data(&self) -> nonblock::MethodReply<PropMap> {
        <Self as Properties>::get(self, "org.bluez.Device1", "ServiceData")
    }

    fn services_resolved(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, "org.bluez.Device1", "ServicesResolved")
    }
}

/// Typed read-only access to the properties carried by an `org.bluez.Device1`
/// `InterfacesAdded`/`GetManagedObjects`/`PropertiesChanged` payload.
#[derive(Debug, Default)]
pub struct OrgBluezDevice1Properties<'a>(pub &'a arg::PropMap);

impl<'a> OrgBluezDevice1Properties<'a> {
    pub const INTERFACE_NAME: &'static str = ORG_BLUEZ_DEVICE1_NAME;

    pub fn from_interfaces(
        interfaces: &'a ::std::collections::HashMap<String, arg::PropMap>,
    ) -> Option<Self> {
        interfaces.get(ORG_BLUEZ_DEVICE1_NAME).map(Self)
    }

    pub fn address(&self) -> Option<&str> {
        arg::prop_cast::<String>(self.0, "Address").map(|v| v.as_str())
    }

    pub fn address_type(&self) -> Option<&str> {
        arg::prop_cast::<String>(self.0, "AddressType").map(|v| v.as_str())
    }

    pub fn name(&self) -> Option<&String> {
        arg::prop_cast::<String>(self.0, "Name")
    }

    pub fn alias(&self) -> Option<&str> {
        arg::prop_cast::<String>(self.0, "Alias").map(|v| v.as_str())
    }

    pub fn appearance(&self) -> Option<u16> {
        arg::prop_cast::<u16>(self.0, "Appearance").copied()
    }

    pub fn uuids(&self) -> Option<&Vec<String>> {
        arg::prop_cast::<Vec<String>>(self.0, "UUIDs")
    }

    pub fn paired(&self) -> Option<bool> {
        arg::prop_cast::<bool>(self.0, "Paired").copied()
    }

    pub fn connected(&self) -> Option<bool> {
        arg::prop_cast::<bool>(self.0, "Connected").copied()
    }

    pub fn rssi(&self) -> Option<i16> {
        arg::prop_cast::<i16>(self.0, "RSSI").copied()
    }

    pub fn tx_power(&self) -> Option<i16> {
        arg::prop_cast::<i16>(self.0, "TxPower").copied()
    }

    pub fn manufacturer_data(&self) -> Option<&HashMap<u16, Variant<Box<dyn RefArg>>>> {
        arg::prop_cast::<HashMap<u16, Variant<Box<dyn RefArg>>>>(self.0, "ManufacturerData")
    }

    pub fn service_data(&self) -> Option<&PropMap> {
        arg::prop_cast::<PropMap>(self.0, "ServiceData")
    }

    pub fn services_resolved(&self) -> Option<bool> {
        arg::prop_cast::<bool>(self.0, "ServicesResolved").copied()
    }
}
