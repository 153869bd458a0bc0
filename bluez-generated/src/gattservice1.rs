// This code was autogenerated with `dbus-codegen-rust --file=specs/org.bluez.GattService1.xml --interfaces=org.bluez.GattService1 --client=nonblock --methodtype=none --prop-newtype`, see https://github.com/diwic/dbus-rs
#[allow(unused_imports)]
use dbus::arg;
use dbus::nonblock;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;

pub const ORG_BLUEZ_GATT_SERVICE1_NAME: &str = "org.bluez.GattService1";

pub trait OrgBluezGattService1 {
    fn uuid(&self) -> nonblock::MethodReply<String>;
    fn primary(&self) -> nonblock::MethodReply<bool>;
    fn device(&self) -> nonblock::MethodReply<dbus::Path<'static>>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezGattService1
    for nonblock::Proxy<'a, C>
{
    fn uuid(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, "org.bluez.GattService1", "UUID")
    }

    fn primary(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, "org.bluez.GattService1", "Primary")
    }

    fn device(&self) -> nonblock::MethodReply<dbus::Path<'static>> {
        <Self as Properties>::get(self, "org.bluez.GattService1", "Device")
    }
}

/// Typed read-only access to the properties carried by an `org.bluez.GattService1`
/// `GetManagedObjects` payload.
#[derive(Debug, Default)]
pub struct OrgBluezGattService1Properties<'a>(pub &'a arg::PropMap);

impl<'a> OrgBluezGattService1Properties<'a> {
    pub fn from_interfaces(
        interfaces: &'a ::std::collections::HashMap<String, arg::PropMap>,
    ) -> Option<Self> {
        interfaces.get(ORG_BLUEZ_GATT_SERVICE1_NAME).map(Self)
    }

    pub fn uuid(&self) -> Option<&str> {
        arg::prop_cast::<String>(self.0, "UUID").map(|v| v.as_str())
    }

    pub fn primary(&self) -> Option<bool> {
        arg::prop_cast::<bool>(self.0, "Primary").copied()
    }
}
