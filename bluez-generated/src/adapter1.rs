// This code was autogenerated with `dbus-codegen-rust --file=specs/org.bluez.Adapter1.xml --interfaces=org.bluez.Adapter1 --client=nonblock --methodtype=none --prop-newtype`, see https://github.com/diwic/dbus-rs
#[allow(unused_imports)]
use dbus::arg;
use dbus::nonblock;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;

pub const ORG_BLUEZ_ADAPTER1_NAME: &str = "org.bluez.Adapter1";

pub trait OrgBluezAdapter1 {
    fn start_discovery(&self) -> nonblock::MethodReply<()>;
    fn stop_discovery(&self) -> nonblock::MethodReply<()>;
    fn remove_device(&self, device: dbus::Path) -> nonblock::MethodReply<()>;
    fn set_discovery_filter(
        &self,
        properties: arg::PropMap,
    ) -> nonblock::MethodReply<()>;
    fn get_discovery_filters(&self) -> nonblock::MethodReply<Vec<String>>;

    fn address(&self) -> nonblock::MethodReply<String>;
    fn address_type(&self) -> nonblock::MethodReply<String>;
    fn name(&self) -> nonblock::MethodReply<String>;
    fn alias(&self) -> nonblock::MethodReply<String>;
    fn set_alias(&self, value: String) -> nonblock::MethodReply<()>;
    fn class(&self) -> nonblock::MethodReply<u32>;
    fn powered(&self) -> nonblock::MethodReply<bool>;
    fn set_powered(&self, value: bool) -> nonblock::MethodReply<()>;
    fn discoverable(&self) -> nonblock::MethodReply<bool>;
    fn set_discoverable(&self, value: bool) -> nonblock::MethodReply<()>;
    fn pairable(&self) -> nonblock::MethodReply<bool>;
    fn set_pairable(&self, value: bool) -> nonblock::MethodReply<()>;
    fn discovering(&self) -> nonblock::MethodReply<bool>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezAdapter1
    for nonblock::Proxy<'a, C>
{
    fn start_discovery(&self) -> nonblock::MethodReply<()> {
        self.method_call("org.bluez.Adapter1", "StartDiscovery", ())
    }

    fn stop_discovery(&self) -> nonblock::MethodReply<()> {
        self.method_call("org.bluez.Adapter1", "StopDiscovery", ())
    }

    fn remove_device(&self, device: dbus::Path) -> nonblock::MethodReply<()> {
        self.method_call("org.bluez.Adapter1", "RemoveDevice", (device,))
    }

    fn set_discovery_filter(&self, properties: arg::PropMap) -> nonblock::MethodReply<()> {
        self.method_call("org.bluez.Adapter1", "SetDiscoveryFilter", (properties,))
    }

    fn get_discovery_filters(&self) -> nonblock::MethodReply<Vec<String>> {
        self.method_call("org.bluez.Adapter1", "GetDiscoveryFilters", ())
    }

    fn address(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, "org.bluez.Adapter1", "Address")
    }

    fn address_type(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, "org.bluez.Adapter1", "AddressType")
    }

    fn name(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, "org.bluez.Adapter1", "Name")
    }

    fn alias(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, "org.bluez.Adapter1", "Alias")
    }

    fn set_alias(&self, value: String) -> nonblock::MethodReply<()> {
        <Self as Properties>::set(self, "org.bluez.Adapter1", "Alias", value)
    }

    fn class(&self) -> nonblock::MethodReply<u32> {
        <Self as Properties>::get(self, "org.bluez.Adapter1", "Class")
    }

    fn powered(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, "org.bluez.Adapter1", "Powered")
    }

    fn set_powered(&self, value: bool) -> nonblock::MethodReply<()> {
        <Self as Properties>::set(self, "org.bluez.Adapter1", "Powered", value)
    }

    fn discoverable(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, "org.bluez.Adapter1", "Discoverable")
    }

    fn set_discoverable(&self, value: bool) -> nonblock::MethodReply<()> {
        <Self as Properties>::set(self, "org.bluez.Adapter1", "Discoverable", value)
    }

    fn pairable(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, "org.bluez.Adapter1", "Pairable")
    }

    fn set_pairable(&self, value: bool) -> nonblock::MethodReply<()> {
        <Self as Properties>::set(self, "org.bluez.Adapter1", "Pairable", value)
    }

    fn discovering(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, "org.bluez.Adapter1", "Discovering")
    }
}

/// Typed read-only access to the properties carried by an `org.bluez.Adapter1`
/// `InterfacesAdded`/`GetManagedObjects` payload.
#[derive(Debug, Default)]
pub struct OrgBluezAdapter1Properties<'a>(pub &'a arg::PropMap);

impl<'a> OrgBluezAdapter1Properties<'a> {
    pub const INTERFACE_NAME: &'static str = ORG_BLUEZ_ADAPTER1_NAME;

    pub fn from_interfaces(
        interfaces: &'a ::std::collections::HashMap<String, arg::PropMap>,
    ) -> Option<Self> {
        interfaces.get(ORG_BLUEZ_ADAPTER1_NAME).map(Self)
    }

    pub fn address(&self) -> Option<&str> {
        arg::prop_cast::<String>(self.0, "Address").map(|v| v.as_str())
    }

    pub fn address_type(&self) -> Option<&str> {
        arg::prop_cast::<String>(self.0, "AddressType").map(|v| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        arg::prop_cast::<String>(self.0, "Name").map(|v| v.as_str())
    }

    pub fn alias(&self) -> Option<&str> {
        arg::prop_cast::<String>(self.0, "Alias").map(|v| v.as_str())
    }

    pub fn powered(&self) -> Option<bool> {
        arg::prop_cast::<bool>(self.0, "Powered").copied()
    }

    pub fn discoverable(&self) -> Option<bool> {
        arg::prop_cast::<bool>(self.0, "Discoverable").copied()
    }

    pub fn discovering(&self) -> Option<bool> {
        arg::prop_cast::<bool>(self.0, "Discovering").copied()
    }
}
