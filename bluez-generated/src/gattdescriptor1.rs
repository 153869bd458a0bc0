// This code was autogenerated with `dbus-codegen-rust --file=specs/org.bluez.GattDescriptor1.xml --interfaces=org.bluez.GattDescriptor1 --client=nonblock --methodtype=none --prop-newtype`, see https://github.com/diwic/dbus-rs
#[allow(unused_imports)]
use dbus::arg;
use dbus::nonblock;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;

pub const ORG_BLUEZ_GATT_DESCRIPTOR1_NAME: &str = "org.bluez.GattDescriptor1";

pub trait OrgBluezGattDescriptor1 {
    fn read_value(&self, options: arg::PropMap) -> nonblock::MethodReply<Vec<u8>>;
    fn write_value(&self, value: Vec<u8>, options: arg::PropMap) -> nonblock::MethodReply<()>;

    fn uuid(&self) -> nonblock::MethodReply<String>;
    fn characteristic(&self) -> nonblock::MethodReply<dbus::Path<'static>>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezGattDescriptor1
    for nonblock::Proxy<'a, C>
{
    fn read_value(&self, options: arg::PropMap) -> nonblock::MethodReply<Vec<u8>> {
        self.method_call("org.bluez.GattDescriptor1", "ReadValue", (options,))
    }

    fn write_value(&self, value: Vec<u8>, options: arg::PropMap) -> nonblock::MethodReply<()> {
        self.method_call("org.bluez.GattDescriptor1", "WriteValue", (value, options))
    }

    fn uuid(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, "org.bluez.GattDescriptor1", "UUID")
    }

    fn characteristic(&self) -> nonblock::MethodReply<dbus::Path<'static>> {
        <Self as Properties>::get(self, "org.bluez.GattDescriptor1", "Characteristic")
    }
}
