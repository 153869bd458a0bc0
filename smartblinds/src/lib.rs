//! Vendor BLE GATT protocol engine and single-flight session manager for smart blinds.
//!
//! This crate owns C2 (session/connection lifecycle) and C3 (per-device protocol state machine)
//! of the bridge: everything that talks to [`bluez_async`] directly. It knows nothing about MQTT;
//! callers observe decoded state through [`BlindDeviceEvent`] and drive writes through
//! [`SessionManager::execute_command`].

mod decode;
mod device;
mod queue;
mod session;
mod supervisor;
mod unlock;
mod uuids;

pub use decode::{SensorReading, Status};
pub use device::{BlindDevice, BlindDeviceEvent, BlindDeviceObserver, DeviceError};
pub use queue::{CommandQueue, QueuedCommand};
pub use session::{DeviceHandle, SessionConfig, SessionError, SessionManager, StartOptions};
pub use supervisor::BlindDeviceSupervisor;
pub use unlock::UnlockState;
pub use uuids::{Slot, MAX_ANGLE, MIN_ANGLE};

pub use bluez_async::{BluetoothError, BluetoothSession, DeviceId, MacAddress, SpawnError};
