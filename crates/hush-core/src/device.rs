//! Input device identity.

use std::fmt;

/// Opaque OS handle for an audio device. On macOS this is the
/// `AudioObjectID`; it can change when a device is reconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An input-capable audio device as reported by the OS.
///
/// `uid` is stable across reconnections and is what a selection is keyed on.
/// `id` is only valid until the device list changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    pub id: DeviceId,
    pub uid: String,
    pub name: String,
}

impl InputDevice {
    pub fn new(id: u32, uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DeviceId(id),
            uid: uid.into(),
            name: name.into(),
        }
    }

    /// True when both records describe the same physical device.
    pub fn same_device(&self, other: &InputDevice) -> bool {
        self.uid == other.uid
    }
}

/// One row of the device selection submenu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMenuEntry {
    pub uid: String,
    pub name: String,
    pub selected: bool,
}
