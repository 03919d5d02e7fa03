//! Backend for platforms without CoreAudio.
//!
//! Input devices are listed through cpal, which has no stable device id, so
//! the device name doubles as the uid. Mute control and device-change
//! notifications are not available.

use std::ffi::c_void;

use cpal::traits::{DeviceTrait, HostTrait};
use hush_core::permission::AccessCallback;
use hush_core::watcher::{AudioObjectId, ListenerPlatform, ListenerProc, OsStatus, PropertyAddress};
use hush_core::{AudioBackend, AudioError, InputDevice, MicPermission, PermissionProvider};

/// `kAudio_UnimplementedError`
const UNIMPLEMENTED: OsStatus = -4;

#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for CpalBackend {
    fn input_devices(&self) -> Result<Vec<InputDevice>, AudioError> {
        let devices = cpal::default_host()
            .input_devices()
            .map_err(|e| AudioError::Enumerate(e.to_string()))?;
        Ok(devices
            .filter_map(|device| device.name().ok())
            .enumerate()
            .map(|(index, name)| InputDevice::new(index as u32, name.clone(), name))
            .collect())
    }

    fn default_input_device(&self) -> Result<Option<InputDevice>, AudioError> {
        let Some(name) = cpal::default_host()
            .default_input_device()
            .and_then(|device| device.name().ok())
        else {
            return Ok(None);
        };
        Ok(self.input_devices()?.into_iter().find(|d| d.uid == name))
    }

    fn set_input_muted(&self, _device: &InputDevice, _muted: bool) -> Result<(), AudioError> {
        Err(AudioError::Unsupported("input mute"))
    }
}

/// Refuses every listener registration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoListeners;

impl ListenerPlatform for NoListeners {
    unsafe fn add_listener(
        &self,
        _object: AudioObjectId,
        _address: &PropertyAddress,
        _listener: ListenerProc,
        _context: *mut c_void,
    ) -> OsStatus {
        UNIMPLEMENTED
    }

    unsafe fn remove_listener(
        &self,
        _object: AudioObjectId,
        _address: &PropertyAddress,
        _listener: ListenerProc,
        _context: *mut c_void,
    ) -> OsStatus {
        UNIMPLEMENTED
    }
}

/// No capture authorization exists here, access is always granted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPermissions;

impl PermissionProvider for NoPermissions {
    fn status(&self) -> MicPermission {
        MicPermission::Authorized
    }

    fn request_access(&self, on_complete: AccessCallback) {
        on_complete(true);
    }
}
