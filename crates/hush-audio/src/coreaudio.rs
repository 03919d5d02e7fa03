//! CoreAudio device enumeration, input mute and property listeners.

use std::collections::HashMap;
use std::ffi::c_void;
use std::mem::size_of;
use std::ptr;

use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};
use hush_core::watcher::{
    AudioObjectId, DEVICES_ADDRESS, ListenerPlatform, ListenerProc, OsStatus, PropertyAddress,
    SYSTEM_OBJECT, four_cc,
};
use hush_core::{AudioBackend, AudioError, InputDevice};
use parking_lot::Mutex;
use tracing::{debug, trace};

const SCOPE_GLOBAL: u32 = four_cc(b"glob");
const SCOPE_INPUT: u32 = four_cc(b"inpt");
const ELEMENT_MAIN: u32 = 0;

/// `kAudioObjectUnknown`
const UNKNOWN_OBJECT: AudioObjectId = 0;

const DEFAULT_INPUT_DEVICE: PropertyAddress = global(four_cc(b"dIn "));
const DEVICE_UID: PropertyAddress = global(four_cc(b"uid "));
const OBJECT_NAME: PropertyAddress = global(four_cc(b"lnam"));
const INPUT_STREAMS: PropertyAddress = input(four_cc(b"stm#"));
const INPUT_MUTE: PropertyAddress = input(four_cc(b"mute"));
const INPUT_VOLUME: PropertyAddress = input(four_cc(b"volm"));

const fn global(selector: u32) -> PropertyAddress {
    PropertyAddress {
        selector,
        scope: SCOPE_GLOBAL,
        element: ELEMENT_MAIN,
    }
}

const fn input(selector: u32) -> PropertyAddress {
    PropertyAddress {
        selector,
        scope: SCOPE_INPUT,
        element: ELEMENT_MAIN,
    }
}

#[link(name = "CoreAudio", kind = "framework")]
unsafe extern "C" {
    fn AudioObjectHasProperty(object: AudioObjectId, address: *const PropertyAddress) -> u8;

    fn AudioObjectIsPropertySettable(
        object: AudioObjectId,
        address: *const PropertyAddress,
        out_settable: *mut u8,
    ) -> OsStatus;

    fn AudioObjectGetPropertyDataSize(
        object: AudioObjectId,
        address: *const PropertyAddress,
        qualifier_size: u32,
        qualifier: *const c_void,
        out_size: *mut u32,
    ) -> OsStatus;

    fn AudioObjectGetPropertyData(
        object: AudioObjectId,
        address: *const PropertyAddress,
        qualifier_size: u32,
        qualifier: *const c_void,
        io_size: *mut u32,
        out_data: *mut c_void,
    ) -> OsStatus;

    fn AudioObjectSetPropertyData(
        object: AudioObjectId,
        address: *const PropertyAddress,
        qualifier_size: u32,
        qualifier: *const c_void,
        data_size: u32,
        data: *const c_void,
    ) -> OsStatus;

    fn AudioObjectAddPropertyListener(
        object: AudioObjectId,
        address: *const PropertyAddress,
        listener: ListenerProc,
        client_data: *mut c_void,
    ) -> OsStatus;

    fn AudioObjectRemovePropertyListener(
        object: AudioObjectId,
        address: *const PropertyAddress,
        listener: ListenerProc,
        client_data: *mut c_void,
    ) -> OsStatus;
}

fn data_size(object: AudioObjectId, address: &PropertyAddress) -> Result<u32, AudioError> {
    let mut size = 0u32;
    let status =
        unsafe { AudioObjectGetPropertyDataSize(object, address, 0, ptr::null(), &mut size) };
    AudioError::check("AudioObjectGetPropertyDataSize", status)?;
    Ok(size)
}

fn get_array<T: Copy + Default>(
    object: AudioObjectId,
    address: &PropertyAddress,
) -> Result<Vec<T>, AudioError> {
    let size = data_size(object, address)?;
    let mut values = vec![T::default(); size as usize / size_of::<T>()];
    let mut io_size = (values.len() * size_of::<T>()) as u32;
    let status = unsafe {
        AudioObjectGetPropertyData(
            object,
            address,
            0,
            ptr::null(),
            &mut io_size,
            values.as_mut_ptr().cast(),
        )
    };
    AudioError::check("AudioObjectGetPropertyData", status)?;
    // The list may have shrunk between the two calls.
    values.truncate(io_size as usize / size_of::<T>());
    Ok(values)
}

fn get_value<T: Copy + Default>(
    object: AudioObjectId,
    address: &PropertyAddress,
) -> Result<T, AudioError> {
    let mut value = T::default();
    let mut io_size = size_of::<T>() as u32;
    let status = unsafe {
        AudioObjectGetPropertyData(
            object,
            address,
            0,
            ptr::null(),
            &mut io_size,
            (&mut value as *mut T).cast(),
        )
    };
    AudioError::check("AudioObjectGetPropertyData", status)?;
    Ok(value)
}

fn set_value<T: Copy>(
    object: AudioObjectId,
    address: &PropertyAddress,
    value: T,
) -> Result<(), AudioError> {
    let status = unsafe {
        AudioObjectSetPropertyData(
            object,
            address,
            0,
            ptr::null(),
            size_of::<T>() as u32,
            (&value as *const T).cast(),
        )
    };
    AudioError::check("AudioObjectSetPropertyData", status)
}

fn get_string(object: AudioObjectId, address: &PropertyAddress) -> Result<String, AudioError> {
    let mut raw: CFStringRef = ptr::null();
    let mut io_size = size_of::<CFStringRef>() as u32;
    let status = unsafe {
        AudioObjectGetPropertyData(
            object,
            address,
            0,
            ptr::null(),
            &mut io_size,
            (&mut raw as *mut CFStringRef).cast(),
        )
    };
    AudioError::check("AudioObjectGetPropertyData", status)?;
    if raw.is_null() {
        return Err(AudioError::Enumerate(format!(
            "device {object} returned no string"
        )));
    }
    // The getter hands back a +1 reference.
    let string = unsafe { CFString::wrap_under_create_rule(raw) };
    Ok(string.to_string())
}

fn is_settable(object: AudioObjectId, address: &PropertyAddress) -> bool {
    if unsafe { AudioObjectHasProperty(object, address) } == 0 {
        return false;
    }
    let mut settable = 0u8;
    let status = unsafe { AudioObjectIsPropertySettable(object, address, &mut settable) };
    status == 0 && settable != 0
}

fn describe(id: AudioObjectId) -> Result<InputDevice, AudioError> {
    let uid = get_string(id, &DEVICE_UID)?;
    let name = get_string(id, &OBJECT_NAME)?;
    Ok(InputDevice::new(id, uid, name))
}

/// Audio devices through the CoreAudio HAL.
///
/// Muting prefers the device's input mute control. Devices without one are
/// silenced through the input volume, and the previous volume is restored
/// on unmute.
#[derive(Default)]
pub struct CoreAudioBackend {
    saved_volume: Mutex<HashMap<String, f32>>,
}

impl CoreAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_volume_muted(&self, device: &InputDevice, muted: bool) -> Result<(), AudioError> {
        let id = device.id.0;
        let mut saved = self.saved_volume.lock();
        if muted {
            let current: f32 = get_value(id, &INPUT_VOLUME)?;
            if current > 0.0 {
                saved.insert(device.uid.clone(), current);
            }
            set_value(id, &INPUT_VOLUME, 0.0f32)
        } else {
            let volume = saved.remove(&device.uid).unwrap_or(1.0);
            set_value(id, &INPUT_VOLUME, volume)
        }
    }
}

impl AudioBackend for CoreAudioBackend {
    fn input_devices(&self) -> Result<Vec<InputDevice>, AudioError> {
        let ids: Vec<AudioObjectId> = get_array(SYSTEM_OBJECT, &DEVICES_ADDRESS)?;

        let mut devices = Vec::with_capacity(ids.len());
        for id in ids {
            // A device can disappear while we walk the list, skip it.
            match data_size(id, &INPUT_STREAMS) {
                Ok(0) => continue,
                Ok(_) => {}
                Err(e) => {
                    debug!(id, error = %e, "Skipping device");
                    continue;
                }
            }
            match describe(id) {
                Ok(device) => devices.push(device),
                Err(e) => debug!(id, error = %e, "Skipping device"),
            }
        }
        trace!(count = devices.len(), "Enumerated input devices");
        Ok(devices)
    }

    fn default_input_device(&self) -> Result<Option<InputDevice>, AudioError> {
        let id: AudioObjectId = get_value(SYSTEM_OBJECT, &DEFAULT_INPUT_DEVICE)?;
        if id == UNKNOWN_OBJECT {
            return Ok(None);
        }
        describe(id).map(Some)
    }

    fn set_input_muted(&self, device: &InputDevice, muted: bool) -> Result<(), AudioError> {
        let id = device.id.0;
        if is_settable(id, &INPUT_MUTE) {
            set_value(id, &INPUT_MUTE, u32::from(muted))
        } else if is_settable(id, &INPUT_VOLUME) {
            self.set_volume_muted(device, muted)
        } else {
            Err(AudioError::Unsupported("input has no mute or volume control"))
        }
    }
}

/// Property listeners on the CoreAudio HAL.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreAudioListeners;

impl ListenerPlatform for CoreAudioListeners {
    unsafe fn add_listener(
        &self,
        object: AudioObjectId,
        address: &PropertyAddress,
        listener: ListenerProc,
        context: *mut c_void,
    ) -> OsStatus {
        unsafe { AudioObjectAddPropertyListener(object, address, listener, context) }
    }

    unsafe fn remove_listener(
        &self,
        object: AudioObjectId,
        address: &PropertyAddress,
        listener: ListenerProc,
        context: *mut c_void,
    ) -> OsStatus {
        unsafe { AudioObjectRemovePropertyListener(object, address, listener, context) }
    }
}
