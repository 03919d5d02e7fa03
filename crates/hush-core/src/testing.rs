//! In-memory stand-ins for the OS audio subsystem, shared by the tests of
//! this crate and the app.

use std::ffi::c_void;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::watcher::{
    AudioObjectId, DEVICES_ADDRESS, ListenerPlatform, ListenerProc, OsStatus, PropertyAddress,
    SYSTEM_OBJECT, four_cc,
};
use crate::{AudioBackend, AudioError, InputDevice};

#[derive(Default)]
pub struct FakeBackend {
    devices: Mutex<Vec<InputDevice>>,
    default: Mutex<Option<InputDevice>>,
    fail_enumeration: Mutex<bool>,
    fail_mute: Mutex<bool>,
    mute_calls: Mutex<Vec<(u32, bool)>>,
    queries: Mutex<usize>,
}

impl FakeBackend {
    pub fn with_devices(devices: Vec<InputDevice>) -> Self {
        let backend = Self::default();
        *backend.devices.lock() = devices;
        backend
    }

    pub fn set_devices(&self, devices: Vec<InputDevice>) {
        *self.devices.lock() = devices;
    }

    pub fn set_default(&self, device: Option<InputDevice>) {
        *self.default.lock() = device;
    }

    pub fn fail_enumeration(&self) {
        *self.fail_enumeration.lock() = true;
    }

    pub fn fail_mute(&self) {
        *self.fail_mute.lock() = true;
    }

    /// `(device id, muted)` for every mute call, in order.
    pub fn mute_calls(&self) -> Vec<(u32, bool)> {
        self.mute_calls.lock().clone()
    }

    pub fn queries(&self) -> usize {
        *self.queries.lock()
    }
}

impl AudioBackend for FakeBackend {
    fn input_devices(&self) -> Result<Vec<InputDevice>, AudioError> {
        *self.queries.lock() += 1;
        if *self.fail_enumeration.lock() {
            return Err(AudioError::Status {
                call: "AudioObjectGetPropertyData",
                status: -1,
            });
        }
        Ok(self.devices.lock().clone())
    }

    fn default_input_device(&self) -> Result<Option<InputDevice>, AudioError> {
        Ok(self.default.lock().clone())
    }

    fn set_input_muted(&self, device: &InputDevice, muted: bool) -> Result<(), AudioError> {
        if *self.fail_mute.lock() {
            return Err(AudioError::Unsupported("mute"));
        }
        self.mute_calls.lock().push((device.id.0, muted));
        Ok(())
    }
}

/// `kAudioHardwareBadObjectError`, returned when removing an unknown listener.
const BAD_OBJECT: OsStatus = four_cc(b"!obj") as OsStatus;

#[derive(Default)]
struct PlatformState {
    // (listener, context address) pairs the fake OS would call.
    active: Vec<(ListenerProc, usize)>,
    add_status: OsStatus,
    remove_status: OsStatus,
    remove_calls: usize,
}

/// Listener registry that behaves like the OS: it stores callbacks by
/// identity and invokes them with the registered context.
#[derive(Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<PlatformState>>,
}

impl FakePlatform {
    pub fn set_add_status(&self, status: OsStatus) {
        self.state.lock().add_status = status;
    }

    pub fn set_remove_status(&self, status: OsStatus) {
        self.state.lock().remove_status = status;
    }

    /// Number of installed listeners.
    pub fn active(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn remove_calls(&self) -> usize {
        self.state.lock().remove_calls
    }

    /// Delivers a device-list change to every installed listener.
    pub fn fire(&self) {
        let active = self.state.lock().active.clone();
        for (listener, context) in active {
            // SAFETY: the watcher keeps the context alive while installed.
            unsafe {
                listener(SYSTEM_OBJECT, 1, &DEVICES_ADDRESS, context as *mut c_void);
            }
        }
    }
}

impl ListenerPlatform for FakePlatform {
    unsafe fn add_listener(
        &self,
        _object: AudioObjectId,
        _address: &PropertyAddress,
        listener: ListenerProc,
        context: *mut c_void,
    ) -> OsStatus {
        let mut state = self.state.lock();
        if state.add_status == 0 {
            state.active.push((listener, context as usize));
        }
        state.add_status
    }

    unsafe fn remove_listener(
        &self,
        _object: AudioObjectId,
        _address: &PropertyAddress,
        listener: ListenerProc,
        context: *mut c_void,
    ) -> OsStatus {
        let mut state = self.state.lock();
        state.remove_calls += 1;
        if state.remove_status != 0 {
            return state.remove_status;
        }
        let position = state.active.iter().position(|(l, c)| {
            std::ptr::fn_addr_eq(*l, listener) && *c == context as usize
        });
        match position {
            Some(index) => {
                state.active.remove(index);
                0
            }
            None => BAD_OBJECT,
        }
    }
}
