//! Device-list change notifications.
//!
//! The OS audio subsystem reports changes through a plain `extern "C"`
//! callback plus an opaque context pointer. [`DeviceWatcher`] registers a
//! trampoline monomorphised for the observer type and hands the OS a borrowed
//! pointer to the observer. The callback resolves that pointer back to the
//! observer, with no global lookup.
//!
//! The OS does not own the observer. The stored registration holds the `Arc`
//! so the observer outlives the OS registration, and removal passes back the
//! exact same callback and context, because the OS matches listeners by
//! identity.

use std::any::Any;
use std::ffi::c_void;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{AudioBackend, SharedMicrophone};

/// OS handle of an audio object.
pub type AudioObjectId = u32;

/// OS status code, `0` on success.
pub type OsStatus = i32;

/// Mirror of CoreAudio's `AudioObjectPropertyAddress`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyAddress {
    pub selector: u32,
    pub scope: u32,
    pub element: u32,
}

/// Packs a four character code the way CoreAudio constants are defined.
pub const fn four_cc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

/// The process-wide audio system object.
pub const SYSTEM_OBJECT: AudioObjectId = 1;

/// Global list of audio devices (`kAudioHardwarePropertyDevices`).
pub const DEVICES_ADDRESS: PropertyAddress = PropertyAddress {
    selector: four_cc(b"dev#"),
    scope: four_cc(b"glob"),
    element: 0,
};

/// Signature of an OS property listener (`AudioObjectPropertyListenerProc`).
pub type ListenerProc = unsafe extern "C" fn(
    object: AudioObjectId,
    address_count: u32,
    addresses: *const PropertyAddress,
    context: *mut c_void,
) -> OsStatus;

/// The OS listener registration calls.
pub trait ListenerPlatform {
    /// # Safety
    ///
    /// `context` must stay valid for as long as `listener` is registered,
    /// and `listener` must tolerate being called from any thread.
    unsafe fn add_listener(
        &self,
        object: AudioObjectId,
        address: &PropertyAddress,
        listener: ListenerProc,
        context: *mut c_void,
    ) -> OsStatus;

    /// # Safety
    ///
    /// `listener` and `context` must be the values given to `add_listener`.
    unsafe fn remove_listener(
        &self,
        object: AudioObjectId,
        address: &PropertyAddress,
        listener: ListenerProc,
        context: *mut c_void,
    ) -> OsStatus;
}

/// Receives device-list change notifications, on an OS-chosen thread.
pub trait DeviceListObserver: Send + Sync + 'static {
    fn device_list_changed(&self);
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("couldn't add device listener: status {status}")]
    Register { status: OsStatus },
    #[error("couldn't remove device listener: status {status}")]
    Unregister { status: OsStatus },
}

/// An active subscription. `listener` and `context` are exactly what the OS
/// was given.
struct ListenerRegistration {
    listener: ListenerProc,
    context: *mut c_void,
    _observer: Arc<dyn Any + Send + Sync>,
}

/// Owns the single device-list listener of the process.
pub struct DeviceWatcher<P: ListenerPlatform> {
    platform: P,
    registration: Option<ListenerRegistration>,
    // Registrations the OS refused to remove. Their observers must stay
    // alive because the OS may still call into them.
    orphaned: Vec<ListenerRegistration>,
}

impl<P: ListenerPlatform> DeviceWatcher<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            registration: None,
            orphaned: Vec::new(),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// Subscribes `observer` to global device-list changes.
    ///
    /// On failure any earlier registration stays in place. On success an
    /// earlier registration is removed, so the stored handle always belongs
    /// to the latest successful call. Registering the observer that is
    /// already registered changes nothing, since the OS could not tell the
    /// two listeners apart.
    pub fn register<O: DeviceListObserver>(&mut self, observer: Arc<O>) -> Result<(), WatchError> {
        let listener: ListenerProc = device_list_trampoline::<O>;
        let context = Arc::as_ptr(&observer).cast::<c_void>().cast_mut();

        if self.registration.as_ref().is_some_and(|current| {
            current.context == context && std::ptr::fn_addr_eq(current.listener, listener)
        }) {
            debug!("Device watcher already registered for this observer");
            return Ok(());
        }

        // SAFETY: the registration stored below keeps the observer alive
        // until the listener is removed.
        let status = unsafe {
            self.platform
                .add_listener(SYSTEM_OBJECT, &DEVICES_ADDRESS, listener, context)
        };
        if status != 0 {
            return Err(WatchError::Register { status });
        }
        info!("Device watcher set up");

        let previous = self.registration.replace(ListenerRegistration {
            listener,
            context,
            _observer: observer,
        });
        if let Some(previous) = previous {
            debug!("Replacing previous device watcher");
            if let Err(e) = self.remove(previous) {
                warn!(error = %e, "Previous device watcher is still registered");
            }
        }
        Ok(())
    }

    /// Removes the listener. Does nothing when none is registered.
    pub fn unregister(&mut self) -> Result<(), WatchError> {
        match self.registration.take() {
            Some(registration) => self.remove(registration),
            None => Ok(()),
        }
    }

    fn remove(&mut self, registration: ListenerRegistration) -> Result<(), WatchError> {
        // SAFETY: same listener and context that were registered.
        let status = unsafe {
            self.platform.remove_listener(
                SYSTEM_OBJECT,
                &DEVICES_ADDRESS,
                registration.listener,
                registration.context,
            )
        };
        if status != 0 {
            self.orphaned.push(registration);
            return Err(WatchError::Unregister { status });
        }
        Ok(())
    }
}

impl<P: ListenerPlatform> Drop for DeviceWatcher<P> {
    fn drop(&mut self) {
        if let Err(e) = self.unregister() {
            debug!(error = %e, "Device watcher dropped while registered");
        }
        // The OS may still call these, so their observers are leaked.
        for registration in self.orphaned.drain(..) {
            std::mem::forget(registration);
        }
    }
}

unsafe extern "C" fn device_list_trampoline<O: DeviceListObserver>(
    _object: AudioObjectId,
    _address_count: u32,
    _addresses: *const PropertyAddress,
    context: *mut c_void,
) -> OsStatus {
    if context.is_null() {
        return 0;
    }
    // SAFETY: context came from `Arc::as_ptr` on an `O` that the
    // registration keeps alive while the listener is installed.
    let observer = unsafe { &*context.cast_const().cast::<O>() };
    observer.device_list_changed();
    0
}

/// Keeps the microphone's selection pointed at a live device handle.
///
/// When the device list changes the OS may hand out new ids for devices
/// that are still present. This re-queries the list and re-keys the
/// selection by uid. A failed query drops the notification.
pub struct MicrophoneWatch {
    backend: Arc<dyn AudioBackend>,
    microphone: SharedMicrophone,
}

impl MicrophoneWatch {
    pub fn new(microphone: SharedMicrophone) -> Self {
        let backend = microphone.lock().backend();
        Self {
            backend,
            microphone,
        }
    }
}

impl DeviceListObserver for MicrophoneWatch {
    fn device_list_changed(&self) {
        let devices = match self.backend.input_devices() {
            Ok(devices) => devices,
            Err(e) => {
                debug!(error = %e, "Dropping device change notification");
                return;
            }
        };
        let replaced = self.microphone.lock().refresh_selection(devices);
        debug!(replaced, "Device list changed");
    }
}
