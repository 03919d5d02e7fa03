//! The microphone model: which input device is selected and whether it is
//! muted.
//!
//! The model is shared between the UI thread and the OS thread that delivers
//! device-list notifications, so it always lives behind a lock
//! ([`SharedMicrophone`]). Setting the status applies it to the hardware and
//! then synchronously notifies the single registered listener.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{AudioBackend, AudioError, DeviceMenuEntry, InputDevice, MicStatus};

pub type SharedMicrophone = Arc<Mutex<Microphone>>;

/// Called after every status assignment.
pub type StatusListener = Box<dyn FnMut(MicStatus) + Send + 'static>;

pub struct Microphone {
    backend: Arc<dyn AudioBackend>,
    selected: Option<InputDevice>,
    preferred_uid: Option<String>,
    status: MicStatus,
    listener: Option<StatusListener>,
}

impl Microphone {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            selected: None,
            preferred_uid: None,
            status: MicStatus::default(),
            listener: None,
        }
    }

    /// Device to select first when the menu is built, if it is present.
    pub fn with_preferred_input(mut self, uid: Option<String>) -> Self {
        self.preferred_uid = uid;
        self
    }

    pub fn into_shared(self) -> SharedMicrophone {
        Arc::new(Mutex::new(self))
    }

    pub fn backend(&self) -> Arc<dyn AudioBackend> {
        self.backend.clone()
    }

    pub fn input_devices(&self) -> Result<Vec<InputDevice>, AudioError> {
        self.backend.input_devices()
    }

    pub fn selected_input(&self) -> Option<&InputDevice> {
        self.selected.as_ref()
    }

    /// Replaces the selection without touching the hardware.
    pub fn set_selected_input(&mut self, device: InputDevice) {
        self.selected = Some(device);
    }

    pub fn status(&self) -> MicStatus {
        self.status
    }

    /// Assigns the status, applies it to the selected device and notifies
    /// the listener. The listener runs even if the status is unchanged.
    pub fn set_status(&mut self, status: MicStatus) {
        debug!(from = ?self.status, to = ?status, "Setting microphone status");
        self.status = status;
        self.apply_status();
        if let Some(listener) = self.listener.as_mut() {
            listener(status);
        }
    }

    /// Sets the one status listener, replacing any earlier one.
    ///
    /// The listener runs inside `set_status`, so with a [`SharedMicrophone`]
    /// it runs while the caller holds the lock. It must not lock the
    /// microphone itself; hand the status off (e.g. to the event loop)
    /// instead.
    pub fn on_status_changed<F>(&mut self, listener: F)
    where
        F: FnMut(MicStatus) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    pub fn toggle(&mut self) {
        self.set_status(self.status.toggled());
    }

    /// Re-keys the selection after the OS reported a new device list.
    ///
    /// Any device whose uid matches the selected one replaces it, picking up
    /// a new OS handle. Without a match the selection is left alone.
    /// Returns whether the selection was replaced.
    pub fn refresh_selection<I>(&mut self, devices: I) -> bool
    where
        I: IntoIterator<Item = InputDevice>,
    {
        let mut replaced = false;
        for device in devices {
            let matches = self
                .selected
                .as_ref()
                .is_some_and(|selected| selected.same_device(&device));
            if matches {
                debug!(uid = %device.uid, id = %device.id, "Refreshed selected input");
                self.selected = Some(device);
                replaced = true;
            }
        }
        replaced
    }

    /// Builds the device submenu rows.
    ///
    /// Makes sure a present device is selected first: the current selection
    /// if it still exists, otherwise the preferred uid, the system default,
    /// or the first device. Either the complete list or an error is
    /// returned.
    pub fn device_menu(&mut self) -> Result<Vec<DeviceMenuEntry>, AudioError> {
        let devices = self.backend.input_devices()?;

        let current = self
            .selected
            .as_ref()
            .and_then(|selected| devices.iter().find(|d| d.same_device(selected)));
        let choice = match current {
            Some(device) => Some(device.clone()),
            None => self.initial_choice(&devices)?,
        };

        if let Some(device) = choice {
            let changed = self
                .selected
                .as_ref()
                .is_none_or(|selected| !selected.same_device(&device));
            self.selected = Some(device);
            if changed {
                info!(device = ?self.selected, "Selected input device");
                self.apply_status();
            }
        }

        let selected_uid = self.selected.as_ref().map(|d| d.uid.as_str());
        Ok(devices
            .iter()
            .map(|device| DeviceMenuEntry {
                uid: device.uid.clone(),
                name: device.name.clone(),
                selected: Some(device.uid.as_str()) == selected_uid,
            })
            .collect())
    }

    /// Switches to the device with `uid`.
    ///
    /// A muted previous device is unmuted so it is not left silenced, and
    /// the current status is applied to the new one.
    pub fn select_input(&mut self, uid: &str) -> Result<InputDevice, AudioError> {
        let device = self
            .backend
            .input_devices()?
            .into_iter()
            .find(|d| d.uid == uid)
            .ok_or_else(|| AudioError::UnknownDevice(uid.to_owned()))?;

        if let Some(previous) = self.selected.as_ref() {
            if !previous.same_device(&device) && self.status.is_muted() {
                if let Err(e) = self.backend.set_input_muted(previous, false) {
                    warn!(uid = %previous.uid, error = %e, "Failed to unmute previous input");
                }
            }
        }

        info!(uid = %device.uid, name = %device.name, "Switching input device");
        self.selected = Some(device.clone());
        self.preferred_uid = Some(device.uid.clone());
        self.apply_status();
        Ok(device)
    }

    fn initial_choice(&self, devices: &[InputDevice]) -> Result<Option<InputDevice>, AudioError> {
        if let Some(uid) = self.preferred_uid.as_deref() {
            if let Some(device) = devices.iter().find(|d| d.uid == uid) {
                return Ok(Some(device.clone()));
            }
            debug!(uid, "Preferred input device not present");
        }

        if let Some(default) = self.backend.default_input_device()? {
            if let Some(device) = devices.iter().find(|d| d.same_device(&default)) {
                return Ok(Some(device.clone()));
            }
        }

        Ok(devices.first().cloned())
    }

    fn apply_status(&self) {
        let Some(device) = self.selected.as_ref() else {
            debug!("No input selected, status not applied to hardware");
            return;
        };
        if let Err(e) = self.backend.set_input_muted(device, self.status.is_muted()) {
            warn!(
                uid = %device.uid,
                status = ?self.status,
                error = %e,
                "Failed to apply microphone status"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn new_mic(backend: &Arc<FakeBackend>) -> Microphone {
        Microphone::new(backend.clone())
    }

    #[test]
    fn test_set_status_notifies_listener_every_time() {
        let backend = Arc::new(FakeBackend::with_devices(vec![]));
        let mut mic = new_mic(&backend);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        mic.on_status_changed(move |status| sink.lock().push(status));

        mic.set_status(MicStatus::Muted);
        mic.set_status(MicStatus::Muted);
        mic.toggle();

        assert_eq!(
            *seen.lock(),
            vec![MicStatus::Muted, MicStatus::Muted, MicStatus::Speaking]
        );
    }

    #[test]
    fn test_listener_runs_under_shared_lock() {
        let backend = Arc::new(FakeBackend::with_devices(vec![]));
        let shared = new_mic(&backend).into_shared();
        let weak = Arc::downgrade(&shared);
        let held = Arc::new(Mutex::new(Vec::new()));
        let sink = held.clone();
        shared.lock().on_status_changed(move |_| {
            if let Some(microphone) = weak.upgrade() {
                sink.lock().push(microphone.try_lock().is_none());
            }
        });

        shared.lock().toggle();

        assert_eq!(*held.lock(), vec![true]);
        assert_eq!(shared.lock().status(), MicStatus::Speaking);
    }

    #[test]
    fn test_set_status_mutes_selected_device() {
        let builtin = InputDevice::new(40, "builtin", "MacBook Pro Microphone");
        let backend = Arc::new(FakeBackend::with_devices(vec![builtin.clone()]));
        let mut mic = new_mic(&backend);
        mic.set_selected_input(builtin);

        mic.set_status(MicStatus::Muted);
        mic.set_status(MicStatus::Speaking);

        assert_eq!(backend.mute_calls(), vec![(40, true), (40, false)]);
    }

    #[test]
    fn test_hardware_failure_still_notifies() {
        let backend = Arc::new(FakeBackend::with_devices(vec![]));
        backend.fail_mute();
        let mut mic = new_mic(&backend);
        mic.set_selected_input(InputDevice::new(1, "usb", "USB Mic"));
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        mic.on_status_changed(move |status| *sink.lock() = Some(status));

        mic.set_status(MicStatus::Speaking);

        assert_eq!(mic.status(), MicStatus::Speaking);
        assert_eq!(*seen.lock(), Some(MicStatus::Speaking));
    }

    #[test]
    fn test_refresh_selection_without_match_keeps_selection() {
        let backend = Arc::new(FakeBackend::with_devices(vec![]));
        let mut mic = new_mic(&backend);
        let selected = InputDevice::new(7, "usb-headset", "Headset");
        mic.set_selected_input(selected.clone());

        let replaced = mic.refresh_selection(vec![
            InputDevice::new(8, "builtin", "MacBook Pro Microphone"),
            InputDevice::new(9, "display", "Studio Display Microphone"),
        ]);

        assert!(!replaced);
        assert_eq!(mic.selected_input(), Some(&selected));
    }

    #[test]
    fn test_refresh_selection_with_empty_list_keeps_selection() {
        let backend = Arc::new(FakeBackend::with_devices(vec![]));
        let mut mic = new_mic(&backend);
        let selected = InputDevice::new(7, "usb-headset", "Headset");
        mic.set_selected_input(selected.clone());

        assert!(!mic.refresh_selection(Vec::new()));
        assert_eq!(mic.selected_input(), Some(&selected));
    }

    #[test]
    fn test_refresh_selection_replaces_matching_uid() {
        let backend = Arc::new(FakeBackend::with_devices(vec![]));
        let mut mic = new_mic(&backend);
        mic.set_selected_input(InputDevice::new(7, "usb-headset", "Headset"));

        let refreshed = InputDevice::new(93, "usb-headset", "Headset (renamed)");
        let replaced = mic.refresh_selection(vec![
            InputDevice::new(8, "builtin", "MacBook Pro Microphone"),
            refreshed.clone(),
        ]);

        assert!(replaced);
        assert_eq!(mic.selected_input(), Some(&refreshed));
    }

    #[test]
    fn test_refresh_selection_without_selection_is_noop() {
        let backend = Arc::new(FakeBackend::with_devices(vec![]));
        let mut mic = new_mic(&backend);

        assert!(!mic.refresh_selection(vec![InputDevice::new(8, "builtin", "Mic")]));
        assert!(mic.selected_input().is_none());
    }

    #[test]
    fn test_device_menu_prefers_configured_uid() {
        let builtin = InputDevice::new(1, "builtin", "MacBook Pro Microphone");
        let usb = InputDevice::new(2, "usb", "USB Mic");
        let backend = Arc::new(FakeBackend::with_devices(vec![builtin.clone(), usb.clone()]));
        backend.set_default(Some(builtin));
        let mut mic = new_mic(&backend).with_preferred_input(Some("usb".into()));

        let entries = mic.device_menu().unwrap();

        assert_eq!(mic.selected_input(), Some(&usb));
        assert_eq!(
            entries.iter().map(|e| e.selected).collect::<Vec<_>>(),
            vec![false, true]
        );
    }

    #[test]
    fn test_device_menu_falls_back_to_default_then_first() {
        let builtin = InputDevice::new(1, "builtin", "MacBook Pro Microphone");
        let usb = InputDevice::new(2, "usb", "USB Mic");
        let backend = Arc::new(FakeBackend::with_devices(vec![builtin.clone(), usb.clone()]));
        backend.set_default(Some(usb.clone()));
        let mut mic = new_mic(&backend).with_preferred_input(Some("gone".into()));

        mic.device_menu().unwrap();
        assert_eq!(mic.selected_input(), Some(&usb));

        let backend = Arc::new(FakeBackend::with_devices(vec![builtin.clone(), usb]));
        let mut mic = new_mic(&backend);
        mic.device_menu().unwrap();
        assert_eq!(mic.selected_input(), Some(&builtin));
    }

    #[test]
    fn test_device_menu_applies_status_to_new_selection() {
        let builtin = InputDevice::new(1, "builtin", "MacBook Pro Microphone");
        let backend = Arc::new(FakeBackend::with_devices(vec![builtin]));
        let mut mic = new_mic(&backend);

        mic.device_menu().unwrap();
        mic.device_menu().unwrap();

        // Applied once, when the selection first appeared.
        assert_eq!(backend.mute_calls(), vec![(1, true)]);
    }

    #[test]
    fn test_device_menu_error_leaves_selection() {
        let usb = InputDevice::new(2, "usb", "USB Mic");
        let backend = Arc::new(FakeBackend::with_devices(vec![usb.clone()]));
        let mut mic = new_mic(&backend);
        mic.set_selected_input(usb.clone());
        backend.fail_enumeration();

        assert!(mic.device_menu().is_err());
        assert_eq!(mic.selected_input(), Some(&usb));
    }

    #[test]
    fn test_select_input_unmutes_previous_device() {
        let builtin = InputDevice::new(1, "builtin", "MacBook Pro Microphone");
        let usb = InputDevice::new(2, "usb", "USB Mic");
        let backend = Arc::new(FakeBackend::with_devices(vec![builtin.clone(), usb.clone()]));
        let mut mic = new_mic(&backend);
        mic.set_selected_input(builtin);

        let selected = mic.select_input("usb").unwrap();

        assert_eq!(selected, usb);
        assert_eq!(backend.mute_calls(), vec![(1, false), (2, true)]);
    }

    #[test]
    fn test_select_unknown_input_is_an_error() {
        let backend = Arc::new(FakeBackend::with_devices(vec![]));
        let mut mic = new_mic(&backend);

        let err = mic.select_input("nope").unwrap_err();
        assert!(matches!(err, AudioError::UnknownDevice(uid) if uid == "nope"));
    }
}
