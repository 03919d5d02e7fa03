//! Global hotkey handling.
//!
//! The controller owns the hotkey registration and turns hotkey presses into
//! microphone status changes. It also drives re-recording: the old hotkey is
//! released, the event loop opens a capture window, and the captured
//! combination is registered in its place.

use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use hush_core::{HotkeyMode, MicStatus, SharedMicrophone};
use tao::event_loop::EventLoopProxy;
use tracing::{debug, error, info, warn};

use crate::config_ext::{ConfigExt, hotkey_label};
use crate::event::HushEvent;
use crate::lifecycle::HotkeyControl;
use crate::Config;

/// Label shown while waiting for a new hotkey.
pub const RECORDING_LABEL: &str = "Press new hotkey…";

/// What a hotkey event does to the microphone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Toggle,
    Set(MicStatus),
}

/// Maps a hotkey press or release to an action for the given mode.
pub fn action_for(mode: HotkeyMode, state: HotKeyState) -> Option<HotkeyAction> {
    match (mode, state) {
        (HotkeyMode::Toggle, HotKeyState::Pressed) => Some(HotkeyAction::Toggle),
        (HotkeyMode::Toggle, HotKeyState::Released) => None,
        (HotkeyMode::PushToTalk, HotKeyState::Pressed) => {
            Some(HotkeyAction::Set(MicStatus::Speaking))
        }
        (HotkeyMode::PushToTalk, HotKeyState::Released) => {
            Some(HotkeyAction::Set(MicStatus::Muted))
        }
    }
}

/// Hotkey state after a recording ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    /// Hotkey in effect afterwards
    pub hotkey: HotKey,
    /// Whether `hotkey` is registered with the OS
    pub registered: bool,
    /// The new hotkey, when it replaced the old one and should be saved
    pub accepted: Option<HotKey>,
}

/// Decides which hotkey to keep when recording ends.
///
/// A captured hotkey wins if it can be registered. Otherwise, and on
/// cancel, `current` is registered again.
pub fn settle_recording<R>(current: HotKey, captured: Option<HotKey>, mut register: R) -> Recorded
where
    R: FnMut(HotKey) -> bool,
{
    match captured {
        Some(hotkey) if register(hotkey) => {
            info!(hotkey = %hotkey_label(&hotkey), "New hotkey recorded");
            return Recorded {
                hotkey,
                registered: true,
                accepted: Some(hotkey),
            };
        }
        Some(hotkey) => {
            warn!(hotkey = %hotkey_label(&hotkey), "Hotkey is not available, keeping the old one");
        }
        None => debug!("Hotkey recording cancelled"),
    }
    Recorded {
        hotkey: current,
        registered: register(current),
        accepted: None,
    }
}

pub struct HotkeyController {
    manager: Option<GlobalHotKeyManager>,
    hotkey: HotKey,
    registered: bool,
    mode: HotkeyMode,
    recording: bool,
    microphone: SharedMicrophone,
    event_sender: EventLoopProxy<HushEvent>,
}

impl HotkeyController {
    /// Registers the configured hotkey. Without a working hotkey manager the
    /// controller still serves the menu actions.
    pub fn new(
        config: &Config,
        microphone: SharedMicrophone,
        event_sender: EventLoopProxy<HushEvent>,
    ) -> Self {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| error!(error = %e, "Failed to create hotkey manager"))
            .ok();
        let mut controller = Self {
            manager,
            hotkey: config.hotkey_or_default(),
            registered: false,
            mode: config.mode,
            recording: false,
            microphone,
            event_sender,
        };
        controller.registered = controller.register(controller.hotkey);
        controller.show_label();
        controller
    }

    /// Applies a global hotkey event.
    pub fn handle_event(&mut self, event: GlobalHotKeyEvent) {
        if self.recording || event.id() != self.hotkey.id() {
            return;
        }
        let Some(action) = action_for(self.mode, event.state()) else {
            return;
        };
        debug!(?action, "Hotkey");
        let mut microphone = self.microphone.lock();
        match action {
            HotkeyAction::Toggle => microphone.toggle(),
            HotkeyAction::Set(status) => microphone.set_status(status),
        }
    }

    /// Ends recording. With `Some(hotkey)` the new hotkey replaces the old
    /// one and is returned so it can be saved; otherwise the old hotkey is
    /// restored.
    pub fn finish_recording(&mut self, captured: Option<HotKey>) -> Option<HotKey> {
        if !self.recording {
            return None;
        }
        self.recording = false;

        let recorded = settle_recording(self.hotkey, captured, |hotkey| self.register(hotkey));
        self.hotkey = recorded.hotkey;
        self.registered = recorded.registered;
        let accepted = recorded.accepted;
        self.show_label();
        accepted
    }

    fn register(&self, hotkey: HotKey) -> bool {
        let Some(manager) = self.manager.as_ref() else {
            return false;
        };
        match manager.register(hotkey) {
            Ok(()) => true,
            Err(e) => {
                error!(hotkey = %hotkey_label(&hotkey), error = %e, "Failed to register hotkey");
                false
            }
        }
    }

    fn unregister(&mut self) {
        if !self.registered {
            return;
        }
        if let Some(manager) = self.manager.as_ref() {
            if let Err(e) = manager.unregister(self.hotkey) {
                warn!(error = %e, "Failed to unregister hotkey");
            }
        }
        self.registered = false;
    }

    fn show_label(&self) {
        let label = if self.recording {
            RECORDING_LABEL.to_owned()
        } else {
            format!("Hotkey: {}", hotkey_label(&self.hotkey))
        };
        self.event_sender
            .send_event(HushEvent::HotkeyLabel(label))
            .ok();
    }
}

impl HotkeyControl for HotkeyController {
    fn toggle(&mut self) {
        self.microphone.lock().toggle();
    }

    fn record_new_hotkey(&mut self) {
        if self.recording {
            return;
        }
        info!("Recording new hotkey");
        // Release the current hotkey so pressing it again can be captured.
        self.unregister();
        self.recording = true;
        self.show_label();
        self.event_sender.send_event(HushEvent::CaptureHotkey).ok();
    }
}
