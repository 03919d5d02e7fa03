//! Application events for the tao event loop.

use hush_core::{DeviceMenuEntry, MicStatus};

/// Events for the tao event loop. Sent from whichever thread produced them,
/// applied to the tray on the main thread.
#[derive(Debug, Clone)]
pub enum HushEvent {
    /// Show the status-bar item with its menu
    AttachMenu,
    /// The microphone status has changed
    StatusChanged(MicStatus),
    /// A complete device list is ready for the submenu
    DevicesListed(Vec<DeviceMenuEntry>),
    /// New text for the hotkey menu item
    HotkeyLabel(String),
    /// Open the window that captures a new hotkey
    CaptureHotkey,
}
