//! Core types for hush.
//!
//! This crate is platform-agnostic. It holds the configuration, the
//! microphone model and the bridge that turns OS device-list notifications
//! into selection updates. The OS side is reached through the traits in
//! [`backend`], [`permission`] and [`watcher`], which `hush-audio`
//! implements.

pub mod backend;
mod config;
mod device;
pub mod microphone;
pub mod permission;
mod status;
pub mod watcher;

pub use backend::{AudioBackend, AudioError};
pub use config::{Config, ConfigManager, HotkeyMode};
pub use device::{DeviceId, DeviceMenuEntry, InputDevice};
pub use microphone::{Microphone, SharedMicrophone};
pub use permission::{MicPermission, PermissionProvider};
pub use status::MicStatus;
pub use watcher::{
    DeviceListObserver, DeviceWatcher, ListenerPlatform, MicrophoneWatch, WatchError,
};

/// Application name
pub const APP_NAME: &str = "hush";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "Hush";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "HUSH_LOG";

#[cfg(any(test, feature = "testing"))]
#[doc(hidden)]
pub mod testing;
