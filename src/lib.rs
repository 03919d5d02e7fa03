// Re-export from sub-crates
pub use hush_audio::{SystemBackend, SystemListeners, SystemPermissions};
pub use hush_core::{
    APP_NAME, APP_NAME_PRETTY, Config, ConfigManager, DEFAULT_LOG_LEVEL, DeviceMenuEntry,
    HotkeyMode, InputDevice, LOG_ENV, MicStatus, Microphone, SharedMicrophone,
};

// App-specific modules
pub mod capture;
pub mod config_ext;
pub mod event;
pub mod hotkey;
pub mod icon;
pub mod lifecycle;
pub mod menu;
pub mod notify;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
