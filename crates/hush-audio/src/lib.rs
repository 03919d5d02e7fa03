//! Audio device backends for hush.
//!
//! On macOS devices, mute and change notifications come from CoreAudio and
//! microphone authorization from AVFoundation. Elsewhere devices are listed
//! through cpal; muting and notifications are unavailable.

#[cfg(target_os = "macos")]
mod coreaudio;
#[cfg(not(target_os = "macos"))]
mod fallback;
#[cfg(target_os = "macos")]
mod permission;

#[cfg(target_os = "macos")]
pub use coreaudio::{CoreAudioBackend as SystemBackend, CoreAudioListeners as SystemListeners};
#[cfg(not(target_os = "macos"))]
pub use fallback::{
    CpalBackend as SystemBackend, NoListeners as SystemListeners,
    NoPermissions as SystemPermissions,
};
#[cfg(target_os = "macos")]
pub use permission::AvPermissions as SystemPermissions;
