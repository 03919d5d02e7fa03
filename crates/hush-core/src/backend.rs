//! Access to the OS audio subsystem.

use thiserror::Error;

use crate::InputDevice;

#[derive(Debug, Error)]
pub enum AudioError {
    /// An OS call returned a non-zero status code
    #[error("{call} failed with status {status}")]
    Status { call: &'static str, status: i32 },
    /// The device with this uid is not present
    #[error("no input device with uid {0}")]
    UnknownDevice(String),
    /// The operation is not supported by this backend or device
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
    /// Device enumeration failed
    #[error("failed to enumerate devices: {0}")]
    Enumerate(String),
}

impl AudioError {
    /// Maps an OS status code to `Ok(())` when zero.
    pub fn check(call: &'static str, status: i32) -> Result<(), AudioError> {
        if status == 0 {
            Ok(())
        } else {
            Err(AudioError::Status { call, status })
        }
    }
}

/// Input device enumeration and mute control.
///
/// Implementations must be callable from any thread: the device watcher
/// queries the backend from the OS notification thread.
pub trait AudioBackend: Send + Sync {
    /// Lists every device that has at least one input stream.
    fn input_devices(&self) -> Result<Vec<InputDevice>, AudioError>;

    /// The system default input device, if any.
    fn default_input_device(&self) -> Result<Option<InputDevice>, AudioError>;

    /// Mutes or unmutes input on the device.
    fn set_input_muted(&self, device: &InputDevice, muted: bool) -> Result<(), AudioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status() {
        assert!(AudioError::check("AudioObjectGetPropertyData", 0).is_ok());
        let err = AudioError::check("AudioObjectGetPropertyData", -50).unwrap_err();
        assert_eq!(
            err.to_string(),
            "AudioObjectGetPropertyData failed with status -50"
        );
    }
}
