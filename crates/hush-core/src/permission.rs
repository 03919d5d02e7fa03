//! Microphone authorization.

/// Authorization state for audio capture, as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicPermission {
    /// The user has not been asked yet
    NotDetermined,
    /// The user denied access
    Denied,
    /// Access is blocked by policy and the user cannot grant it
    Restricted,
    /// Access granted
    Authorized,
}

impl MicPermission {
    /// Maps an `AVAuthorizationStatus` value.
    pub fn from_raw(status: isize) -> MicPermission {
        match status {
            0 => MicPermission::NotDetermined,
            1 => MicPermission::Restricted,
            2 => MicPermission::Denied,
            3 => MicPermission::Authorized,
            // Unknown future values are treated as a refusal.
            _ => MicPermission::Denied,
        }
    }
}

/// Completion handler for an access request. Receives `true` when granted.
pub type AccessCallback = Box<dyn FnOnce(bool) + Send + 'static>;

pub trait PermissionProvider {
    /// Current authorization state.
    fn status(&self) -> MicPermission;

    /// Prompts the user. `on_complete` may be called on any thread, at some
    /// later point.
    fn request_access(&self, on_complete: AccessCallback);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw() {
        assert_eq!(MicPermission::from_raw(0), MicPermission::NotDetermined);
        assert_eq!(MicPermission::from_raw(1), MicPermission::Restricted);
        assert_eq!(MicPermission::from_raw(2), MicPermission::Denied);
        assert_eq!(MicPermission::from_raw(3), MicPermission::Authorized);
        assert_eq!(MicPermission::from_raw(42), MicPermission::Denied);
    }
}
