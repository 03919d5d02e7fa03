//! Microphone mute status.

/// Whether the selected microphone is muted or live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MicStatus {
    /// Input is muted at the device level
    #[default]
    Muted,
    /// Input is live
    Speaking,
}

impl MicStatus {
    /// Label for the toggle menu item, naming the action it performs.
    pub fn title(&self) -> &'static str {
        match self {
            MicStatus::Muted => "Unmute",
            MicStatus::Speaking => "Mute",
        }
    }

    pub fn toggled(&self) -> MicStatus {
        match self {
            MicStatus::Muted => MicStatus::Speaking,
            MicStatus::Speaking => MicStatus::Muted,
        }
    }

    pub fn is_muted(&self) -> bool {
        matches!(self, MicStatus::Muted)
    }
}
