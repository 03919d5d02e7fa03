use std::sync::LazyLock;

use hush_core::MicStatus;

pub const ICON_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/icon.png");

static ICON_SPEAKING: LazyLock<tray_icon::Icon> =
    LazyLock::new(|| load_icon(include_bytes!("../assets/mic.png")));
static ICON_MUTED: LazyLock<tray_icon::Icon> =
    LazyLock::new(|| load_icon(include_bytes!("../assets/mic-muted.png")));

/// Status-bar image for a microphone status.
pub trait StatusIcon {
    fn icon(&self) -> tray_icon::Icon;
}

impl StatusIcon for MicStatus {
    fn icon(&self) -> tray_icon::Icon {
        match self {
            MicStatus::Muted => ICON_MUTED.clone(),
            MicStatus::Speaking => ICON_SPEAKING.clone(),
        }
    }
}

fn load_icon(bytes: &[u8]) -> tray_icon::Icon {
    let image = image::load_from_memory(bytes)
        .expect("Failed to decode embedded icon")
        .into_rgba8();
    let (width, height) = image.dimensions();
    tray_icon::Icon::from_rgba(image.into_raw(), width, height).expect("Failed to open icon")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_icons_decode() {
        for bytes in [
            &include_bytes!("../assets/mic.png")[..],
            &include_bytes!("../assets/mic-muted.png")[..],
        ] {
            let image = image::load_from_memory(bytes).unwrap();
            assert_eq!(image.width(), image.height());
        }
    }
}
