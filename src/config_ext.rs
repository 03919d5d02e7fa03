//! App-specific configuration extensions.
//!
//! This module provides hotkey support on top of the core Config, which
//! stores the hotkey as a string.

use std::str::FromStr;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use tracing::warn;

use crate::Config;

/// Default hotkey: Cmd+Shift+M
pub fn default_hotkey() -> HotKey {
    HotKey::new(Some(Modifiers::SUPER | Modifiers::SHIFT), Code::KeyM)
}

/// Extension trait for Config to handle hotkeys.
pub trait ConfigExt {
    /// Get the hotkey, parsing from config or using default.
    fn hotkey_or_default(&self) -> HotKey;

    /// Store a hotkey in the config.
    fn set_hotkey(&mut self, hotkey: &HotKey);
}

impl ConfigExt for Config {
    fn hotkey_or_default(&self) -> HotKey {
        let Some(configured) = self.hotkey() else {
            return default_hotkey();
        };
        match HotKey::from_str(configured) {
            Ok(hotkey) => hotkey,
            Err(e) => {
                warn!(hotkey = configured, error = %e, "Invalid hotkey in config, using default");
                default_hotkey()
            }
        }
    }

    fn set_hotkey(&mut self, hotkey: &HotKey) {
        self.hotkey = Some(hotkey_to_string(hotkey));
    }
}

const MODIFIER_NAMES: [(Modifiers, &str, &str); 4] = [
    (Modifiers::CONTROL, "control", "⌃"),
    (Modifiers::ALT, "alt", "⌥"),
    (Modifiers::SHIFT, "shift", "⇧"),
    (Modifiers::SUPER, "super", "⌘"),
];

fn has_super(mods: Modifiers) -> bool {
    mods.intersects(Modifiers::SUPER | Modifiers::META)
}

fn has_modifier(mods: Modifiers, modifier: Modifiers) -> bool {
    if modifier == Modifiers::SUPER {
        has_super(mods)
    } else {
        mods.contains(modifier)
    }
}

/// Config representation, e.g. `super+shift+KeyM`. Parses back with
/// `HotKey::from_str`.
pub fn hotkey_to_string(hotkey: &HotKey) -> String {
    let mut parts: Vec<String> = MODIFIER_NAMES
        .iter()
        .filter(|(modifier, _, _)| has_modifier(hotkey.mods, *modifier))
        .map(|(_, name, _)| name.to_string())
        .collect();
    parts.push(format!("{:?}", hotkey.key));
    parts.join("+")
}

/// Menu representation in macOS notation, e.g. `⇧⌘M`.
pub fn hotkey_label(hotkey: &HotKey) -> String {
    let mut label: String = MODIFIER_NAMES
        .iter()
        .filter(|(modifier, _, _)| has_modifier(hotkey.mods, *modifier))
        .map(|(_, _, symbol)| *symbol)
        .collect();
    let key = format!("{:?}", hotkey.key);
    let key = key
        .strip_prefix("Key")
        .or_else(|| key.strip_prefix("Digit"))
        .unwrap_or(&key);
    label.push_str(key);
    label
}

/// Modifier keys held while a hotkey is captured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldModifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub super_key: bool,
}

impl HeldModifiers {
    fn to_modifiers(self) -> Modifiers {
        let mut mods = Modifiers::empty();
        mods.set(Modifiers::SHIFT, self.shift);
        mods.set(Modifiers::CONTROL, self.control);
        mods.set(Modifiers::ALT, self.alt);
        mods.set(Modifiers::SUPER, self.super_key);
        mods
    }
}

fn is_modifier_key(name: &str) -> bool {
    ["Shift", "Control", "Alt", "Super", "Meta", "Hyper", "Fn"]
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

fn is_function_key(code: Code) -> bool {
    format!("{code:?}")
        .strip_prefix('F')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Builds a hotkey from a captured key press.
///
/// `key_name` is the physical key code name (`KeyM`, `Semicolon`, `F5`).
/// Returns `None` for modifier keys, unknown keys, and plain keys without a
/// modifier, which would swallow normal typing. Function keys may be used
/// alone.
pub fn hotkey_from_capture(key_name: &str, held: HeldModifiers) -> Option<HotKey> {
    if is_modifier_key(key_name) {
        return None;
    }
    let code = Code::from_str(key_name).ok()?;
    let mods = held.to_modifiers();
    if mods.is_empty() && !is_function_key(code) {
        return None;
    }
    Some(HotKey::new(Some(mods), code))
}
