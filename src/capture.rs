//! Small window that captures a new hotkey.
//!
//! Global hotkeys cannot observe arbitrary key presses, so recording uses a
//! focused window instead. The first non-modifier key, together with the
//! modifiers held at that moment, becomes the new hotkey. Escape or closing
//! the window cancels.

use anyhow::{Context, Result};
use global_hotkey::hotkey::HotKey;
use tao::dpi::LogicalSize;
use tao::event::{ElementState, WindowEvent};
use tao::event_loop::EventLoopWindowTarget;
use tao::keyboard::{KeyCode, ModifiersState};
use tao::window::{Window, WindowBuilder, WindowId};

use crate::config_ext::{HeldModifiers, hotkey_from_capture};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Still waiting for a usable key
    Pending,
    Captured(HotKey),
    Cancelled,
}

pub struct HotkeyCapture {
    window: Window,
    modifiers: ModifiersState,
}

impl HotkeyCapture {
    pub fn open<T: 'static>(target: &EventLoopWindowTarget<T>) -> Result<Self> {
        let window = WindowBuilder::new()
            .with_title("Press the new hotkey, or Esc to cancel")
            .with_inner_size(LogicalSize::new(360.0, 80.0))
            .with_resizable(false)
            .with_always_on_top(true)
            .with_focused(true)
            .build(target)
            .context("Failed to open hotkey capture window")?;
        window.set_focus();
        Ok(Self {
            window,
            modifiers: ModifiersState::empty(),
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn handle(&mut self, event: &WindowEvent<'_>) -> CaptureOutcome {
        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = *modifiers;
                CaptureOutcome::Pending
            }
            WindowEvent::CloseRequested | WindowEvent::Destroyed => CaptureOutcome::Cancelled,
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if event.physical_key == KeyCode::Escape {
                    return CaptureOutcome::Cancelled;
                }
                let held = HeldModifiers {
                    shift: self.modifiers.shift_key(),
                    control: self.modifiers.control_key(),
                    alt: self.modifiers.alt_key(),
                    super_key: self.modifiers.super_key(),
                };
                match hotkey_from_capture(&format!("{:?}", event.physical_key), held) {
                    Some(hotkey) => CaptureOutcome::Captured(hotkey),
                    None => CaptureOutcome::Pending,
                }
            }
            _ => CaptureOutcome::Pending,
        }
    }
}
