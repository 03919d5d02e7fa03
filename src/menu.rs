//! The status-bar menu.

use std::collections::HashMap;

use anyhow::Result;
use hush_core::{DeviceMenuEntry, MicStatus};
use parking_lot::Mutex;
use tao::event_loop::EventLoopProxy;
use tracing::warn;
use tray_icon::menu::{
    AboutMetadataBuilder, CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem,
    Submenu,
};

use crate::event::HushEvent;
use crate::lifecycle::StatusUi;
use crate::{APP_NAME_PRETTY, VERSION};

/// What a click on a menu item asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Toggle,
    SelectDevice(String),
    RefreshDevices,
    RecordHotkey,
    Quit,
}

pub struct TrayMenu {
    menu: Menu,
    toggle: MenuItem,
    devices: Submenu,
    refresh: MenuItem,
    hotkey_label: MenuItem,
    record_hotkey: MenuItem,
    quit: MenuItem,
    device_items: Vec<CheckMenuItem>,
    placeholder: Option<MenuItem>,
    device_uids: HashMap<MenuId, String>,
}

impl TrayMenu {
    pub fn new() -> Result<Self> {
        let menu = Menu::new();
        let toggle = MenuItem::new(MicStatus::Muted.title(), true, None);
        let devices = Submenu::new("Input Device", true);
        let refresh = MenuItem::new("Refresh", true, None);
        let hotkey_label = MenuItem::new("Hotkey:", false, None);
        let record_hotkey = MenuItem::new("Record New Hotkey…", true, None);
        let quit = MenuItem::new("Quit", true, None);

        devices.append_items(&[&PredefinedMenuItem::separator(), &refresh])?;
        menu.append_items(&[
            &MenuItem::new(APP_NAME_PRETTY, false, None),
            &PredefinedMenuItem::separator(),
            &toggle,
            &devices,
            &PredefinedMenuItem::separator(),
            &hotkey_label,
            &record_hotkey,
            &PredefinedMenuItem::separator(),
            &PredefinedMenuItem::about(
                None,
                Some(
                    AboutMetadataBuilder::new()
                        .version(Some(VERSION.to_owned()))
                        .build(),
                ),
            ),
            &quit,
        ])?;

        Ok(Self {
            menu,
            toggle,
            devices,
            refresh,
            hotkey_label,
            record_hotkey,
            quit,
            device_items: Vec::new(),
            placeholder: None,
            device_uids: HashMap::new(),
        })
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn action(&self, event: &MenuEvent) -> Option<MenuAction> {
        let id = &event.id;
        if id == self.toggle.id() {
            Some(MenuAction::Toggle)
        } else if id == self.refresh.id() {
            Some(MenuAction::RefreshDevices)
        } else if id == self.record_hotkey.id() {
            Some(MenuAction::RecordHotkey)
        } else if id == self.quit.id() {
            Some(MenuAction::Quit)
        } else {
            self.device_uids
                .get(id)
                .map(|uid| MenuAction::SelectDevice(uid.clone()))
        }
    }

    pub fn set_status(&self, status: MicStatus) {
        self.toggle.set_text(status.title());
    }

    pub fn set_hotkey_label(&self, label: &str) {
        self.hotkey_label.set_text(label);
    }

    /// Replaces the device items. The refresh item stays at the bottom.
    pub fn set_devices(&mut self, entries: &[DeviceMenuEntry]) -> Result<()> {
        for item in self.device_items.drain(..) {
            self.devices.remove(&item)?;
        }
        if let Some(placeholder) = self.placeholder.take() {
            self.devices.remove(&placeholder)?;
        }
        self.device_uids.clear();

        if entries.is_empty() {
            let placeholder = MenuItem::new("No input devices", false, None);
            self.devices.insert(&placeholder, 0)?;
            self.placeholder = Some(placeholder);
            return Ok(());
        }

        for (position, entry) in entries.iter().enumerate() {
            let item = CheckMenuItem::new(&entry.name, true, entry.selected, None);
            self.devices.insert(&item, position)?;
            self.device_uids.insert(item.id().clone(), entry.uid.clone());
            self.device_items.push(item);
        }
        Ok(())
    }
}

/// Forwards lifecycle display updates to the event loop, which owns the
/// menu.
pub struct ProxyUi(Mutex<EventLoopProxy<HushEvent>>);

impl ProxyUi {
    pub fn new(proxy: EventLoopProxy<HushEvent>) -> Self {
        Self(Mutex::new(proxy))
    }

    fn send(&self, event: HushEvent) {
        if self.0.lock().send_event(event).is_err() {
            warn!("Event loop is gone, dropping menu update");
        }
    }
}

impl StatusUi for ProxyUi {
    fn attach_menu(&self) {
        self.send(HushEvent::AttachMenu);
    }

    fn show_status(&self, status: MicStatus) {
        self.send(HushEvent::StatusChanged(status));
    }

    fn show_devices(&self, entries: Vec<DeviceMenuEntry>) {
        self.send(HushEvent::DevicesListed(entries));
    }
}
