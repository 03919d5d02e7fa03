//! Startup and shutdown sequencing.
//!
//! [`App::launch`] runs the startup steps in a fixed order: device watcher,
//! hotkeys, permission check, menu, status subscription, initial status,
//! device list. The OS is reached through traits so the whole sequence can
//! run against fakes.

use std::sync::Arc;

use hush_core::{
    DeviceMenuEntry, DeviceWatcher, InputDevice, ListenerPlatform, MicPermission, MicStatus,
    MicrophoneWatch, PermissionProvider, SharedMicrophone,
};
use tracing::{debug, error, info, warn};

/// Exit code for a normal quit.
pub const EXIT_QUIT: i32 = 0;

/// Exit code when the app cannot work: no microphone access or no device
/// list.
pub const EXIT_FATAL: i32 = 1;

/// Where the lifecycle pushes display updates. Calls may come from any
/// thread.
pub trait StatusUi: Send + Sync {
    /// Shows the status-bar item with its menu.
    fn attach_menu(&self);

    /// Updates the toggle item title and the status-bar icon.
    fn show_status(&self, status: MicStatus);

    /// Replaces the device submenu with a complete list.
    fn show_devices(&self, entries: Vec<DeviceMenuEntry>);
}

/// Ends the process.
pub trait Terminator: Send + Sync {
    fn exit(&self, code: i32);
}

/// `std::process::exit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

pub trait HotkeyControl {
    fn toggle(&mut self);
    fn record_new_hotkey(&mut self);
}

/// Returned once the app asked the [`Terminator`] to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminated;

/// Everything the app needs from the outside world.
pub struct AppParts<P> {
    pub microphone: SharedMicrophone,
    pub listeners: P,
    pub permissions: Box<dyn PermissionProvider>,
    pub ui: Arc<dyn StatusUi>,
    pub terminator: Arc<dyn Terminator>,
}

pub struct App<P: ListenerPlatform, H> {
    microphone: SharedMicrophone,
    watcher: DeviceWatcher<P>,
    hotkeys: H,
    ui: Arc<dyn StatusUi>,
    terminator: Arc<dyn Terminator>,
}

impl<P: ListenerPlatform, H: HotkeyControl> App<P, H> {
    /// Runs the startup protocol.
    ///
    /// Fails with [`Terminated`] when microphone access is refused or the
    /// device list cannot be read; the exit has already been requested.
    pub fn launch<F>(parts: AppParts<P>, make_hotkeys: F) -> Result<Self, Terminated>
    where
        F: FnOnce(SharedMicrophone) -> H,
    {
        let AppParts {
            microphone,
            listeners,
            permissions,
            ui,
            terminator,
        } = parts;

        let mut watcher = DeviceWatcher::new(listeners);
        let watch = Arc::new(MicrophoneWatch::new(microphone.clone()));
        if let Err(e) = watcher.register(watch) {
            warn!(error = %e, "Device changes will not be tracked");
        }

        let hotkeys = make_hotkeys(microphone.clone());

        match permissions.status() {
            MicPermission::NotDetermined => {
                info!("Requesting microphone access");
                let terminator = terminator.clone();
                permissions.request_access(Box::new(move |granted| {
                    if granted {
                        info!("Microphone access granted");
                    } else {
                        error!("Can't get access to the microphone");
                        terminator.exit(EXIT_FATAL);
                    }
                }));
            }
            permission @ (MicPermission::Denied | MicPermission::Restricted) => {
                error!(?permission, "Can't get access to the microphone");
                terminator.exit(EXIT_FATAL);
                return Err(Terminated);
            }
            MicPermission::Authorized => debug!("Microphone access already granted"),
        }

        ui.attach_menu();

        let mut app = Self {
            microphone,
            watcher,
            hotkeys,
            ui,
            terminator,
        };

        {
            let ui = app.ui.clone();
            let mut microphone = app.microphone.lock();
            microphone.on_status_changed(move |status| ui.show_status(status));
            microphone.set_status(MicStatus::Muted);
        }

        app.refresh_devices()?;
        Ok(app)
    }

    pub fn microphone(&self) -> &SharedMicrophone {
        &self.microphone
    }

    pub fn hotkeys_mut(&mut self) -> &mut H {
        &mut self.hotkeys
    }

    pub fn toggle(&mut self) {
        self.hotkeys.toggle();
    }

    /// Unmutes, then exits. The microphone is never left muted behind a
    /// process that is gone.
    pub fn quit(&mut self) {
        info!("Quitting");
        self.microphone.lock().set_status(MicStatus::Speaking);
        self.terminator.exit(EXIT_QUIT);
    }

    /// Rebuilds the device submenu. A failure to list devices is fatal.
    pub fn refresh_devices(&mut self) -> Result<(), Terminated> {
        let entries = self.microphone.lock().device_menu();
        match entries {
            Ok(entries) => {
                debug!(count = entries.len(), "Device menu refreshed");
                self.ui.show_devices(entries);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to list input devices");
                self.terminator.exit(EXIT_FATAL);
                Err(Terminated)
            }
        }
    }

    pub fn record_new_hotkey(&mut self) {
        self.hotkeys.record_new_hotkey();
    }

    /// Switches input to the device with `uid` and refreshes the menu.
    /// Returns the device when the switch succeeded.
    pub fn select_device(&mut self, uid: &str) -> Result<Option<InputDevice>, Terminated> {
        let selected = self.microphone.lock().select_input(uid);
        let selected = match selected {
            Ok(device) => Some(device),
            Err(e) => {
                warn!(uid, error = %e, "Failed to switch input device");
                None
            }
        };
        self.refresh_devices()?;
        Ok(selected)
    }

    /// Removes the device listener. Best-effort: the OS usually kills a
    /// menu-bar app before this runs.
    pub fn shutdown(&mut self) {
        if !self.watcher.is_registered() {
            return;
        }
        info!("Cleaning up device listener");
        if let Err(e) = self.watcher.unregister() {
            warn!(error = %e, "Failed to remove device listener");
        }
    }
}

#[cfg(test)]
mod tests {
    use hush_core::testing::{FakeBackend, FakePlatform};
    use hush_core::{InputDevice, Microphone};
    use parking_lot::Mutex;

    use super::*;
    use hush_core::permission::AccessCallback;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        AttachMenu,
        Status(MicStatus),
        Devices(Vec<String>),
        Exit(i32),
        HotkeysBuilt,
        Toggle,
        RecordHotkey,
    }

    type Log = Arc<Mutex<Vec<Call>>>;

    struct RecordingUi(Log);

    impl StatusUi for RecordingUi {
        fn attach_menu(&self) {
            self.0.lock().push(Call::AttachMenu);
        }

        fn show_status(&self, status: MicStatus) {
            self.0.lock().push(Call::Status(status));
        }

        fn show_devices(&self, entries: Vec<DeviceMenuEntry>) {
            let uids = entries.into_iter().map(|e| e.uid).collect();
            self.0.lock().push(Call::Devices(uids));
        }
    }

    struct RecordingTerminator(Log);

    impl Terminator for RecordingTerminator {
        fn exit(&self, code: i32) {
            self.0.lock().push(Call::Exit(code));
        }
    }

    struct FakeHotkeys {
        log: Log,
        microphone: SharedMicrophone,
    }

    impl HotkeyControl for FakeHotkeys {
        fn toggle(&mut self) {
            self.log.lock().push(Call::Toggle);
            self.microphone.lock().toggle();
        }

        fn record_new_hotkey(&mut self) {
            self.log.lock().push(Call::RecordHotkey);
        }
    }

    /// Permission prompt whose answer the test gives later.
    #[derive(Clone)]
    struct FakePermissions {
        status: MicPermission,
        pending: Arc<Mutex<Option<AccessCallback>>>,
    }

    impl FakePermissions {
        fn new(status: MicPermission) -> Self {
            Self {
                status,
                pending: Arc::new(Mutex::new(None)),
            }
        }

        fn answer(&self, granted: bool) {
            let callback = self.pending.lock().take().expect("no pending request");
            callback(granted);
        }
    }

    impl PermissionProvider for FakePermissions {
        fn status(&self) -> MicPermission {
            self.status
        }

        fn request_access(&self, on_complete: AccessCallback) {
            *self.pending.lock() = Some(on_complete);
        }
    }

    struct Harness {
        log: Log,
        backend: Arc<FakeBackend>,
        platform: FakePlatform,
        permissions: FakePermissions,
    }

    impl Harness {
        fn new(permission: MicPermission) -> Self {
            let backend = Arc::new(FakeBackend::with_devices(vec![
                InputDevice::new(40, "builtin", "MacBook Pro Microphone"),
                InputDevice::new(52, "usb-headset", "Headset"),
            ]));
            Self {
                log: Arc::new(Mutex::new(Vec::new())),
                backend,
                platform: FakePlatform::default(),
                permissions: FakePermissions::new(permission),
            }
        }

        fn launch(&self) -> Result<App<FakePlatform, FakeHotkeys>, Terminated> {
            let parts = AppParts {
                microphone: Microphone::new(self.backend.clone()).into_shared(),
                listeners: self.platform.clone(),
                permissions: Box::new(self.permissions.clone()),
                ui: Arc::new(RecordingUi(self.log.clone())),
                terminator: Arc::new(RecordingTerminator(self.log.clone())),
            };
            let log = self.log.clone();
            App::launch(parts, move |microphone| {
                log.lock().push(Call::HotkeysBuilt);
                FakeHotkeys { log, microphone }
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.log.lock().clone()
        }

        fn clear(&self) {
            self.log.lock().clear();
        }
    }

    fn devices() -> Call {
        Call::Devices(vec!["builtin".into(), "usb-headset".into()])
    }

    #[test]
    fn test_startup_order_when_authorized() {
        let harness = Harness::new(MicPermission::Authorized);

        let app = harness.launch().unwrap();

        assert_eq!(
            harness.calls(),
            vec![
                Call::HotkeysBuilt,
                Call::AttachMenu,
                Call::Status(MicStatus::Muted),
                devices(),
            ]
        );
        assert_eq!(harness.platform.active(), 1);
        assert_eq!(app.microphone().lock().status(), MicStatus::Muted);
        assert_eq!(
            app.microphone().lock().selected_input().map(|d| d.uid.clone()),
            Some("builtin".to_string())
        );
    }

    #[test]
    fn test_startup_forces_muted_on_hardware() {
        let harness = Harness::new(MicPermission::Authorized);

        harness.launch().unwrap();

        // Selected device gets the forced status once it is chosen.
        assert_eq!(harness.backend.mute_calls(), vec![(40, true)]);
    }

    #[test]
    fn test_denied_exits_before_menu() {
        for permission in [MicPermission::Denied, MicPermission::Restricted] {
            let harness = Harness::new(permission);

            let result = harness.launch();

            assert!(result.is_err());
            assert_eq!(harness.calls(), vec![Call::HotkeysBuilt, Call::Exit(EXIT_FATAL)]);
        }
    }

    #[test]
    fn test_declined_prompt_exits() {
        let harness = Harness::new(MicPermission::NotDetermined);

        // Startup does not wait for the answer.
        let app = harness.launch().unwrap();
        assert!(!harness.calls().contains(&Call::Exit(EXIT_FATAL)));

        harness.permissions.answer(false);

        assert_eq!(harness.calls().last(), Some(&Call::Exit(EXIT_FATAL)));
        drop(app);
    }

    #[test]
    fn test_granted_prompt_continues() {
        let harness = Harness::new(MicPermission::NotDetermined);

        let _app = harness.launch().unwrap();
        harness.permissions.answer(true);

        assert!(!harness.calls().iter().any(|c| matches!(c, Call::Exit(_))));
    }

    #[test]
    fn test_watcher_failure_is_not_fatal() {
        let harness = Harness::new(MicPermission::Authorized);
        harness.platform.set_add_status(-4);

        let app = harness.launch().unwrap();

        assert_eq!(harness.calls().last(), Some(&devices()));
        assert_eq!(harness.platform.active(), 0);
        drop(app);
    }

    #[test]
    fn test_startup_enumeration_failure_exits() {
        let harness = Harness::new(MicPermission::Authorized);
        harness.backend.fail_enumeration();

        assert!(harness.launch().is_err());
        assert_eq!(harness.calls().last(), Some(&Call::Exit(EXIT_FATAL)));
    }

    #[test]
    fn test_quit_unmutes_before_exit() {
        let harness = Harness::new(MicPermission::Authorized);
        let mut app = harness.launch().unwrap();
        harness.clear();

        app.quit();

        assert_eq!(
            harness.calls(),
            vec![Call::Status(MicStatus::Speaking), Call::Exit(EXIT_QUIT)]
        );
        assert_eq!(harness.backend.mute_calls().last(), Some(&(40, false)));
    }

    #[test]
    fn test_refresh_failure_exits_without_menu() {
        let harness = Harness::new(MicPermission::Authorized);
        let mut app = harness.launch().unwrap();
        harness.clear();
        harness.backend.fail_enumeration();

        assert_eq!(app.refresh_devices(), Err(Terminated));
        assert_eq!(harness.calls(), vec![Call::Exit(EXIT_FATAL)]);
    }

    #[test]
    fn test_refresh_shows_new_devices() {
        let harness = Harness::new(MicPermission::Authorized);
        let mut app = harness.launch().unwrap();
        harness.clear();
        harness
            .backend
            .set_devices(vec![InputDevice::new(52, "usb-headset", "Headset")]);

        app.refresh_devices().unwrap();

        assert_eq!(harness.calls(), vec![Call::Devices(vec!["usb-headset".into()])]);
    }

    #[test]
    fn test_menu_actions_reach_hotkeys() {
        let harness = Harness::new(MicPermission::Authorized);
        let mut app = harness.launch().unwrap();
        harness.clear();

        app.toggle();
        app.record_new_hotkey();

        assert_eq!(
            harness.calls(),
            vec![
                Call::Toggle,
                Call::Status(MicStatus::Speaking),
                Call::RecordHotkey
            ]
        );
    }

    #[test]
    fn test_select_device_switches_and_refreshes() {
        let harness = Harness::new(MicPermission::Authorized);
        let mut app = harness.launch().unwrap();
        harness.clear();

        let selected = app.select_device("usb-headset").unwrap();

        assert_eq!(selected.map(|d| d.uid), Some("usb-headset".to_string()));
        assert_eq!(harness.calls(), vec![devices()]);
        assert_eq!(
            harness.backend.mute_calls(),
            vec![(40, true), (40, false), (52, true)]
        );
    }

    #[test]
    fn test_select_unknown_device_keeps_selection() {
        let harness = Harness::new(MicPermission::Authorized);
        let mut app = harness.launch().unwrap();

        assert_eq!(app.select_device("gone").unwrap(), None);
        assert_eq!(
            app.microphone().lock().selected_input().map(|d| d.uid.clone()),
            Some("builtin".to_string())
        );
    }

    #[test]
    fn test_device_change_refreshes_selection() {
        let harness = Harness::new(MicPermission::Authorized);
        let app = harness.launch().unwrap();

        harness.backend.set_devices(vec![
            InputDevice::new(52, "usb-headset", "Headset"),
            InputDevice::new(61, "builtin", "MacBook Pro Microphone"),
        ]);
        harness.platform.fire();

        assert_eq!(
            app.microphone().lock().selected_input().map(|d| d.id.0),
            Some(61)
        );
    }

    #[test]
    fn test_shutdown_removes_listener() {
        let harness = Harness::new(MicPermission::Authorized);
        let mut app = harness.launch().unwrap();

        app.shutdown();
        app.shutdown();

        assert_eq!(harness.platform.active(), 0);
        assert_eq!(harness.platform.remove_calls(), 1);
    }

    #[test]
    fn test_shutdown_failure_is_swallowed() {
        let harness = Harness::new(MicPermission::Authorized);
        let mut app = harness.launch().unwrap();
        harness.platform.set_remove_status(-1);

        app.shutdown();

        assert!(!harness.calls().iter().any(|c| matches!(c, Call::Exit(_))));
    }
}
