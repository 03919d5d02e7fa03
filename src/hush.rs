use std::sync::Arc;

use anyhow::Result;
use global_hotkey::GlobalHotKeyEvent;
use hush::capture::{CaptureOutcome, HotkeyCapture};
use hush::config_ext::ConfigExt;
use hush::event::HushEvent;
use hush::hotkey::HotkeyController;
use hush::icon::StatusIcon;
use hush::lifecycle::{App, AppParts, EXIT_FATAL, ProcessExit, Terminated};
use hush::menu::{MenuAction, ProxyUi, TrayMenu};
use hush::notify::NotificationLayer;
use hush::{
    Config, ConfigManager, DEFAULT_LOG_LEVEL, LOG_ENV, Microphone, SystemBackend,
    SystemListeners, SystemPermissions,
};
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tray_icon::TrayIconBuilder;
use tray_icon::menu::MenuEvent;

fn save_config(config_manager: &ConfigManager, config: &Config) {
    if let Err(e) = config_manager.save(config) {
        warn!(error = %e, "Failed to save config");
    }
}

fn main() -> Result<()> {
    // Load config
    let config_manager = ConfigManager::new()?;
    let mut config = config_manager.load()?;
    // save back the config to create the file if it doesn't exist
    config_manager.save(&config)?;

    // Initialize the logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .finish()
        .with(NotificationLayer::new(config.notifications))
        .init();

    let microphone = Microphone::new(Arc::new(SystemBackend::new()))
        .with_preferred_input(config.input_device().map(str::to_owned))
        .into_shared();

    let mut tray_menu = TrayMenu::new()?;
    let mut icon_tray = None;
    let mut app: Option<App<SystemListeners, HotkeyController>> = None;
    let mut capture: Option<HotkeyCapture> = None;

    let menu_channel = MenuEvent::receiver();
    let hotkey_channel = GlobalHotKeyEvent::receiver();

    let event_loop: EventLoop<HushEvent> = EventLoopBuilder::with_user_event().build();
    let event_sender = event_loop.create_proxy();

    event_loop.run(move |event, target, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::NewEvents(StartCause::Init) => {
                // Launch once the event loop is running so the tray icon can
                // be created, see https://github.com/tauri-apps/tray-icon/issues/90
                let parts = AppParts {
                    microphone: microphone.clone(),
                    listeners: SystemListeners,
                    permissions: Box::new(SystemPermissions),
                    ui: Arc::new(ProxyUi::new(event_sender.clone())),
                    terminator: Arc::new(ProcessExit),
                };
                let sender = event_sender.clone();
                match App::launch(parts, |microphone| {
                    HotkeyController::new(&config, microphone, sender)
                }) {
                    Ok(launched) => {
                        app = Some(launched);
                        info!("Hush ready");
                    }
                    Err(Terminated) => *control_flow = ControlFlow::ExitWithCode(EXIT_FATAL),
                }
            }

            Event::UserEvent(event) => match event {
                HushEvent::AttachMenu => {
                    let status = microphone.lock().status();
                    match TrayIconBuilder::new()
                        .with_menu(Box::new(tray_menu.menu().clone()))
                        .with_tooltip("hush - microphone mute")
                        .with_icon(status.icon())
                        .build()
                    {
                        Ok(icon) => {
                            icon_tray.replace(icon);
                        }
                        Err(e) => error!(error = %e, "Failed to create tray icon"),
                    }

                    // We have to request a redraw here to have the icon actually show up.
                    // Tao only exposes a redraw method on the Window so we use core-foundation directly.
                    #[cfg(target_os = "macos")]
                    unsafe {
                        use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};

                        let rl = CFRunLoopGetMain();
                        CFRunLoopWakeUp(rl);
                    }
                }
                HushEvent::StatusChanged(status) => {
                    info!(?status, "Status changed");
                    tray_menu.set_status(status);
                    if let Some(icon) = icon_tray.as_ref() {
                        if let Err(e) = icon.set_icon(Some(status.icon())) {
                            warn!(error = %e, "Failed to update tray icon");
                        }
                    }
                }
                HushEvent::DevicesListed(entries) => {
                    if let Err(e) = tray_menu.set_devices(&entries) {
                        warn!(error = %e, "Failed to update device menu");
                    }
                }
                HushEvent::HotkeyLabel(label) => tray_menu.set_hotkey_label(&label),
                HushEvent::CaptureHotkey => {
                    if capture.is_none() {
                        match HotkeyCapture::open(target) {
                            Ok(window) => capture = Some(window),
                            Err(e) => {
                                error!(error = %e, "Can't record a new hotkey");
                                if let Some(app) = app.as_mut() {
                                    app.hotkeys_mut().finish_recording(None);
                                }
                            }
                        }
                    }
                }
            },

            Event::WindowEvent {
                window_id, event, ..
            } => {
                let outcome = match capture.as_mut() {
                    Some(window) if window.window_id() == window_id => window.handle(&event),
                    _ => CaptureOutcome::Pending,
                };
                let captured = match outcome {
                    CaptureOutcome::Pending => None,
                    CaptureOutcome::Captured(hotkey) => Some(Some(hotkey)),
                    CaptureOutcome::Cancelled => Some(None),
                };
                if let Some(captured) = captured {
                    // Dropping the capture closes its window.
                    capture = None;
                    if let Some(app) = app.as_mut() {
                        if let Some(hotkey) = app.hotkeys_mut().finish_recording(captured) {
                            config.set_hotkey(&hotkey);
                            save_config(&config_manager, &config);
                        }
                    }
                }
            }

            Event::LoopDestroyed => {
                if let Some(app) = app.as_mut() {
                    app.shutdown();
                }
            }

            _ => {}
        }

        if let Ok(event) = menu_channel.try_recv() {
            let action = tray_menu.action(&event);
            if let (Some(action), Some(running)) = (action, app.as_mut()) {
                match action {
                    MenuAction::Toggle => running.toggle(),
                    MenuAction::RefreshDevices => {
                        if running.refresh_devices().is_err() {
                            *control_flow = ControlFlow::ExitWithCode(EXIT_FATAL);
                        }
                    }
                    MenuAction::SelectDevice(uid) => match running.select_device(&uid) {
                        Ok(Some(device)) => {
                            info!(device = %device.name, "Input device selected");
                            config.input_device = Some(device.uid);
                            save_config(&config_manager, &config);
                        }
                        Ok(None) => {}
                        Err(Terminated) => *control_flow = ControlFlow::ExitWithCode(EXIT_FATAL),
                    },
                    MenuAction::RecordHotkey => running.record_new_hotkey(),
                    MenuAction::Quit => {
                        icon_tray.take();
                        running.quit();
                    }
                }
            }
        }

        // Handle hotkey events
        if let Ok(event) = hotkey_channel.try_recv() {
            if let Some(app) = app.as_mut() {
                app.hotkeys_mut().handle_event(event);
            }
        }
    });
}

