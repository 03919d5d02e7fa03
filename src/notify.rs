//! System notifications.
//!
//! A menu-bar app has no console, so warnings and errors are also shown as
//! desktop notifications. That is how a fatal startup error reaches the
//! user before the process exits.

use anyhow::Result;
use notify_rust::Notification;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, error};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::icon::ICON_PATH;
use crate::{APP_NAME, APP_NAME_PRETTY};

/// Target of events about failed notifications. The layer never turns
/// these into notifications, otherwise a broken notification service would
/// recurse through the subscriber.
const FAILURE_TARGET: &str = "hush::notify::failure";

type Sender = fn(&str, &str) -> Result<()>;

fn show(summary: &str, body: &str) -> Result<()> {
    Notification::new()
        .icon(ICON_PATH)
        .appname(APP_NAME)
        .summary(&format!("{} - {}", APP_NAME_PRETTY, summary))
        .body(body)
        .show()?;
    Ok(())
}

fn deliver(send: Sender, summary: &str, body: &str) {
    if let Err(e) = send(summary, body) {
        error!(target: FAILURE_TARGET, "Failed to send notification: {}", e);
    }
}

/// Send a system notification with a summary and body.
pub fn notify(summary: &str, body: &str) {
    deliver(show, summary, body);
}

/// Visitor to extract the message field from tracing events.
struct MessageVisitor {
    message: Option<String>,
}

impl MessageVisitor {
    fn new() -> Self {
        Self { message: None }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        }
    }
}

/// Tracing layer that sends notifications for warnings and errors.
pub struct NotificationLayer {
    enabled: bool,
    send: Sender,
}

impl NotificationLayer {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            send: show,
        }
    }
}

fn should_notify(level: Level) -> Option<&'static str> {
    match level {
        Level::ERROR => Some("error"),
        Level::WARN => Some("warning"),
        _ => None,
    }
}

impl<S: Subscriber> Layer<S> for NotificationLayer {
    fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
        if !self.enabled || event.metadata().target() == FAILURE_TARGET {
            return;
        }
        let level = *event.metadata().level();

        if let Some(summary) = should_notify(level) {
            let mut visitor = MessageVisitor::new();
            event.record(&mut visitor);

            if let Some(message) = visitor.message {
                deliver(self.send, summary, &message);
            }
        }
    }
}
