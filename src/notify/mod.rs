//! System notification surface
//!
//! The widget asks for notifications in two places: `SHOW_NOTIFICATION`
//! requests handled by the background worker, and reminder firings from the
//! task scheduler. Both go through the [`Notifier`] trait so the platform
//! surface (and tests) can be swapped in behind it.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};

/// Notification permission state, as the platform reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// Never asked
    Default,
    Granted,
    Denied,
}

/// Trait for posting system notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Current permission state
    fn permission(&self) -> NotificationPermission;

    /// Prompt the user for permission; resolves to the resulting state
    async fn request_permission(&self) -> NotificationPermission;

    /// Post a notification. A `tag` collapses repeated firings for the
    /// same subject into one surface entry. No-op unless granted.
    fn show(&self, title: &str, message: &str, tag: Option<&str>);
}

/// Notifier that writes to the log stream
///
/// Stands in for the OS notification surface in headless runs. Permission
/// starts granted so reminders fire without a prompt.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    async fn request_permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn show(&self, title: &str, message: &str, tag: Option<&str>) {
        match tag {
            Some(tag) => tracing::info!(tag, "notification: {} - {}", title, message),
            None => tracing::info!("notification: {} - {}", title, message),
        }
    }
}

/// Scripted notifier for tests: records calls, answers permission prompts
/// with a configured outcome.
pub struct MockNotifier {
    state: AtomicU8,
    grant_on_request: bool,
    shown: std::sync::Mutex<Vec<ShownNotification>>,
}

/// One recorded `show` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownNotification {
    pub title: String,
    pub message: String,
    pub tag: Option<String>,
}

impl MockNotifier {
    pub fn new(initial: NotificationPermission, grant_on_request: bool) -> Self {
        Self {
            state: AtomicU8::new(Self::encode(initial)),
            grant_on_request,
            shown: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn granted() -> Self {
        Self::new(NotificationPermission::Granted, true)
    }

    pub fn shown(&self) -> Vec<ShownNotification> {
        self.shown.lock().unwrap().clone()
    }

    fn encode(p: NotificationPermission) -> u8 {
        match p {
            NotificationPermission::Default => 0,
            NotificationPermission::Granted => 1,
            NotificationPermission::Denied => 2,
        }
    }

    fn decode(v: u8) -> NotificationPermission {
        match v {
            1 => NotificationPermission::Granted,
            2 => NotificationPermission::Denied,
            _ => NotificationPermission::Default,
        }
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn permission(&self) -> NotificationPermission {
        Self::decode(self.state.load(Ordering::SeqCst))
    }

    async fn request_permission(&self) -> NotificationPermission {
        let next = if self.grant_on_request {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        };
        self.state.store(Self::encode(next), Ordering::SeqCst);
        next
    }

    fn show(&self, title: &str, message: &str, tag: Option<&str>) {
        if self.permission() != NotificationPermission::Granted {
            return;
        }
        self.shown.lock().unwrap().push(ShownNotification {
            title: title.to_string(),
            message: message.to_string(),
            tag: tag.map(str::to_string),
        });
    }
}
