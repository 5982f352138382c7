//! Cross-context messaging protocol
//!
//! The widget spans four contexts: the host page, the injected frame, the
//! content-script injector, and the background worker. Everything they say
//! to each other is one of the `CrossContextMessage` kinds below, carried
//! over per-channel transports that deliver in send order. Delivery is
//! best-effort: a message to a gone tab or an unready frame is dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Widget color theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// User-facing settings, owned by the background worker
///
/// Persisted as a single small record in the synced storage scope.
/// Writes are last-write-wins; there is no partial-merge conflict because
/// updates always go through [`Settings::apply`] on the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub auto_speak: bool,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_speak: false,
            theme: Theme::Dark,
        }
    }
}

impl Settings {
    /// Merge the provided fields of a patch over this record.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(auto_speak) = patch.auto_speak {
            self.auto_speak = auto_speak;
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
    }
}

/// Partial settings update carried by `UPDATE_SETTINGS`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_speak: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

/// Stable ids of the two context-menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuAction {
    Explain,
    AnalyzeCode,
}

impl MenuAction {
    /// Menu title shown to the user
    pub fn title(&self) -> &'static str {
        match self {
            MenuAction::Explain => "Explain with AGNI",
            MenuAction::AnalyzeCode => "Analyze Code with AGNI",
        }
    }
}

/// A context-menu activation, created on click and consumed once
#[derive(Debug, Clone)]
pub struct ContextMenuEvent {
    pub menu_item_id: MenuAction,
    pub selection_text: String,
}

/// The closed set of messages exchanged across contexts
///
/// Wire tags and payload fields are a compatibility contract with the
/// content script and background worker; receivers match exhaustively so
/// a new kind cannot be ignored silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CrossContextMessage {
    /// Ask the background worker for the settings record (expects a reply)
    #[serde(rename = "GET_SETTINGS")]
    GetSettings,
    /// Merge a patch into the settings record (expects `{success}` reply)
    #[serde(rename = "UPDATE_SETTINGS")]
    UpdateSettings { settings: SettingsPatch },
    /// Fire-and-forget request for a system notification
    #[serde(rename = "SHOW_NOTIFICATION")]
    ShowNotification { title: String, message: String },
    /// Background worker -> content script: a menu entry was clicked
    #[serde(rename = "CONTEXT_MENU_CLICK")]
    ContextMenuClick {
        action: MenuAction,
        #[serde(rename = "selectedText")]
        selected_text: String,
    },
    /// Page channel: flip the widget between collapsed and expanded
    #[serde(rename = "AGNI_TOGGLE")]
    Toggle,
    /// Page channel: override the frame size (pixels)
    #[serde(rename = "AGNI_RESIZE")]
    Resize { width: u32, height: u32 },
    /// Injector -> frame: deliver a context-menu action into the panel
    #[serde(rename = "CONTEXT_ACTION")]
    ContextAction { action: MenuAction, text: String },
}

/// Reply to a runtime-channel request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuntimeReply {
    Settings(Settings),
    Ack { success: bool },
}

/// Envelope for the runtime channel (content script / popup -> background)
///
/// Request/response kinds attach a oneshot responder; the worker holding it
/// is the "will respond asynchronously" signal, and dropping it without
/// sending tells the caller the reply was lost. Fire-and-forget kinds carry
/// no responder.
#[derive(Debug)]
pub struct RuntimeEnvelope {
    pub message: CrossContextMessage,
    pub respond: Option<oneshot::Sender<RuntimeReply>>,
}

impl RuntimeEnvelope {
    /// Envelope with no reply expected
    pub fn fire_and_forget(message: CrossContextMessage) -> Self {
        Self {
            message,
            respond: None,
        }
    }

    /// Envelope expecting a reply; returns the receiving half
    pub fn request(message: CrossContextMessage) -> (Self, oneshot::Receiver<RuntimeReply>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                message,
                respond: Some(tx),
            },
            rx,
        )
    }
}
