//! Extension background worker
//!
//! Process-wide owner of the settings record and switchboard for
//! cross-context requests. Content scripts and the popup talk to it over
//! the runtime channel; it talks back to individual tabs through the tab
//! registry. Tab delivery is best-effort: a click routed to a tab that is
//! gone, or whose content script never loaded, is dropped.

use crate::notify::Notifier;
use crate::protocol::{
    ContextMenuEvent, CrossContextMessage, MenuAction, RuntimeEnvelope, RuntimeReply, Settings,
    SettingsPatch,
};
use crate::storage::WidgetStorage;
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifies one open tab with an injected content script
pub type TabId = u32;

/// Where a context-menu entry is offered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuContext {
    /// Only when text is selected
    Selection,
}

/// A registered context-menu entry
#[derive(Debug, Clone)]
pub struct ContextMenuEntry {
    pub id: MenuAction,
    pub title: &'static str,
    pub contexts: Vec<MenuContext>,
}

/// Commands consumed by the worker loop
#[derive(Debug)]
pub enum BackgroundCommand {
    /// A runtime-channel message from a content script or the popup
    Runtime(RuntimeEnvelope),
    /// The user clicked a context-menu entry in a tab
    MenuClicked { event: ContextMenuEvent, tab: TabId },
    /// A tab's content script came up and can receive messages
    TabOpened {
        tab: TabId,
        channel: mpsc::UnboundedSender<CrossContextMessage>,
    },
    TabClosed { tab: TabId },
}

/// The background worker state and message handlers
pub struct BackgroundWorker {
    storage: Arc<WidgetStorage>,
    notifier: Arc<dyn Notifier>,
    tabs: HashMap<TabId, mpsc::UnboundedSender<CrossContextMessage>>,
    menus: Vec<ContextMenuEntry>,
}

impl BackgroundWorker {
    /// Install-time setup: write default settings when none exist yet and
    /// register the context-menu entries.
    pub fn install(storage: Arc<WidgetStorage>, notifier: Arc<dyn Notifier>) -> Result<Self> {
        if storage.load_settings()?.is_none() {
            storage.save_settings(&Settings::default())?;
            tracing::info!("Installed default settings");
        }

        let menus = vec![
            ContextMenuEntry {
                id: MenuAction::Explain,
                title: MenuAction::Explain.title(),
                contexts: vec![MenuContext::Selection],
            },
            ContextMenuEntry {
                id: MenuAction::AnalyzeCode,
                title: MenuAction::AnalyzeCode.title(),
                contexts: vec![MenuContext::Selection],
            },
        ];

        Ok(Self {
            storage,
            notifier,
            tabs: HashMap::new(),
            menus,
        })
    }

    /// Registered context-menu entries
    pub fn menus(&self) -> &[ContextMenuEntry] {
        &self.menus
    }

    /// Handle one runtime-channel message, returning the reply for kinds
    /// that expect one.
    pub fn handle_message(&self, message: CrossContextMessage) -> Option<RuntimeReply> {
        match message {
            CrossContextMessage::GetSettings => Some(RuntimeReply::Settings(self.settings())),
            CrossContextMessage::UpdateSettings { settings } => {
                Some(RuntimeReply::Ack {
                    success: self.update_settings(&settings),
                })
            }
            CrossContextMessage::ShowNotification { title, message } => {
                self.notifier.show(&title, &message, None);
                None
            }
            // Page-channel kinds are not addressed to the worker
            CrossContextMessage::ContextMenuClick { .. }
            | CrossContextMessage::Toggle
            | CrossContextMessage::Resize { .. }
            | CrossContextMessage::ContextAction { .. } => {
                tracing::trace!("Dropping message not addressed to the background worker");
                None
            }
        }
    }

    /// Forward a context-menu click to the originating tab, fire-and-forget
    pub fn on_context_menu(&self, event: ContextMenuEvent, tab: TabId) {
        let Some(channel) = self.tabs.get(&tab) else {
            tracing::trace!("Dropping context-menu click for unknown tab {}", tab);
            return;
        };
        let message = CrossContextMessage::ContextMenuClick {
            action: event.menu_item_id,
            selected_text: event.selection_text,
        };
        if channel.send(message).is_err() {
            tracing::trace!("Dropping context-menu click for closed tab {}", tab);
        }
    }

    /// Consume commands until every handle is dropped
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<BackgroundCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                BackgroundCommand::Runtime(envelope) => {
                    let reply = self.handle_message(envelope.message);
                    if let (Some(reply), Some(respond)) = (reply, envelope.respond) {
                        // Caller gone; nothing to tell it
                        let _ = respond.send(reply);
                    }
                }
                BackgroundCommand::MenuClicked { event, tab } => self.on_context_menu(event, tab),
                BackgroundCommand::TabOpened { tab, channel } => {
                    self.tabs.insert(tab, channel);
                }
                BackgroundCommand::TabClosed { tab } => {
                    self.tabs.remove(&tab);
                }
            }
        }
        tracing::debug!("Background worker shutting down");
    }

    fn settings(&self) -> Settings {
        match self.storage.load_settings() {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::error!("Failed to read settings: {}", e);
                Settings::default()
            }
        }
    }

    fn update_settings(&self, patch: &SettingsPatch) -> bool {
        let mut settings = self.settings();
        settings.apply(patch);
        match self.storage.save_settings(&settings) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to persist settings: {}", e);
                false
            }
        }
    }
}

/// Cheap cloneable handle for talking to a spawned worker
#[derive(Clone)]
pub struct BackgroundHandle {
    tx: mpsc::UnboundedSender<BackgroundCommand>,
}

impl BackgroundHandle {
    /// Spawn the worker loop, returning the handle to it
    pub fn spawn(worker: BackgroundWorker) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(worker.run(rx));
        Self { tx }
    }

    /// Fetch the settings record
    pub async fn get_settings(&self) -> Result<Settings> {
        let (envelope, rx) = RuntimeEnvelope::request(CrossContextMessage::GetSettings);
        self.send_runtime(envelope)?;
        match rx.await {
            Ok(RuntimeReply::Settings(settings)) => Ok(settings),
            Ok(other) => bail!("unexpected reply to GET_SETTINGS: {:?}", other),
            Err(_) => bail!("background worker dropped the request"),
        }
    }

    /// Merge a patch into the settings record
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<bool> {
        let (envelope, rx) =
            RuntimeEnvelope::request(CrossContextMessage::UpdateSettings { settings: patch });
        self.send_runtime(envelope)?;
        match rx.await {
            Ok(RuntimeReply::Ack { success }) => Ok(success),
            Ok(other) => bail!("unexpected reply to UPDATE_SETTINGS: {:?}", other),
            Err(_) => bail!("background worker dropped the request"),
        }
    }

    /// Fire-and-forget system notification request
    pub fn show_notification(&self, title: impl Into<String>, message: impl Into<String>) {
        let _ = self.send_runtime(RuntimeEnvelope::fire_and_forget(
            CrossContextMessage::ShowNotification {
                title: title.into(),
                message: message.into(),
            },
        ));
    }

    /// Report a context-menu click in a tab
    pub fn menu_clicked(&self, event: ContextMenuEvent, tab: TabId) {
        let _ = self.tx.send(BackgroundCommand::MenuClicked { event, tab });
    }

    /// Register a tab's content-script channel
    pub fn register_tab(&self, tab: TabId, channel: mpsc::UnboundedSender<CrossContextMessage>) {
        let _ = self.tx.send(BackgroundCommand::TabOpened { tab, channel });
    }

    pub fn close_tab(&self, tab: TabId) {
        let _ = self.tx.send(BackgroundCommand::TabClosed { tab });
    }

    fn send_runtime(&self, envelope: RuntimeEnvelope) -> Result<()> {
        if self.tx.send(BackgroundCommand::Runtime(envelope)).is_err() {
            bail!("background worker is gone");
        }
        Ok(())
    }
}
