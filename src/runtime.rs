//! Widget runtime wiring
//!
//! Assembles the whole widget out of its parts: the background worker, one
//! host page's injector, the frame channel, the task store, and the
//! reminder scheduler, each running as its own task on the shared runtime.
//! Used by `agni widget` and driven directly by the integration tests.

use crate::background::{BackgroundHandle, BackgroundWorker, TabId};
use crate::config::Config;
use crate::injector::{FrameHandle, HostPage, WidgetInjector};
use crate::notify::Notifier;
use crate::protocol::{ContextMenuEvent, CrossContextMessage, MenuAction};
use crate::storage::WidgetStorage;
use crate::tasks::reminders::{self, ReminderError, ReminderScheduler};
use crate::tasks::TaskStore;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// The single host page the headless runtime injects into
pub const PAGE_TAB: TabId = 1;

/// A fully wired widget
pub struct WidgetRuntime {
    pub background: BackgroundHandle,
    pub injector: Arc<Mutex<WidgetInjector>>,
    pub tasks: Arc<Mutex<TaskStore>>,
    frame: Arc<FrameHandle>,
    page_tx: mpsc::UnboundedSender<CrossContextMessage>,
    frame_rx: Option<mpsc::UnboundedReceiver<CrossContextMessage>>,
    notifier: Arc<dyn Notifier>,
}

impl WidgetRuntime {
    /// Install everything and spawn the component loops
    pub fn start(
        config: &Config,
        storage: Arc<WidgetStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let worker = BackgroundWorker::install(storage.clone(), notifier.clone())?;
        let background = BackgroundHandle::spawn(worker);

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let frame = Arc::new(FrameHandle::connected(frame_tx));

        let page = HostPage::new();
        let Some(injector) = WidgetInjector::install(&page, frame.clone()) else {
            bail!("host page was already injected");
        };
        let injector = Arc::new(Mutex::new(injector));

        // Page channel (host page <-> injector) and this page's runtime
        // channel (background -> content script)
        let (page_tx, page_rx) = mpsc::unbounded_channel();
        let (tab_tx, tab_rx) = mpsc::unbounded_channel();
        background.register_tab(PAGE_TAB, tab_tx);
        tokio::spawn(WidgetInjector::run(injector.clone(), page_rx, tab_rx));

        let tasks = Arc::new(Mutex::new(TaskStore::open(storage)?));
        let scheduler = ReminderScheduler::new(
            tasks.clone(),
            notifier.clone(),
            config.widget.reminder_poll_secs,
        );
        tokio::spawn(scheduler.run());

        Ok(Self {
            background,
            injector,
            tasks,
            frame,
            page_tx,
            frame_rx: Some(frame_rx),
            notifier,
        })
    }

    /// Post on the page channel, as the frame UI or the page itself would
    pub fn post_page_message(&self, message: CrossContextMessage) {
        let _ = self.page_tx.send(message);
    }

    /// A context-menu click on selected text in the host page
    pub fn context_menu_click(&self, action: MenuAction, selection: &str) {
        self.background.menu_clicked(
            ContextMenuEvent {
                menu_item_id: action,
                selection_text: selection.to_string(),
            },
            PAGE_TAB,
        );
    }

    /// Take the frame's receiving end (once); whoever holds it plays the
    /// panel application.
    pub fn take_frame_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<CrossContextMessage>> {
        self.frame_rx.take()
    }

    /// Frame handle, for reconnecting or dropping the frame in tests
    pub fn frame(&self) -> Arc<FrameHandle> {
        self.frame.clone()
    }

    /// Commit a reminder `minutes` out on a task, permission-gated
    pub async fn schedule_reminder(
        &self,
        task_id: &str,
        minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ReminderError> {
        reminders::schedule_reminder(&self.tasks, self.notifier.as_ref(), task_id, minutes, now)
            .await
    }
}

/// Run the widget headless until Ctrl-C, logging frame deliveries
pub async fn run_widget(config: &Config) -> Result<()> {
    let storage = Arc::new(WidgetStorage::new()?);
    let notifier: Arc<dyn Notifier> = Arc::new(crate::notify::LogNotifier);
    let mut runtime = WidgetRuntime::start(config, storage, notifier)?;

    let Some(mut frame_rx) = runtime.take_frame_receiver() else {
        bail!("frame receiver already taken");
    };
    tokio::spawn(async move {
        while let Some(message) = frame_rx.recv().await {
            tracing::info!("Frame received: {:?}", message);
        }
    });

    let settings = runtime.background.get_settings().await?;
    tracing::info!(
        "Widget running (enabled: {}, theme: {:?}). Ctrl-C to exit.",
        settings.enabled,
        settings.theme
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
