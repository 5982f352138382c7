//! Content-script injector
//!
//! Installs the floating widget surface into a host page exactly once and
//! bridges page-level events into the frame. The injector owns the single
//! `expanded` flag and the frame geometry; both mutate only inside the
//! page-message handler, whether the toggle was posted by the frame's own
//! UI, the keyboard shortcut, or a synthesized expand on a context-menu
//! click.

use crate::protocol::CrossContextMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};

/// Corner rounding of the embedded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerRadius {
    /// Fully round (the collapsed button)
    Full,
    Px(u32),
}

/// The embedded frame's size and shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub corner_radius: CornerRadius,
}

/// Small floating button in the page corner
pub const COLLAPSED: FrameGeometry = FrameGeometry {
    width: 80,
    height: 80,
    corner_radius: CornerRadius::Full,
};

/// Full assistant panel
pub const EXPANDED: FrameGeometry = FrameGeometry {
    width: 450,
    height: 600,
    corner_radius: CornerRadius::Px(16),
};

/// One host page's surface; owns the set-once injection guard
///
/// The flag is set on the first successful install and never cleared for
/// the lifetime of the page, so re-running the injector is a no-op.
#[derive(Default)]
pub struct HostPage {
    injected: AtomicBool,
}

impl HostPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_injected(&self) -> bool {
        self.injected.load(Ordering::SeqCst)
    }
}

/// Sender into the frame's internal message channel
///
/// The frame document loads asynchronously; forwards attempted before it
/// connects are dropped silently. No queue, no retry.
pub struct FrameHandle {
    tx: StdMutex<Option<mpsc::UnboundedSender<CrossContextMessage>>>,
}

impl FrameHandle {
    pub fn disconnected() -> Self {
        Self {
            tx: StdMutex::new(None),
        }
    }

    pub fn connected(tx: mpsc::UnboundedSender<CrossContextMessage>) -> Self {
        Self {
            tx: StdMutex::new(Some(tx)),
        }
    }

    /// Mark the frame ready to receive
    pub fn connect(&self, tx: mpsc::UnboundedSender<CrossContextMessage>) {
        *self.tx.lock().unwrap() = Some(tx);
    }

    /// Best-effort forward into the frame
    pub fn post(&self, message: CrossContextMessage) {
        match self.tx.lock().unwrap().as_ref() {
            Some(tx) => {
                if tx.send(message).is_err() {
                    tracing::trace!("Frame channel closed; dropping forward");
                }
            }
            None => tracing::trace!("Frame not ready; dropping forward"),
        }
    }
}

/// The injected widget surface on one page
pub struct WidgetInjector {
    expanded: bool,
    geometry: FrameGeometry,
    frame: Arc<FrameHandle>,
}

impl WidgetInjector {
    /// Install the widget into a page. Returns `None` when the page was
    /// already injected.
    pub fn install(page: &HostPage, frame: Arc<FrameHandle>) -> Option<Self> {
        if page.injected.swap(true, Ordering::SeqCst) {
            tracing::debug!("Widget already injected; skipping");
            return None;
        }
        tracing::info!("Widget injected. Press Alt+A to toggle.");
        Some(Self {
            expanded: false,
            geometry: COLLAPSED,
            frame,
        })
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Handle a message on the page channel
    pub fn handle_page_message(&mut self, message: &CrossContextMessage) {
        match message {
            CrossContextMessage::Toggle => {
                self.expanded = !self.expanded;
                self.geometry = if self.expanded { EXPANDED } else { COLLAPSED };
            }
            CrossContextMessage::Resize { width, height } => {
                // Arbitrary override; corner radius keeps its current value
                self.geometry.width = *width;
                self.geometry.height = *height;
            }
            CrossContextMessage::GetSettings
            | CrossContextMessage::UpdateSettings { .. }
            | CrossContextMessage::ShowNotification { .. }
            | CrossContextMessage::ContextMenuClick { .. }
            | CrossContextMessage::ContextAction { .. } => {
                tracing::trace!("Dropping message not addressed to the page channel");
            }
        }
    }

    /// Handle a message on the runtime channel (from the background worker)
    pub fn handle_runtime_message(&mut self, message: CrossContextMessage) {
        match message {
            CrossContextMessage::ContextMenuClick {
                action,
                selected_text,
            } => {
                // Expand first so the user sees the result land, then
                // forward the action into the frame.
                if !self.expanded {
                    self.handle_page_message(&CrossContextMessage::Toggle);
                }
                self.frame.post(CrossContextMessage::ContextAction {
                    action,
                    text: selected_text,
                });
            }
            CrossContextMessage::GetSettings
            | CrossContextMessage::UpdateSettings { .. }
            | CrossContextMessage::ShowNotification { .. }
            | CrossContextMessage::Toggle
            | CrossContextMessage::Resize { .. }
            | CrossContextMessage::ContextAction { .. } => {
                tracing::trace!("Dropping message not addressed to the content script");
            }
        }
    }

    /// Page-level key-down listener. Returns `true` when the event was
    /// consumed and default handling should be suppressed (Alt+A only).
    pub fn handle_key_down(&mut self, alt: bool, key: &str) -> bool {
        if alt && key.eq_ignore_ascii_case("a") {
            self.handle_page_message(&CrossContextMessage::Toggle);
            return true;
        }
        false
    }

    /// Drive a shared injector from its two channels until both close
    pub async fn run(
        injector: Arc<Mutex<WidgetInjector>>,
        mut page_rx: mpsc::UnboundedReceiver<CrossContextMessage>,
        mut runtime_rx: mpsc::UnboundedReceiver<CrossContextMessage>,
    ) {
        loop {
            tokio::select! {
                Some(message) = page_rx.recv() => {
                    injector.lock().await.handle_page_message(&message);
                }
                Some(message) = runtime_rx.recv() => {
                    injector.lock().await.handle_runtime_message(message);
                }
                else => break,
            }
        }
        tracing::debug!("Injector channels closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MenuAction;

    fn installed() -> (WidgetInjector, mpsc::UnboundedReceiver<CrossContextMessage>) {
        let page = HostPage::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let injector =
            WidgetInjector::install(&page, Arc::new(FrameHandle::connected(tx))).unwrap();
        (injector, rx)
    }

    #[test]
    fn second_install_is_a_no_op() {
        let page = HostPage::new();
        let frame = Arc::new(FrameHandle::disconnected());
        assert!(WidgetInjector::install(&page, frame.clone()).is_some());
        assert!(page.is_injected());
        assert!(WidgetInjector::install(&page, frame).is_none());
    }

    #[test]
    fn double_toggle_restores_collapsed_geometry() {
        let (mut injector, _rx) = installed();
        assert_eq!(injector.geometry(), COLLAPSED);

        injector.handle_page_message(&CrossContextMessage::Toggle);
        assert!(injector.is_expanded());
        assert_eq!(injector.geometry(), EXPANDED);

        injector.handle_page_message(&CrossContextMessage::Toggle);
        assert!(!injector.is_expanded());
        assert_eq!(injector.geometry(), COLLAPSED);
    }

    #[test]
    fn resize_overrides_size_but_keeps_corner_radius() {
        let (mut injector, _rx) = installed();
        injector.handle_page_message(&CrossContextMessage::Toggle);
        injector.handle_page_message(&CrossContextMessage::Resize {
            width: 600,
            height: 800,
        });
        let geometry = injector.geometry();
        assert_eq!((geometry.width, geometry.height), (600, 800));
        assert_eq!(geometry.corner_radius, CornerRadius::Px(16));
    }

    #[test]
    fn context_menu_click_expands_before_forwarding() {
        let (mut injector, mut rx) = installed();
        injector.handle_runtime_message(CrossContextMessage::ContextMenuClick {
            action: MenuAction::Explain,
            selected_text: "const x = 1".into(),
        });

        assert!(injector.is_expanded());
        assert_eq!(
            rx.try_recv().unwrap(),
            CrossContextMessage::ContextAction {
                action: MenuAction::Explain,
                text: "const x = 1".into(),
            }
        );
    }

    #[test]
    fn context_menu_click_while_expanded_does_not_collapse() {
        let (mut injector, mut rx) = installed();
        injector.handle_page_message(&CrossContextMessage::Toggle);
        injector.handle_runtime_message(CrossContextMessage::ContextMenuClick {
            action: MenuAction::AnalyzeCode,
            selected_text: "x".into(),
        });
        assert!(injector.is_expanded());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn forward_to_unready_frame_is_dropped_silently() {
        let page = HostPage::new();
        let frame = Arc::new(FrameHandle::disconnected());
        let mut injector = WidgetInjector::install(&page, frame.clone()).unwrap();

        injector.handle_runtime_message(CrossContextMessage::ContextMenuClick {
            action: MenuAction::Explain,
            selected_text: "lost".into(),
        });
        assert!(injector.is_expanded());

        // Once the frame connects, later forwards arrive
        let (tx, mut rx) = mpsc::unbounded_channel();
        frame.connect(tx);
        injector.handle_runtime_message(CrossContextMessage::ContextMenuClick {
            action: MenuAction::Explain,
            selected_text: "kept".into(),
        });
        let CrossContextMessage::ContextAction { text, .. } = rx.try_recv().unwrap() else {
            panic!("expected a context action");
        };
        assert_eq!(text, "kept");
    }

    #[test]
    fn alt_a_toggles_and_is_consumed() {
        let (mut injector, _rx) = installed();
        assert!(injector.handle_key_down(true, "a"));
        assert!(injector.is_expanded());
        assert!(injector.handle_key_down(true, "A"));
        assert!(!injector.is_expanded());

        assert!(!injector.handle_key_down(false, "a"));
        assert!(!injector.handle_key_down(true, "b"));
        assert!(!injector.is_expanded());
    }

    #[test]
    fn runtime_channel_drops_unaddressed_kinds() {
        let (mut injector, mut rx) = installed();
        injector.handle_runtime_message(CrossContextMessage::Toggle);
        injector.handle_runtime_message(CrossContextMessage::GetSettings);
        assert!(!injector.is_expanded());
        assert!(rx.try_recv().is_err());
    }
}
