//! Reminder creation and the polling scan loop

use super::TaskStore;
use crate::notify::{NotificationPermission, Notifier};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration};

/// Title used for every reminder notification
const REMINDER_TITLE: &str = "AGNI Task Reminder";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReminderError {
    /// The user declined notification permission; the reminder was not committed
    #[error("Notification permission denied")]
    PermissionDenied,
    #[error("No task with id {0}")]
    UnknownTask(String),
}

/// Commit a reminder `minutes` from `now` on the given task.
///
/// If permission was never requested, the prompt happens first and the
/// reminder is committed only on grant. An earlier denial fails the same
/// way without re-prompting.
pub async fn schedule_reminder(
    store: &Mutex<TaskStore>,
    notifier: &dyn Notifier,
    task_id: &str,
    minutes: i64,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ReminderError> {
    let permission = match notifier.permission() {
        NotificationPermission::Default => notifier.request_permission().await,
        state => state,
    };
    if permission != NotificationPermission::Granted {
        return Err(ReminderError::PermissionDenied);
    }

    let at = now + ChronoDuration::minutes(minutes);
    let committed = match store.lock().await.set_reminder(task_id, at) {
        Ok(committed) => committed,
        Err(e) => {
            tracing::error!("Failed to persist reminder: {}", e);
            false
        }
    };
    if !committed {
        return Err(ReminderError::UnknownTask(task_id.to_string()));
    }
    Ok(at)
}

/// Polling loop that fires elapsed reminders
pub struct ReminderScheduler {
    store: Arc<Mutex<TaskStore>>,
    notifier: Arc<dyn Notifier>,
    poll: Duration,
}

impl ReminderScheduler {
    pub fn new(store: Arc<Mutex<TaskStore>>, notifier: Arc<dyn Notifier>, poll_secs: u64) -> Self {
        Self {
            store,
            notifier,
            poll: Duration::from_secs(poll_secs),
        }
    }

    /// Scan forever at the configured cadence
    pub async fn run(self) {
        let mut ticker = interval(self.poll);
        loop {
            ticker.tick().await;
            self.scan(Utc::now()).await;
        }
    }

    /// One scan pass: fire and clear every elapsed reminder
    pub async fn scan(&self, now: DateTime<Utc>) {
        let due = match self.store.lock().await.take_due_reminders(now) {
            Ok(due) => due,
            Err(e) => {
                tracing::error!("Reminder scan failed to persist: {}", e);
                return;
            }
        };
        for task in due {
            // Tagged with the task id so repeat firings collapse
            self.notifier
                .show(REMINDER_TITLE, &task.text, Some(&task.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MockNotifier;
    use crate::storage::WidgetStorage;

    async fn fixture() -> (tempfile::TempDir, Arc<Mutex<TaskStore>>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(WidgetStorage::at(dir.path()).unwrap());
        let store = Arc::new(Mutex::new(TaskStore::open(storage).unwrap()));
        (dir, store)
    }

    #[tokio::test]
    async fn reminder_fires_once_with_task_id_tag() {
        let (_dir, store) = fixture().await;
        let notifier = Arc::new(MockNotifier::granted());
        let now = Utc::now();

        let task = {
            let mut guard = store.lock().await;
            guard.add("water the plants", now).unwrap().unwrap()
        };
        schedule_reminder(&store, notifier.as_ref(), &task.id, 5, now)
            .await
            .unwrap();

        let scheduler = ReminderScheduler::new(store.clone(), notifier.clone(), 10);

        scheduler.scan(now).await;
        assert!(notifier.shown().is_empty());

        let later = now + ChronoDuration::minutes(6);
        scheduler.scan(later).await;
        scheduler.scan(later).await;

        let shown = notifier.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].message, "water the plants");
        assert_eq!(shown[0].tag.as_deref(), Some(task.id.as_str()));
        assert!(store.lock().await.get(&task.id).unwrap().reminder.is_none());
    }

    #[tokio::test]
    async fn completed_task_never_fires() {
        let (_dir, store) = fixture().await;
        let notifier = Arc::new(MockNotifier::granted());
        let now = Utc::now();

        let task = {
            let mut guard = store.lock().await;
            let task = guard.add("ship it", now).unwrap().unwrap();
            task
        };
        schedule_reminder(&store, notifier.as_ref(), &task.id, 5, now)
            .await
            .unwrap();
        store.lock().await.toggle(&task.id).unwrap();

        let scheduler = ReminderScheduler::new(store.clone(), notifier.clone(), 10);
        scheduler.scan(now + ChronoDuration::hours(1)).await;
        assert!(notifier.shown().is_empty());
    }

    #[tokio::test]
    async fn denied_permission_blocks_the_commit() {
        let (_dir, store) = fixture().await;
        let notifier = MockNotifier::new(NotificationPermission::Default, false);
        let now = Utc::now();

        let task = {
            let mut guard = store.lock().await;
            guard.add("call home", now).unwrap().unwrap()
        };
        let err = schedule_reminder(&store, &notifier, &task.id, 5, now)
            .await
            .unwrap_err();
        assert_eq!(err, ReminderError::PermissionDenied);
        assert!(store.lock().await.get(&task.id).unwrap().reminder.is_none());
    }

    #[tokio::test]
    async fn unknown_task_is_reported() {
        let (_dir, store) = fixture().await;
        let notifier = MockNotifier::granted();
        let err = schedule_reminder(&store, &notifier, "404", 5, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, ReminderError::UnknownTask("404".to_string()));
    }
}
