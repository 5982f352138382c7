//! Panel-local task list
//!
//! Owned by the panel's task view; every mutation rewrites the persisted
//! list so a reload reproduces it. Ids are time-derived millisecond
//! strings; the store bumps past the last issued id when two creations
//! land in the same millisecond, so ids stay unique and time-ordered.

pub mod reminders;

use crate::storage::WidgetStorage;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<DateTime<Utc>>,
}

/// Ordered task list backed by the local storage scope
pub struct TaskStore {
    storage: Arc<WidgetStorage>,
    tasks: Vec<Task>,
    last_issued_ms: i64,
}

impl TaskStore {
    /// Load the persisted list
    pub fn open(storage: Arc<WidgetStorage>) -> Result<Self> {
        let tasks = storage.load_tasks()?;
        let last_issued_ms = tasks
            .iter()
            .filter_map(|t| t.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Ok(Self {
            storage,
            tasks,
            last_issued_ms,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    /// Append a task; blank text is rejected with no mutation
    pub fn add(&mut self, text: &str, now: DateTime<Utc>) -> Result<Option<Task>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let task = Task {
            id: self.next_id(now),
            text: text.to_string(),
            completed: false,
            reminder: None,
        };
        self.tasks.push(task.clone());
        self.persist()?;
        Ok(Some(task))
    }

    /// Flip completion; `false` when the id is unknown
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        task.completed = !task.completed;
        self.persist()?;
        Ok(true)
    }

    /// Remove a task; `false` when the id is unknown
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Commit a reminder timestamp; `false` when the id is unknown
    pub fn set_reminder(&mut self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        task.reminder = Some(at);
        self.persist()?;
        Ok(true)
    }

    /// Collect incomplete tasks whose reminder has elapsed, clearing each
    /// reminder so it cannot re-fire. Completed tasks are skipped even
    /// past expiry.
    pub fn take_due_reminders(&mut self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let mut due = Vec::new();
        for task in &mut self.tasks {
            if task.completed {
                continue;
            }
            if let Some(at) = task.reminder {
                if at <= now {
                    task.reminder = None;
                    due.push(task.clone());
                }
            }
        }
        if !due.is_empty() {
            self.persist()?;
        }
        Ok(due)
    }

    fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let mut ms = now.timestamp_millis();
        if ms <= self.last_issued_ms {
            ms = self.last_issued_ms + 1;
        }
        self.last_issued_ms = ms;
        ms.to_string()
    }

    fn persist(&self) -> Result<()> {
        self.storage.save_tasks(&self.tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> (tempfile::TempDir, TaskStore) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(WidgetStorage::at(dir.path()).unwrap());
        let store = TaskStore::open(storage).unwrap();
        (dir, store)
    }

    #[test]
    fn add_trims_and_rejects_blank() {
        let (_dir, mut store) = store();
        assert!(store.add("   ", Utc::now()).unwrap().is_none());
        let task = store.add("  Buy milk  ", Utc::now()).unwrap().unwrap();
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let (_dir, mut store) = store();
        let now = Utc::now();
        let a = store.add("one", now).unwrap().unwrap();
        let b = store.add("two", now).unwrap().unwrap();
        let c = store.add("three", now).unwrap().unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert!(b.id.parse::<i64>().unwrap() > a.id.parse::<i64>().unwrap());
        assert!(c.id.parse::<i64>().unwrap() > b.id.parse::<i64>().unwrap());
    }

    #[test]
    fn reload_reproduces_the_list() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(WidgetStorage::at(dir.path()).unwrap());

        let mut store = TaskStore::open(storage.clone()).unwrap();
        store.add("Buy milk", Utc::now()).unwrap();

        let reloaded = TaskStore::open(storage).unwrap();
        assert_eq!(reloaded.tasks().len(), 1);
        assert_eq!(reloaded.tasks()[0].text, "Buy milk");
        assert!(!reloaded.tasks()[0].completed);
    }

    #[test]
    fn toggle_and_delete_report_unknown_ids() {
        let (_dir, mut store) = store();
        let task = store.add("task", Utc::now()).unwrap().unwrap();
        assert!(!store.toggle("missing").unwrap());
        assert!(store.toggle(&task.id).unwrap());
        assert!(store.get(&task.id).unwrap().completed);
        assert!(!store.delete("missing").unwrap());
        assert!(store.delete(&task.id).unwrap());
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn due_reminders_fire_once_and_skip_completed() {
        let (_dir, mut store) = store();
        let now = Utc::now();
        let open = store.add("open", now).unwrap().unwrap();
        let done = store.add("done", now).unwrap().unwrap();
        store.toggle(&done.id).unwrap();
        store.set_reminder(&open.id, now + Duration::minutes(5)).unwrap();
        store.set_reminder(&done.id, now + Duration::minutes(5)).unwrap();

        // Before expiry nothing is due
        assert!(store.take_due_reminders(now).unwrap().is_empty());

        let later = now + Duration::minutes(6);
        let fired = store.take_due_reminders(later).unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, open.id);

        // Reminder cleared: a second scan past expiry fires nothing
        assert!(store.get(&open.id).unwrap().reminder.is_none());
        assert!(store.take_due_reminders(later).unwrap().is_empty());
    }
}
