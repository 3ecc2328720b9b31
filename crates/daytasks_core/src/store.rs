//! Sole owner of task identity and lifecycle. Every successful mutation
//! mirrors the full collection to durable storage and, when a remote session
//! is active, schedules a debounced push. Both side effects are
//! fire-and-forget; the mutation's return value never waits on them.

use crate::error::AppError;
use crate::model::{Priority, ReminderOffset, Task, TaskStatus};
use crate::storage::json_store;
use crate::sync::SyncAdapter;
use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Optional fields supplied at creation time.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub priority: Priority,
    pub labels: Vec<String>,
    pub due_date: Option<String>,
    pub reminder: ReminderOffset,
}

/// Partial-field merge for `update`. `None` leaves the field untouched;
/// `due_date` is doubly optional so a patch can clear it.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub priority: Option<Priority>,
    pub labels: Option<Vec<String>>,
    pub due_date: Option<Option<String>>,
    pub reminder: Option<ReminderOffset>,
}

pub struct TaskStore {
    tasks: Vec<Task>,
    path: PathBuf,
    sync: Option<SyncAdapter>,
}

impl TaskStore {
    /// Hydrates from the tasks slot. Missing or malformed state starts the
    /// store empty; hydration never fails.
    pub fn open(path: PathBuf) -> Self {
        let tasks = json_store::load_tasks(&path);
        Self {
            tasks,
            path,
            sync: None,
        }
    }

    pub fn attach_sync(&mut self, sync: SyncAdapter) {
        self.sync = Some(sync);
    }

    pub fn sync(&self) -> Option<&SyncAdapter> {
        self.sync.as_ref()
    }

    pub fn sync_mut(&mut self) -> Option<&mut SyncAdapter> {
        self.sync.as_mut()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Creates a task at the head of the sequence. Blank text is rejected
    /// before any task exists.
    pub fn add(&mut self, text: &str, details: NewTask) -> Result<Task, AppError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("text is required"));
        }

        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        let id = format!("task-{}", OffsetDateTime::now_utc().unix_timestamp_nanos());

        let task = Task {
            id,
            text: trimmed.to_string(),
            completed: false,
            created_at,
            status: TaskStatus::Todo,
            priority: details.priority,
            labels: dedup_labels(details.labels),
            due_date: details.due_date,
            reminder: details.reminder,
        };

        self.tasks.insert(0, task.clone());
        self.after_mutation();
        Ok(task)
    }

    /// Merges the patch into the task. Unknown ids are a silent no-op
    /// (`None`); a blank text field in the patch is ignored rather than
    /// emptying the task.
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|task| task.id == id)?;

        if let Some(text) = patch.text {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                task.text = trimmed.to_string();
            }
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(labels) = patch.labels {
            task.labels = dedup_labels(labels);
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(reminder) = patch.reminder {
            task.reminder = reminder;
        }

        let updated = task.clone();
        self.after_mutation();
        Some(updated)
    }

    /// Flips `completed`; `status` is untouched.
    pub fn toggle_complete(&mut self, id: &str) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|task| task.id == id)?;
        task.completed = !task.completed;
        let updated = task.clone();
        self.after_mutation();
        Some(updated)
    }

    /// Moves a task between the to-do and in-progress columns; `completed`
    /// is untouched.
    pub fn set_status(&mut self, id: &str, status: TaskStatus) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|task| task.id == id)?;
        task.status = status;
        let updated = task.clone();
        self.after_mutation();
        Some(updated)
    }

    /// Removes the task; returns whether one was actually removed. Deleting
    /// an absent id is an idempotent no-op.
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            return false;
        };
        self.tasks.remove(index);
        self.after_mutation();
        true
    }

    /// Last-writer-wins replacement used by pull-on-login. Persists but does
    /// not schedule a push back of what the server just sent.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.persist();
    }

    /// Pushes the current collection immediately, canceling any pending
    /// debounce timer. No-op without an authenticated sync adapter.
    pub fn flush_sync(&mut self) {
        if let Some(sync) = self.sync.as_mut() {
            sync.flush(&self.tasks);
        }
    }

    fn after_mutation(&mut self) {
        self.persist();
        if let Some(sync) = self.sync.as_mut() {
            sync.schedule_push(&self.tasks);
        }
    }

    fn persist(&self) {
        if let Err(err) = json_store::save_tasks(&self.path, &self.tasks) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to persist tasks");
        }
    }
}

fn dedup_labels(labels: Vec<String>) -> Vec<String> {
    let mut deduped: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !deduped.iter().any(|existing| existing == trimmed) {
            deduped.push(trimmed.to_string());
        }
    }
    deduped
}
