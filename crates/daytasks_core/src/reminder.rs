//! Periodic scan over the live task snapshot. A reminder fires when "now"
//! lands inside the tolerance window around `due_date - offset`, at most
//! once per task per session. The fired set lives in the evaluator, so a
//! restart may legitimately re-fire a still-due task.

use crate::model::Task;
use crate::notify::Notifier;
use std::collections::HashSet;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// How often the evaluator runs.
pub const EVALUATION_PERIOD: std::time::Duration = std::time::Duration::from_secs(30);

/// Half-width of the window around the reminder time.
const FIRE_TOLERANCE: time::Duration = time::Duration::seconds(60);

pub struct ReminderEvaluator {
    fired: HashSet<String>,
}

impl ReminderEvaluator {
    pub fn new() -> Self {
        Self {
            fired: HashSet::new(),
        }
    }

    /// Evaluates one tick against the given snapshot, emitting through the
    /// notifier. Returns the tasks that fired on this pass. A notifier
    /// failure still marks the task fired, so a denied notification surface
    /// does not retry every tick.
    pub fn evaluate(
        &mut self,
        tasks: &[Task],
        now: OffsetDateTime,
        notifier: &dyn Notifier,
    ) -> Vec<Task> {
        let mut fired = Vec::new();

        for task in tasks {
            if task.completed || self.fired.contains(&task.id) {
                continue;
            }
            let Some(offset) = task.reminder.duration() else {
                continue;
            };
            let Some(due_date) = task.due_date.as_deref() else {
                continue;
            };
            let due = match OffsetDateTime::parse(due_date, &Rfc3339) {
                Ok(due) => due,
                Err(_) => {
                    tracing::warn!(task_id = %task.id, "due_date is not RFC3339, skipping reminder");
                    continue;
                }
            };

            let reminder_time = due - offset;
            if (now - reminder_time).abs() >= FIRE_TOLERANCE {
                continue;
            }

            self.fired.insert(task.id.clone());
            if let Err(err) = notifier.notify(task) {
                tracing::warn!(task_id = %task.id, error = %err, "reminder notification suppressed");
            }
            fired.push(task.clone());
        }

        fired
    }
}

impl Default for ReminderEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
