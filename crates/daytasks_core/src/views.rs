//! Pure read-side projections over the task sequence. Nothing here mutates;
//! order is always preserved from the store.

use crate::model::{Task, TaskStatus};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, UtcOffset};

/// Active tasks first, completed second, each in store order.
pub fn partition_by_completion(tasks: &[Task]) -> (Vec<&Task>, Vec<&Task>) {
    tasks.iter().partition(|task| !task.completed)
}

#[derive(Debug, Default)]
pub struct BoardColumns<'a> {
    pub todo: Vec<&'a Task>,
    pub in_progress: Vec<&'a Task>,
    pub done: Vec<&'a Task>,
}

/// Board-style buckets. Completion takes precedence over status: a completed
/// task lands in `done` no matter what column it was in.
pub fn board_columns(tasks: &[Task]) -> BoardColumns<'_> {
    let mut columns = BoardColumns::default();
    for task in tasks {
        if task.completed {
            columns.done.push(task);
        } else {
            match task.status {
                TaskStatus::Todo => columns.todo.push(task),
                TaskStatus::InProgress => columns.in_progress.push(task),
            }
        }
    }
    columns
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelFilter {
    All,
    Label(String),
}

/// A task with no labels is visible under every filter; a labeled task only
/// under "all" or a filter matching one of its labels.
pub fn filter_by_label<'a>(tasks: &'a [Task], filter: &LabelFilter) -> Vec<&'a Task> {
    match filter {
        LabelFilter::All => tasks.iter().collect(),
        LabelFilter::Label(label) => tasks
            .iter()
            .filter(|task| task.labels.is_empty() || task.labels.iter().any(|l| l == label))
            .collect(),
    }
}

/// round(100 * completed / total); 0 for an empty subset.
pub fn completion_percent<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> u8 {
    let mut total = 0u32;
    let mut completed = 0u32;
    for task in tasks {
        total += 1;
        if task.completed {
            completed += 1;
        }
    }
    if total == 0 {
        0
    } else {
        ((f64::from(completed) * 100.0) / f64::from(total)).round() as u8
    }
}

/// Calendar placement: a task lands on the local calendar date of its due
/// date, falling back to its creation date. Tasks with unparseable
/// timestamps are left off the calendar.
pub fn tasks_on_date<'a>(tasks: &'a [Task], date: Date, offset: UtcOffset) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| {
            let when = task.due_date.as_deref().unwrap_or(&task.created_at);
            match OffsetDateTime::parse(when, &Rfc3339) {
                Ok(parsed) => parsed.to_offset(offset).date() == date,
                Err(_) => false,
            }
        })
        .collect()
}

/// Per-label completion percentages for progress graphs. Unlike
/// `filter_by_label`, unlabeled tasks do not count toward any label here.
pub fn label_progress(tasks: &[Task], labels: &[&str]) -> Vec<(String, u8)> {
    labels
        .iter()
        .map(|label| {
            let subset = tasks
                .iter()
                .filter(|task| task.labels.iter().any(|l| l == label));
            (label.to_string(), completion_percent(subset))
        })
        .collect()
}

/// Completion percentage restricted to tasks created on the given local day.
pub fn todays_completion(tasks: &[Task], today: Date, offset: UtcOffset) -> u8 {
    let subset = tasks.iter().filter(|task| {
        match OffsetDateTime::parse(&task.created_at, &Rfc3339) {
            Ok(created) => created.to_offset(offset).date() == today,
            Err(_) => false,
        }
    });
    completion_percent(subset)
}
