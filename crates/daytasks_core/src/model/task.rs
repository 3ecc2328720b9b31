use serde::{Deserialize, Serialize};
use time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub reminder: ReminderOffset,
}

/// Column a not-yet-completed task sits in. Completion is a separate flag;
/// a completed task keeps whatever status it last had.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// How far ahead of the due date a reminder should fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderOffset {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "1hr")]
    OneHour,
    #[serde(rename = "1day")]
    OneDay,
}

impl ReminderOffset {
    pub fn duration(self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::FifteenMinutes => Some(Duration::minutes(15)),
            Self::OneHour => Some(Duration::hours(1)),
            Self::OneDay => Some(Duration::days(1)),
        }
    }
}
