use serde::{Deserialize, Serialize};

/// Days kept in the streak history.
pub const STREAK_DATE_CAP: usize = 30;

/// Consecutive-day completion streak, persisted in its own slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub count: u32,
    #[serde(default)]
    pub last_date: Option<String>,
    #[serde(default)]
    pub dates: Vec<String>,
}
