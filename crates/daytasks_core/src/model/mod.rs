mod streak;
mod task;
mod user;

pub use streak::{STREAK_DATE_CAP, StreakRecord};
pub use task::{Priority, ReminderOffset, Task, TaskStatus};
pub use user::{Credential, UserProfile};
