use clap::{Parser, Subcommand};
use daytasks_core::model::{Priority, ReminderOffset, TaskStatus};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: daytasks add "Buy milk" --priority high --label groceries
    Add {
        text: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long = "label", value_name = "LABEL")]
        labels: Vec<String>,
        /// Due date-time, RFC 3339 (e.g. 2024-03-01T10:00:00Z)
        #[arg(long)]
        due: Option<String>,
        /// Reminder offset before the due date: none, 15min, 1hr or 1day
        #[arg(long)]
        reminder: Option<String>,
    },
    /// Edit a task's text or details
    ///
    /// Example: daytasks edit task-1 --text "Buy organic milk"
    Edit {
        id: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long = "label", value_name = "LABEL")]
        labels: Vec<String>,
        #[arg(long)]
        due: Option<String>,
        /// Drop the due date
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        #[arg(long)]
        reminder: Option<String>,
    },
    /// Toggle a task's completion
    ///
    /// Example: daytasks done task-1
    Done {
        id: String,
    },
    /// Move a task to a board column
    ///
    /// Example: daytasks status task-1 in-progress
    Status {
        id: String,
        status: String,
    },
    /// Delete a task
    ///
    /// Example: daytasks delete task-1
    Delete {
        id: String,
    },
    /// List tasks
    ///
    /// Example: daytasks list active --label work
    List {
        #[command(subcommand)]
        list: Option<ListCommand>,
        #[arg(long, global = true)]
        label: Option<String>,
    },
    /// Show the kanban board
    Board,
    /// List tasks that land on a calendar date
    ///
    /// Example: daytasks day 2024-03-01
    Day {
        date: String,
    },
    /// Show completion stats and the current streak
    Progress,
    /// Sign in with a Google ID token
    Login {
        id_token: String,
    },
    /// Sign out and forget the stored credential
    Logout,
    /// Pull tasks from the remote account
    Sync,
    /// Evaluate due reminders once
    Remind,
    /// Keep evaluating reminders until interrupted
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// List every task
    All,
    /// List incomplete tasks
    Active,
    /// List completed tasks
    Completed,
}

pub fn parse_priority(raw: &str) -> Result<Priority, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(format!(
            "unknown priority '{other}' (expected low, medium or high)"
        )),
    }
}

pub fn parse_status(raw: &str) -> Result<TaskStatus, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "todo" => Ok(TaskStatus::Todo),
        "in-progress" | "inprogress" | "in_progress" => Ok(TaskStatus::InProgress),
        other => Err(format!(
            "unknown status '{other}' (expected todo or in-progress)"
        )),
    }
}

pub fn parse_reminder(raw: &str) -> Result<ReminderOffset, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "none" => Ok(ReminderOffset::None),
        "15min" => Ok(ReminderOffset::FifteenMinutes),
        "1hr" => Ok(ReminderOffset::OneHour),
        "1day" => Ok(ReminderOffset::OneDay),
        other => Err(format!(
            "unknown reminder '{other}' (expected none, 15min, 1hr or 1day)"
        )),
    }
}
