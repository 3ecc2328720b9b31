use notify_rust::Notification;

use super::{Notifier, reminder_body};
use crate::error::AppError;
use crate::model::Task;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, task: &Task) -> Result<(), AppError> {
        Notification::new()
            .summary("daytasks")
            .body(&reminder_body(task))
            .show()
            .map_err(|err| AppError::io(format!("failed to show notification: {err}")))?;
        Ok(())
    }
}
