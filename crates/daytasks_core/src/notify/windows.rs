use tauri_winrt_notification::Toast;

use super::{Notifier, reminder_body};
use crate::error::AppError;
use crate::model::Task;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, task: &Task) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title("daytasks")
            .text1(&reminder_body(task))
            .show()
            .map_err(|err| AppError::io(format!("failed to show notification: {err}")))?;
        Ok(())
    }
}
