//! Best-effort mirror of the task collection to the remote API. Pushes are
//! debounced behind a one-second quiet period; pull happens once per login
//! and follows last-writer-wins (a non-empty remote list replaces local
//! state outright, with no merge).

use crate::error::AppError;
use crate::model::{Credential, Task};
use crate::storage::json_store;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Quiet period between the last mutation and the push it triggers.
pub const PUSH_QUIET_PERIOD: Duration = Duration::from_secs(1);

/// Remote task API contract. The HTTP implementation talks to the real
/// backend; tests substitute their own.
pub trait TaskApi: Send + Sync {
    fn exchange_id_token(&self, id_token: &str) -> Result<Credential, AppError>;
    fn fetch_tasks(&self, token: &str) -> Result<Vec<Task>, AppError>;
    fn store_tasks(&self, token: &str, tasks: &[Task]) -> Result<(), AppError>;
}

pub struct HttpTaskApi {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpTaskApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct AuthResponse {
    access_token: String,
    user: crate::model::UserProfile,
}

#[derive(Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<Task>,
}

impl TaskApi for HttpTaskApi {
    fn exchange_id_token(&self, id_token: &str) -> Result<Credential, AppError> {
        let response = self
            .client
            .post(format!("{}/auth/google", self.base_url))
            .json(&serde_json::json!({ "id_token": id_token }))
            .send()
            .map_err(|err| AppError::http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::http(format!(
                "identity exchange failed with status {}",
                response.status()
            )));
        }

        let auth: AuthResponse = response
            .json()
            .map_err(|err| AppError::http(err.to_string()))?;
        Ok(Credential {
            token: auth.access_token,
            user: auth.user,
        })
    }

    fn fetch_tasks(&self, token: &str) -> Result<Vec<Task>, AppError> {
        let response = self
            .client
            .get(format!("{}/tasks", self.base_url))
            .bearer_auth(token)
            .send()
            .map_err(|err| AppError::http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::http(format!(
                "task fetch failed with status {}",
                response.status()
            )));
        }

        let payload: TasksResponse = response
            .json()
            .map_err(|err| AppError::http(err.to_string()))?;
        Ok(payload.tasks)
    }

    fn store_tasks(&self, token: &str, tasks: &[Task]) -> Result<(), AppError> {
        let response = self
            .client
            .post(format!("{}/tasks", self.base_url))
            .bearer_auth(token)
            .json(&serde_json::json!({ "tasks": tasks }))
            .send()
            .map_err(|err| AppError::http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::http(format!(
                "task push failed with status {}",
                response.status()
            )));
        }

        Ok(())
    }
}

struct PendingPush {
    cancel: Sender<()>,
}

/// Owns the session credential and the pending debounce timer. All mutation
/// goes through `&mut self`, so there is no shared state to lock.
pub struct SyncAdapter {
    api: Arc<dyn TaskApi>,
    session_path: PathBuf,
    credential: Option<Credential>,
    pending: Option<PendingPush>,
}

impl SyncAdapter {
    pub fn new(api: Arc<dyn TaskApi>, session_path: PathBuf) -> Self {
        let credential = json_store::load_credential(&session_path);
        Self {
            api,
            session_path,
            credential,
            pending: None,
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// Exchanges the opaque identity token for an access token and user
    /// profile, and persists the resulting credential to the session slot.
    pub fn login(&mut self, id_token: &str) -> Result<Credential, AppError> {
        let credential = self.api.exchange_id_token(id_token)?;
        if let Err(err) = json_store::save_credential(&self.session_path, &credential) {
            tracing::warn!(error = %err, "failed to persist session credential");
        }
        self.credential = Some(credential.clone());
        Ok(credential)
    }

    /// One fetch after login. `Some(tasks)` means the remote list is
    /// non-empty and replaces local state; `None` means keep local tasks
    /// (empty remote list, or a failure that was logged and swallowed).
    pub fn pull_on_login(&self) -> Option<Vec<Task>> {
        let credential = self.credential.as_ref()?;
        match self.api.fetch_tasks(&credential.token) {
            Ok(tasks) if tasks.is_empty() => {
                tracing::debug!("remote task list is empty, keeping local tasks");
                None
            }
            Ok(tasks) => Some(tasks),
            Err(err) => {
                tracing::warn!(error = %err, "task pull failed, keeping local tasks");
                None
            }
        }
    }

    /// Schedules a push of the given snapshot after the quiet period. A
    /// newer call cancels and supersedes any pending push, so only the
    /// latest state within a burst of edits is transmitted.
    pub fn schedule_push(&mut self, tasks: &[Task]) {
        let Some(token) = self.credential.as_ref().map(|c| c.token.clone()) else {
            return;
        };

        self.cancel_pending();

        let (cancel, canceled) = mpsc::channel();
        let api = Arc::clone(&self.api);
        let snapshot = tasks.to_vec();
        thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = canceled.recv_timeout(PUSH_QUIET_PERIOD)
                && let Err(err) = api.store_tasks(&token, &snapshot)
            {
                tracing::warn!(error = %err, "task push failed");
            }
        });

        self.pending = Some(PendingPush { cancel });
    }

    /// Cancels any pending timer and pushes immediately. One-shot commands
    /// call this so the process does not exit with a push still queued.
    pub fn flush(&mut self, tasks: &[Task]) {
        self.cancel_pending();
        let Some(credential) = self.credential.as_ref() else {
            return;
        };
        if let Err(err) = self.api.store_tasks(&credential.token, tasks) {
            tracing::warn!(error = %err, "task push failed");
        }
    }

    /// Clears the in-memory credential and the session slot. Local tasks
    /// are untouched.
    pub fn logout(&mut self) {
        self.cancel_pending();
        self.credential = None;
        if let Err(err) = json_store::clear_credential(&self.session_path) {
            tracing::warn!(error = %err, "failed to clear session credential");
        }
    }

    /// Cancels the pending timer without waiting on the worker. A worker
    /// already past its quiet period may have a push in flight; that push is
    /// neither cancelled nor joined, so callers never block on network I/O.
    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            let _ = pending.cancel.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PUSH_QUIET_PERIOD, SyncAdapter, TaskApi};
    use crate::error::AppError;
    use crate::model::{Credential, Priority, ReminderOffset, Task, TaskStatus, UserProfile};
    use crate::storage::json_store;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("daytasks-{nanos}-{file_name}"))
    }

    fn sample_task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            text: "demo".to_string(),
            completed: false,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            labels: Vec::new(),
            due_date: None,
            reminder: ReminderOffset::None,
        }
    }

    fn sample_credential() -> Credential {
        Credential {
            token: "jwt-token".to_string(),
            user: UserProfile {
                id: "user-1".to_string(),
                email: None,
                name: None,
                picture: None,
            },
        }
    }

    struct MockApi {
        remote_tasks: Mutex<Vec<Task>>,
        pushes: Mutex<Vec<Vec<Task>>>,
        fail_fetch: bool,
        fail_store: bool,
        push_delay: Duration,
    }

    impl MockApi {
        fn new(remote_tasks: Vec<Task>) -> Self {
            Self {
                remote_tasks: Mutex::new(remote_tasks),
                pushes: Mutex::new(Vec::new()),
                fail_fetch: false,
                fail_store: false,
                push_delay: Duration::ZERO,
            }
        }

        fn push_count(&self) -> usize {
            self.pushes.lock().unwrap().len()
        }
    }

    impl TaskApi for MockApi {
        fn exchange_id_token(&self, _id_token: &str) -> Result<Credential, AppError> {
            Ok(sample_credential())
        }

        fn fetch_tasks(&self, _token: &str) -> Result<Vec<Task>, AppError> {
            if self.fail_fetch {
                return Err(AppError::http("connection refused"));
            }
            Ok(self.remote_tasks.lock().unwrap().clone())
        }

        fn store_tasks(&self, _token: &str, tasks: &[Task]) -> Result<(), AppError> {
            if self.fail_store {
                return Err(AppError::http("connection refused"));
            }
            if !self.push_delay.is_zero() {
                std::thread::sleep(self.push_delay);
            }
            self.pushes.lock().unwrap().push(tasks.to_vec());
            Ok(())
        }
    }

    fn adapter_with(api: Arc<MockApi>, session_file: &str) -> SyncAdapter {
        SyncAdapter::new(api, temp_path(session_file))
    }

    #[test]
    fn login_persists_credential_to_session_slot() {
        let api = Arc::new(MockApi::new(Vec::new()));
        let session = temp_path("login-session.json");
        let mut adapter = SyncAdapter::new(api, session.clone());

        let credential = adapter.login("google-id-token").unwrap();

        assert!(adapter.is_authenticated());
        assert_eq!(json_store::load_credential(&session), Some(credential));
        std::fs::remove_file(&session).ok();
    }

    #[test]
    fn pull_on_login_replaces_with_non_empty_remote_list() {
        let api = Arc::new(MockApi::new(vec![sample_task("remote-1")]));
        let mut adapter = adapter_with(api, "pull-nonempty.json");
        adapter.login("token").unwrap();

        let pulled = adapter.pull_on_login().expect("remote tasks expected");
        assert_eq!(pulled.len(), 1);
        assert_eq!(pulled[0].id, "remote-1");

        adapter.logout();
    }

    #[test]
    fn pull_on_login_keeps_local_when_remote_empty() {
        let api = Arc::new(MockApi::new(Vec::new()));
        let mut adapter = adapter_with(api, "pull-empty.json");
        adapter.login("token").unwrap();

        assert_eq!(adapter.pull_on_login(), None);
        adapter.logout();
    }

    #[test]
    fn pull_on_login_swallows_fetch_failure() {
        let mut api = MockApi::new(Vec::new());
        api.fail_fetch = true;
        let api = Arc::new(api);
        let mut adapter = adapter_with(api, "pull-failure.json");
        adapter.login("token").unwrap();

        assert_eq!(adapter.pull_on_login(), None);
        adapter.logout();
    }

    #[test]
    fn pull_without_credential_is_noop() {
        let api = Arc::new(MockApi::new(vec![sample_task("remote-1")]));
        let adapter = adapter_with(api, "pull-anon.json");

        assert_eq!(adapter.pull_on_login(), None);
    }

    #[test]
    fn scheduled_push_fires_after_quiet_period() {
        let api = Arc::new(MockApi::new(Vec::new()));
        let mut adapter = adapter_with(Arc::clone(&api), "push-fires.json");
        adapter.login("token").unwrap();

        adapter.schedule_push(&[sample_task("task-1")]);
        std::thread::sleep(PUSH_QUIET_PERIOD + Duration::from_millis(300));

        assert_eq!(api.push_count(), 1);
        adapter.logout();
    }

    #[test]
    fn newer_schedule_supersedes_pending_push() {
        let api = Arc::new(MockApi::new(Vec::new()));
        let mut adapter = adapter_with(Arc::clone(&api), "push-supersede.json");
        adapter.login("token").unwrap();

        adapter.schedule_push(&[sample_task("task-1")]);
        adapter.schedule_push(&[sample_task("task-1"), sample_task("task-2")]);
        std::thread::sleep(PUSH_QUIET_PERIOD + Duration::from_millis(300));

        assert_eq!(api.push_count(), 1);
        let pushes = api.pushes.lock().unwrap();
        assert_eq!(pushes[0].len(), 2);
        drop(pushes);
        adapter.logout();
    }

    #[test]
    fn flush_cancels_timer_and_pushes_immediately() {
        let api = Arc::new(MockApi::new(Vec::new()));
        let mut adapter = adapter_with(Arc::clone(&api), "push-flush.json");
        adapter.login("token").unwrap();

        adapter.schedule_push(&[sample_task("task-1")]);
        adapter.flush(&[sample_task("task-1")]);

        assert_eq!(api.push_count(), 1);

        // Waiting out the quiet period must not produce a second push.
        std::thread::sleep(PUSH_QUIET_PERIOD + Duration::from_millis(300));
        assert_eq!(api.push_count(), 1);
        adapter.logout();
    }

    #[test]
    fn schedule_push_does_not_wait_on_inflight_push() {
        let mut api = MockApi::new(Vec::new());
        api.push_delay = Duration::from_secs(2);
        let api = Arc::new(api);
        let mut adapter = adapter_with(Arc::clone(&api), "push-inflight.json");
        adapter.login("token").unwrap();

        adapter.schedule_push(&[sample_task("task-1")]);
        // Let the quiet period elapse so the worker is inside the slow push.
        std::thread::sleep(PUSH_QUIET_PERIOD + Duration::from_millis(300));

        let started = std::time::Instant::now();
        adapter.schedule_push(&[sample_task("task-2")]);
        assert!(
            started.elapsed() < Duration::from_millis(500),
            "schedule_push waited {:?} on the in-flight push",
            started.elapsed()
        );

        // Both pushes eventually land; neither was waited on by the caller.
        std::thread::sleep(PUSH_QUIET_PERIOD + Duration::from_secs(3));
        assert_eq!(api.push_count(), 2);
        adapter.logout();
    }

    #[test]
    fn schedule_push_without_credential_is_noop() {
        let api = Arc::new(MockApi::new(Vec::new()));
        let mut adapter = adapter_with(Arc::clone(&api), "push-anon.json");

        adapter.schedule_push(&[sample_task("task-1")]);
        std::thread::sleep(PUSH_QUIET_PERIOD + Duration::from_millis(300));

        assert_eq!(api.push_count(), 0);
    }

    #[test]
    fn push_failure_is_swallowed() {
        let mut api = MockApi::new(Vec::new());
        api.fail_store = true;
        let api = Arc::new(api);
        let mut adapter = adapter_with(api, "push-failure.json");
        adapter.login("token").unwrap();

        adapter.flush(&[sample_task("task-1")]);
        adapter.logout();
    }

    #[test]
    fn logout_clears_credential_and_session_slot() {
        let api = Arc::new(MockApi::new(Vec::new()));
        let session = temp_path("logout-session.json");
        let mut adapter = SyncAdapter::new(api, session.clone());
        adapter.login("token").unwrap();

        adapter.logout();

        assert!(!adapter.is_authenticated());
        assert_eq!(json_store::load_credential(&session), None);
        assert!(!session.exists());
    }
}
