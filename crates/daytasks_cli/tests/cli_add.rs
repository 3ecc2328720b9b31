use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("daytasks-{nanos}-{file_name}"))
}

fn write_store(path: &PathBuf, tasks: serde_json::Value) {
    let content = serde_json::json!({
        "schema_version": 1,
        "tasks": tasks
    });
    std::fs::write(path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

#[test]
fn add_creates_task_with_details() {
    let exe = env!("CARGO_BIN_EXE_daytasks");
    let store_path = temp_path("cli-add.json");

    let output = Command::new(exe)
        .args([
            "add",
            "Buy milk",
            "--priority",
            "high",
            "--label",
            "groceries",
            "--due",
            "2026-01-02T10:00:00Z",
            "--reminder",
            "1hr",
        ])
        .env("DAYTASKS_STORE_PATH", &store_path)
        .env("DAYTASKS_CONFIG_PATH", temp_path("config.json"))
        .env("DAYTASKS_SESSION_PATH", temp_path("session.json"))
        .output()
        .expect("failed to run add command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added task: Buy milk"));

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).unwrap();
    std::fs::remove_file(&store_path).ok();

    assert_eq!(stored["schema_version"], 1);
    assert_eq!(stored["tasks"][0]["text"], "Buy milk");
    assert_eq!(stored["tasks"][0]["completed"], false);
    assert_eq!(stored["tasks"][0]["status"], "todo");
    assert_eq!(stored["tasks"][0]["priority"], "high");
    assert_eq!(stored["tasks"][0]["labels"][0], "groceries");
    assert_eq!(stored["tasks"][0]["due_date"], "2026-01-02T10:00:00Z");
    assert_eq!(stored["tasks"][0]["reminder"], "1hr");
}

#[test]
fn add_prepends_new_tasks() {
    let exe = env!("CARGO_BIN_EXE_daytasks");
    let store_path = temp_path("cli-add-prepend.json");

    write_store(
        &store_path,
        serde_json::json!([
            {
                "id": "task-1",
                "text": "first",
                "created_at": "2026-01-01T00:00:00Z"
            }
        ]),
    );

    let output = Command::new(exe)
        .args(["add", "second"])
        .env("DAYTASKS_STORE_PATH", &store_path)
        .env("DAYTASKS_CONFIG_PATH", temp_path("config.json"))
        .env("DAYTASKS_SESSION_PATH", temp_path("session.json"))
        .output()
        .expect("failed to run add command");

    assert!(output.status.success());

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).unwrap();
    std::fs::remove_file(&store_path).ok();

    assert_eq!(stored["tasks"].as_array().unwrap().len(), 2);
    assert_eq!(stored["tasks"][0]["text"], "second");
    assert_eq!(stored["tasks"][1]["id"], "task-1");
}

#[test]
fn add_rejects_blank_text_and_writes_nothing() {
    let exe = env!("CARGO_BIN_EXE_daytasks");
    let store_path = temp_path("cli-add-blank.json");

    let output = Command::new(exe)
        .args(["add", "   "])
        .env("DAYTASKS_STORE_PATH", &store_path)
        .env("DAYTASKS_CONFIG_PATH", temp_path("config.json"))
        .env("DAYTASKS_SESSION_PATH", temp_path("session.json"))
        .output()
        .expect("failed to run add command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
    assert!(!store_path.exists());
}

#[test]
fn add_rejects_unknown_priority() {
    let exe = env!("CARGO_BIN_EXE_daytasks");
    let store_path = temp_path("cli-add-priority.json");

    let output = Command::new(exe)
        .args(["add", "demo", "--priority", "urgent"])
        .env("DAYTASKS_STORE_PATH", &store_path)
        .env("DAYTASKS_CONFIG_PATH", temp_path("config.json"))
        .env("DAYTASKS_SESSION_PATH", temp_path("session.json"))
        .output()
        .expect("failed to run add command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
    assert!(!store_path.exists());
}

#[test]
fn add_json_output_includes_defaults() {
    let exe = env!("CARGO_BIN_EXE_daytasks");
    let store_path = temp_path("cli-add-json.json");

    let output = Command::new(exe)
        .args(["--json", "add", "demo"])
        .env("DAYTASKS_STORE_PATH", &store_path)
        .env("DAYTASKS_CONFIG_PATH", temp_path("config.json"))
        .env("DAYTASKS_SESSION_PATH", temp_path("session.json"))
        .output()
        .expect("failed to run add command");

    std::fs::remove_file(&store_path).ok();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("json output");

    assert!(parsed["id"].as_str().unwrap().starts_with("task-"));
    assert_eq!(parsed["text"], "demo");
    assert_eq!(parsed["completed"], false);
    assert_eq!(parsed["status"], "todo");
    assert_eq!(parsed["priority"], "medium");
    assert_eq!(parsed["reminder"], "none");
}
