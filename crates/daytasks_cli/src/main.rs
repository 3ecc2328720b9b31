use clap::{CommandFactory, Parser};
use std::io::{self, BufRead};
use std::sync::Arc;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing_subscriber::EnvFilter;

use daytasks_core::config::{self, Palette};
use daytasks_core::error::AppError;
use daytasks_core::model::{StreakRecord, Task};
use daytasks_core::notify::notifier_from_env;
use daytasks_core::reminder::{EVALUATION_PERIOD, ReminderEvaluator};
use daytasks_core::storage::json_store;
use daytasks_core::store::{NewTask, TaskPatch, TaskStore};
use daytasks_core::sync::{HttpTaskApi, SyncAdapter};
use daytasks_core::views::{self, LabelFilter};

mod cli;

use cli::{Cli, Command, ListCommand, parse_priority, parse_reminder, parse_status};

fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

fn open_store(config: &config::Config) -> Result<TaskStore, AppError> {
    let mut store = TaskStore::open(json_store::tasks_path()?);
    if let Some(base_url) = config.api_base_url.as_deref() {
        let api = Arc::new(HttpTaskApi::new(base_url));
        store.attach_sync(SyncAdapter::new(api, json_store::session_path()?));
    }
    Ok(store)
}

fn task_state(task: &Task) -> &'static str {
    if task.completed {
        return "done";
    }
    match task.status {
        daytasks_core::model::TaskStatus::Todo => "todo",
        daytasks_core::model::TaskStatus::InProgress => "in-progress",
    }
}

fn priority_label(task: &Task) -> &'static str {
    match task.priority {
        daytasks_core::model::Priority::Low => "low",
        daytasks_core::model::Priority::Medium => "medium",
        daytasks_core::model::Priority::High => "high",
    }
}

fn print_task_line(task: &Task, palette: &Palette) {
    let labels = if task.labels.is_empty() {
        "-".to_string()
    } else {
        task.labels.join(",")
    };
    let due = task.due_date.as_deref().unwrap_or("-");
    println!(
        "{} | {} | {} | {} | {} | {}",
        palette.mutedize(&task.id),
        palette.accentize(&task.text),
        task_state(task),
        priority_label(task),
        labels,
        due
    );
}

fn print_tasks_plain(tasks: &[&Task], palette: &Palette) {
    for task in tasks {
        print_task_line(task, palette);
    }
}

fn print_task_json(task: &Task) -> Result<(), AppError> {
    let json = serde_json::to_string(task).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{json}");
    Ok(())
}

fn print_tasks_json(tasks: &[&Task]) -> Result<(), AppError> {
    let json =
        serde_json::to_string(tasks).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{json}");
    Ok(())
}

fn record_completion(store: &TaskStore) -> Result<StreakRecord, AppError> {
    let path = json_store::streak_path()?;
    let record = json_store::load_streak(&path);
    let offset = local_offset();
    let today = OffsetDateTime::now_utc().to_offset(offset).date();
    let updated = daytasks_core::progress::update_streak(&record, store.tasks(), today, offset);
    if updated != record {
        json_store::save_streak(&path, &updated)?;
    }
    Ok(updated)
}

fn not_found(id: &str) -> AppError {
    AppError::invalid_input(format!("task not found: {id}"))
}

fn list_filter(label: Option<String>) -> LabelFilter {
    match label {
        Some(label) => LabelFilter::Label(label),
        None => LabelFilter::All,
    }
}

fn run_command(cli: Cli, palette: &Palette, config: &config::Config) -> Result<(), AppError> {
    let mut store = open_store(config)?;

    match cli.command {
        Command::Add {
            text,
            priority,
            labels,
            due,
            reminder,
        } => {
            let text = match text {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::invalid_input("text is required")),
            };

            let mut details = NewTask {
                labels,
                due_date: due,
                ..NewTask::default()
            };
            if let Some(raw) = priority {
                details.priority = parse_priority(&raw).map_err(AppError::invalid_input)?;
            }
            if let Some(raw) = reminder {
                details.reminder = parse_reminder(&raw).map_err(AppError::invalid_input)?;
            }

            let task = store.add(&text, details)?;
            store.flush_sync();
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!("Added task: {} ({})", task.text, task.id);
            }
        }
        Command::Edit {
            id,
            text,
            priority,
            labels,
            due,
            clear_due,
            reminder,
        } => {
            if let Some(text) = &text
                && text.trim().is_empty()
            {
                return Err(AppError::invalid_input("text is required"));
            }
            let mut patch = TaskPatch {
                text,
                ..TaskPatch::default()
            };
            if let Some(raw) = priority {
                patch.priority = Some(parse_priority(&raw).map_err(AppError::invalid_input)?);
            }
            if !labels.is_empty() {
                patch.labels = Some(labels);
            }
            if clear_due {
                patch.due_date = Some(None);
            } else if let Some(due) = due {
                patch.due_date = Some(Some(due));
            }
            if let Some(raw) = reminder {
                patch.reminder = Some(parse_reminder(&raw).map_err(AppError::invalid_input)?);
            }

            let task = store.update(&id, patch).ok_or_else(|| not_found(&id))?;
            store.flush_sync();
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!("Updated task: {} ({})", task.text, task.id);
            }
        }
        Command::Done { id } => {
            let task = store.toggle_complete(&id).ok_or_else(|| not_found(&id))?;
            let streak = record_completion(&store)?;
            store.flush_sync();
            if cli.json {
                print_task_json(&task)?;
            } else if task.completed {
                println!(
                    "Completed task: {} ({}), streak {} day(s)",
                    task.text, task.id, streak.count
                );
            } else {
                println!("Reopened task: {} ({})", task.text, task.id);
            }
        }
        Command::Status { id, status } => {
            let status = parse_status(&status).map_err(AppError::invalid_input)?;
            let task = store.set_status(&id, status).ok_or_else(|| not_found(&id))?;
            store.flush_sync();
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!("Moved task: {} ({}) to {}", task.text, task.id, task_state(&task));
            }
        }
        Command::Delete { id } => {
            let deleted = store.delete(&id);
            store.flush_sync();
            if cli.json {
                println!("{}", serde_json::json!({ "id": id, "deleted": deleted }));
            } else if deleted {
                println!("Deleted task: {id}");
            } else {
                println!("No such task: {id}");
            }
        }
        Command::List { list, label } => {
            let filter = list_filter(label);
            let visible = views::filter_by_label(store.tasks(), &filter);
            let (active, completed): (Vec<&Task>, Vec<&Task>) =
                visible.into_iter().partition(|task| !task.completed);

            let tasks: Vec<&Task> = match list.unwrap_or(ListCommand::All) {
                ListCommand::All => active.into_iter().chain(completed).collect(),
                ListCommand::Active => active,
                ListCommand::Completed => completed,
            };

            if cli.json {
                print_tasks_json(&tasks)?;
            } else {
                print_tasks_plain(&tasks, palette);
            }
        }
        Command::Board => {
            let filtered = store.tasks();
            let columns = views::board_columns(filtered);
            if cli.json {
                let json = serde_json::json!({
                    "todo": columns.todo,
                    "inProgress": columns.in_progress,
                    "done": columns.done,
                });
                println!("{json}");
            } else {
                for (title, column) in [
                    ("TODO", &columns.todo),
                    ("IN PROGRESS", &columns.in_progress),
                    ("DONE", &columns.done),
                ] {
                    println!("{}", palette.accentize(title));
                    print_tasks_plain(column, palette);
                }
            }
        }
        Command::Day { date } => {
            let date = Date::parse(&date, format_description!("[year]-[month]-[day]"))
                .map_err(|_| AppError::invalid_input("date must be YYYY-MM-DD"))?;
            let tasks = views::tasks_on_date(store.tasks(), date, local_offset());
            if cli.json {
                print_tasks_json(&tasks)?;
            } else {
                print_tasks_plain(&tasks, palette);
            }
        }
        Command::Progress => {
            let tasks = store.tasks();
            let overall = views::completion_percent(tasks.iter());
            let offset = local_offset();
            let today = OffsetDateTime::now_utc().to_offset(offset).date();
            let daily = views::todays_completion(tasks, today, offset);

            let mut labels: Vec<&str> = Vec::new();
            for task in tasks {
                for label in &task.labels {
                    if !labels.contains(&label.as_str()) {
                        labels.push(label);
                    }
                }
            }
            let per_label = views::label_progress(tasks, &labels);
            let streak = json_store::load_streak(&json_store::streak_path()?);

            if cli.json {
                let json = serde_json::json!({
                    "overall": overall,
                    "today": daily,
                    "labels": per_label
                        .iter()
                        .map(|(label, percent)| serde_json::json!({ "label": label, "percent": percent }))
                        .collect::<Vec<_>>(),
                    "streak": streak,
                });
                println!("{json}");
            } else {
                println!("Overall: {overall}%");
                println!("Today: {daily}%");
                for (label, percent) in &per_label {
                    println!("{}: {percent}%", palette.mutedize(label));
                }
                println!("Streak: {} day(s)", streak.count);
            }
        }
        Command::Login { id_token } => {
            let Some(sync) = store.sync_mut() else {
                return Err(AppError::invalid_input(
                    "no api_base_url configured; set it in config.json to enable sync",
                ));
            };
            let credential = sync.login(&id_token)?;
            if let Some(remote) = sync.pull_on_login() {
                store.replace_all(remote);
            }
            let who = credential
                .user
                .email
                .or(credential.user.name)
                .unwrap_or(credential.user.id);
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "user": who, "tasks": store.tasks().len() })
                );
            } else {
                println!("Logged in as {who} ({} tasks)", store.tasks().len());
            }
        }
        Command::Logout => {
            if let Some(sync) = store.sync_mut() {
                sync.logout();
            }
            if cli.json {
                println!("{}", serde_json::json!({ "logged_in": false }));
            } else {
                println!("Logged out; local tasks kept");
            }
        }
        Command::Sync => {
            let Some(sync) = store.sync() else {
                return Err(AppError::invalid_input(
                    "no api_base_url configured; set it in config.json to enable sync",
                ));
            };
            if !sync.is_authenticated() {
                return Err(AppError::invalid_input("not logged in"));
            }
            store.flush_sync();
            if cli.json {
                println!("{}", serde_json::json!({ "tasks": store.tasks().len() }));
            } else {
                println!("Pushed {} task(s)", store.tasks().len());
            }
        }
        Command::Remind => {
            let notifier = notifier_from_env()?;
            let mut evaluator = ReminderEvaluator::new();
            let fired =
                evaluator.evaluate(store.tasks(), OffsetDateTime::now_utc(), notifier.as_ref());
            if cli.json {
                let refs: Vec<&Task> = fired.iter().collect();
                print_tasks_json(&refs)?;
            } else {
                for task in &fired {
                    println!("Reminder: {} ({})", task.text, task.id);
                }
                println!("{} reminder(s) fired", fired.len());
            }
        }
        Command::Watch => {
            let notifier = notifier_from_env()?;
            let mut evaluator = ReminderEvaluator::new();
            let path = json_store::tasks_path()?;
            loop {
                let tasks = json_store::load_tasks(&path);
                let fired =
                    evaluator.evaluate(&tasks, OffsetDateTime::now_utc(), notifier.as_ref());
                for task in &fired {
                    println!("Reminder: {} ({})", task.text, task.id);
                }
                std::thread::sleep(EVALUATION_PERIOD);
            }
        }
    }

    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(current.clone());
                current.clear();
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_interactive(palette: &Palette, config: &config::Config) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("daytasks".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli, palette, config) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let loaded = config::load_config_with_fallback();
    if let Some(err) = loaded.error.as_ref() {
        tracing::warn!(error = %err, "failed to load configuration, using defaults");
    }
    let palette = config::palette_for_theme(loaded.config.theme.as_deref());

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive(&palette, &loaded.config) {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli, &palette, &loaded.config) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
