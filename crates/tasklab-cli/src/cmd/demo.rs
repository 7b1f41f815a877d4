//! `tasklab demo`: run the built-in demonstration script.
//!
//! The script has three phases: eighteen payloads that each break a
//! validation rule, ten valid tasks, then ten calls that fail inside the
//! repository (duplicate ids, unknown kinds, missing ids, capability
//! violations). Errors from the first phase are printed and cleared before
//! the second phase starts.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use tracing::info;

use tasklab_core::config::ProjectConfig;
use tasklab_core::model::{
    CreatePayload, Priority, Status, UpdatePayload, WorkItemRecord, parse_datetime,
};
use tasklab_core::{FixedClock, TaskController, TaskRepository};

use super::{ErrorEntry, error_entries, task_records, write_errors, write_tasks};
use crate::output::{OutputMode, render};
use crate::script::Operation;

/// Instant the demo treats as "now" when neither `--now` nor the project
/// config picks one.
pub const DEFAULT_REFERENCE_TIME: &str = "2025-10-28T12:00:00Z";

/// Creation date shared by every fixed-date payload in the script.
const CREATED: &str = "2025-10-27";

#[derive(Args, Debug, Default)]
pub struct DemoArgs {
    /// Freeze "now" at this instant (RFC 3339 or YYYY-MM-DD).
    #[arg(long)]
    pub now: Option<String>,
}

/// JSON shape of a demo run.
#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub validation_errors: Vec<ErrorEntry>,
    pub service_errors: Vec<ErrorEntry>,
    pub tasks: Vec<WorkItemRecord>,
}

pub fn run_demo(args: &DemoArgs, project: &ProjectConfig, output: OutputMode) -> Result<()> {
    let now = reference_time(args, project)?;
    info!(%now, "running demo script");

    let mut controller = TaskController::new(TaskRepository::with_clock(FixedClock::new(now)));
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for op in validation_cases() {
        op.apply(&mut controller);
    }
    let validation_errors = error_entries(controller.errors());
    if !output.is_json() {
        write_errors(&mut out, output, "Validation errors", &controller)?;
    }
    controller.clear_errors();

    for op in valid_tasks().into_iter().chain(service_cases()) {
        op.apply(&mut controller);
    }

    let report = DemoReport {
        validation_errors,
        service_errors: error_entries(controller.errors()),
        tasks: task_records(controller.get_all_tasks()),
    };
    render(&mut out, output, &report, |_, w| {
        write_errors(w, output, "Service errors", &controller)?;
        write_tasks(
            w,
            output,
            "All tasks",
            controller.get_all_tasks(),
            &project.display,
        )
    })?;
    out.flush()?;
    Ok(())
}

/// `--now`, then `[demo] reference_time`, then [`DEFAULT_REFERENCE_TIME`].
fn reference_time(args: &DemoArgs, project: &ProjectConfig) -> Result<DateTime<Utc>> {
    if let Some(raw) = args.now.as_deref() {
        return parse_datetime(raw).with_context(|| format!("--now is not a date-time: {raw}"));
    }
    if let Some(at) = project.demo.reference_time()? {
        return Ok(at);
    }
    parse_datetime(DEFAULT_REFERENCE_TIME).context("built-in reference time is malformed")
}

fn task(id: &str, title: &str) -> CreatePayload {
    CreatePayload::new(id, title).created_at(CREATED)
}

/// Payloads that each violate one rule. The `now` cases take their
/// creation time from the clock.
fn validation_cases() -> Vec<Operation> {
    let fresh = |id: &str| CreatePayload::new(id, "Valid Title");
    let dated = |id: &str| task(id, "Valid Title");
    [
        CreatePayload::new("T-001", "ab"),
        CreatePayload::new("T-002", "a".repeat(101)),
        fresh("T-003").created_at("not-a-date"),
        fresh("T-004").deadline("2000-01-01"),
        fresh("T-005").status("NOT_A_STATUS"),
        fresh("T-006").priority("NOT_A_PRIORITY"),
        fresh("T-007").description("short"),
        fresh("T-008").description("a".repeat(201)),
        fresh("T-009").done_at("not-a-date"),
        fresh("T-010").done_at("2000-01-01"),
        dated("T-011").deadline("2025-10-26"),
        dated("T-012").done_at("2025-10-26"),
        fresh("T-013").created_at("2025-11-01"),
        CreatePayload::new("T-014", 12_345_i64).created_at(CREATED),
        dated("T-015").deadline(true),
        dated("T-016").status(123_i64),
        dated("T-017").priority(456_i64),
        dated("T-018").description(serde_json::json!({"text": "not a string"})),
    ]
    .into_iter()
    .map(|payload| Operation::create("task", payload))
    .collect()
}

fn valid_tasks() -> Vec<Operation> {
    [
        task("T-101", "Implement login feature"),
        task("T-102", "Write documentation").status(Status::InProgress),
        task("T-103", "Fix bug in payment module")
            .status(Status::Done)
            .priority(Priority::Low),
        task("T-104", "Refactor codebase"),
        task("T-105", "Design new logo").priority(Priority::High),
        task("T-106", "Prepare release notes")
            .description("Draft release notes for version 2.0."),
        task("T-107", "Optimize database queries")
            .status(Status::InProgress)
            .priority(Priority::High),
        task("T-108", "Set up CI/CD pipeline"),
        task("T-109", "Conduct user interviews").status(Status::InProgress),
        task("T-110", "Update dependencies"),
    ]
    .into_iter()
    .map(|payload| Operation::create("task", payload))
    .collect()
}

/// Calls that fail in the repository, plus the two leaf items they need.
fn service_cases() -> Vec<Operation> {
    let missing = "NON_EXISTENT_ID".to_string();
    vec![
        Operation::create("task", task("T-101", "Duplicate ID")),
        Operation::create("UNKNOWN_TYPE", task("T-999", "Unknown Type")),
        Operation::Get { id: missing.clone() },
        Operation::Update {
            id: missing.clone(),
            updates: UpdatePayload::new().set("title", "Should Fail"),
        },
        Operation::Remove { id: missing },
        Operation::AddChild {
            parent: "NON_EXISTENT_PARENT".into(),
            child: "T-101".into(),
        },
        Operation::AddChild {
            parent: "T-101".into(),
            child: "NON_EXISTENT_CHILD".into(),
        },
        Operation::create("subtask", task("ST-201", "Subtask")),
        Operation::AddChild {
            parent: "ST-201".into(),
            child: "T-101".into(),
        },
        Operation::RemoveChild {
            parent: "NON_EXISTENT_PARENT".into(),
            child: "T-101".into(),
        },
        Operation::create("bug", task("B-301", "Bug")),
        Operation::RemoveChild {
            parent: "B-301".into(),
            child: "T-101".into(),
        },
    ]
}
