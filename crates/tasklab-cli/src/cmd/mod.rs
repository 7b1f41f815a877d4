//! Subcommand handlers and the report they share.

pub mod check;
pub mod demo;
pub mod run;

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::Path;

use tasklab_core::config::DisplayConfig;
use tasklab_core::model::{WorkItem, WorkItemRecord, parse_datetime};
use tasklab_core::{ErrorWithContext, FixedClock, TaskController, TaskService};

use crate::output::{ItemView, OutputMode, pretty_section, render_list};

/// A captured controller error, shaped for JSON output.
#[derive(Debug, Serialize)]
pub struct ErrorEntry {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<serde_json::Value>,
}

pub fn error_entries(errors: &[ErrorWithContext]) -> Vec<ErrorEntry> {
    errors
        .iter()
        .map(|captured| ErrorEntry {
            code: captured.error.error_code().code(),
            message: captured.error.to_string(),
            entry: captured.entry.clone(),
        })
        .collect()
}

pub fn task_records(items: &[WorkItem]) -> Vec<WorkItemRecord> {
    items.iter().map(WorkItem::to_record).collect()
}

/// Write the controller's captured errors under a heading.
pub fn write_errors<S: TaskService>(
    w: &mut dyn Write,
    mode: OutputMode,
    heading: &str,
    controller: &TaskController<S>,
) -> io::Result<()> {
    let count = controller.errors().len();
    match mode {
        OutputMode::Pretty => pretty_section(w, &format!("{heading} ({count} errors)"))?,
        OutputMode::Text | OutputMode::Json => writeln!(w, "# {heading}: {count} errors")?,
    }
    controller.print_errors(w)
}

/// Write every task the controller holds under a heading.
pub fn write_tasks(
    w: &mut dyn Write,
    mode: OutputMode,
    heading: &str,
    items: &[WorkItem],
    display: &DisplayConfig,
) -> io::Result<()> {
    match mode {
        OutputMode::Pretty => pretty_section(w, &format!("{heading} ({})", items.len()))?,
        OutputMode::Text | OutputMode::Json => writeln!(w, "# {heading}: {}", items.len())?,
    }
    let views: Vec<ItemView<'_>> = items
        .iter()
        .map(|item| ItemView { item, display })
        .collect();
    render_list(w, &views, mode)
}

/// Read a file, or stdin when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// A frozen clock for a `--now` flag value.
pub fn fixed_clock(raw: &str) -> Result<FixedClock> {
    parse_datetime(raw)
        .map(FixedClock::new)
        .with_context(|| format!("--now is not a date-time: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tasklab_core::model::CreatePayload;
    use tasklab_core::{Clock, TaskRepository};

    fn controller() -> TaskController<TaskRepository<FixedClock>> {
        let clock = fixed_clock("2025-10-28T12:00:00Z").unwrap();
        let mut ctl = TaskController::new(TaskRepository::with_clock(clock));
        ctl.create_task("task", CreatePayload::new("T-1", "Valid Title").created_at("2025-10-27"));
        ctl.create_task("task", CreatePayload::new("T-1", "Duplicate"));
        ctl
    }

    #[test]
    fn fixed_clock_parses_flag() {
        let clock = fixed_clock("2025-10-28").unwrap();
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2025, 10, 28, 0, 0, 0).unwrap());
        assert!(fixed_clock("soon").is_err());
    }

    #[test]
    fn error_entries_carry_codes_and_payloads() {
        let ctl = controller();
        let entries = error_entries(ctl.errors());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].code, "E3001");
        assert_eq!(
            entries[0].entry.as_ref().and_then(|v| v["title"].as_str()),
            Some("Duplicate")
        );
    }

    #[test]
    fn text_errors_have_a_heading_line() {
        let ctl = controller();
        let mut buf = Vec::new();
        write_errors(&mut buf, OutputMode::Text, "errors", &ctl).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("# errors: 1 errors\nError 1: task with id T-1 already exists\n"));
    }

    #[test]
    fn pretty_tasks_use_item_dump() {
        let ctl = controller();
        let mut buf = Vec::new();
        write_tasks(
            &mut buf,
            OutputMode::Pretty,
            "All tasks",
            ctl.get_all_tasks(),
            &DisplayConfig::default(),
        )
        .unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("All tasks (1)\n"));
        assert!(text.contains("TITLE:         Valid Title\n"));
    }
}
