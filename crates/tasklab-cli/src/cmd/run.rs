//! `tasklab run`: execute an operation script through the controller.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

use tasklab_core::config::ProjectConfig;
use tasklab_core::model::WorkItemRecord;
use tasklab_core::{Clock, TaskController, TaskRepository};

use super::{
    ErrorEntry, error_entries, fixed_clock, read_input, task_records, write_errors, write_tasks,
};
use crate::output::{OutputMode, render};
use crate::script::{Operation, parse_script};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to a JSON array of operations, or `-` for stdin.
    pub script: PathBuf,

    /// Freeze "now" at this instant instead of reading the system clock.
    #[arg(long)]
    pub now: Option<String>,

    /// Exit non-zero when any operation failed.
    #[arg(long)]
    pub strict: bool,
}

/// JSON shape of a script run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub errors: Vec<ErrorEntry>,
    pub tasks: Vec<WorkItemRecord>,
}

pub fn run_script(args: &RunArgs, project: &ProjectConfig, output: OutputMode) -> Result<()> {
    let source = read_input(&args.script)?;
    let ops = parse_script(&source)?;
    info!(operations = ops.len(), script = %args.script.display(), "running script");

    let failed = match args.now.as_deref() {
        Some(raw) => {
            let clock = fixed_clock(raw)?;
            execute(TaskRepository::with_clock(clock), ops, project, output)?
        }
        None => execute(TaskRepository::new(), ops, project, output)?,
    };

    if args.strict && failed > 0 {
        anyhow::bail!("{failed} of the script's operations failed");
    }
    Ok(())
}

/// Apply `ops` in order and report. Returns the number of captured errors.
fn execute<C: Clock>(
    repository: TaskRepository<C>,
    ops: Vec<Operation>,
    project: &ProjectConfig,
    output: OutputMode,
) -> Result<usize> {
    let mut controller = TaskController::new(repository);
    for op in ops {
        op.apply(&mut controller);
    }

    let report = RunReport {
        errors: error_entries(controller.errors()),
        tasks: task_records(controller.get_all_tasks()),
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    render(&mut out, output, &report, |_, w| {
        write_errors(w, output, "Errors", &controller)?;
        write_tasks(w, output, "Tasks", controller.get_all_tasks(), &project.display)
    })?;
    out.flush()?;
    Ok(report.errors.len())
}
