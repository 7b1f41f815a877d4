//! `tasklab check`: build one work item from a JSON payload.
//!
//! Prints the item on success. On failure the error goes to stderr and the
//! process exits non-zero.

use anyhow::{Context, Result};
use clap::Args;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

use tasklab_core::config::ProjectConfig;
use tasklab_core::model::{CreatePayload, WorkItem, WorkItemKind};
use tasklab_core::{Clock, SystemClock, TaskError};

use super::{fixed_clock, read_input};
use crate::output::{CliError, ItemView, OutputMode, render_error, render_item};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Work item kind: epic, story, task, subtask or bug.
    #[arg(long, default_value = "task")]
    pub kind: String,

    /// Path to a JSON creation payload, or `-` for stdin.
    pub payload: PathBuf,

    /// Freeze "now" at this instant instead of reading the system clock.
    #[arg(long)]
    pub now: Option<String>,
}

pub fn run_check(args: &CheckArgs, project: &ProjectConfig, output: OutputMode) -> Result<()> {
    let source = read_input(&args.payload)?;
    let payload: CreatePayload = serde_json::from_str(&source)
        .with_context(|| format!("Failed to parse payload {}", args.payload.display()))?;
    let built = match args.now.as_deref() {
        Some(raw) => build(&args.kind, payload, &fixed_clock(raw)?),
        None => build(&args.kind, payload, &SystemClock),
    };

    match built {
        Ok(item) => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let view = ItemView {
                item: &item,
                display: &project.display,
            };
            render_item(&mut out, &view, output)?;
            out.flush()?;
            Ok(())
        }
        Err(err) => {
            debug!(fields = ?err.violated_fields(), "payload rejected");
            render_error(output, &CliError::from(&err))?;
            anyhow::bail!("{err}")
        }
    }
}

fn build(kind: &str, payload: CreatePayload, clock: &impl Clock) -> Result<WorkItem, TaskError> {
    let kind = kind
        .parse::<WorkItemKind>()
        .map_err(|err| TaskError::UnknownType { kind: err.got })?;
    WorkItem::with_clock(kind, payload, clock)
}
