//! Shared output layer for pretty/text/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: pretty output for humans, compact text for pipes, or stable
//! JSON.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` flag
//! 2. hidden `--json` flag
//! 3. `FORMAT` env var, then the user config `output` key
//! 4. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

use tasklab_core::TaskError;
use tasklab_core::config::{DisplayConfig, normalize_output_mode};
use tasklab_core::model::WorkItem;

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, aligned labels).
    Pretty,
    /// Token-efficient plain text for agents and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    fn from_name(name: &str) -> Option<Self> {
        match normalize_output_mode(name)? {
            "json" => Some(Self::Json),
            "text" => Some(Self::Text),
            _ => Some(Self::Pretty),
        }
    }
}

/// Pick the output mode. `resolved` is the config layer's answer for
/// everything below the `--format` flag.
pub fn resolve_output_mode(format_flag: Option<OutputMode>, resolved: &str) -> OutputMode {
    format_flag
        .or_else(|| OutputMode::from_name(resolved))
        .unwrap_or(OutputMode::Text)
}

/// Trait implemented by any CLI result type that can be rendered in all modes.
pub trait Renderable {
    /// Render for human consumption: labelled fields, one per line.
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Render as a self-contained JSON value.
    fn render_json(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Render as a single text row (no header; see [`table_headers`]).
    ///
    /// [`table_headers`]: Renderable::table_headers
    fn render_table(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Column headers for text mode, in the same order as [`render_table`] fields.
    ///
    /// [`render_table`]: Renderable::render_table
    fn table_headers() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }
}

/// Render a single [`Renderable`] item.
pub fn render_item<R: Renderable>(w: &mut dyn Write, item: &R, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Pretty => item.render_human(w),
        OutputMode::Text => item.render_table(w),
        OutputMode::Json => {
            item.render_json(w)?;
            writeln!(w)
        }
    }
}

/// Render a list of [`Renderable`] items.
///
/// - In JSON mode, wraps items in a JSON array.
/// - In text mode, prints a header row and one row per item.
pub fn render_list<R: Renderable>(
    w: &mut dyn Write,
    items: &[R],
    mode: OutputMode,
) -> io::Result<()> {
    match mode {
        OutputMode::Pretty => {
            for item in items {
                item.render_human(w)?;
            }
        }
        OutputMode::Text => {
            if !items.is_empty() {
                writeln!(w, "{}", R::table_headers().join("  "))?;
            }
            for item in items {
                item.render_table(w)?;
            }
        }
        OutputMode::Json => {
            write!(w, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(w, ",")?;
                }
                writeln!(w)?;
                item.render_json(w)?;
            }
            writeln!(w, "\n]")?;
        }
    }
    Ok(())
}

/// A work item paired with the display settings used to dump it.
pub struct ItemView<'a> {
    pub item: &'a WorkItem,
    pub display: &'a DisplayConfig,
}

impl Renderable for ItemView<'_> {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let lines = self
            .item
            .info_lines(&self.display.date_format, self.display.show_done_at);
        for (label, value) in lines {
            pretty_kv(w, &label.to_uppercase(), value)?;
        }
        pretty_rule(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(w, &self.item.to_record()).map_err(io::Error::other)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}  {}",
            self.item.id(),
            self.item.kind(),
            self.item.status(),
            self.item.priority(),
            self.item.title()
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "TYPE", "STATUS", "PRIORITY", "TITLE"]
    }
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (e.g. "E3001").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Create an error with a suggestion and error code.
    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
        }
    }
}

impl From<&TaskError> for CliError {
    fn from(err: &TaskError) -> Self {
        Self::with_details(err.to_string(), err.suggestion(), err.error_code().code())
    }
}

/// Render a serializable value in the requested format.
///
/// In JSON mode, the value is serialized with `serde_json`. In pretty/text
/// mode, `human_fn` produces the output.
pub fn render<T: Serialize>(
    w: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *w, value)?;
            writeln!(w)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            human_fn(value, w)?;
        }
    }
    Ok(())
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)
}

fn write_error(out: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}
