#![forbid(unsafe_code)]

mod cmd;
mod output;
mod script;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use tasklab_core::ErrorCode;
use tasklab_core::config::resolve_config;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tasklab: validated work item tracker",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Output format. Overrides `--json`, `FORMAT` and the user config.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Run the demonstration script",
        long_about = "Run the built-in script: payloads that break each validation rule, ten valid \
                      tasks, then calls that fail in the repository. Prints the captured errors \
                      and the final task list.",
        after_help = "EXAMPLES:\n    # Run with the default reference time\n    tasklab demo\n\n    # Pin \"now\" to another instant\n    tasklab demo --now 2025-12-01T09:00:00Z\n\n    # Emit machine-readable output\n    tasklab demo --format json"
    )]
    Demo(cmd::demo::DemoArgs),

    #[command(
        about = "Run an operation script",
        long_about = "Apply a JSON array of create/get/update/add_child/remove_child/remove \
                      operations through the controller, then report errors and tasks.",
        after_help = "EXAMPLES:\n    # Run a script file\n    tasklab run ops.json\n\n    # Read the script from stdin and fail on any error\n    cat ops.json | tasklab run - --strict\n\n    # Emit machine-readable output\n    tasklab run ops.json --format json"
    )]
    Run(cmd::run::RunArgs),

    #[command(
        about = "Validate one payload",
        long_about = "Build a single work item from a JSON creation payload. Prints the item, \
                      or the validation error with a non-zero exit status.",
        after_help = "EXAMPLES:\n    # Check a task payload\n    tasklab check payload.json\n\n    # Check a story from stdin\n    echo '{\"id\":\"S-1\",\"title\":\"Checkout\"}' | tasklab check --kind story -"
    )]
    Check(cmd::check::CheckArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TASKLAB_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "tasklab=debug,info"
        } else {
            "tasklab=info,warn"
        })
    });

    let format = env::var("TASKLAB_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let config = match resolve_config(&project_root, cli.json) {
        Ok(config) => config,
        Err(err) => {
            let code = ErrorCode::ConfigParseError;
            let mode = cli.format.unwrap_or(if cli.json {
                OutputMode::Json
            } else {
                OutputMode::Text
            });
            render_error(
                mode,
                &CliError::with_details(
                    format!("{err:#}"),
                    code.hint().unwrap_or("Fix the config file and retry."),
                    code.code(),
                ),
            )?;
            return Err(err);
        }
    };
    let output = resolve_output_mode(cli.format, &config.resolved_output);

    match cli.command {
        Commands::Demo(ref args) => cmd::demo::run_demo(args, &config.project, output),
        Commands::Run(ref args) => cmd::run::run_script(args, &config.project, output),
        Commands::Check(ref args) => cmd::check::run_check(args, &config.project, output),
    }
}
