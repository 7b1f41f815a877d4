use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::Path;

use crate::model::parse_datetime;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// strftime pattern for dates in the item dump.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub show_done_at: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            show_done_at: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Instant the demo script treats as "now". Unset means the built-in
    /// reference time.
    #[serde(default)]
    pub reference_time: Option<String>,
}

impl DemoConfig {
    /// The configured reference time, parsed.
    ///
    /// # Errors
    ///
    /// Fails when `reference_time` is set but is not a date-time.
    pub fn reference_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.reference_time
            .as_deref()
            .map(|raw| {
                parse_datetime(raw)
                    .with_context(|| format!("demo.reference_time is not a date-time: {raw}"))
            })
            .transpose()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Load `.tasklab/config.toml` under `project_root`. A missing file yields
/// defaults.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".tasklab/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load `<config_dir>/tasklab/config.toml`.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("tasklab/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge project config, user config and environment into one view.
///
/// # Errors
///
/// Propagates config loading failures.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

/// Output mode precedence: `--json`, then `FORMAT`, then user config, then
/// pretty on a terminal and text otherwise.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<&str>,
    env_format: Option<&str>,
) -> String {
    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

/// Canonical output mode name, accepting the legacy `human`/`table` aliases.
#[must_use]
pub fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn write_project_config(root: &Path, content: &str) {
        let dir = root.join(".tasklab");
        std::fs::create_dir_all(&dir).expect("create .tasklab");
        std::fs::write(dir.join("config.toml"), content).expect("write config");
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.display.date_format, "%Y-%m-%d");
        assert!(!cfg.display.show_done_at);
        assert!(cfg.demo.reference_time.is_none());
    }

    #[test]
    fn partial_project_config_fills_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        write_project_config(
            root.path(),
            r#"
[display]
show_done_at = true

[demo]
reference_time = "2025-10-28T09:30:00Z"
"#,
        );

        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert!(cfg.display.show_done_at);
        assert_eq!(cfg.display.date_format, "%Y-%m-%d");
        assert_eq!(
            cfg.demo.reference_time().expect("parse"),
            Some(Utc.with_ymd_and_hms(2025, 10, 28, 9, 30, 0).unwrap())
        );
    }

    #[test]
    fn malformed_project_config_names_the_file() {
        let root = tempfile::tempdir().expect("temp dir");
        write_project_config(root.path(), "[display\n");
        let err = load_project_config(root.path()).expect_err("parse should fail");
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn bad_reference_time_is_an_error() {
        let demo = DemoConfig {
            reference_time: Some("yesterday".to_string()),
        };
        assert!(demo.reference_time().is_err());
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        let output = resolve_output(true, Some("pretty"), Some("text"));
        assert_eq!(output, "json");
    }

    #[test]
    fn env_beats_user_config() {
        let output = resolve_output(false, Some("json"), Some("text"));
        assert_eq!(output, "text");
    }

    #[test]
    fn legacy_aliases_are_normalized() {
        let pretty = resolve_output(false, Some("table"), Some("human"));
        assert_eq!(pretty, "pretty");

        let text = resolve_output(false, Some("human"), Some("table"));
        assert_eq!(text, "text");
    }

    #[test]
    fn unknown_modes_fall_through() {
        assert_eq!(normalize_output_mode("yaml"), None);
        let output = resolve_output(false, Some("json"), Some("yaml"));
        assert_eq!(output, "json");
    }

    #[test]
    fn user_config_parses_output() {
        let cfg: UserConfig = toml::from_str(r#"output = "json""#).expect("parse");
        assert_eq!(cfg.output, Some("json".to_string()));
    }
}
