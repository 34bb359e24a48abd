//! Logging configuration
//!
//! Filtering is expressed as a base level plus per-crate overrides, so the
//! swarmview crates can log at `info` while dependencies stay at `warn`.
//! [`LogConfig::directives`] renders both into an `EnvFilter` string.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Crates whose spans carry fetch and bind activity
pub const SWARMVIEW_TARGETS: [&str; 3] = ["swarmview_core", "swarmview_cache", "swarmview_display"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for every target without an override
    pub level: String,

    /// Per-target level overrides, keyed by module path
    pub targets: BTreeMap<String, String>,

    pub console: ConsoleConfig,

    /// Optional file sink; always JSONL
    pub file: Option<FileConfig>,

    pub jsonl: JsonlConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            targets: swarmview_targets("info"),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
        }
    }
}

impl LogConfig {
    /// Pretty console output with the swarmview crates at `debug`
    pub fn development() -> Self {
        Self {
            level: "info".to_string(),
            targets: swarmview_targets("debug"),
            console: ConsoleConfig {
                format: LogFormat::Pretty,
                ansi: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Warnings only, routed through the libtest capture
    pub fn testing() -> Self {
        Self {
            level: "warn".to_string(),
            targets: BTreeMap::new(),
            console: ConsoleConfig {
                test_writer: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Override the level for one target
    pub fn with_target(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.targets.insert(target.into(), level.into());
        self
    }

    /// `EnvFilter` directives: the base level followed by each override
    pub fn directives(&self) -> String {
        std::iter::once(self.level.clone())
            .chain(
                self.targets
                    .iter()
                    .map(|(target, level)| format!("{target}={level}")),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn swarmview_targets(level: &str) -> BTreeMap<String, String> {
    SWARMVIEW_TARGETS
        .iter()
        .map(|target| (target.to_string(), level.to_string()))
        .collect()
}

/// Console event format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Jsonl,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: LogFormat,
    pub ansi: bool,
    /// Extra filter applied to the console only
    pub level: Option<String>,
    /// Write through the libtest capture instead of stdout
    pub test_writer: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::Jsonl,
            ansi: false,
            level: None,
            test_writer: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name prefix; files are named `<prefix>.log` or `<prefix>.<date>.log`
    pub prefix: String,
    pub rotation: RotationStrategy,
    /// Rotated files to keep; `None` keeps all
    pub max_files: Option<usize>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "swarmview".to_string(),
            rotation: RotationStrategy::Daily,
            max_files: Some(7),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One file, truncated when the subscriber is installed
    Never,
}

/// Fields included in each JSONL event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlConfig {
    /// Put event fields (`hash`, `waiters`, ...) at the top level
    pub flatten_events: bool,
    /// Include the enclosing `fetch` / `bind` spans
    pub spans: bool,
    pub location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            spans: true,
            location: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quiets_dependencies() {
        let config = LogConfig::default();
        assert_eq!(
            config.directives(),
            "warn,swarmview_cache=info,swarmview_core=info,swarmview_display=info"
        );
        assert_eq!(config.console.format, LogFormat::Jsonl);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert_eq!(config.console.format, LogFormat::Pretty);
        assert_eq!(config.targets["swarmview_display"], "debug");
        assert!(config.directives().starts_with("info,"));
    }

    #[test]
    fn test_target_override() {
        let config = LogConfig::testing().with_target("swarmview_cache::coordinator", "trace");
        assert_eq!(config.directives(), "warn,swarmview_cache::coordinator=trace");
        assert!(config.console.test_writer);
    }

    #[test]
    fn test_partial_json() {
        let config: LogConfig = serde_json::from_str(
            r#"{"level": "error", "targets": {"swarmview_cache": "trace"}, "console": {"format": "pretty"}}"#,
        )
        .unwrap();
        assert_eq!(config.directives(), "error,swarmview_cache=trace");
        assert_eq!(config.console.format, LogFormat::Pretty);
        assert!(config.console.enabled);
        assert!(config.jsonl.flatten_events);
    }
}
