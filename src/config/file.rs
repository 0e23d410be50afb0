use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::logging::LoggingConfig;
use super::timeunit;

/// On-disk shape of the optional scheduler config file. Every field is an
/// override; anything absent falls back to the built-in defaults.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub tasks: Vec<TaskEntry>,
    pub schedules: HashMap<String, ScheduleEntry>,
    pub fail_fast: Option<bool>,
    pub continue_on_error: Option<bool>,
    pub reports_dir: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct TaskEntry {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub script_path: Option<PathBuf>,
    #[serde(default)]
    pub interpreter: Option<String>,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub timeout: Option<TimeoutEntry>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub extra_args: Option<Vec<String>>,
}

/// Timeouts are accepted either as a plain number of seconds or as a
/// duration literal like "10 m".
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum TimeoutEntry {
    Seconds(u64),
    Text(String),
}

impl TimeoutEntry {
    pub fn resolve(&self) -> anyhow::Result<Duration> {
        match self {
            TimeoutEntry::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            TimeoutEntry::Text(text) => timeunit::parse_duration(text),
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct ScheduleEntry {
    pub tasks: Option<Vec<String>>,
    pub enabled: Option<bool>,
    pub cron: Option<String>,
    pub timezone: Option<String>,
}

pub fn read_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let content = std::fs::read_to_string(path).context("Failed to read config file")?;
    let config = serde_json::from_str(&content).context("Failed to parse config file")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_entry_accepts_both_forms() {
        let entry: TimeoutEntry = serde_json::from_str("120").unwrap();
        assert_eq!(entry.resolve().unwrap(), Duration::from_secs(120));

        let entry: TimeoutEntry = serde_json::from_str("\"2 m\"").unwrap();
        assert_eq!(entry.resolve().unwrap(), Duration::from_secs(120));

        let entry: TimeoutEntry = serde_json::from_str("\"forever\"").unwrap();
        assert!(entry.resolve().is_err());
    }

    #[test]
    fn test_config_file_parses_partial_overrides() {
        let raw = r#"{
            "fail_fast": false,
            "tasks": [
                {"id": "security_audit", "timeout": "20 m"}
            ],
            "schedules": {
                "daily": {"tasks": ["change_detection", "log_review"]}
            }
        }"#;
        let file: ConfigFile = serde_json::from_str(raw).unwrap();
        assert_eq!(file.fail_fast, Some(false));
        assert_eq!(file.tasks.len(), 1);
        assert!(file.tasks[0].script_path.is_none());
        assert_eq!(
            file.schedules["daily"].tasks.as_deref(),
            Some(&["change_detection".to_string(), "log_review".to_string()][..])
        );
    }
}
