use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum LogOutput {
    /// Console only, for interactive use and CI.
    #[serde(rename = "stdout")]
    Stdout,
    /// Per-day log file, with every record also copied to the console.
    #[serde(rename = "file")]
    #[default]
    File,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub output: LogOutput,
    /// Directory for the per-day log files, used when output is "file".
    pub dir: Option<PathBuf>,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::File,
            dir: None,
            level: "info".to_string(),
        }
    }
}
