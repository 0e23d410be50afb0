use chrono::{DateTime, Local, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outcome of a single task execution within a schedule run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub display_name: String,
    pub success: bool,
    pub runtime_seconds: f64,
    /// Truncated to the storage budget; the raw text of failures lives in
    /// the run-level `errors` list.
    pub output: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default)]
    pub critical_issues: Vec<String>,
}

/// Aggregate record for one schedule invocation. `tasks_run` is a prefix of
/// the schedule's task list, shorter than the full list only when fail-fast
/// aborted the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub timestamp: DateTime<Utc>,
    pub schedule: String,
    pub tasks_run: Vec<TaskResult>,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_runtime_seconds: f64,
    /// Raw, untruncated error text, one entry per failed task.
    pub errors: Vec<String>,
    #[serde(default)]
    pub summary: RunSummary,
}

impl RunResult {
    pub fn new(schedule: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            schedule: schedule.to_string(),
            tasks_run: Vec::new(),
            success_count: 0,
            failure_count: 0,
            total_runtime_seconds: 0.0,
            errors: Vec::new(),
            summary: RunSummary::default(),
        }
    }
}

/// Writes the run result as a timestamped JSON report. Best-effort: on any
/// I/O failure the error is logged and None is returned, so callers must
/// check before chaining into the file-based alert entry point.
pub fn save_report(reports_dir: &Path, result: &RunResult) -> Option<PathBuf> {
    let filename = format!("maintenance_{}.json", Local::now().format("%Y%m%d_%H%M%S"));
    let path = reports_dir.join(filename);

    let json = match serde_json::to_string_pretty(result) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize run result: {}", e);
            return None;
        }
    };

    if let Err(e) = std::fs::create_dir_all(reports_dir) {
        error!(
            "Failed to create reports directory {}: {}",
            reports_dir.display(),
            e
        );
        return None;
    }
    if let Err(e) = std::fs::write(&path, json) {
        error!("Failed to write report {}: {}", path.display(), e);
        return None;
    }

    Some(path)
}

pub fn load_report(path: &Path) -> anyhow::Result<RunResult> {
    use anyhow::Context;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    let result = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse report {}", path.display()))?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_result() -> RunResult {
        let mut result = RunResult::new("daily");
        result.tasks_run.push(TaskResult {
            task_id: "security_audit".to_string(),
            display_name: "Security Audit".to_string(),
            success: true,
            runtime_seconds: 1.5,
            output: "clean".to_string(),
        });
        result.success_count = 1;
        result.total_runtime_seconds = 1.5;
        result
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let reports_dir = dir.path().join("nested").join("reports");

        let saved = save_report(&reports_dir, &sample_result()).expect("report should be saved");
        let name = saved.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("maintenance_"));
        assert!(name.ends_with(".json"));

        let loaded = load_report(&saved).unwrap();
        assert_eq!(loaded.schedule, "daily");
        assert_eq!(loaded.success_count, 1);
        assert_eq!(loaded.failure_count, 0);
        assert_eq!(loaded.tasks_run.len(), 1);
        assert_eq!(loaded.tasks_run[0].task_id, "security_audit");
        assert!(loaded.summary.critical_issues.is_empty());
    }

    #[test]
    fn test_save_report_returns_none_on_io_failure() {
        // A file where the directory should be
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("reports");
        std::fs::write(&blocker, "in the way").unwrap();

        assert!(save_report(&blocker, &sample_result()).is_none());
    }

    #[test]
    fn test_load_report_tolerates_missing_summary() {
        // Reports written by older versions have no summary section
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.json");
        let raw = r#"{
            "timestamp": "2026-08-01T02:00:00Z",
            "schedule": "weekly",
            "tasks_run": [],
            "success_count": 0,
            "failure_count": 0,
            "total_runtime_seconds": 0.0,
            "errors": []
        }"#;
        std::fs::write(&path, raw).unwrap();

        let loaded = load_report(&path).unwrap();
        assert!(loaded.summary.critical_issues.is_empty());
    }
}
