use anyhow::{anyhow, bail, Result};
use log::{info, warn};
use std::time::{Duration, Instant};

use crate::config::{Config, ScheduleDefinition};
use crate::report::{RunResult, TaskResult};
use crate::runner::TaskRunner;
use crate::utils::{format_duration, truncate_output};

/// Drives one schedule invocation: iterates the schedule's ordered task
/// list, runs each task through the TaskRunner and accumulates a RunResult.
/// Individual task failures are data, not errors; the only errors out of
/// here are unknown schedule/task names and runtime construction.
pub struct Scheduler {
    config: Config,
}

impl Scheduler {
    pub fn new(config: Config) -> Self {
        Scheduler { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run_schedule(&self, schedule_name: &str) -> Result<RunResult> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.run_schedule_async(schedule_name))
    }

    async fn run_schedule_async(&self, schedule_name: &str) -> Result<RunResult> {
        let schedule = self.schedule(schedule_name)?;
        if !schedule.enabled {
            warn!(
                "Schedule '{}' is disabled in config, running anyway on explicit request",
                schedule_name
            );
        }

        info!(
            "Running schedule '{}' with {} tasks (fail-fast: {})",
            schedule_name,
            schedule.tasks.len(),
            self.config.fail_fast
        );

        let runner = TaskRunner::new(&self.config);
        let started = Instant::now();
        let mut result = RunResult::new(schedule_name);

        for task_id in &schedule.tasks {
            let Some(task) = self.config.tasks.get(task_id) else {
                warn!(
                    "Skipping unknown task id '{}' in schedule '{}'",
                    task_id, schedule_name
                );
                continue;
            };

            let task_started = Instant::now();
            let (success, output) = runner.run_task(task_id).await;
            let runtime_seconds = task_started.elapsed().as_secs_f64();

            result.tasks_run.push(TaskResult {
                task_id: task_id.clone(),
                display_name: task.display_name.clone(),
                success,
                runtime_seconds,
                output: truncate_output(&output),
            });

            if success {
                result.success_count += 1;
            } else {
                result.failure_count += 1;
                result.errors.push(output);
                if task.required {
                    result
                        .summary
                        .critical_issues
                        .push(format!("Required task failed: {}", task.display_name));
                }
                if self.config.fail_fast {
                    warn!(
                        "Fail-fast: aborting schedule '{}' after failure of '{}'",
                        schedule_name, task_id
                    );
                    break;
                }
            }
        }

        result.total_runtime_seconds = started.elapsed().as_secs_f64();
        self.log_summary(&result);
        Ok(result)
    }

    /// Runs a single task by id, outside any schedule.
    pub fn run_task(&self, task_id: &str) -> Result<(bool, String)> {
        if !self.config.tasks.contains_key(task_id) {
            bail!("Unknown task id: '{}'", task_id);
        }
        let runtime = tokio::runtime::Runtime::new()?;
        let runner = TaskRunner::new(&self.config);
        Ok(runtime.block_on(runner.run_task(task_id)))
    }

    /// Prints the execution plan for a schedule without running anything.
    pub fn print_plan(&self, schedule_name: &str) {
        let Ok(schedule) = self.schedule(schedule_name) else {
            println!(
                "Unknown schedule '{}' (known: {})",
                schedule_name,
                self.known_schedules().join(", ")
            );
            return;
        };

        println!(
            "Execution plan for schedule '{}' (fail-fast: {}, cron: {}, timezone: {}):",
            schedule_name,
            if self.config.fail_fast { "on" } else { "off" },
            schedule.cron,
            schedule.timezone
        );
        for (i, task_id) in schedule.tasks.iter().enumerate() {
            match self.config.tasks.get(task_id) {
                Some(task) => {
                    println!("  {}. {} ({})", i + 1, task.display_name, task.id);
                    println!(
                        "     script: {}{}, timeout: {}{}",
                        task.script_path.display(),
                        task.interpreter
                            .as_deref()
                            .map(|interp| format!(" [{}]", interp))
                            .unwrap_or_default(),
                        format_duration(task.timeout),
                        if task.required { ", required" } else { "" }
                    );
                }
                None => println!("  {}. {} (unknown task id, will be skipped)", i + 1, task_id),
            }
        }
    }

    /// Prints the plan for a single-task run.
    pub fn print_task_plan(&self, task_id: &str) {
        match self.config.tasks.get(task_id) {
            Some(task) => {
                println!("Would run task '{}' ({})", task.display_name, task.id);
                println!(
                    "  script: {}{}, timeout: {}{}",
                    task.script_path.display(),
                    task.interpreter
                        .as_deref()
                        .map(|interp| format!(" [{}]", interp))
                        .unwrap_or_default(),
                    format_duration(task.timeout),
                    if task.required { ", required" } else { "" }
                );
            }
            None => println!("Unknown task id '{}'", task_id),
        }
    }

    fn schedule(&self, name: &str) -> Result<&ScheduleDefinition> {
        self.config
            .schedules
            .get(name)
            .ok_or_else(|| anyhow!("Unknown schedule: '{}'", name))
    }

    fn known_schedules(&self) -> Vec<String> {
        let mut names: Vec<String> = self.config.schedules.keys().cloned().collect();
        names.sort();
        names
    }

    fn log_summary(&self, result: &RunResult) {
        info!(
            "Schedule '{}' finished: {} succeeded, {} failed, total {}",
            result.schedule,
            result.success_count,
            result.failure_count,
            format_duration(Duration::from_secs_f64(result.total_runtime_seconds))
        );
        for task in &result.tasks_run {
            info!(
                "  [{}] {} ({})",
                if task.success { "PASS" } else { "FAIL" },
                task.display_name,
                format_duration(Duration::from_secs_f64(task.runtime_seconds))
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::CHANGE_DETECTION_TASK;
    use crate::config::TaskDefinition;
    use crate::utils::OUTPUT_LIMIT;
    use chrono::Utc;
    use tempfile::TempDir;

    fn shell_task(id: &str, dir: &TempDir, body: &str) -> TaskDefinition {
        let script = dir.path().join(format!("{id}.sh"));
        std::fs::write(&script, body).unwrap();
        TaskDefinition {
            id: id.to_string(),
            display_name: id.to_string(),
            description: String::new(),
            script_path: script,
            interpreter: Some("sh".to_string()),
            priority: 1,
            timeout: Duration::from_secs(10),
            required: false,
            extra_args: vec![],
        }
    }

    fn scheduler_with(
        dir: &TempDir,
        tasks: Vec<TaskDefinition>,
        order: Vec<&str>,
        fail_fast: bool,
    ) -> Scheduler {
        let state_file = dir.path().join("detection_state.json");
        std::fs::write(
            &state_file,
            format!(r#"{{"last_run": "{}"}}"#, Utc::now().to_rfc3339()),
        )
        .unwrap();

        let mut config = Config::resolve(None).unwrap();
        config.state_file = state_file;
        config.fail_fast = fail_fast;
        config.tasks = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        config
            .schedules
            .get_mut("daily")
            .unwrap()
            .tasks = order.into_iter().map(String::from).collect();
        Scheduler::new(config)
    }

    #[test]
    fn test_all_succeeding_schedule() {
        let dir = TempDir::new().unwrap();
        let tasks = vec![
            shell_task("a", &dir, "echo a"),
            shell_task("b", &dir, "echo b"),
            shell_task("c", &dir, "echo c"),
        ];
        let scheduler = scheduler_with(&dir, tasks, vec!["a", "b", "c"], true);

        let result = scheduler.run_schedule("daily").unwrap();
        assert_eq!(result.failure_count, 0);
        assert_eq!(result.success_count, 3);
        assert_eq!(result.tasks_run.len(), 3);
        assert!(result.errors.is_empty());
        assert_eq!(result.success_count + result.failure_count, result.tasks_run.len());
    }

    #[test]
    fn test_fail_fast_stops_at_first_failure() {
        let dir = TempDir::new().unwrap();
        let tasks = vec![
            shell_task("a", &dir, "echo a"),
            shell_task("b", &dir, "exit 1"),
            shell_task("c", &dir, "echo c"),
        ];
        let scheduler = scheduler_with(&dir, tasks, vec!["a", "b", "c"], true);

        let result = scheduler.run_schedule("daily").unwrap();
        assert_eq!(result.tasks_run.len(), 2);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count, 1);
        assert!(!result.tasks_run.iter().any(|t| t.task_id == "c"));
    }

    #[test]
    fn test_continue_on_error_runs_everything() {
        let dir = TempDir::new().unwrap();
        let tasks = vec![
            shell_task("a", &dir, "exit 1"),
            shell_task("b", &dir, "echo b"),
            shell_task("c", &dir, "exit 1"),
        ];
        let scheduler = scheduler_with(&dir, tasks, vec!["a", "b", "c"], false);

        let result = scheduler.run_schedule("daily").unwrap();
        assert_eq!(result.tasks_run.len(), 3);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count, 2);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_unknown_task_ids_are_skipped() {
        let dir = TempDir::new().unwrap();
        let tasks = vec![shell_task("a", &dir, "echo a")];
        let scheduler = scheduler_with(&dir, tasks, vec!["stale_id", "a"], true);

        let result = scheduler.run_schedule("daily").unwrap();
        assert_eq!(result.tasks_run.len(), 1);
        assert_eq!(result.tasks_run[0].task_id, "a");
        assert_eq!(result.failure_count, 0);
    }

    #[test]
    fn test_long_output_is_truncated_but_errors_are_raw() {
        let dir = TempDir::new().unwrap();
        // 1500 'x' chars on stderr, nonzero exit
        let tasks = vec![shell_task(
            "noisy",
            &dir,
            "printf 'x%.0s' $(seq 1500) >&2; exit 1",
        )];
        let scheduler = scheduler_with(&dir, tasks, vec!["noisy"], true);

        let result = scheduler.run_schedule("daily").unwrap();
        assert_eq!(result.failure_count, 1);
        let stored = &result.tasks_run[0].output;
        assert_eq!(stored.chars().count(), OUTPUT_LIMIT + 3);
        assert!(stored.ends_with("..."));
        // Raw error keeps the full text
        assert!(result.errors[0].chars().count() > OUTPUT_LIMIT + 3);
    }

    #[test]
    fn test_required_failure_is_a_critical_issue() {
        let dir = TempDir::new().unwrap();
        let mut task = shell_task("audit", &dir, "exit 1");
        task.required = true;
        task.display_name = "Security Audit".to_string();
        let scheduler = scheduler_with(&dir, vec![task], vec!["audit"], true);

        let result = scheduler.run_schedule("daily").unwrap();
        assert_eq!(
            result.summary.critical_issues,
            vec!["Required task failed: Security Audit"]
        );
    }

    #[test]
    fn test_unknown_schedule_is_an_error() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler_with(&dir, vec![], vec![], true);
        assert!(scheduler.run_schedule("hourly").is_err());
    }

    #[test]
    fn test_run_task_rejects_unknown_id() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler_with(&dir, vec![], vec![], true);
        assert!(scheduler.run_task("nope").is_err());
    }

    #[test]
    fn test_run_single_task() {
        let dir = TempDir::new().unwrap();
        let tasks = vec![shell_task(CHANGE_DETECTION_TASK, &dir, "echo ran")];
        let scheduler = scheduler_with(&dir, tasks, vec![], true);

        let (success, output) = scheduler.run_task(CHANGE_DETECTION_TASK).unwrap();
        assert!(success);
        assert_eq!(output.trim(), "ran");
    }

    #[test]
    fn test_end_to_end_fail_fast_with_missing_script() {
        let dir = TempDir::new().unwrap();
        let task_a = shell_task("taskA", &dir, "echo fine");
        let mut task_b = shell_task("taskB", &dir, "echo never");
        task_b.script_path = dir.path().join("missing_b.sh");
        let expected_error = format!("Script not found: {}", task_b.script_path.display());

        let scheduler = scheduler_with(&dir, vec![task_a, task_b], vec!["taskA", "taskB"], true);
        let result = scheduler.run_schedule("daily").unwrap();

        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.tasks_run.len(), 2);
        assert_eq!(result.errors, vec![expected_error]);
    }
}
