use log::{error, info};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::Config;
use crate::gate::DependencyGate;
use crate::utils::format_duration;

/// Executes one task's script as a subprocess with a timeout. Every outcome
/// is normalized to `(success, output)`; nothing in here returns an error to
/// the schedule driver.
pub struct TaskRunner<'a> {
    config: &'a Config,
    gate: DependencyGate,
}

impl<'a> TaskRunner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            gate: DependencyGate::new(config.state_file.clone()),
            config,
        }
    }

    /// Runs a single task to completion. The task id must exist in the
    /// registry; the schedule driver checks membership before calling.
    pub async fn run_task(&self, task_id: &str) -> (bool, String) {
        let task = &self.config.tasks[task_id];

        info!("Starting task '{}' ({})", task.display_name, task.id);

        if !self.gate.dependencies_satisfied(task_id) {
            let msg = format!("Dependencies not satisfied for {}", task_id);
            error!("{}", msg);
            return (false, msg);
        }

        let script = resolve_script_path(&task.script_path);
        if !script.exists() {
            let msg = format!("Script not found: {}", script.display());
            error!("Task '{}' failed: {}", task.display_name, msg);
            return (false, msg);
        }

        let mut cmd = match &task.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&script);
                cmd
            }
            None => Command::new(&script),
        };
        cmd.args(&task.extra_args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Dropping the timed-out future must take the child down with it
        cmd.kill_on_drop(true);

        let started = std::time::Instant::now();
        match timeout(task.timeout, cmd.output()).await {
            Err(_) => {
                let msg = format!("Task timed out: {}", task.display_name);
                error!(
                    "{} (limit {})",
                    msg,
                    format_duration(task.timeout)
                );
                (false, msg)
            }
            Ok(Err(e)) => {
                let msg = format!("Task execution failed: {} - {}", task.display_name, e);
                error!("{}", msg);
                (false, msg)
            }
            Ok(Ok(output)) => {
                if output.status.success() {
                    info!(
                        "Task '{}' completed in {}",
                        task.display_name,
                        format_duration(started.elapsed())
                    );
                    (true, String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    let msg = format!("Task failed: {} - {}", task.display_name, stderr);
                    error!("{} (exit {:?})", msg, output.status.code());
                    (false, msg)
                }
            }
        }
    }
}

fn resolve_script_path(script_path: &std::path::Path) -> PathBuf {
    if script_path.is_absolute() {
        script_path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_default()
            .join(script_path)
    }
}
