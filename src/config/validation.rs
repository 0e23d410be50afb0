use std::collections::HashSet;
use std::time::Duration;

use crate::alerts::AlertConfig;
use crate::config::Config;

#[derive(Debug, Clone)]
pub enum ValidationResult {
    Error(String),
    Warning(String),
}

/// Sanity-checks the resolved configuration. Findings are advisory: the run
/// proceeds either way, and stale schedule entries are tolerated at run time.
pub fn validate_config(config: &Config, alerts: &AlertConfig) -> Vec<ValidationResult> {
    let mut result = vec![];

    for task in config.tasks.values() {
        if task.display_name.is_empty() {
            result.push(ValidationResult::Warning(format!(
                "Task '{}' has an empty display name",
                task.id
            )));
        }
        if task.script_path.as_os_str().is_empty() {
            result.push(ValidationResult::Error(format!(
                "Task '{}': script path must not be empty",
                task.id
            )));
        }
        if task.timeout < Duration::from_secs(1) {
            result.push(ValidationResult::Error(format!(
                "Task '{}': timeout must be at least 1 second",
                task.id
            )));
        }
        if let Some(interpreter) = &task.interpreter {
            if interpreter.is_empty() {
                result.push(ValidationResult::Error(format!(
                    "Task '{}': interpreter must not be an empty string",
                    task.id
                )));
            }
        }
    }

    for schedule in config.schedules.values() {
        if schedule.tasks.is_empty() {
            result.push(ValidationResult::Warning(format!(
                "Schedule '{}' has no tasks",
                schedule.name
            )));
        }

        let mut seen = HashSet::new();
        for task_id in &schedule.tasks {
            if !config.tasks.contains_key(task_id) {
                result.push(ValidationResult::Warning(format!(
                    "Schedule '{}' references unknown task '{}', it will be skipped at run time",
                    schedule.name, task_id
                )));
            }
            if !seen.insert(task_id) {
                result.push(ValidationResult::Warning(format!(
                    "Schedule '{}' lists task '{}' more than once",
                    schedule.name, task_id
                )));
            }
        }
    }

    let valid_levels = ["error", "warn", "info", "debug", "trace", "off"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        result.push(ValidationResult::Error(format!(
            "Invalid log level '{}'. Must be one of: {}",
            config.logging.level,
            valid_levels.join(", ")
        )));
    }

    let email = &alerts.channels.email;
    if email.enabled {
        if email.smtp_server.is_empty() {
            result.push(ValidationResult::Warning(
                "Email alerts are enabled but no SMTP server is configured".to_string(),
            ));
        }
        if email.recipients.is_empty() {
            result.push(ValidationResult::Warning(
                "Email alerts are enabled but no recipients are configured".to_string(),
            ));
        }
    }
    if alerts.channels.slack.enabled && alerts.channels.slack.webhook_url.is_empty() {
        result.push(ValidationResult::Warning(
            "Slack alerts are enabled but no webhook URL is configured".to_string(),
        ));
    }

    result
}
