use chrono_tz::Tz;
use std::time::Duration;

use super::{ScheduleDefinition, TaskDefinition};

/// Root of the dependency graph; every other task is gated on its state file.
pub const CHANGE_DETECTION_TASK: &str = "change_detection";

/// Task whose output carries the `vulnerabilities_found` count.
pub const DEPENDENCY_CHECK_TASK: &str = "dependency_check";

pub const DEFAULT_REPORTS_DIR: &str = "tools/monitoring/reports";
pub const DEFAULT_STATE_FILE: &str = "detection_state.json";

/// The built-in task registry. Priorities are informational; execution order
/// comes from each schedule's explicit task list.
pub fn default_tasks() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition {
            id: CHANGE_DETECTION_TASK.to_string(),
            display_name: "Change Detection".to_string(),
            description: "Detect source and dependency changes since the last run".to_string(),
            script_path: "scripts/change_detection.sh".into(),
            interpreter: Some("sh".to_string()),
            priority: 1,
            timeout: Duration::from_secs(300),
            required: true,
            extra_args: vec![],
        },
        TaskDefinition {
            id: "security_audit".to_string(),
            display_name: "Security Audit".to_string(),
            description: "Scan the working tree for insecure patterns and leaked secrets".to_string(),
            script_path: "scripts/security_audit.sh".into(),
            interpreter: Some("sh".to_string()),
            priority: 2,
            timeout: Duration::from_secs(600),
            required: true,
            extra_args: vec![],
        },
        TaskDefinition {
            id: DEPENDENCY_CHECK_TASK.to_string(),
            display_name: "Dependency Check".to_string(),
            description: "Check third-party dependencies against known vulnerability databases".to_string(),
            script_path: "scripts/dependency_check.sh".into(),
            interpreter: Some("sh".to_string()),
            priority: 3,
            timeout: Duration::from_secs(900),
            required: false,
            extra_args: vec![],
        },
        TaskDefinition {
            id: "log_review".to_string(),
            display_name: "Log Review".to_string(),
            description: "Summarize warnings and errors from recent tool logs".to_string(),
            script_path: "scripts/log_review.sh".into(),
            interpreter: Some("sh".to_string()),
            priority: 4,
            timeout: Duration::from_secs(300),
            required: false,
            extra_args: vec![],
        },
        TaskDefinition {
            id: "backup_verification".to_string(),
            display_name: "Backup Verification".to_string(),
            description: "Verify that recent backups exist and are readable".to_string(),
            script_path: "scripts/backup_verification.sh".into(),
            interpreter: Some("sh".to_string()),
            priority: 5,
            timeout: Duration::from_secs(600),
            required: false,
            extra_args: vec![],
        },
    ]
}

/// The built-in schedules. Cron expressions and timezones are descriptive
/// metadata for the external OS scheduler, never evaluated here.
pub fn default_schedules() -> Vec<ScheduleDefinition> {
    let tz = system_timezone();
    vec![
        ScheduleDefinition {
            name: "daily".to_string(),
            tasks: vec![
                CHANGE_DETECTION_TASK.to_string(),
                "security_audit".to_string(),
                "log_review".to_string(),
            ],
            enabled: true,
            cron: "0 2 * * *".to_string(),
            timezone: tz,
        },
        ScheduleDefinition {
            name: "weekly".to_string(),
            tasks: vec![
                CHANGE_DETECTION_TASK.to_string(),
                "security_audit".to_string(),
                DEPENDENCY_CHECK_TASK.to_string(),
                "backup_verification".to_string(),
            ],
            enabled: true,
            cron: "0 3 * * 0".to_string(),
            timezone: tz,
        },
        ScheduleDefinition {
            name: "monthly".to_string(),
            tasks: vec![
                CHANGE_DETECTION_TASK.to_string(),
                "security_audit".to_string(),
                DEPENDENCY_CHECK_TASK.to_string(),
                "backup_verification".to_string(),
                "log_review".to_string(),
            ],
            enabled: true,
            cron: "0 4 1 * *".to_string(),
            timezone: tz,
        },
    ]
}

pub fn system_timezone() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse().ok())
        .unwrap_or(chrono_tz::UTC)
}
