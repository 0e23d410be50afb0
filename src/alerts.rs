use anyhow::{bail, Result};
use chrono::Utc;
use lettre::message::{MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{error, info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::defaults::DEPENDENCY_CHECK_TASK;
use crate::report::{self, RunResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Critical,
    High,
    Warning,
    Info,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertLevel::Critical => "CRITICAL",
            AlertLevel::High => "HIGH",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Info => "INFO",
        };
        f.write_str(name)
    }
}

impl AlertLevel {
    fn ansi_color(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "\x1b[1;31m", // bold red
            AlertLevel::High => "\x1b[31m",       // red
            AlertLevel::Warning => "\x1b[33m",    // yellow
            AlertLevel::Info => "\x1b[36m",       // cyan
        }
    }

    fn slack_color(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "danger",
            AlertLevel::High => "#e06000",
            AlertLevel::Warning => "warning",
            AlertLevel::Info => "good",
        }
    }
}

/// An ephemeral notification derived from a run result. Only its dispatch
/// side effects persist.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AlertConfig {
    pub channels: ChannelConfig,
    pub rules: RuleConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ChannelConfig {
    pub console: ConsoleChannel,
    pub file: FileChannel,
    pub email: EmailChannel,
    pub slack: SlackChannel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleChannel {
    pub enabled: bool,
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileChannel {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for FileChannel {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("logs/alerts.log"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailChannel {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub recipients: Vec<String>,
}

impl Default for EmailChannel {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: 587,
            username: None,
            password: None,
            from: "codesentinel@localhost".to_string(),
            recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlackChannel {
    pub enabled: bool,
    pub webhook_url: String,
    pub channel: String,
    pub username: String,
}

impl Default for SlackChannel {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: String::new(),
            channel: "#maintenance".to_string(),
            username: "CodeSentinel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub task_failures: bool,
    pub critical_security_issues: bool,
    pub dependency_vulnerabilities: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            task_failures: true,
            critical_security_issues: true,
            dependency_vulnerabilities: true,
        }
    }
}

impl AlertConfig {
    /// Loads the alert configuration. Missing or malformed files fall back
    /// to defaults with a logged warning.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Ignoring alert config {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Ignoring malformed alert config {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}

/// Evaluates the alert rules over a run result. Rules are independent and
/// contribute at most one alert each, in declaration order: task failures,
/// critical security issues, dependency vulnerabilities.
pub fn evaluate_rules(result: &RunResult, rules: &RuleConfig) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if rules.task_failures && result.failure_count > 0 {
        alerts.push(Alert {
            level: AlertLevel::Warning,
            title: "Maintenance Task Failures".to_string(),
            message: format!(
                "{} maintenance tasks failed in the '{}' schedule",
                result.failure_count, result.schedule
            ),
            details: json!({
                "schedule": result.schedule,
                "failure_count": result.failure_count,
                "errors": result.errors,
            }),
        });
    }

    if rules.critical_security_issues && !result.summary.critical_issues.is_empty() {
        alerts.push(Alert {
            level: AlertLevel::Critical,
            title: "Critical Security Issues".to_string(),
            message: format!(
                "{} critical issues require immediate attention",
                result.summary.critical_issues.len()
            ),
            details: json!({
                "schedule": result.schedule,
                "issues": result.summary.critical_issues,
            }),
        });
    }

    if rules.dependency_vulnerabilities {
        if let Some(count) = vulnerability_count(result) {
            if count > 0 {
                alerts.push(Alert {
                    level: AlertLevel::High,
                    title: "Dependency Vulnerabilities".to_string(),
                    message: format!("{} known vulnerabilities found in dependencies", count),
                    details: json!({
                        "schedule": result.schedule,
                        "vulnerabilities_found": count,
                    }),
                });
            }
        }
    }

    alerts
}

/// Reads the dependency-check task's structured output. The script reports
/// JSON with a `vulnerabilities_found` integer; when the marker is present
/// but the output does not parse, assume at least one vulnerability rather
/// than dropping the alert.
fn vulnerability_count(result: &RunResult) -> Option<u64> {
    let task = result
        .tasks_run
        .iter()
        .find(|t| t.task_id == DEPENDENCY_CHECK_TASK)?;
    if !task.output.contains("vulnerabilities_found") {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(&task.output) {
        Ok(value) => value
            .get("vulnerabilities_found")
            .and_then(|v| v.as_u64())
            .or(Some(1)),
        Err(_) => Some(1),
    }
}

/// Fans an alert out to every enabled channel. Channel failures are logged
/// and isolated: one channel going down never blocks the others, and there
/// is no retry or queueing.
pub struct AlertDispatcher {
    config: AlertConfig,
}

impl AlertDispatcher {
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }

    /// Returns true iff every enabled channel accepted the alert.
    pub fn send(&self, alert: &Alert) -> bool {
        let mut all_ok = true;

        if self.config.channels.console.enabled {
            if let Err(e) = self.send_console(alert) {
                error!("Console alert failed: {:#}", e);
                all_ok = false;
            }
        }
        if self.config.channels.file.enabled {
            if let Err(e) = self.send_file(alert) {
                error!("File alert failed: {:#}", e);
                all_ok = false;
            }
        }
        if self.config.channels.email.enabled {
            if let Err(e) = self.send_email(alert) {
                error!("Email alert failed: {:#}", e);
                all_ok = false;
            }
        }
        if self.config.channels.slack.enabled {
            if let Err(e) = self.send_slack(alert) {
                error!("Slack alert failed: {:#}", e);
                all_ok = false;
            }
        }

        all_ok
    }

    /// Returns true iff every alert was sent on every enabled channel.
    pub fn send_all(&self, alerts: &[Alert]) -> bool {
        let mut all_ok = true;
        for alert in alerts {
            if !self.send(alert) {
                all_ok = false;
            }
        }
        all_ok
    }

    fn send_console(&self, alert: &Alert) -> Result<()> {
        println!(
            "{}[{}] {}\x1b[0m",
            alert.level.ansi_color(),
            alert.level,
            alert.title
        );
        println!("  {}", alert.message);
        Ok(())
    }

    fn send_file(&self, alert: &Alert) -> Result<()> {
        use std::io::Write;

        let path = &self.config.channels.file.path;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(
            file,
            "{} [{}] {}: {}",
            Utc::now().to_rfc3339(),
            alert.level,
            alert.title,
            alert.message
        )?;
        Ok(())
    }

    fn send_email(&self, alert: &Alert) -> Result<()> {
        let cfg = &self.config.channels.email;
        let email = build_email_message(cfg, alert)?;

        let mut mailer = SmtpTransport::starttls_relay(&cfg.smtp_server)?.port(cfg.smtp_port);
        if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
            mailer = mailer.credentials(Credentials::new(username.clone(), password.clone()));
        }
        mailer.build().send(&email)?;

        info!(
            "Email alert '{}' sent to {} recipients",
            alert.title,
            cfg.recipients.len()
        );
        Ok(())
    }

    fn send_slack(&self, alert: &Alert) -> Result<()> {
        let cfg = &self.config.channels.slack;
        let payload = json!({
            "channel": cfg.channel,
            "username": cfg.username,
            "attachments": [{
                "color": alert.level.slack_color(),
                "title": alert.title,
                "text": alert.message,
                "fields": [
                    {"title": "Level", "value": alert.level.to_string(), "short": true},
                    {"title": "Time", "value": Utc::now().to_rfc3339(), "short": true},
                ],
            }],
        });

        let response = Client::new().post(&cfg.webhook_url).json(&payload).send()?;
        if response.status().as_u16() != 200 {
            bail!("Slack webhook returned status {}", response.status());
        }

        info!("Slack alert '{}' posted to {}", alert.title, cfg.channel);
        Ok(())
    }
}

/// Renders the fixed plaintext template as a multipart message.
fn build_email_message(cfg: &EmailChannel, alert: &Alert) -> Result<Message> {
    if cfg.recipients.is_empty() {
        bail!("No email recipients configured");
    }

    let body = format!(
        "Maintenance Alert\n\nLevel: {}\nTitle: {}\n\n{}\n\nTime: {}\n\nDetails:\n{}\n",
        alert.level,
        alert.title,
        alert.message,
        Utc::now().to_rfc3339(),
        serde_json::to_string_pretty(&alert.details)?
    );

    let mut builder = Message::builder()
        .from(cfg.from.parse()?)
        .subject(format!("[{}] {}", alert.level, alert.title));
    for recipient in &cfg.recipients {
        builder = builder.to(recipient.parse()?);
    }

    let email = builder.multipart(MultiPart::mixed().singlepart(SinglePart::plain(body)))?;
    Ok(email)
}

/// Legacy file-based entry point: loads a saved run-result report, evaluates
/// the rules and dispatches whatever they produce. Returns whether every
/// dispatch succeeded.
pub fn check_results_and_alert(path: &Path, config: &AlertConfig) -> Result<bool> {
    let result = report::load_report(path)?;
    let alerts = evaluate_rules(&result, &config.rules);

    if alerts.is_empty() {
        info!("No alert rules triggered for {}", path.display());
        return Ok(true);
    }

    info!(
        "{} alert(s) triggered for {}",
        alerts.len(),
        path.display()
    );
    let dispatcher = AlertDispatcher::new(config.clone());
    Ok(dispatcher.send_all(&alerts))
}
