pub mod defaults;
pub mod file;
pub mod logging;
pub mod timeunit;
pub mod validation;

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use self::file::{ConfigFile, ScheduleEntry, TaskEntry};
use self::logging::LoggingConfig;

/// Fully resolved configuration: built-in defaults with any file overrides
/// already applied. Read-only for the rest of the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub tasks: HashMap<String, TaskDefinition>,
    pub schedules: HashMap<String, ScheduleDefinition>,
    pub fail_fast: bool,
    pub reports_dir: PathBuf,
    pub state_file: PathBuf,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub script_path: PathBuf,
    /// Program the script is passed to. None means the script file is
    /// executed directly.
    pub interpreter: Option<String>,
    pub priority: u32,
    pub timeout: Duration,
    pub required: bool,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ScheduleDefinition {
    pub name: String,
    /// Ordered task ids; execution follows this list as written.
    pub tasks: Vec<String>,
    pub enabled: bool,
    /// Descriptive only, consumed by the external OS scheduler.
    pub cron: String,
    pub timezone: Tz,
}

/// Loads the scheduler configuration. A missing or malformed config file is
/// tolerated (defaults are used); a structurally invalid one — a new task
/// without a script path, an unparsable timezone — is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_file = match path {
        Some(path) => match file::read_config_file(path) {
            Ok(file) => Some(file),
            Err(e) => {
                // The logger may not be initialized yet at this point
                eprintln!(
                    "warning: ignoring config file {}: {:#}",
                    path.display(),
                    e
                );
                None
            }
        },
        None => None,
    };

    Config::resolve(config_file)
}

impl Config {
    pub fn resolve(config_file: Option<ConfigFile>) -> Result<Self> {
        let mut tasks: HashMap<String, TaskDefinition> = defaults::default_tasks()
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        let mut schedules: HashMap<String, ScheduleDefinition> = defaults::default_schedules()
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();

        let mut config = Config {
            tasks: HashMap::new(),
            schedules: HashMap::new(),
            fail_fast: true,
            reports_dir: defaults::DEFAULT_REPORTS_DIR.into(),
            state_file: defaults::DEFAULT_STATE_FILE.into(),
            logging: LoggingConfig::default(),
        };

        if let Some(file) = config_file {
            for entry in file.tasks {
                match tasks.get_mut(&entry.id) {
                    Some(task) => task
                        .apply(entry)
                        .context("Invalid task override")?,
                    None => {
                        let task = TaskDefinition::from_entry(entry)?;
                        tasks.insert(task.id.clone(), task);
                    }
                }
            }

            for (name, entry) in file.schedules {
                match schedules.get_mut(&name) {
                    Some(schedule) => schedule.apply(entry)?,
                    None => {
                        let schedule = ScheduleDefinition::from_entry(name, entry)?;
                        schedules.insert(schedule.name.clone(), schedule);
                    }
                }
            }

            // fail_fast wins when both flags are present
            config.fail_fast = file
                .fail_fast
                .or(file.continue_on_error.map(|c| !c))
                .unwrap_or(true);
            if let Some(dir) = file.reports_dir {
                config.reports_dir = dir;
            }
            if let Some(state) = file.state_file {
                config.state_file = state;
            }
            if let Some(logging) = file.logging {
                config.logging = logging;
            }
        }

        config.tasks = tasks;
        config.schedules = schedules;
        Ok(config)
    }
}

impl TaskDefinition {
    fn apply(&mut self, entry: TaskEntry) -> Result<()> {
        let TaskEntry {
            id: _,
            display_name,
            description,
            script_path,
            interpreter,
            priority,
            timeout,
            required,
            extra_args,
        } = entry;

        if let Some(v) = display_name {
            self.display_name = v;
        }
        if let Some(v) = description {
            self.description = v;
        }
        if let Some(v) = script_path {
            self.script_path = v;
        }
        if let Some(v) = interpreter {
            self.interpreter = Some(v);
        }
        if let Some(v) = priority {
            self.priority = v;
        }
        if let Some(v) = timeout {
            self.timeout = v.resolve()?;
        }
        if let Some(v) = required {
            self.required = v;
        }
        if let Some(v) = extra_args {
            self.extra_args = v;
        }
        Ok(())
    }

    fn from_entry(entry: TaskEntry) -> Result<Self> {
        let TaskEntry {
            id,
            display_name,
            description,
            script_path,
            interpreter,
            priority,
            timeout,
            required,
            extra_args,
        } = entry;

        let Some(script_path) = script_path else {
            bail!("Task '{}' is missing 'script_path'", id);
        };

        Ok(Self {
            display_name: display_name.unwrap_or_else(|| id.clone()),
            description: description.unwrap_or_default(),
            script_path,
            interpreter,
            priority: priority.unwrap_or(10),
            timeout: match timeout {
                Some(t) => t.resolve()?,
                None => Duration::from_secs(300),
            },
            required: required.unwrap_or(false),
            extra_args: extra_args.unwrap_or_default(),
            id,
        })
    }
}

impl ScheduleDefinition {
    fn apply(&mut self, entry: ScheduleEntry) -> Result<()> {
        if let Some(v) = entry.tasks {
            self.tasks = v;
        }
        if let Some(v) = entry.enabled {
            self.enabled = v;
        }
        if let Some(v) = entry.cron {
            self.cron = v;
        }
        if let Some(v) = entry.timezone {
            self.timezone = parse_timezone(&v)?;
        }
        Ok(())
    }

    fn from_entry(name: String, entry: ScheduleEntry) -> Result<Self> {
        let Some(tasks) = entry.tasks else {
            bail!("Schedule '{}' is missing 'tasks'", name);
        };

        Ok(Self {
            tasks,
            enabled: entry.enabled.unwrap_or(true),
            cron: entry.cron.unwrap_or_default(),
            timezone: match entry.timezone {
                Some(tz) => parse_timezone(&tz)?,
                None => defaults::system_timezone(),
            },
            name,
        })
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    match name.parse() {
        Ok(tz) => Ok(tz),
        Err(_) => bail!("Unable to parse timezone: '{}'", name),
    }
}
