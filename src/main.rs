mod alerts;
mod config;
mod gate;
mod logging;
mod report;
mod runner;
mod scheduler;
mod utils;

use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;

use alerts::AlertConfig;
use config::validation::{validate_config, ValidationResult};
use report::RunResult;
use scheduler::Scheduler;
use utils::format_duration;

#[derive(Parser, Debug)]
#[command(version, about = "Maintenance automation for development environments", long_about = None)]
struct Args {
    /// Path to the scheduler config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the alert config file (JSON)
    #[arg(long)]
    alert_config: Option<PathBuf>,

    /// Run a single task by id instead of a schedule
    #[arg(short, long)]
    task: Option<String>,

    /// Schedule to run (daily, weekly or monthly)
    #[arg(short, long, default_value = "daily")]
    schedule: String,

    /// Print the execution plan without running anything
    #[arg(long)]
    dry_run: bool,

    /// Raise the log level to debug
    #[arg(short, long)]
    verbose: bool,

    /// Print config validation results
    #[arg(long)]
    validate: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = config::load_config(args.config.as_deref())?;

    logging::setup_logging(&config.logging, args.verbose)?;

    let alert_config = AlertConfig::load(args.alert_config.as_deref());

    if args.validate {
        let info = validate_config(&config, &alert_config);

        for msg in &info {
            match msg {
                ValidationResult::Error(m) => {
                    error!("{}", m);
                }
                ValidationResult::Warning(m) => {
                    warn!("{}", m);
                }
            }
        }

        if info.is_empty() {
            info!("Configuration is valid");
        }
    }

    let scheduler = Scheduler::new(config);

    if args.dry_run {
        match &args.task {
            Some(task_id) => scheduler.print_task_plan(task_id),
            None => scheduler.print_plan(&args.schedule),
        }
        return Ok(());
    }

    if let Some(task_id) = &args.task {
        let (success, output) = scheduler.run_task(task_id)?;
        if success {
            let trimmed = output.trim_end();
            if !trimmed.is_empty() {
                println!("{}", trimmed);
            }
            return Ok(());
        }
        eprintln!("{}", output);
        std::process::exit(1);
    }

    let result = scheduler.run_schedule(&args.schedule)?;

    match report::save_report(&scheduler.config().reports_dir, &result) {
        Some(path) => {
            info!("Report saved to {}", path.display());
            match alerts::check_results_and_alert(&path, &alert_config) {
                Ok(true) => {}
                Ok(false) => warn!("One or more alert channels failed"),
                Err(e) => error!("Alert evaluation failed: {:#}", e),
            }
        }
        None => warn!("Report was not saved, skipping alert evaluation"),
    }

    print_summary(&result);

    if result.failure_count > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(result: &RunResult) {
    println!(
        "\nMaintenance summary for schedule '{}' ({} succeeded, {} failed, total {})",
        result.schedule,
        result.success_count,
        result.failure_count,
        format_duration(Duration::from_secs_f64(result.total_runtime_seconds))
    );
    for task in &result.tasks_run {
        println!(
            "  [{}] {} ({})",
            if task.success { "PASS" } else { "FAIL" },
            task.display_name,
            format_duration(Duration::from_secs_f64(task.runtime_seconds))
        );
    }
    if !result.summary.critical_issues.is_empty() {
        println!("\nCritical Issues:");
        for issue in &result.summary.critical_issues {
            println!("  - {}", issue);
        }
    }
}
