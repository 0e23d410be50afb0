use anyhow::Result;
use chrono::Local;
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::logging::{LogOutput, LoggingConfig};

/// Duplicates every log record to the day file and to stdout, so task
/// attempts always land in both places.
struct TeeWriter {
    file: std::fs::File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        io::stdout().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        io::stdout().flush()
    }
}

/// One file per day; rotation happens by filename.
fn day_log_path(dir: &Path) -> PathBuf {
    dir.join(format!("maintenance_{}.log", Local::now().format("%Y%m%d")))
}

/// Initializes the process-wide logger. Called exactly once, from main;
/// the scheduler and dispatcher only use the `log` macros.
pub fn setup_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        config.level.parse::<LevelFilter>()?
    };

    match &config.output {
        LogOutput::Stdout => {
            env_logger::Builder::new()
                .filter_level(level)
                .format_timestamp_secs()
                .init();
        }
        LogOutput::File => {
            let dir = config.dir.clone().unwrap_or_else(|| PathBuf::from("logs"));
            std::fs::create_dir_all(&dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(day_log_path(&dir))?;

            // Records still reach the console through the tee
            env_logger::Builder::new()
                .filter_level(level)
                .format_timestamp_secs()
                .target(env_logger::Target::Pipe(Box::new(TeeWriter { file })))
                .init();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_day_log_path_is_date_stamped() {
        let path = day_log_path(Path::new("logs"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("maintenance_"));
        assert!(name.ends_with(".log"));
        // maintenance_YYYYMMDD.log
        assert_eq!(name.len(), "maintenance_.log".len() + 8);
    }

    #[test]
    fn test_tee_writer_records_to_the_day_file() {
        let dir = TempDir::new().unwrap();
        let path = day_log_path(dir.path());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();

        let mut tee = TeeWriter { file };
        let written = tee.write(b"INFO Starting task 'Security Audit'\n").unwrap();
        tee.write(b"INFO Task 'Security Audit' completed\n").unwrap();
        tee.flush().unwrap();

        assert_eq!(written, "INFO Starting task 'Security Audit'\n".len());
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("Starting task 'Security Audit'"));
    }
}
