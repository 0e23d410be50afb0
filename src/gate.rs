use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use log::debug;
use serde::Deserialize;
use std::path::PathBuf;

/// How old the last change-detection run may be before dependent tasks are
/// refused.
const MAX_DETECTION_AGE_HOURS: i64 = 24;

#[derive(Deserialize)]
struct DetectionState {
    last_run: String,
}

/// Decides whether a task's prerequisite — a sufficiently recent
/// change-detection run — is satisfied. Fails closed: a missing state file,
/// a missing field or an unparsable timestamp all count as unsatisfied.
pub struct DependencyGate {
    state_file: PathBuf,
}

impl DependencyGate {
    pub fn new(state_file: PathBuf) -> Self {
        Self { state_file }
    }

    pub fn dependencies_satisfied(&self, task_id: &str) -> bool {
        // Nothing gates the root of the dependency graph
        if task_id == crate::config::defaults::CHANGE_DETECTION_TASK {
            return true;
        }

        let Some(last_run) = self.last_detection_run() else {
            debug!(
                "No usable detection state at {}, treating dependencies of '{}' as unsatisfied",
                self.state_file.display(),
                task_id
            );
            return false;
        };

        let age = Utc::now().signed_duration_since(last_run);
        let satisfied = age < TimeDelta::hours(MAX_DETECTION_AGE_HOURS);
        debug!(
            "Last change detection ran at {last_run}, {} h ago, dependencies of '{}' {}",
            age.num_hours(),
            task_id,
            if satisfied { "satisfied" } else { "unsatisfied" }
        );
        satisfied
    }

    fn last_detection_run(&self) -> Option<DateTime<Utc>> {
        let content = std::fs::read_to_string(&self.state_file).ok()?;
        let state: DetectionState = serde_json::from_str(&content).ok()?;
        parse_timestamp(&state.last_run)
    }
}

/// The change-detection task writes either an RFC 3339 timestamp or a naive
/// local one; accept both.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
}
