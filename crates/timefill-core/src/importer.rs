//! Importer
//!
//! Writes scheduled tasks back to the time tracker, one request at a time.
//! Failures are collected per task and never abort the batch.

use std::fs;
use std::path::Path;

use serde::Serialize;
use timefill_ai::{parse_task_csv, GeneratedTask};
use timefill_integrations::{NewTimeEntry, TimeTracking};

use crate::error::{Result, TimefillError};

/// Outcome of an import batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub total_entries: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub dry_run: bool,
}

impl ImportReport {
    fn record_success(&mut self) {
        self.successful += 1;
    }

    fn record_failure(&mut self, task: &GeneratedTask, reason: &str) {
        self.failed += 1;
        self.errors
            .push(format!("{} '{}': {reason}", task.target_day, task.description));
    }
}

/// Convert a scheduled task into a create-entry payload
///
/// Returns `None` for tasks without a start time.
#[must_use]
pub fn to_new_entry(task: &GeneratedTask, project_id: &str) -> Option<NewTimeEntry> {
    let start = task.target_day.and_time(task.start?).and_utc();
    Some(NewTimeEntry {
        start,
        end: start + task.estimated,
        description: task.description.clone(),
        project_id: Some(project_id.to_string()),
        billable: task.billable,
    })
}

/// Read tasks from a CSV file (`date,start,end,description,projectName,taskName,billable`)
///
/// # Errors
///
/// Returns `UnreadableFile` if the file cannot be read
pub fn load_task_csv(path: &Path) -> Result<Vec<GeneratedTask>> {
    let contents = fs::read_to_string(path).map_err(|e| TimefillError::UnreadableFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let tasks = parse_task_csv(&contents);
    log::info!("Read {} task(s) from {}", tasks.len(), path.display());
    Ok(tasks)
}

pub struct Importer<'a> {
    tracker: &'a dyn TimeTracking,
    project_id: String,
    dry_run: bool,
}

impl<'a> Importer<'a> {
    #[must_use]
    pub fn new(tracker: &'a dyn TimeTracking, project_id: String) -> Self {
        Self {
            tracker,
            project_id,
            dry_run: false,
        }
    }

    /// Count and validate without calling the time tracker
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Create one entry per task
    pub async fn import(&self, tasks: &[GeneratedTask]) -> ImportReport {
        let mut report = ImportReport {
            total_entries: tasks.len(),
            dry_run: self.dry_run,
            ..ImportReport::default()
        };

        for task in tasks {
            let Some(entry) = to_new_entry(task, &self.project_id) else {
                report.record_failure(task, "no start time");
                continue;
            };

            if self.dry_run {
                log::info!(
                    "[dry-run] Would create {} {}-{} {}",
                    task.target_day,
                    entry.start.format("%H:%M"),
                    entry.end.format("%H:%M"),
                    entry.description
                );
                report.record_success();
                continue;
            }

            match self.tracker.create_entry(&entry).await {
                Ok(()) => report.record_success(),
                Err(e) => {
                    log::warn!("Failed to import '{}': {e:#}", task.description);
                    report.record_failure(task, &format!("{e:#}"));
                }
            }
        }

        log::info!(
            "Import finished via {}: {}/{} successful",
            self.tracker.system_name(),
            report.successful,
            report.total_entries
        );
        report
    }
}
