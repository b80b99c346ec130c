//! Workflow coordinator
//!
//! Chains the components for one phrase and repository:
//! range -> existing entries -> gaps -> commits -> model -> tasks -> schedule.
//! Every collaborator failure is wrapped with the operation and interval.

use chrono::{Days, NaiveDate, NaiveTime};
use serde::Serialize;
use timefill_ai::{select_best, GeneratedTask, TaskGenerator, TextGenerator, WorkPreferences};
use timefill_integrations::{Commit, CommitSource, TimeEntry, TimeTracking};

use crate::config::Settings;
use crate::date_range::{DateRange, DateRangeResolver, WorkCalendar};
use crate::error::{Result, TimefillError};
use crate::gap_analyzer::{Gap, GapAnalyzer};
use crate::scheduler::Scheduler;

const STATUS_LOOKBACK_DAYS: u64 = 30;
/// The tracker filters listings by entry start; entries running past
/// midnight into the range start at most this many days earlier
const LISTING_LEAD_DAYS: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkflowStep {
    ResolveRange,
    ListEntries,
    FindGaps,
    FetchCommits,
    SelectModel,
    GenerateTasks,
    ScheduleTasks,
}

/// Everything a `plan` run produced, including how far it got
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub range: DateRange,
    pub existing_entries: usize,
    pub gaps: Vec<Gap>,
    pub commits: Vec<Commit>,
    pub model: Option<String>,
    pub tasks: Vec<GeneratedTask>,
    pub unscheduled: Vec<GeneratedTask>,
    pub steps_completed: Vec<WorkflowStep>,
}

impl WorkflowOutcome {
    fn new(range: DateRange) -> Self {
        Self {
            range,
            existing_entries: 0,
            gaps: Vec::new(),
            commits: Vec::new(),
            model: None,
            tasks: Vec::new(),
            unscheduled: Vec::new(),
            steps_completed: vec![WorkflowStep::ResolveRange],
        }
    }

    #[must_use]
    pub fn gap_dates(&self) -> Vec<NaiveDate> {
        self.gaps.iter().map(|gap| gap.day.date).collect()
    }
}

/// Most recent logged day over the look-back window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkStatus {
    pub last_entry: Option<NaiveDate>,
    pub days_behind: Option<i64>,
}

pub struct Workflow<'a> {
    tracker: &'a dyn TimeTracking,
    commits: &'a dyn CommitSource,
    generator: &'a dyn TextGenerator,
    settings: &'a Settings,
    default_repository: Option<String>,
}

impl<'a> Workflow<'a> {
    #[must_use]
    pub fn new(
        tracker: &'a dyn TimeTracking,
        commits: &'a dyn CommitSource,
        generator: &'a dyn TextGenerator,
        settings: &'a Settings,
    ) -> Self {
        Self {
            tracker,
            commits,
            generator,
            settings,
            default_repository: None,
        }
    }

    #[must_use]
    pub fn with_default_repository(mut self, repository: Option<String>) -> Self {
        self.default_repository = repository;
        self
    }

    /// Resolve `phrase`, find gaps and fill them with scheduled tasks
    ///
    /// Stops early (successfully) when there are no gaps or no commits.
    ///
    /// # Errors
    ///
    /// Returns an input error for a bad phrase or missing repository, an
    /// upstream error when a service fails, or `NoCandidates` when no model
    /// is available
    pub async fn plan(
        &self,
        phrase: &str,
        repository: Option<&str>,
        today: NaiveDate,
    ) -> Result<WorkflowOutcome> {
        let repository = repository
            .map(ToString::to_string)
            .or_else(|| self.default_repository.clone())
            .ok_or_else(|| {
                TimefillError::MissingInput(
                    "no repository given and DEFAULT_GITHUB_REPO is not set".to_string(),
                )
            })?;

        let calendar = WorkCalendar::new(&self.settings.calendar);
        let range = DateRangeResolver::new(&calendar).resolve(phrase, today)?;
        let mut outcome = WorkflowOutcome::new(range);

        let entries = list_overlapping(self.tracker, &outcome.range).await?;
        outcome.existing_entries = entries.len();
        outcome.steps_completed.push(WorkflowStep::ListEntries);

        let analyzer = GapAnalyzer::new(self.settings.gaps.min_expected_seconds);
        outcome.gaps = analyzer.find_gaps(&outcome.range.business_days, &entries);
        outcome.steps_completed.push(WorkflowStep::FindGaps);

        let gap_dates = outcome.gap_dates();
        let (Some(first), Some(last)) = (gap_dates.first(), gap_dates.last()) else {
            log::info!("No gaps in {}, nothing to fill", outcome.range.label());
            return Ok(outcome);
        };

        let since = first.and_time(NaiveTime::default()).and_utc();
        let until = last
            .and_hms_opt(23, 59, 59)
            .map_or(since, |t| t.and_utc());
        outcome.commits = self
            .commits
            .list_commits(&repository, since, until)
            .await
            .map_err(|e| {
                TimefillError::upstream("list commits", format!("{repository} {first}..{last}"), e)
            })?;
        outcome.steps_completed.push(WorkflowStep::FetchCommits);

        if outcome.commits.is_empty() {
            log::info!("No commits in {repository} for {first}..{last}");
            return Ok(outcome);
        }

        let models = self
            .generator
            .list_models()
            .await
            .map_err(|e| TimefillError::upstream("list models", self.generator.provider_name(), e))?;
        let model = select_best(&models)?.identifier;
        outcome.model = Some(model.clone());
        outcome.steps_completed.push(WorkflowStep::SelectModel);

        let preferences = WorkPreferences {
            daily_hours: self.settings.schedule.daily_hours,
            meetings_per_week: self.settings.schedule.meetings_per_week,
        };
        let tasks = TaskGenerator::new(self.generator, model.clone(), preferences)
            .generate(&outcome.commits, &gap_dates)
            .await
            .map_err(|e| TimefillError::upstream("generate tasks", model, e))?;
        outcome.steps_completed.push(WorkflowStep::GenerateTasks);

        let schedule = Scheduler::new(&self.settings.schedule).schedule(tasks, &gap_dates);
        outcome.tasks = schedule.tasks;
        outcome.unscheduled = schedule.unscheduled;
        outcome.steps_completed.push(WorkflowStep::ScheduleTasks);

        Ok(outcome)
    }
}

/// Entries overlapping `range`, including ones carried over from the previous evening
///
/// # Errors
///
/// Returns an upstream error if the entries cannot be listed
pub async fn list_overlapping(tracker: &dyn TimeTracking, range: &DateRange) -> Result<Vec<TimeEntry>> {
    let (start, end) = range.utc_bounds();
    let lead_start = range
        .start
        .checked_sub_days(Days::new(LISTING_LEAD_DAYS))
        .map_or(start, |day| day.and_time(NaiveTime::default()).and_utc());

    let mut entries = tracker
        .list_entries(lead_start, end)
        .await
        .map_err(|e| TimefillError::upstream("list time entries", range.label(), e))?;
    entries.retain(|entry| entry.end > start || entry.start >= start);

    log::debug!("{} entries overlap {}", entries.len(), range.label());
    Ok(entries)
}

/// Last logged day within the previous 30 days and how far behind `today` it is
///
/// # Errors
///
/// Returns an upstream error if the entries cannot be listed
pub async fn work_status(tracker: &dyn TimeTracking, today: NaiveDate) -> Result<WorkStatus> {
    let from = today
        .checked_sub_days(Days::new(STATUS_LOOKBACK_DAYS))
        .unwrap_or(today);
    let start = from.and_time(NaiveTime::default()).and_utc();
    let end = today
        .and_hms_opt(23, 59, 59)
        .map_or(start, |t| t.and_utc());

    let entries = tracker
        .list_entries(start, end)
        .await
        .map_err(|e| TimefillError::upstream("list time entries", format!("{from}..{today}"), e))?;

    let last_entry = entries.iter().map(|e| e.start.date_naive()).max();
    let days_behind = last_entry.map(|last| (today - last).num_days());

    Ok(WorkStatus {
        last_entry,
        days_behind,
    })
}
