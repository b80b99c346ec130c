//! Task Generator
//!
//! Turns commit history into timesheet tasks by prompting a generative-text
//! model for CSV rows (`date,start,end,description,projectName,taskName,billable`)
//! and parsing whatever comes back. Model output is treated as untrusted:
//! fences, headers and comment lines are stripped and malformed rows skipped.

use std::collections::BTreeSet;
use std::fmt::Write;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveTime};
use timefill_integrations::Commit;

use crate::ai_provider::TextGenerator;

/// Header line of the task CSV format
pub const TASK_CSV_HEADER: &str = "date,start,end,description,projectName,taskName,billable";

const MAX_PROMPT_COMMITS: usize = 20;
const DEFAULT_PROJECT: &str = "Development";
const DEFAULT_TASK: &str = "General";

/// Working preferences passed to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkPreferences {
    pub daily_hours: u32,
    pub meetings_per_week: u32,
}

impl Default for WorkPreferences {
    fn default() -> Self {
        Self {
            daily_hours: 8,
            meetings_per_week: 2,
        }
    }
}

/// Task produced from commits, not yet written to the time tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTask {
    pub target_day: NaiveDate,
    pub description: String,
    pub estimated: Duration,
    /// Start time-of-day; `None` until the scheduler places the task
    pub start: Option<NaiveTime>,
    pub project_name: String,
    pub task_name: String,
    pub billable: bool,
    pub is_meeting: bool,
}

impl GeneratedTask {
    /// Create an unscheduled task
    #[must_use]
    pub fn new(target_day: NaiveDate, description: String, estimated: Duration) -> Self {
        Self {
            target_day,
            description,
            estimated,
            start: None,
            project_name: DEFAULT_PROJECT.to_string(),
            task_name: DEFAULT_TASK.to_string(),
            billable: true,
            is_meeting: false,
        }
    }

    /// End time-of-day, when the task has a start
    #[must_use]
    pub fn end(&self) -> Option<NaiveTime> {
        self.start.map(|start| start + self.estimated)
    }

    /// Estimated duration in hours (rounded to 2 decimal places)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn estimated_hours(&self) -> f64 {
        (self.estimated.num_seconds() as f64 / 3600.0 * 100.0).round() / 100.0
    }
}

/// Generates tasks from commits through a text model
pub struct TaskGenerator<'a> {
    provider: &'a dyn TextGenerator,
    model: String,
    preferences: WorkPreferences,
}

impl<'a> TaskGenerator<'a> {
    #[must_use]
    pub fn new(provider: &'a dyn TextGenerator, model: String, preferences: WorkPreferences) -> Self {
        Self {
            provider,
            model,
            preferences,
        }
    }

    /// Ask the model for tasks covering `target_days` and keep those that land on one
    ///
    /// # Errors
    ///
    /// Returns an error if the model request fails
    pub async fn generate(
        &self,
        commits: &[Commit],
        target_days: &[NaiveDate],
    ) -> Result<Vec<GeneratedTask>> {
        if commits.is_empty() || target_days.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = build_prompt(commits, target_days, self.preferences);
        let response = self
            .provider
            .generate(&self.model, &prompt)
            .await
            .with_context(|| format!("Task generation with {} failed", self.model))?;

        let wanted: BTreeSet<NaiveDate> = target_days.iter().copied().collect();
        let parsed = parse_task_csv(&response);
        let total = parsed.len();
        let tasks: Vec<GeneratedTask> = parsed
            .into_iter()
            .filter(|task| wanted.contains(&task.target_day))
            .collect();

        if tasks.len() < total {
            log::warn!(
                "Dropped {} generated task(s) outside the requested days",
                total - tasks.len()
            );
        }
        log::info!("Model {} produced {} task(s)", self.model, tasks.len());
        Ok(tasks)
    }
}

/// Build the task-generation prompt
#[must_use]
pub fn build_prompt(
    commits: &[Commit],
    target_days: &[NaiveDate],
    preferences: WorkPreferences,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "Based on the following GitHub commits, create a detailed task list in CSV format \
         suitable for time tracking.\n\n",
    );
    prompt.push_str("Working parameters:\n");
    let _ = writeln!(prompt, "- Daily working hours: {} hours", preferences.daily_hours);
    let _ = writeln!(
        prompt,
        "- Weekly meetings: {} meetings (scheduled separately, do not include them)",
        preferences.meetings_per_week
    );
    prompt.push_str("- Estimate realistic time for each development task\n");

    let days: Vec<String> = target_days.iter().map(ToString::to_string).collect();
    let _ = writeln!(prompt, "- Only use these dates: {}\n", days.join(", "));

    prompt.push_str("GitHub Commits:\n");
    for (i, commit) in commits.iter().take(MAX_PROMPT_COMMITS).enumerate() {
        let _ = writeln!(
            prompt,
            "{}. {} - {} (by {})",
            i + 1,
            commit.timestamp.format("%Y-%m-%d"),
            commit.summary(),
            commit.author
        );
    }

    let _ = write!(
        prompt,
        "\nPlease generate a CSV with the following columns:\n{TASK_CSV_HEADER}\n\n\
         Guidelines:\n\
         - Break down commits into logical development tasks\n\
         - Estimate appropriate time for each task (coding usually takes 2-4 hours, testing 1-2 hours)\n\
         - Include code reviews, testing, and documentation time\n\
         - Use format: date (YYYY-MM-DD), start (HH:MM), end (HH:MM)\n\
         - Make descriptions professional and do not use commas inside them\n\
         - Set billable to true for development work\n\
         - Spread tasks across the listed dates realistically\n\n\
         Return ONLY the CSV data without any additional text or formatting.\n"
    );

    prompt
}

/// Split one CSV line, honouring double-quoted fields
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn clean_description(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Parse one data row; `None` (with a warning) when it cannot be used
fn parse_row(line: &str) -> Option<GeneratedTask> {
    let mut fields = split_csv_line(line);
    if fields.len() < 4 {
        log::warn!("Skipping task row with {} column(s): {line}", fields.len());
        return None;
    }

    // Unquoted commas inside the description spill into extra columns
    if fields.len() > 7 {
        let extra = fields.len() - 7;
        let joined = fields[3..=3 + extra].join(",");
        fields.splice(3..=3 + extra, [joined]);
    }

    let Ok(target_day) = NaiveDate::parse_from_str(&fields[0], "%Y-%m-%d") else {
        log::warn!("Skipping task row with invalid date '{}'", fields[0]);
        return None;
    };

    let (start, estimated) = match (fields[1].as_str(), fields[2].as_str()) {
        ("", "") => (None, Duration::hours(1)),
        (start, end) => match (parse_time(start), parse_time(end)) {
            (Some(start), Some(end)) if end > start => (Some(start), end - start),
            _ => {
                log::warn!("Skipping task row with invalid times '{start}'-'{end}'");
                return None;
            }
        },
    };

    let description = clean_description(&fields[3]);
    if description.is_empty() {
        log::warn!("Skipping task row without description: {line}");
        return None;
    }

    let mut task = GeneratedTask::new(target_day, description, estimated);
    task.start = start;
    if let Some(project) = fields.get(4).filter(|p| !p.is_empty()) {
        task.project_name.clone_from(project);
    }
    if let Some(name) = fields.get(5).filter(|t| !t.is_empty()) {
        task.task_name.clone_from(name);
    }
    if let Some(billable) = fields.get(6).filter(|b| !b.is_empty()) {
        task.billable = billable.eq_ignore_ascii_case("true");
    }
    task.is_meeting = task.task_name.to_lowercase().contains("meeting")
        || task.description.to_lowercase().contains("meeting");

    Some(task)
}

/// Parse task CSV (model output or a file in the same shape)
#[must_use]
pub fn parse_task_csv(text: &str) -> Vec<GeneratedTask> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("```"))
        .filter(|line| !line.to_lowercase().starts_with("date,"))
        .filter_map(parse_row)
        .collect()
}
