//! Helper utility functions for CLI commands

use std::io::Write;

use anyhow::Result;
use timefill_ai::{GeneratedTask, TASK_CSV_HEADER};

/// Safely truncate a string to a maximum number of characters (not bytes).
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Escape a string for CSV format
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// `5400` -> `1h 30m`
pub fn format_duration(seconds: i64) -> String {
    let minutes = seconds.max(0) / 60;
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Seconds as decimal hours with two places
#[allow(clippy::cast_precision_loss)]
pub fn format_hours(seconds: i64) -> String {
    format!("{:.2}", seconds as f64 / 3600.0)
}

/// Write tasks in the same CSV shape the importer reads
pub fn write_tasks_csv<W: Write>(tasks: &[GeneratedTask], out: &mut W) -> Result<()> {
    writeln!(out, "{TASK_CSV_HEADER}")?;
    for task in tasks {
        let start = task.start.map(|t| t.format("%H:%M").to_string()).unwrap_or_default();
        let end = task.end().map(|t| t.format("%H:%M").to_string()).unwrap_or_default();
        writeln!(
            out,
            "{},{start},{end},{},{},{},{}",
            task.target_day,
            escape_csv(&task.description),
            escape_csv(&task.project_name),
            escape_csv(&task.task_name),
            task.billable
        )?;
    }
    Ok(())
}
