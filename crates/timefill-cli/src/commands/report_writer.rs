//! Report writers for exported work reports

use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use timefill_core::WorkReport;

use super::helpers::{escape_csv, format_hours};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Default output file name for a report
pub fn default_file_name(report: &WorkReport, format: ReportFormat) -> String {
    format!(
        "timesheet_report_{}_{}.{}",
        report.start.format("%Y%m%d"),
        report.end.format("%Y%m%d"),
        format.extension()
    )
}

pub fn write_report<W: Write>(report: &WorkReport, format: ReportFormat, out: &mut W) -> Result<()> {
    match format {
        ReportFormat::Csv => write_csv(report, out),
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report).context("Failed to serialize report")?;
            writeln!(out)?;
            Ok(())
        }
    }
}

/// Entry rows, then per-day and per-description totals
fn write_csv<W: Write>(report: &WorkReport, out: &mut W) -> Result<()> {
    writeln!(out, "Date,Start,End,Description,Project,Billable,Hours")?;
    for row in &report.rows {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            row.date,
            row.start.format("%H:%M"),
            row.end.format("%H:%M"),
            escape_csv(&row.description),
            escape_csv(row.project_id.as_deref().unwrap_or_default()),
            row.billable,
            format_hours(row.seconds)
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Date,Total Hours")?;
    for (date, seconds) in &report.daily_totals {
        writeln!(out, "{date},{}", format_hours(*seconds))?;
    }

    writeln!(out)?;
    writeln!(out, "Description,Total Hours")?;
    for (description, seconds) in &report.description_totals {
        writeln!(out, "{},{}", escape_csv(description), format_hours(*seconds))?;
    }

    writeln!(out)?;
    writeln!(out, "Total,{}", format_hours(report.total_seconds))?;
    Ok(())
}
