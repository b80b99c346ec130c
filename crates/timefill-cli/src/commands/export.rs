/// Report export command handler
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{Table, Tabled};
use timefill_core::{DateRangeResolver, ReportExporter, ReportSource, WorkCalendar};

use super::helpers::{format_duration, truncate_str};
use super::report_writer::{default_file_name, write_report, ReportFormat};
use super::AppContext;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Date phrase, e.g. "last month"
    #[arg(required = true, num_args = 1..)]
    phrase: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Csv)]
    format: ReportFormat,

    /// Output file, defaults to timesheet_report_<start>_<end>.<ext>
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Time")]
    time: String,
}

pub async fn handle_export_command(ctx: &AppContext, args: ExportArgs) -> Result<()> {
    let calendar = WorkCalendar::new(&ctx.settings.calendar);
    let range =
        DateRangeResolver::new(&calendar).resolve(&args.phrase.join(" "), AppContext::today())?;

    let clockify = ctx.clockify()?;
    let outcome = ReportExporter::new(&clockify, ctx.settings.report.duration_tolerance_seconds)
        .export(&range)
        .await?;
    let report = &outcome.report;

    if outcome.source() == ReportSource::Fallback {
        println!("Reports API unavailable, aggregated raw entries instead");
    }

    let mut rows: Vec<SummaryRow> = report
        .description_totals
        .iter()
        .map(|(description, seconds)| SummaryRow {
            description: truncate_str(description, 60),
            time: format_duration(*seconds),
        })
        .collect();
    rows.sort_by(|a, b| a.description.cmp(&b.description));
    if !rows.is_empty() {
        println!("{}", Table::new(rows));
    }
    println!(
        "\n{}: {} entries, {} total",
        range.label(),
        report.entry_count,
        format_duration(report.total_seconds)
    );

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(default_file_name(report, args.format)));
    log::info!("Writing {:?} report to {}", args.format, path.display());
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_report(report, args.format, &mut BufWriter::new(file))?;

    println!("Report written to {} ({})", path.display(), outcome.source().as_str());
    Ok(())
}
