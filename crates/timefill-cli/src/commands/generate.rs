/// Task generation command handler
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{Table, Tabled};
use timefill_core::{Importer, Workflow};

use super::helpers::{format_duration, truncate_str, write_tasks_csv};
use super::AppContext;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Date phrase, e.g. "last 2 weeks"
    #[arg(required = true, num_args = 1..)]
    phrase: Vec<String>,

    /// GitHub repository (owner/name), defaults to DEFAULT_GITHUB_REPO
    #[arg(short, long)]
    repo: Option<String>,

    /// Write generated tasks to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Create the generated tasks in Clockify
    #[arg(long)]
    import: bool,

    /// With --import, show what would be created without creating it
    #[arg(short = 'n', long)]
    dry_run: bool,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Billable")]
    billable: &'static str,
}

pub async fn handle_generate_command(ctx: &AppContext, args: GenerateArgs) -> Result<()> {
    let phrase = args.phrase.join(" ");
    let clockify = ctx.clockify()?;
    let github = ctx.github()?;
    let gemini = ctx.gemini()?;

    let outcome = Workflow::new(&clockify, &github, &gemini, &ctx.settings)
        .with_default_repository(ctx.credentials.default_github_repo.clone())
        .plan(&phrase, args.repo.as_deref(), AppContext::today())
        .await?;

    println!(
        "{}: {} business days, {} existing entries, {} gap day(s)",
        outcome.range.label(),
        outcome.range.business_days.len(),
        outcome.existing_entries,
        outcome.gaps.len()
    );

    if outcome.gaps.is_empty() {
        println!("Nothing to fill.");
        return Ok(());
    }
    if outcome.commits.is_empty() {
        println!("No commits found for the gap days.");
        return Ok(());
    }
    if let Some(model) = &outcome.model {
        println!("{} commit(s), model {model}", outcome.commits.len());
    }

    let rows: Vec<TaskRow> = outcome
        .tasks
        .iter()
        .map(|task| TaskRow {
            date: task.target_day.to_string(),
            time: match (task.start, task.end()) {
                (Some(start), Some(end)) => {
                    format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
                }
                _ => String::new(),
            },
            duration: format_duration(task.estimated.num_seconds()),
            description: truncate_str(&task.description, 60),
            billable: if task.billable { "yes" } else { "no" },
        })
        .collect();
    println!("\n{}", Table::new(rows));

    if !outcome.unscheduled.is_empty() {
        log::warn!("{} task(s) did not fit the gap days", outcome.unscheduled.len());
    }
    for task in &outcome.unscheduled {
        println!("Unscheduled: {} ({})", task.description, task.target_day);
    }

    if let Some(path) = &args.output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_tasks_csv(&outcome.tasks, &mut BufWriter::new(file))?;
        println!("\nTasks written to {}", path.display());
    }

    if args.import || args.dry_run {
        let report = Importer::new(&clockify, ctx.credentials.clockify_project_id.clone())
            .dry_run(args.dry_run)
            .import(&outcome.tasks)
            .await;
        super::import::print_import_report(&report);
    }

    Ok(())
}
