/// CSV import command handler
use std::path::Path;

use anyhow::Result;
use timefill_core::{load_task_csv, ImportReport, Importer};

use super::AppContext;

pub async fn handle_import_command(ctx: &AppContext, file: &Path, dry_run: bool) -> Result<()> {
    let tasks = load_task_csv(file)?;
    log::info!("Loaded {} tasks from {}", tasks.len(), file.display());
    if tasks.is_empty() {
        println!("No tasks found in {}", file.display());
        return Ok(());
    }

    let clockify = ctx.clockify()?;
    let report = Importer::new(&clockify, ctx.credentials.clockify_project_id.clone())
        .dry_run(dry_run)
        .import(&tasks)
        .await;

    print_import_report(&report);
    Ok(())
}

pub fn print_import_report(report: &ImportReport) {
    let verb = if report.dry_run { "Would import" } else { "Imported" };
    println!(
        "\n{verb} {}/{} entries ({} failed)",
        report.successful, report.total_entries, report.failed
    );
    for error in &report.errors {
        println!("  - {error}");
    }
}
