/// Gap listing command handler
use anyhow::Result;
use tabled::{Table, Tabled};
use timefill_core::{list_overlapping, DateRangeResolver, GapAnalyzer, WorkCalendar};

use super::helpers::format_duration;
use super::AppContext;

#[derive(Tabled)]
struct GapRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Weekday")]
    weekday: String,
    #[tabled(rename = "Logged")]
    logged: String,
}

pub async fn handle_gaps_command(ctx: &AppContext, phrase: &str) -> Result<()> {
    let calendar = WorkCalendar::new(&ctx.settings.calendar);
    let range = DateRangeResolver::new(&calendar).resolve(phrase, AppContext::today())?;

    let clockify = ctx.clockify()?;
    let entries = list_overlapping(&clockify, &range).await?;

    let gaps = GapAnalyzer::new(ctx.settings.gaps.min_expected_seconds)
        .find_gaps(&range.business_days, &entries);

    println!(
        "{}: {} business days, {} entries",
        range.label(),
        range.business_days.len(),
        entries.len()
    );

    if gaps.is_empty() {
        println!("No gaps found.");
        return Ok(());
    }

    let rows: Vec<GapRow> = gaps
        .iter()
        .map(|gap| GapRow {
            date: gap.day.date.to_string(),
            weekday: gap.day.weekday.to_string(),
            logged: format_duration(gap.logged_seconds),
        })
        .collect();

    println!("\n{}", Table::new(rows));
    println!("\n{} gap day(s)", gaps.len());
    Ok(())
}
