/// Work status command handler
use anyhow::Result;
use timefill_core::work_status;

use super::AppContext;

pub async fn handle_status_command(ctx: &AppContext) -> Result<()> {
    let clockify = ctx.clockify()?;
    let status = work_status(&clockify, AppContext::today()).await?;

    let (Some(last), Some(days_behind)) = (status.last_entry, status.days_behind) else {
        println!("No time entries found in the last 30 days");
        return Ok(());
    };

    println!("Last entry: {last}");
    match days_behind {
        0 => println!("You're up to date!"),
        1 => println!("You're 1 day behind"),
        n => println!("You're {n} days behind"),
    }
    if days_behind > 0 {
        println!(
            "Consider generating tasks: timefill generate {last} to {}",
            AppContext::today()
        );
    }
    Ok(())
}
