/// Model ranking command handler
use anyhow::Result;
use tabled::{Table, Tabled};
use timefill_ai::{rank, TextGenerator};

use super::AppContext;

#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Score")]
    score: u64,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Tier")]
    tier: &'static str,
    #[tabled(rename = "Thinking")]
    thinking: &'static str,
}

pub async fn handle_models_command(ctx: &AppContext) -> Result<()> {
    let gemini = ctx.gemini()?;
    let models = gemini.list_models().await?;

    let ranked = rank(&models);
    let Some(best) = ranked.first() else {
        println!("No generation models available.");
        return Ok(());
    };
    let best = best.identifier.clone();

    let rows: Vec<ModelRow> = ranked
        .into_iter()
        .map(|candidate| ModelRow {
            version: format!(
                "{}.{}",
                candidate.capabilities.major, candidate.capabilities.minor
            ),
            tier: candidate.capabilities.tier.as_str(),
            thinking: if candidate.capabilities.thinking { "yes" } else { "" },
            score: candidate.score,
            model: candidate.identifier,
        })
        .collect();

    println!("{}", Table::new(rows));
    println!("\nSelected: {best}");
    Ok(())
}
