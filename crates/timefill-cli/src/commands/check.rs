/// Connection check command handler
use anyhow::Result;
use timefill_ai::TextGenerator;
use timefill_integrations::TimeTracking;

use super::AppContext;

fn report(name: &str, result: Result<bool>) -> bool {
    match result {
        Ok(true) => {
            println!("  {name:<10} ok");
            true
        }
        Ok(false) => {
            println!("  {name:<10} rejected credentials");
            false
        }
        Err(e) => {
            println!("  {name:<10} failed: {e:#}");
            false
        }
    }
}

pub async fn handle_check_command(ctx: &AppContext) -> Result<()> {
    println!("Testing API connections...\n");

    let clockify = ctx.clockify()?;
    let mut healthy = report("Clockify", clockify.validate_credentials().await);

    if ctx.credentials.github_token.is_some() {
        let github = ctx.github()?;
        match github.current_login().await {
            Ok(login) => println!("  {:<10} ok (signed in as {login})", "GitHub"),
            Err(e) => {
                println!("  {:<10} failed: {e:#}", "GitHub");
                healthy = false;
            }
        }
    } else {
        println!("  {:<10} no GITHUB_API_KEY, public repositories only", "GitHub");
    }

    let gemini = ctx.gemini()?;
    let models = gemini.list_models().await.map(|models| !models.is_empty());
    healthy &= report("Gemini", models);

    if healthy {
        println!("\nAll connections working.");
    } else {
        println!("\nSome connections failed; check your credentials file.");
    }
    Ok(())
}
