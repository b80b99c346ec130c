/// GitHub repository listing command handler
use anyhow::Result;
use tabled::{Table, Tabled};

use super::helpers::truncate_str;
use super::AppContext;

#[derive(Tabled)]
struct RepoRow {
    #[tabled(rename = "Repository")]
    full_name: String,
    #[tabled(rename = "Visibility")]
    visibility: &'static str,
    #[tabled(rename = "Description")]
    description: String,
}

pub async fn handle_repos_command(ctx: &AppContext) -> Result<()> {
    if ctx.credentials.github_token.is_none() {
        anyhow::bail!("Listing repositories requires GITHUB_API_KEY in the credentials file");
    }

    let github = ctx.github()?;
    let repos = github.list_repositories().await?;

    if repos.is_empty() {
        println!("No repositories found.");
        return Ok(());
    }

    let rows: Vec<RepoRow> = repos
        .into_iter()
        .map(|repo| RepoRow {
            visibility: if repo.private { "private" } else { "public" },
            description: truncate_str(repo.description.as_deref().unwrap_or_default(), 50),
            full_name: repo.full_name,
        })
        .collect();

    println!("{}", Table::new(rows));
    if let Some(default) = &ctx.credentials.default_github_repo {
        println!("\nDefault repository: {default}");
    }
    Ok(())
}
