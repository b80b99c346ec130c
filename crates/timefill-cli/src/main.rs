mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use timefill_core::CREDENTIALS_FILE;

use commands::export::ExportArgs;
use commands::generate::GenerateArgs;
use commands::AppContext;

#[derive(Parser)]
#[command(name = "timefill")]
#[command(about = "Fill timesheet gaps from commit history", long_about = None)]
struct Cli {
    /// Credentials file (KEY=value lines)
    #[arg(long, global = true, env = "TIMEFILL_CREDENTIALS", default_value = CREDENTIALS_FILE)]
    credentials: PathBuf,

    /// Settings file (TOML), defaults to <config dir>/timefill/settings.toml
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Test connections to Clockify, GitHub and Gemini
    Check,
    /// Show the last logged day and how far behind you are
    Status,
    /// List business days without logged time
    Gaps {
        /// Date phrase, e.g. "last 2 weeks" or "2025-03-03 to 2025-03-07"
        #[arg(required = true, num_args = 1..)]
        phrase: Vec<String>,
    },
    /// Rank available Gemini models
    Models,
    /// Generate tasks for gap days from GitHub commits
    Generate(GenerateArgs),
    /// Import tasks from a CSV file into Clockify
    Import {
        /// CSV file (date,start,end,description,projectName,taskName,billable)
        file: PathBuf,
        /// Show what would be imported without creating entries
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Export a work report
    Export(ExportArgs),
    /// List your GitHub repositories
    Repos,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let ctx = AppContext::load(&cli.credentials, cli.settings.as_deref())?;

    match cli.command {
        Commands::Check => commands::check::handle_check_command(&ctx).await,
        Commands::Status => commands::status::handle_status_command(&ctx).await,
        Commands::Gaps { phrase } => {
            commands::gaps::handle_gaps_command(&ctx, &phrase.join(" ")).await
        }
        Commands::Models => commands::models::handle_models_command(&ctx).await,
        Commands::Generate(args) => commands::generate::handle_generate_command(&ctx, args).await,
        Commands::Import { file, dry_run } => {
            commands::import::handle_import_command(&ctx, &file, dry_run).await
        }
        Commands::Export(args) => commands::export::handle_export_command(&ctx, args).await,
        Commands::Repos => commands::repos::handle_repos_command(&ctx).await,
    }
}
