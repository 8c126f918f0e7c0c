//! Paper Digest CLI - daily arXiv crawl, enrichment and vault output
//!
//! Command-line interface for the plugin pipeline.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use paper_digest_cli::commands;
use paper_digest_cli::commands::run::RunCommand;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "paper-digest",
    version,
    about = "Crawl, enrich and file arXiv papers through a plugin pipeline",
    after_help = "EXAMPLES:\n  \
                  # List plugins and presets\n  \
                  paper-digest plugins\n  \
                  paper-digest pipelines\n\n  \
                  # Run a preset for one day\n  \
                  paper-digest run --pipeline Request --datetime 20240102\n\n  \
                  # Run an explicit plugin list with an argument override\n  \
                  paper-digest run --plugins ArxivParser,GitHubLinkParser,ResultSaver \\\n      \
                  --set ArxivParser.num_retries=5\n\n  \
                  # Download papers ticked in the generated markdown\n  \
                  paper-digest run --pipeline DownloadByParsing --datetime 20240102"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a preset pipeline or an explicit plugin list
    Run(RunCommand),

    /// List available plugins
    Plugins,

    /// List built-in pipeline presets
    Pipelines,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match &cli.command {
        Commands::Plugins | Commands::Pipelines => Level::WARN,
        _ => {
            if cli.verbose {
                Level::DEBUG
            } else {
                Level::INFO
            }
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Run(cmd) => cmd.execute().await,
        Commands::Plugins => commands::plugins::list_plugins().await,
        Commands::Pipelines => commands::pipelines::list_pipelines().await,
    }
}
