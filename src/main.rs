use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "vulneval")]
#[command(about = "Normalize security scan reports and evaluate generated policies")]
#[command(version)]
struct Cli {
    /// Working directory (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw scan reports into the canonical vulnerability dataset
    Normalize {
        /// Directory containing raw tool reports
        #[arg(long)]
        input: PathBuf,

        /// Output JSON file for the canonical dataset
        #[arg(long)]
        output: PathBuf,
    },

    /// Score generated policy collections against the reference collection
    Evaluate {
        /// Directory with generated policy files (*_policies.json)
        #[arg(long)]
        generated: PathBuf,

        /// Reference policy collection file
        #[arg(long)]
        reference: PathBuf,

        /// Output JSON metrics file, keyed by model name
        #[arg(long)]
        output: PathBuf,

        /// Also run the rubric judge (requires an API key)
        #[arg(long)]
        judge: bool,

        /// Restrict evaluation to these model names
        #[arg(long)]
        model: Vec<String>,
    },

    /// Initialize a default .vulneval/config.toml
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Normalize { input, output } => {
            cli::normalize::normalize_command(&input, &output)?;
        }
        Commands::Evaluate {
            generated,
            reference,
            output,
            judge,
            model,
        } => {
            cli::evaluate::evaluate_command(&work_dir, &generated, &reference, &output, judge, &model)
                .await?;
        }
        Commands::Init { force } => {
            cli::init::init_command(&work_dir, force)?;
        }
    }

    Ok(())
}
