use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use review_worker::config::WorkerConfig;
use review_worker::tools;
use review_worker::worker::{ReviewJob, Worker};

#[derive(Parser, Debug)]
#[command(author, version, about = "Code-review worker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a review job from a JSON file and print the outcome.
    Run {
        /// Path to the job payload.
        #[arg(long)]
        job: PathBuf,

        /// Worker configuration file (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List registered tools and whether their dependencies are installed.
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { job, config } => {
            let config = WorkerConfig::load(config.as_deref())?;
            let raw = std::fs::read_to_string(&job)
                .with_context(|| format!("reading job {}", job.display()))?;
            let job: ReviewJob = serde_json::from_str(&raw)
                .with_context(|| "parsing job payload")?;

            info!(
                files = job.review.files().len(),
                tool_runs = job.tool_runs.len(),
                "starting review job"
            );

            let worker = Worker::new(config);
            let outcome = worker.run_job(job).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Tools => {
            let settings = tools::Settings::new();
            for name in tools::tool_names() {
                if let Some(tool) = tools::create_tool(name, &settings) {
                    let ready = if tool.check_dependencies() {
                        "ready"
                    } else {
                        "missing dependencies"
                    };
                    println!("{:<12} {:<22} {}", tool.name(), ready, tool.description());
                }
            }
        }
    }

    Ok(())
}
