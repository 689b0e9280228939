use clap::{Args, Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use yt_trend_report::api::build_rocket;
use yt_trend_report::config::{create_app_state, init_logger, load_environment, PipelineConfig};
use yt_trend_report::models::RunSummary;
use yt_trend_report::services::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "yt-trend-report")]
#[command(about = "YouTube trend collection, analysis and reporting pipeline", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct RunArgs {
    /// YouTube search query (defaults to SEARCH_QUERY)
    #[arg(long)]
    query: Option<String>,

    /// Skip email sending
    #[arg(long)]
    skip_email: bool,

    /// Email recipient address (defaults to GMAIL_RECIPIENT)
    #[arg(long)]
    recipient: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rerun analysis, report and email on a previously exported CSV
    Report {
        /// Path to the CSV export
        #[arg(long)]
        csv: PathBuf,

        /// Skip email sending
        #[arg(long)]
        skip_email: bool,

        /// Email recipient address (defaults to GMAIL_RECIPIENT)
        #[arg(long)]
        recipient: Option<String>,
    },

    /// Start the web interface
    Serve,
}

fn exit_code(summary: &RunSummary) -> ExitCode {
    if summary.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[rocket::main]
async fn main() -> ExitCode {
    load_environment();
    init_logger();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env();
    if let Err(e) = config.ensure_directories() {
        error!("{e:#}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        None => {
            let mut pipeline = Pipeline::new(config);
            let summary = pipeline
                .run_full_pipeline(
                    !cli.run.skip_email,
                    cli.run.query.as_deref(),
                    cli.run.recipient.as_deref(),
                )
                .await;
            exit_code(&summary)
        }
        Some(Commands::Report {
            csv,
            skip_email,
            recipient,
        }) => {
            let mut pipeline = Pipeline::new(config);
            let summary = pipeline
                .run_from_csv(&csv, !skip_email, recipient.as_deref())
                .await;
            exit_code(&summary)
        }
        Some(Commands::Serve) => {
            let rocket = match create_app_state(config).and_then(build_rocket) {
                Ok(rocket) => rocket,
                Err(e) => {
                    error!("Failed to set up web interface: {e:#}");
                    return ExitCode::FAILURE;
                }
            };
            info!("Starting web interface");
            match rocket.launch().await {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("Rocket failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
