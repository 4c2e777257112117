use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Use the library instead of redeclaring modules
use epg_forge::{config::Config, pipeline};

#[derive(Parser)]
#[command(name = "epg-forge")]
#[command(version)]
#[command(about = "Batch XMLTV consolidation: fetch, repair, merge, enrich and filter EPG feeds")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full batch: fetch every configured source and write one guide
    Run,

    /// Sanitize, load and enrich one document
    Transform {
        /// Source XMLTV file
        input: PathBuf,
        /// Destination file
        output: PathBuf,
    },

    /// Keep only allowlisted channels and their programmes
    Filter {
        /// Source XMLTV file
        input: PathBuf,
        /// Allowlist file, one channel id or display-name per line
        allowlist: PathBuf,
        /// Destination file
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_filter = format!("epg_forge={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting epg-forge v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli).await {
        error!("{e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), epg_forge::PipelineError> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run => {
            let report = pipeline::run_batch(&config).await?;
            info!(
                "batch complete: {}/{} sources, {} channels, {} programmes",
                report.sources_loaded,
                report.sources_loaded + report.sources_failed,
                report.channels,
                report.programmes
            );
        }
        Command::Transform { input, output } => {
            pipeline::transform_file(&config, &input, &output)?;
            info!("transformed {} -> {}", input.display(), output.display());
        }
        Command::Filter {
            input,
            allowlist,
            output,
        } => {
            pipeline::filter_file(&input, &allowlist, &output)?;
            info!("filtered {} -> {}", input.display(), output.display());
        }
    }
    Ok(())
}
