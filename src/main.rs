mod cli;
mod core;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};

use crate::core::config::AppConfig;

#[derive(Parser)]
#[command(name = "awscost", about = "AWS daily cost report CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// First day of the report range (default: yesterday)
    #[arg(long, global = true)]
    start_date: Option<NaiveDate>,

    /// Last day of the report range, inclusive (default: start date)
    #[arg(long, global = true)]
    end_date: Option<NaiveDate>,

    /// Directory for the JSON/CSV artifacts
    #[arg(long, global = true, default_value = ".")]
    output_dir: PathBuf,

    /// Destination S3 bucket (falls back to the config file)
    #[arg(long, global = true, env = "COST_S3_BUCKET")]
    bucket: Option<String>,

    /// Key prefix inside the bucket (default from config, else "reports")
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch costs, write JSON/CSV, and upload to S3 (the default)
    Report,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init {
        /// Bucket to record in the generated config
        #[arg(long)]
        bucket: Option<String>,
    },
    /// Validate config file
    Check,
}

fn usage_error(msg: &str) -> ! {
    Cli::command()
        .error(clap::error::ErrorKind::InvalidValue, msg)
        .exit()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load().unwrap_or_default();
    let opts = cli::output::OutputOptions {
        use_color: cli::output::resolve_color(&config.settings.color, cli.no_color),
        verbose: cli.verbose,
    };

    match cli.command {
        None | Some(Commands::Report) => {
            let today = chrono::Local::now().date_naive();
            let (start, end) = match cli::report_cmd::resolve_window(
                cli.start_date,
                cli.end_date,
                today,
            ) {
                Ok(window) => window,
                Err(msg) => usage_error(&msg),
            };
            let bucket = match cli.bucket.or(config.storage.bucket.clone()) {
                Some(bucket) if !bucket.is_empty() => bucket,
                _ => usage_error(
                    "no bucket given: pass --bucket, set COST_S3_BUCKET, \
                     or add one to the config file",
                ),
            };
            let prefix = cli.prefix.unwrap_or_else(|| config.storage.prefix.clone());

            if let Err(err) = cli::report_cmd::run(
                start,
                end,
                &cli.output_dir,
                bucket,
                prefix,
                config.storage.region.clone(),
                &opts,
            )
            .await
            {
                eprintln!("Error: {}", err);
                std::process::exit(err.exit_code());
            }
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { bucket } => cli::config_cmd::init(bucket, &opts)?,
            ConfigAction::Check => cli::config_cmd::check(&opts)?,
        },
    }

    Ok(())
}
