use anyhow::{Context, Result};
use bridge_desktop::ReqwestHttpClient;
use clap::Parser;
use core_metadata::{CoverFetcher, FetcherOptions, LoftyTagStore, ProviderKind};
use core_runtime::config::ENV_USER_AGENT;
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use core_runtime::{CoverFetchConfig, ProviderCredentials, RunOptions};
use core_service::CoverProcessor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "coverfetch")]
#[command(version)]
#[command(about = "Find cover art for audio files and embed it into their tags", long_about = None)]
struct Cli {
    /// Folder of audio files, or a single audio file
    source: PathBuf,

    /// Do not write exported covers to export-covers/
    #[arg(long)]
    no_covers: bool,

    /// Delay in milliseconds between files and after throttled requests
    #[arg(long, value_name = "MS")]
    custom_delay: Option<u64>,

    /// Only query this provider (spotify, itunes, musicbrainz, discogs)
    #[arg(long, value_name = "NAME", value_parser = parse_provider)]
    provider: Option<ProviderKind>,

    /// Log output format (pretty, json, compact)
    #[arg(long, value_name = "FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_provider(s: &str) -> std::result::Result<ProviderKind, String> {
    s.parse().map_err(|e: core_metadata::MetadataError| e.to_string())
}

fn parse_log_format(s: &str) -> std::result::Result<LogFormat, String> {
    s.parse().map_err(|e: core_runtime::Error| e.to_string())
}

fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        // Logging is not initialized yet
        eprintln!("Loaded environment from {}", path.display());
    }
}

fn run_options(cli: &Cli) -> RunOptions {
    let mut options = RunOptions::default().with_export_covers(!cli.no_covers);
    if let Some(delay) = cli.custom_delay {
        options = options.with_request_delay_ms(delay);
    }
    if let Ok(user_agent) = std::env::var(ENV_USER_AGENT) {
        if !user_agent.trim().is_empty() {
            options = options.with_user_agent(user_agent.trim());
        }
    }
    options
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    let logging = LoggingConfig::default()
        .with_format(cli.log_format.unwrap_or_default())
        .with_level(LogLevel::from_verbosity(cli.verbose));
    init_logging(logging).context("Failed to initialize logging")?;

    let credentials = ProviderCredentials::from_env();
    for name in credentials.missing() {
        warn!("{} is not set", name);
    }

    let config = CoverFetchConfig::builder()
        .source(&cli.source)
        .options(run_options(&cli))
        .credentials(credentials)
        .build()
        .context("Invalid configuration")?;

    info!(
        source = %config.source.display(),
        export_covers = config.options.export_covers,
        delay_ms = config.options.request_delay_ms,
        provider = cli.provider.map(|p| p.cli_name()).unwrap_or("all"),
        "Starting coverfetch"
    );

    let http_client = Arc::new(
        ReqwestHttpClient::new(&config.options.user_agent)
            .context("Failed to build HTTP client")?,
    );
    let fetcher_options = FetcherOptions::from(&config.options).with_provider_filter(cli.provider);
    let fetcher =
        CoverFetcher::from_credentials(http_client, &config.credentials, &fetcher_options).await;

    let active: Vec<&str> = fetcher
        .active_providers()
        .into_iter()
        .map(|p| p.display_name())
        .collect();
    info!("Active providers: {}", active.join(", "));

    let processor = CoverProcessor::new(fetcher, Arc::new(LoftyTagStore::new()), config.options);
    let summary = processor
        .run(&config.source)
        .await
        .with_context(|| format!("Failed to process {}", config.source.display()))?;

    println!(
        "Processed {} file(s): {} embedded, {} exported, {} logged as failures",
        summary.processed, summary.embedded, summary.exported, summary.failed
    );
    if let Some(path) = summary.failure_log {
        println!("Failure log: {}", path.display());
    }

    Ok(())
}
