use catalog_dl::{CatalogDownloader, Config, run_with_shutdown};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Download catalog tracks in the background and serve job status over HTTP
#[derive(Debug, Parser)]
#[command(name = "catalog-dl", version, about)]
struct Args {
    /// Configuration file, created with defaults when missing
    #[arg(short, long, env = "CATALOG_DL_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Override the API bind address from the configuration file
    #[arg(short, long, env = "CATALOG_DL_BIND")]
    bind: Option<SocketAddr>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.log_format, args.verbose);

    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "catalog-dl exited with an error");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> catalog_dl::Result<()> {
    let mut config = Config::load_or_init(&args.config)?;
    if let Some(bind) = args.bind {
        config.api.bind_address = bind;
    }

    tracing::info!(
        config = %args.config.display(),
        bind = %config.api.bind_address,
        store = %config.catalog.store,
        "starting catalog-dl"
    );

    let downloader = Arc::new(CatalogDownloader::new(config, &args.config)?);
    run_with_shutdown(downloader).await
}

fn init_logging(format: LogFormat, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { Level::DEBUG } else { Level::INFO };
        EnvFilter::new(level.as_str().to_lowercase())
    });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer().with_target(verbose)).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}
