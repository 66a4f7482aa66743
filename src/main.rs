use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod engine;
mod engines;
mod error;
mod pool;
mod preprocessing;
mod recognition;
mod server;

#[derive(Parser, Debug)]
#[command(name = "ocr-service")]
#[command(about = "OCR service with a configurable image preprocessing pipeline")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "OCR_PORT", default_value = "8000")]
    pub port: u16,

    /// Language used when a request does not pass `lang` (e.g., "vie", "eng", "eng+vie")
    #[arg(long, env = "OCR_DEFAULT_LANGUAGE", default_value = "vie")]
    pub default_language: String,

    /// Maximum upload size in bytes (default: 20MB)
    #[arg(long, env = "OCR_MAX_FILE_SIZE", default_value = "20971520")]
    pub max_file_size: usize,

    /// Path to tessdata directory (language data is downloaded to a cache dir if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Never download missing language data
    #[arg(long, env = "OCR_NO_DOWNLOAD")]
    pub no_download: bool,

    /// Number of concurrent OCR jobs (defaults to available parallelism)
    #[arg(long, env = "OCR_WORKERS")]
    pub workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from(args);

    tracing::info!("Starting ocr-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Binding to {}:{} ({} OCR workers, default language '{}')",
        config.host,
        config.port,
        config.workers,
        config.default_language
    );

    server::run(config).await
}
