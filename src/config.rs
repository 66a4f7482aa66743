use crate::Args;
use std::num::NonZeroUsize;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub default_language: String,
    pub max_file_size: usize,
    pub tessdata_path: Option<String>,
    pub download_language_data: bool,
    pub workers: usize,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let workers = args
            .workers
            .filter(|&n| n > 0)
            .unwrap_or_else(default_workers);

        Self {
            host: args.host,
            port: args.port,
            default_language: args.default_language,
            max_file_size: args.max_file_size,
            tessdata_path: args.tessdata_path,
            download_language_data: !args.no_download,
            workers,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
