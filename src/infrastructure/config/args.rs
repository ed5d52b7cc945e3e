use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "memento-prefetch",
    version,
    about = "Walks a scrapbook and warms the image cache around each focused memory",
    long_about = None
)]
pub struct CliArgs {
    /// Scrapbook library JSON file.
    #[arg(short, long, value_name = "PATH")]
    pub library: PathBuf,

    /// Scrapbook to open. Defaults to the last opened one, then the first in the library.
    #[arg(short, long, value_name = "ID")]
    pub scrapbook: Option<String>,

    /// Focus path walked through the scrapbook, e.g. `0,1,2,5`.
    #[arg(short, long, value_delimiter = ',', value_name = "INDEX")]
    pub focus: Vec<usize>,

    /// Focus the first memory matching this text before walking the focus path.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Maximum simultaneous downloads.
    #[arg(long, value_name = "N")]
    pub max_concurrent: Option<usize>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,
}
