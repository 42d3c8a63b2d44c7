//! CLI argument parsing for fsburst

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the final report
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "fsburst")]
#[command(version)]
#[command(about = "Parallel file-lifecycle disk I/O benchmark", long_about = None)]
pub struct Cli {
    /// Directory path to write benchmark files into
    #[arg(short = 'd', long = "dir", value_name = "PATH")]
    pub dir: PathBuf,

    /// Number of bytes to write in each file (default 100 MiB)
    #[arg(short = 's', long = "size", value_name = "BYTES", default_value_t = 104_857_600)]
    pub size: u64,

    /// Number of loops, i.e. files to create and delete
    #[arg(short = 'l', long = "loops", value_name = "N", default_value_t = 300)]
    pub loops: u64,

    /// Number of threads to write in parallel, default to available CPU cores
    #[arg(short = 't', long = "threads", value_name = "N")]
    pub threads: Option<usize>,

    /// Emit a progress update every N completed files
    #[arg(long = "progress-every", value_name = "N", default_value_t = 5)]
    pub progress_every: u64,

    /// Output format for the final report (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose tracing to stderr
    #[arg(long)]
    pub debug: bool,
}
