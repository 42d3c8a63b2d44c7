use anyhow::Result;
use clap::Parser;
use fsburst::cli::{Cli, OutputFormat};
use fsburst::driver::BenchmarkDriver;
use fsburst::preflight::{self, RunConfig};
use fsburst::recorder::LatencyRecorder;
use fsburst::{payload, progress, report};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn resolve_threads(requested: Option<usize>) -> usize {
    requested.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = RunConfig {
        dir: args.dir,
        size: args.size,
        loops: args.loops,
        threads: resolve_threads(args.threads),
        progress_every: args.progress_every,
    };

    // Configuration errors abort before any file is touched.
    preflight::validate(&config)?;
    preflight::check_available_space(&config)?;

    let text_mode = matches!(args.format, OutputFormat::Text);
    if text_mode {
        println!("Writing to directory: '{}'", config.dir.display());
        println!("File Size = {} bytes", config.size);
        println!("Loops = {}", config.loops);
        println!("Threads = {}", config.threads);
    }

    let payload: Arc<[u8]> = payload::random_payload(config.size).into();
    let recorder = Arc::new(LatencyRecorder::new());
    let progress = if text_mode {
        progress::console()
    } else {
        progress::silent()
    };

    let driver = BenchmarkDriver::new(&config, payload, Arc::clone(&recorder), progress);
    let outcome = driver.run()?;
    let snapshot = recorder.snapshot();

    match args.format {
        OutputFormat::Text => {
            println!();
            print!("{}", report::render_summary(&config, &outcome, &snapshot));
            println!();
            print!("{}", report::render_system_specs(&config.dir));
        }
        OutputFormat::Json => {
            println!("{}", report::render_json(&config, &outcome, &snapshot)?);
        }
    }

    if outcome.failed_deletes > 0 {
        anyhow::bail!(
            "{} benchmark file(s) were left behind in '{}'",
            outcome.failed_deletes,
            config.dir.display()
        );
    }
    Ok(())
}
