//! Final report rendering
//!
//! Renders the recorder snapshot either as a human-readable console table or
//! as JSON on stdout, plus a system-specs block mirroring what operators
//! usually want next to a disk benchmark number.

use crate::driver::RunOutcome;
use crate::preflight::{self, RunConfig};
use crate::recorder::{Op, Snapshot};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

const GIB: f64 = (1024 * 1024 * 1024) as f64;

/// JSON shape of a completed run.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub dir: String,
    pub file_size_bytes: u64,
    pub loops: u64,
    pub threads: usize,
    pub elapsed_ms: u64,
    pub failed_deletes: u64,
    pub write_throughput_mib_s: f64,
    pub timers: &'a Snapshot,
}

/// Serialize the run result as pretty-printed JSON.
pub fn render_json(
    config: &RunConfig,
    outcome: &RunOutcome,
    snapshot: &Snapshot,
) -> anyhow::Result<String> {
    let report = JsonReport {
        dir: config.dir.display().to_string(),
        file_size_bytes: config.size,
        loops: config.loops,
        threads: config.threads,
        elapsed_ms: outcome.elapsed.as_millis() as u64,
        failed_deletes: outcome.failed_deletes,
        write_throughput_mib_s: write_throughput_mib_s(config, outcome),
        timers: snapshot,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// MiB/s over the whole run, counting only payload bytes.
fn write_throughput_mib_s(config: &RunConfig, outcome: &RunOutcome) -> f64 {
    let secs = outcome.elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }
    let bytes = config.size as f64 * config.loops as f64;
    bytes / (1024.0 * 1024.0) / secs
}

/// Per-timer latency table plus totals, in the style of a console reporter.
pub fn render_summary(config: &RunConfig, outcome: &RunOutcome, snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "====== Latency by operation (µs) ======");
    let _ = writeln!(
        out,
        "{:<10} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "operation", "count", "min", "mean", "max", "p50", "p75", "p95", "p99", "p999"
    );
    for op in Op::ALL {
        let stats = snapshot.get(op);
        let _ = writeln!(
            out,
            "{:<10} {:>8} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
            op.label(),
            stats.count,
            stats.min_us,
            stats.mean_us,
            stats.max_us,
            stats.p50_us,
            stats.p75_us,
            stats.p95_us,
            stats.p99_us,
            stats.p999_us,
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Write throughput: {:.1} MiB/s",
        write_throughput_mib_s(config, outcome)
    );
    if outcome.failed_deletes > 0 {
        let _ = writeln!(
            out,
            "WARNING: {} file(s) could not be deleted",
            outcome.failed_deletes
        );
    }
    let _ = writeln!(
        out,
        "\nTest completed in {:.1} seconds",
        outcome.elapsed.as_secs_f64()
    );
    out
}

/// CPU, memory, and target-filesystem capacity block.
pub fn render_system_specs(dir: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "====== System Specs ======");
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let _ = writeln!(out, "CPU Cores: {cores}");

    if let Some((total, free)) = memory_bytes() {
        let _ = writeln!(out, "Memory Total: {:.2} GB", total as f64 / GIB);
        let _ = writeln!(out, "Memory Free: {:.2} GB", free as f64 / GIB);
    }

    match preflight::filesystem_space(dir) {
        Ok((total, available)) => {
            let _ = writeln!(out, "Diskspace of '{}'", dir.display());
            let _ = writeln!(out, "Diskspace Total: {:.2} GB", total as f64 / GIB);
            let _ = writeln!(out, "Diskspace Available: {:.2} GB", available as f64 / GIB);
        }
        Err(err) => {
            let _ = writeln!(out, "Diskspace: unavailable ({err})");
        }
    }
    out
}

/// Total and free physical memory, when the OS exposes them.
#[cfg(target_os = "linux")]
fn memory_bytes() -> Option<(u64, u64)> {
    let mut info: libc::sysinfo = unsafe { std::mem::zeroed() };
    // SAFETY: sysinfo only writes into the struct we hand it.
    if unsafe { libc::sysinfo(&mut info) } != 0 {
        return None;
    }
    let unit = u64::from(info.mem_unit);
    Some((info.totalram as u64 * unit, info.freeram as u64 * unit))
}

#[cfg(not(target_os = "linux"))]
fn memory_bytes() -> Option<(u64, u64)> {
    None
}
