//! Run configuration and pre-flight checks
//!
//! Everything here runs before the driver is constructed: a configuration
//! that fails validation never touches the target directory.

use nix::sys::statvfs::statvfs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const GIB: f64 = (1024 * 1024 * 1024) as f64;

fn gib(bytes: &u64) -> f64 {
    *bytes as f64 / GIB
}

/// Immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Target directory; must exist and be a directory.
    pub dir: PathBuf,
    /// Bytes written to each file.
    pub size: u64,
    /// Number of files to create and delete.
    pub loops: u64,
    /// Worker thread count.
    pub threads: usize,
    /// Emit a progress update every this many completed files.
    pub progress_every: u64,
}

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("directory '{}' does not exist or is not a directory", .0.display())]
    BadDirectory(PathBuf),

    #[error("file size must be greater than zero")]
    ZeroSize,

    #[error("loop count must be greater than zero")]
    ZeroLoops,

    #[error("thread count must be greater than zero")]
    ZeroThreads,

    #[error("progress cadence must be greater than zero")]
    ZeroCadence,

    #[error("total write volume overflows: {size} bytes x {loops} files")]
    VolumeOverflow { size: u64, loops: u64 },

    #[error(
        "not enough disk space: the run needs {:.2} GB but '{}' has {:.2} GB available; reduce --size or --loops",
        gib(.needed),
        .dir.display(),
        gib(.available)
    )]
    InsufficientSpace {
        needed: u64,
        available: u64,
        dir: PathBuf,
    },

    #[error("failed to query filesystem stats for '{}': {source}", .dir.display())]
    FilesystemStats {
        dir: PathBuf,
        source: nix::Error,
    },
}

/// Validate the shape of the configuration: directory and positive sizes.
pub fn validate(config: &RunConfig) -> Result<(), PreflightError> {
    if !config.dir.is_dir() {
        return Err(PreflightError::BadDirectory(config.dir.clone()));
    }
    if config.size == 0 {
        return Err(PreflightError::ZeroSize);
    }
    if config.loops == 0 {
        return Err(PreflightError::ZeroLoops);
    }
    if config.threads == 0 {
        return Err(PreflightError::ZeroThreads);
    }
    if config.progress_every == 0 {
        return Err(PreflightError::ZeroCadence);
    }
    Ok(())
}

/// Total and available bytes of the filesystem holding `dir`.
pub fn filesystem_space(dir: &Path) -> Result<(u64, u64), PreflightError> {
    let stat = statvfs(dir).map_err(|source| PreflightError::FilesystemStats {
        dir: dir.to_path_buf(),
        source,
    })?;
    let frag = stat.fragment_size() as u64;
    let total = stat.blocks() as u64 * frag;
    let available = stat.blocks_available() as u64 * frag;
    Ok((total, available))
}

/// Fail fast when the filesystem cannot hold the full burst of files.
pub fn check_available_space(config: &RunConfig) -> Result<(), PreflightError> {
    let needed = config
        .size
        .checked_mul(config.loops)
        .ok_or(PreflightError::VolumeOverflow {
            size: config.size,
            loops: config.loops,
        })?;
    let (_, available) = filesystem_space(&config.dir)?;
    if available < needed {
        return Err(PreflightError::InsufficientSpace {
            needed,
            available,
            dir: config.dir.clone(),
        });
    }
    Ok(())
}
