//! fsburst - parallel file-lifecycle disk I/O benchmark
//!
//! This library drives a two-phase benchmark against a target directory:
//! a pool of worker threads creates, writes, and closes N files, then (after
//! a full barrier) deletes them, recording a latency distribution for each
//! of the four operations.

pub mod cli;
pub mod driver;
pub mod payload;
pub mod pool;
pub mod preflight;
pub mod progress;
pub mod recorder;
pub mod report;
