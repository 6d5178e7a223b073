//! Benchmark harness: times the same batch with one worker and with many.

use crate::config::{CodecKind, PoolConfig};
use crate::error::Result;
use crate::job::Job;
use crate::pool::{BatchSummary, StatusLog, TaskPool};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BLOCK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct BenchOptions {
    pub work_dir: PathBuf,
    pub file_size: u64,
    pub files: usize,
    pub workers: usize,
    pub codec: CodecKind,
    pub level: Option<i32>,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("packpool-bench"),
            file_size: 100 * 1024 * 1024,
            files: 4,
            workers: 4,
            codec: CodecKind::default(),
            level: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BenchReport {
    pub files: usize,
    pub workers: usize,
    pub bytes: u64,
    pub single: Duration,
    pub multi: Duration,
    pub failed: usize,
}

impl BenchReport {
    /// Percentage of the single-worker time saved by the multi-worker run.
    pub fn gain_percent(&self) -> f64 {
        let single = self.single.as_secs_f64();
        if single == 0.0 {
            return 0.0;
        }
        (1.0 - self.multi.as_secs_f64() / single) * 100.0
    }
}

/// Writes `files` inputs of `size` bytes each into `dir`. The first one is
/// generated, the rest are copies of it.
pub fn prepare_inputs(dir: &Path, size: u64, files: usize) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let inputs: Vec<PathBuf> = (0..files).map(|i| dir.join(format!("test_file{}.bin", i))).collect();

    if let Some(first) = inputs.first() {
        write_test_file(first, size)?;
        for copy in &inputs[1..] {
            fs::copy(first, copy)?;
        }
    }
    Ok(inputs)
}

fn write_test_file(path: &Path, size: u64) -> Result<()> {
    let block: Vec<u8> = (0u64..)
        .flat_map(|n| format!("{:08} the quick brown fox jumps over the lazy dog\n", n).into_bytes())
        .take(BLOCK_SIZE)
        .collect();

    let mut writer = BufWriter::new(File::create(path)?);
    let mut remaining = size;
    while remaining > 0 {
        let n = remaining.min(block.len() as u64) as usize;
        writer.write_all(&block[..n])?;
        remaining -= n as u64;
    }
    writer.flush()?;
    Ok(())
}

fn timed_run(options: &BenchOptions, inputs: &[PathBuf], workers: usize, tag: &str, status: &StatusLog)
    -> Result<BatchSummary> {
    let jobs = inputs
        .iter()
        .map(|input| {
            let mut name = input.file_name().map(|n| n.to_os_string()).unwrap_or_default();
            name.push(format!(".{}.{}", tag, options.codec.extension()));
            Job::compress(input, options.work_dir.join(name), options.level)
        })
        .collect::<Result<Vec<_>>>()?;

    let config = PoolConfig::default().with_workers(workers).with_codec(options.codec);
    TaskPool::new(config).run(jobs, status)
}

pub fn run_benchmark(options: &BenchOptions, status: &StatusLog) -> Result<BenchReport> {
    let inputs = prepare_inputs(&options.work_dir, options.file_size, options.files)?;

    status.line(&format!("Running single-threaded test ({} files)...", inputs.len()));
    let single = timed_run(options, &inputs, 1, "single", status)?;

    status.line(&format!("Running multi-threaded test ({} threads)...", options.workers));
    let multi = timed_run(options, &inputs, options.workers, "multi", status)?;

    Ok(BenchReport {
        files: inputs.len(),
        workers: options.workers,
        bytes: options.file_size * inputs.len() as u64,
        single: single.elapsed,
        multi: multi.elapsed,
        failed: single.failed() + multi.failed(),
    })
}
