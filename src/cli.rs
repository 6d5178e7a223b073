use crate::batch::{self, BatchPlanner};
use crate::bench::{self, BenchOptions};
use crate::config::{CodecKind, PoolConfig, DEFAULT_BUFFER_SIZE};
use crate::error::PackError;
use crate::job::Direction;
use crate::pool::{StatusLog, TaskPool};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = "Multithreaded file compression tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PoolArgs {
    /// Number of threads to use (default: all available cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Stream format [zlib, zstd]
    #[arg(short, long, default_value = "zlib")]
    codec: CodecKind,

    /// Working buffer size in bytes
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Show a progress bar
    #[arg(short, long)]
    progress: bool,
}

impl PoolArgs {
    fn config(&self) -> PoolConfig {
        PoolConfig::default()
            .with_workers(self.threads.unwrap_or_else(num_cpus::get))
            .with_codec(self.codec)
            .with_buffer_size(self.buffer_size)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compresses a file, or every file in a directory
    Compress {
        /// Input file or directory
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Compression level (zlib: 0-9, zstd: 1-22; default: codec default)
        #[arg(short, long)]
        level: Option<i32>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        #[command(flatten)]
        pool: PoolArgs,
    },
    /// Decompresses a file, or every compressed file in a directory
    Decompress {
        /// Input file or directory
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        #[command(flatten)]
        pool: PoolArgs,
    },
    /// Compares single-threaded and multi-threaded compression
    Bench {
        /// Directory for the generated test files
        #[arg(short, long, value_name = "DIR", default_value = "packpool-bench")]
        dir: PathBuf,

        /// Size of each test file in MiB
        #[arg(long, default_value_t = 100)]
        size_mb: u64,

        /// Number of test files
        #[arg(long, default_value_t = 4)]
        files: usize,

        /// Threads for the multi-threaded run
        #[arg(short, long, default_value_t = 4)]
        threads: usize,

        /// Stream format [zlib, zstd]
        #[arg(short, long, default_value = "zlib")]
        codec: CodecKind,

        /// Compression level
        #[arg(short, long)]
        level: Option<i32>,
    },
}

pub fn run() -> Result<(), PackError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compress { input, output, level, recursive, pool } => {
            let planner = BatchPlanner::new(output, pool.codec).with_level(level).recursive(recursive);
            run_batch(&planner, &input, Direction::Compress, &pool)
        }
        Commands::Decompress { input, output, recursive, pool } => {
            let planner = BatchPlanner::new(output, pool.codec).recursive(recursive);
            run_batch(&planner, &input, Direction::Decompress, &pool)
        }
        Commands::Bench { dir, size_mb, files, threads, codec, level } => {
            let options = BenchOptions {
                work_dir: dir,
                file_size: size_mb * 1024 * 1024,
                files,
                workers: threads,
                codec,
                level,
            };
            println!("Creating {} test files of {} MiB in {}...", files, size_mb, options.work_dir.display());
            let report = bench::run_benchmark(&options, &StatusLog::stdout())?;

            println!();
            println!("Benchmark Results:");
            println!("  Files:                {} x {} MiB", report.files, size_mb);
            println!("  Single-threaded time: {} ms", report.single.as_millis());
            println!("  Multi-threaded time:  {} ms ({} threads)", report.multi.as_millis(), report.workers);
            println!("  Performance gain:     {:.1}% faster", report.gain_percent());
            if report.failed > 0 {
                return Err(PackError::BatchFailed { failed: report.failed, total: 2 * report.files });
            }
            Ok(())
        }
    }
}

fn run_batch(planner: &BatchPlanner, input: &Path, direction: Direction, pool: &PoolArgs)
    -> Result<(), PackError> {
    let config = pool.config();
    config.validate()?;

    let jobs = batch::plan(planner, input, direction)?;
    if jobs.is_empty() {
        println!("No input files found in {}", input.display());
        return Ok(());
    }
    batch::prepare_destinations(&jobs);

    let verb = match direction {
        Direction::Compress => "Compressing",
        Direction::Decompress => "Decompressing",
    };
    println!("{} {} file(s) with {} threads...", verb, jobs.len(), config.workers);

    let mut status = StatusLog::stdout();
    let bar = if pool.progress {
        let bar = ProgressBar::new(jobs.len() as u64);
        bar.set_style(progress_style());
        status = status.with_progress(bar.clone());
        Some(bar)
    } else {
        None
    };

    let summary = TaskPool::new(config).run(jobs, &status)?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let noun = match direction {
        Direction::Compress => "Compression",
        Direction::Decompress => "Decompression",
    };
    println!("{} completed in {} ms", noun, summary.elapsed.as_millis());
    println!("  Succeeded: {} / {}", summary.succeeded(), summary.total());
    println!("  Bytes in:  {}", summary.bytes_in());
    println!("  Bytes out: {}", summary.bytes_out());

    if summary.failed() > 0 {
        return Err(PackError::BatchFailed { failed: summary.failed(), total: summary.total() });
    }
    Ok(())
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] Files {pos}/{len} ({eta})")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
