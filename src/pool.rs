//! Worker pool that distributes independent file jobs.
//!
//! Workers claim jobs from a shared [`JobQueue`] cursor, run them through a
//! [`StreamCodec`] without holding any lock, and report each outcome as one
//! line on a [`StatusLog`]. A failing job is reported and skipped; it never
//! stops the other workers.

use crate::codec::{StreamCodec, StreamStats};
use crate::config::PoolConfig;
use crate::error::{PackError, Result};
use crate::job::{Direction, Job, JobQueue};
use crossbeam_channel::{unbounded, Sender};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Line-oriented diagnostics sink shared by the workers of one pool run.
pub struct StatusLog {
	sink: Mutex<Box<dyn Write + Send>>,
	progress: Option<ProgressBar>,
}

impl StatusLog {
	pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
		Self { sink: Mutex::new(Box::new(writer)), progress: None }
	}

	pub fn stdout() -> Self {
		Self::new(std::io::stdout())
	}

	/// Discards every line.
	pub fn quiet() -> Self {
		Self::new(std::io::sink())
	}

	/// Advances `bar` once per finished job; lines are printed around it.
	pub fn with_progress(mut self, bar: ProgressBar) -> Self {
		self.progress = Some(bar);
		self
	}

	/// Writes one whole line under the lock.
	pub fn line(&self, message: &str) {
		let mut line = String::with_capacity(message.len() + 1);
		line.push_str(message);
		line.push('\n');

		let mut sink = self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		let result = match &self.progress {
			Some(bar) => bar.suspend(|| write_line(&mut **sink, line.as_bytes())),
			None => write_line(&mut **sink, line.as_bytes()),
		};
		if let Err(e) = result {
			log::warn!("Failed to write status line: {}", e);
		}
	}

	fn job_finished(&self) {
		if let Some(bar) = &self.progress {
			bar.inc(1);
		}
	}
}

fn write_line(sink: &mut dyn Write, line: &[u8]) -> std::io::Result<()> {
	sink.write_all(line)?;
	sink.flush()
}

/// Outcome of one job.
#[derive(Debug)]
pub struct JobReport {
	pub index: usize,
	pub worker: usize,
	pub job: Job,
	pub outcome: Result<StreamStats>,
	pub elapsed: Duration,
}

impl JobReport {
	pub fn is_success(&self) -> bool {
		self.outcome.is_ok()
	}

	pub fn status_line(&self) -> String {
		let source = self.job.source().display();
		let destination = self.job.destination().display();
		match &self.outcome {
			Ok(stats) => format!(
				"Processed: {} -> {} ({} -> {} bytes, {} ms)",
				source,
				destination,
				stats.bytes_in,
				stats.bytes_out,
				self.elapsed.as_millis()
			),
			Err(e) => format!("Failed: {} -> {}: {}", source, destination, e),
		}
	}
}

/// Every report of one pool run, ordered by job index.
#[derive(Debug)]
pub struct BatchSummary {
	pub reports: Vec<JobReport>,
	pub elapsed: Duration,
}

impl BatchSummary {
	pub fn total(&self) -> usize {
		self.reports.len()
	}

	pub fn succeeded(&self) -> usize {
		self.reports.iter().filter(|r| r.is_success()).count()
	}

	pub fn failed(&self) -> usize {
		self.total() - self.succeeded()
	}

	pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
		self.reports.iter().filter(|r| !r.is_success())
	}

	pub fn bytes_in(&self) -> u64 {
		self.reports.iter().filter_map(|r| r.outcome.as_ref().ok()).map(|s| s.bytes_in).sum()
	}

	pub fn bytes_out(&self) -> u64 {
		self.reports.iter().filter_map(|r| r.outcome.as_ref().ok()).map(|s| s.bytes_out).sum()
	}
}

pub struct TaskPool {
	config: PoolConfig,
}

impl TaskPool {
	pub fn new(config: PoolConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &PoolConfig {
		&self.config
	}

	/// Runs every job on `config.workers` workers and blocks until all of
	/// them have exited. Only configuration problems fail the whole call;
	/// per-job failures end up in the returned summary.
	pub fn run(&self, jobs: Vec<Job>, status: &StatusLog) -> Result<BatchSummary> {
		self.config.validate()?;
		for job in jobs.iter().filter(|job| job.direction() == Direction::Compress) {
			self.config
				.codec
				.resolve_level(job.level())
				.map_err(|e| PackError::Config(e.to_string()))?;
		}

		let workers = self.config.workers;
		let codec = StreamCodec::new(self.config.codec).with_buffer_size(self.config.buffer_size);
		let queue = JobQueue::new(jobs);
		let pool = rayon::ThreadPoolBuilder::new()
			.num_threads(workers)
			.thread_name(|i| format!("packpool-worker-{}", i))
			.build()?;

		log::info!(
			"Dispatching {} jobs to {} workers ({}, {} byte buffers)",
			queue.len(),
			workers,
			codec.kind().name(),
			codec.buffer_size()
		);

		let (report_tx, report_rx) = unbounded::<JobReport>();
		let start = Instant::now();

		pool.scope(|scope| {
			for worker in 0..workers {
				let queue = &queue;
				let codec = &codec;
				let report_tx = report_tx.clone();
				scope.spawn(move |_| worker_loop(worker, queue, codec, status, report_tx));
			}
		});

		drop(report_tx);
		let elapsed = start.elapsed();

		let mut reports: Vec<JobReport> = report_rx.iter().collect();
		reports.sort_by_key(|r| r.index);

		let summary = BatchSummary { reports, elapsed };
		log::info!(
			"Batch finished in {:.2?}: {} succeeded, {} failed",
			summary.elapsed,
			summary.succeeded(),
			summary.failed()
		);
		Ok(summary)
	}
}

fn worker_loop(
	worker: usize,
	queue: &JobQueue,
	codec: &StreamCodec,
	status: &StatusLog,
	reports: Sender<JobReport>,
) {
	log::debug!("Worker {} started", worker);

	while let Some((index, job)) = queue.claim() {
		log::debug!("Worker {} claimed job {} ({})", worker, index, job.source().display());

		let start = Instant::now();
		let outcome = execute(job, codec);
		let report = JobReport { index, worker, job: job.clone(), outcome, elapsed: start.elapsed() };

		status.line(&report.status_line());
		status.job_finished();

		if let Err(e) = reports.send(report) {
			log::error!("Worker {} failed to send report: {}", worker, e);
			break;
		}
	}

	log::debug!("Worker {} finished", worker);
}

/// Opens the job's streams and runs them through `codec`.
pub fn execute(job: &Job, codec: &StreamCodec) -> Result<StreamStats> {
	let mut source = File::open(job.source()).map_err(|source| PackError::SourceOpen {
		path: job.source().to_path_buf(),
		source,
	})?;
	// Checked before `File::create`, which would truncate the input.
	if same_file::is_same_file(job.source(), job.destination()).unwrap_or(false) {
		return Err(PackError::SameFile {
			path: job.source().to_path_buf(),
			destination: job.destination().to_path_buf(),
		});
	}
	let destination = File::create(job.destination()).map_err(|source| PackError::DestinationOpen {
		path: job.destination().to_path_buf(),
		source,
	})?;

	let mut writer = BufWriter::new(destination);
	let stats = codec.run(&mut source, &mut writer, job.direction(), job.level())?;
	writer.flush()?;
	Ok(stats)
}
