use packpool::batch::{prepare_destinations, BatchPlanner};
use packpool::{CodecKind, Direction, Job, PackError, PoolConfig, StatusLog, TaskPool};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn mixed_content(len: usize, seed: u64) -> Vec<u8> {
	let mut rng = StdRng::seed_from_u64(seed);
	let mut data = vec![0u8; len];
	// Random first half, repetitive text second half.
	let half = len / 2;
	rng.fill_bytes(&mut data[..half]);
	let text = b"lorem ipsum dolor sit amet, consectetur adipiscing elit. ";
	for (i, byte) in data[half..].iter_mut().enumerate() {
		*byte = text[i % text.len()];
	}
	data
}

fn write_files(dir: &Path, sizes: &[usize]) -> Vec<(PathBuf, Vec<u8>)> {
	sizes
		.iter()
		.enumerate()
		.map(|(i, &size)| {
			let path = dir.join(format!("file{}.bin", i));
			let data = mixed_content(size, i as u64);
			fs::write(&path, &data).unwrap();
			(path, data)
		})
		.collect()
}

fn compress_then_decompress(codec: CodecKind, sizes: &[usize], workers: usize) {
	let dir = TempDir::new().unwrap();
	let input_dir = dir.path().join("input");
	fs::create_dir(&input_dir).unwrap();
	let originals = write_files(&input_dir, sizes);

	let config = PoolConfig::default().with_workers(workers).with_codec(codec);

	let compressed_dir = dir.path().join("compressed");
	let jobs = BatchPlanner::new(&compressed_dir, codec).compress_jobs(&input_dir).unwrap();
	assert_eq!(jobs.len(), sizes.len());
	prepare_destinations(&jobs);
	let summary = TaskPool::new(config.clone()).run(jobs, &StatusLog::quiet()).unwrap();
	assert_eq!(summary.succeeded(), sizes.len());

	for report in &summary.reports {
		let written = fs::metadata(report.job.destination()).unwrap().len();
		let stats = report.outcome.as_ref().unwrap();
		assert_eq!(stats.bytes_out, written);
		// Zero-length inputs still produce a complete, non-empty stream.
		assert!(written > 0);
	}

	let restored_dir = dir.path().join("restored");
	let jobs = BatchPlanner::new(&restored_dir, codec).decompress_jobs(&compressed_dir).unwrap();
	assert_eq!(jobs.len(), sizes.len());
	prepare_destinations(&jobs);
	let summary = TaskPool::new(config).run(jobs, &StatusLog::quiet()).unwrap();
	assert_eq!(summary.succeeded(), sizes.len());

	for (path, data) in originals {
		let restored = fs::read(restored_dir.join(path.file_name().unwrap())).unwrap();
		assert_eq!(restored.len(), data.len(), "{}", path.display());
		assert!(restored == data, "{} differs after round trip", path.display());
	}
}

#[test]
fn five_file_batch_on_two_workers() {
	compress_then_decompress(CodecKind::Zlib, &[0, 1, 1_048_577, 10_000_000, 0], 2);
}

#[test]
fn five_file_batch_on_two_workers_zstd() {
	compress_then_decompress(CodecKind::Zstd, &[0, 1, 1_048_577, 10_000_000, 0], 2);
}

#[test]
fn more_workers_than_jobs() {
	compress_then_decompress(CodecKind::Zlib, &[10, 20, 30], 16);
}

#[test]
fn exactly_once_for_many_shapes() {
	for jobs in [0usize, 1, 2, 7, 25] {
		for workers in [1usize, 2, 3, 8, 32] {
			let dir = TempDir::new().unwrap();
			let files = write_files(dir.path(), &vec![256; jobs]);
			let batch = files
				.iter()
				.map(|(path, _)| {
					let destination = dir.path().join(format!("{}.zz", path.file_name().unwrap().to_string_lossy()));
					Job::compress(path, destination, Some(1)).unwrap()
				})
				.collect();

			let summary = TaskPool::new(PoolConfig::default().with_workers(workers))
				.run(batch, &StatusLog::quiet())
				.unwrap();

			let indices: Vec<usize> = summary.reports.iter().map(|r| r.index).collect();
			assert_eq!(indices, (0..jobs).collect::<Vec<_>>(), "M={} N={}", jobs, workers);
			assert_eq!(summary.succeeded(), jobs);
		}
	}
}

#[test]
fn unreadable_sources_do_not_stop_the_batch() {
	let dir = TempDir::new().unwrap();
	let files = write_files(dir.path(), &[1000, 2000, 3000, 4000]);

	let mut jobs = Vec::new();
	for (i, (path, _)) in files.iter().enumerate() {
		jobs.push(Job::compress(path, dir.path().join(format!("ok{}.zz", i)), None).unwrap());
		jobs.push(Job::compress(dir.path().join(format!("ghost{}", i)), dir.path().join(format!("ghost{}.zz", i)), None).unwrap());
	}
	// A directory opens but cannot be read as a stream.
	jobs.push(Job::compress(dir.path(), dir.path().join("dir.zz"), None).unwrap());

	let summary = TaskPool::new(PoolConfig::default().with_workers(3))
		.run(jobs, &StatusLog::quiet())
		.unwrap();

	assert_eq!(summary.total(), 9);
	assert_eq!(summary.failed(), 5);
	assert_eq!(summary.succeeded(), summary.total() - summary.failed());
	for report in summary.failures() {
		assert!(matches!(
			report.outcome,
			Err(PackError::SourceOpen { .. }) | Err(PackError::Codec(_))
		));
	}
	for i in 0..4 {
		assert!(dir.path().join(format!("ok{}.zz", i)).exists());
	}
}

#[test]
fn same_level_always_restores_same_bytes() {
	let dir = TempDir::new().unwrap();
	let files = write_files(dir.path(), &[300_000]);
	let source = &files[0].0;

	for codec in [CodecKind::Zlib, CodecKind::Zstd] {
		let level = Some(match codec {
			CodecKind::Zlib => 9,
			CodecKind::Zstd => 19,
		});
		let jobs = vec![
			Job::compress(source, dir.path().join("first"), level).unwrap(),
			Job::compress(source, dir.path().join("second"), level).unwrap(),
		];
		let config = PoolConfig::default().with_workers(2).with_codec(codec);
		TaskPool::new(config.clone()).run(jobs, &StatusLog::quiet()).unwrap();

		let jobs = vec![
			Job::decompress(dir.path().join("first"), dir.path().join("first.out")).unwrap(),
			Job::decompress(dir.path().join("second"), dir.path().join("second.out")).unwrap(),
		];
		let summary = TaskPool::new(config).run(jobs, &StatusLog::quiet()).unwrap();
		assert_eq!(summary.succeeded(), 2);

		let first = fs::read(dir.path().join("first.out")).unwrap();
		let second = fs::read(dir.path().join("second.out")).unwrap();
		assert!(first == files[0].1 && second == files[0].1, "{:?} level round trip", codec);
	}
}

#[test]
fn truncated_archive_keeps_partial_output() {
	let dir = TempDir::new().unwrap();
	let files = write_files(dir.path(), &[500_000]);
	let compressed = dir.path().join("data.zz");
	let config = PoolConfig::default().with_workers(1).with_buffer_size(4096);

	TaskPool::new(config.clone())
		.run(vec![Job::compress(&files[0].0, &compressed, None).unwrap()], &StatusLog::quiet())
		.unwrap();
	let bytes = fs::read(&compressed).unwrap();
	fs::write(&compressed, &bytes[..bytes.len() - 10]).unwrap();

	let restored = dir.path().join("data.out");
	let summary = TaskPool::new(config)
		.run(vec![Job::decompress(&compressed, &restored).unwrap()], &StatusLog::quiet())
		.unwrap();

	assert_eq!(summary.failed(), 1);
	assert!(matches!(summary.reports[0].outcome, Err(PackError::Codec(_))));
	// No rollback: whatever was decoded before the failure stays on disk.
	assert!(restored.exists());
	assert!(fs::metadata(&restored).unwrap().len() <= files[0].1.len() as u64);
}

#[test]
fn status_line_names_processed_job() {
	let dir = TempDir::new().unwrap();
	let files = write_files(dir.path(), &[64]);
	let job = Job::compress(&files[0].0, dir.path().join("x.zz"), None).unwrap();
	let summary = TaskPool::new(PoolConfig::default().with_workers(1))
		.run(vec![job], &StatusLog::quiet())
		.unwrap();
	assert_eq!(summary.reports[0].job.direction(), Direction::Compress);
	assert!(summary.reports[0].status_line().starts_with("Processed: "));
}

#[test]
fn aliased_destination_leaves_source_intact() {
	let dir = TempDir::new().unwrap();
	let files = write_files(dir.path(), &[10_000]);
	fs::create_dir(dir.path().join("sub")).unwrap();
	let alias = dir.path().join("sub").join("..").join("file0.bin");

	let summary = TaskPool::new(PoolConfig::default().with_workers(1))
		.run(vec![Job::compress(&files[0].0, &alias, None).unwrap()], &StatusLog::quiet())
		.unwrap();

	assert_eq!(summary.failed(), 1);
	assert!(matches!(summary.reports[0].outcome, Err(PackError::SameFile { .. })));
	assert!(fs::read(&files[0].0).unwrap() == files[0].1);
}
