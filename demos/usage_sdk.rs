use packpool::{Job, PoolConfig, StatusLog, TaskPool};

fn main() {
	let dir = std::env::temp_dir().join("packpool-demo");
	std::fs::create_dir_all(&dir).unwrap();

	let mut jobs = Vec::new();
	for i in 0..4 {
		let input = dir.join(format!("input{}.txt", i));
		std::fs::write(&input, "hello hello hello hello\n".repeat(1000 * (i + 1))).unwrap();
		jobs.push(Job::compress(&input, dir.join(format!("input{}.txt.zz", i)), Some(9)).unwrap());
	}

	let pool = TaskPool::new(PoolConfig::default().with_workers(2));
	let summary = pool.run(jobs, &StatusLog::stdout()).unwrap();
	println!(
		"compressed {} files: {} -> {} bytes in {:.2?}",
		summary.succeeded(),
		summary.bytes_in(),
		summary.bytes_out(),
		summary.elapsed
	);
}
