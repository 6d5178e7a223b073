//! # Packpool
//!
//! Batch compression and decompression of files on a bounded pool of worker
//! threads.
//!
//! ## Features
//!
//! - **Streaming Codec**: Every file is pushed through a stateful compress or
//!   decompress transform with two fixed-size buffers, so memory use does not
//!   depend on file size
//! - **Two Formats**: zlib (deflate) and zstd behind one transform interface
//! - **Worker Pool**: Workers claim files from a shared cursor; each file is
//!   processed exactly once
//! - **Failure Isolation**: An unreadable, unwritable or corrupt file is
//!   reported and skipped without stopping the rest of the batch
//!
//! ## Quick Start
//!
//! ### In-memory Round Trip
//!
//! ```rust
//! use packpool::{compress_bytes, decompress_bytes, CodecKind};
//!
//! let original = b"Hello, world! This is test data.";
//! let compressed = compress_bytes(original, CodecKind::Zlib, None).unwrap();
//! let restored = decompress_bytes(&compressed, CodecKind::Zlib).unwrap();
//! assert_eq!(original.to_vec(), restored);
//! ```
//!
//! ### Compressing a Batch of Files
//!
//! ```rust,no_run
//! use packpool::{Job, PoolConfig, StatusLog, TaskPool};
//!
//! # fn example() -> Result<(), packpool::PackError> {
//! let jobs = vec![
//!     Job::compress("a.log", "out/a.log.zz", Some(9))?,
//!     Job::compress("b.log", "out/b.log.zz", None)?,
//! ];
//!
//! let pool = TaskPool::new(PoolConfig::default().with_workers(2));
//! let summary = pool.run(jobs, &StatusLog::stdout())?;
//! println!("{} of {} files compressed", summary.succeeded(), summary.total());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod bench;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod job;
pub mod pool;

// Re-export commonly used types for convenience
pub use codec::{CodecSession, StreamCodec, StreamStats, Transform};
pub use config::{CodecKind, PoolConfig, DEFAULT_BUFFER_SIZE};
pub use error::{CodecError, PackError, Result};
pub use job::{Direction, Job, JobQueue};
pub use pool::{BatchSummary, JobReport, StatusLog, TaskPool};

use std::io::Cursor;

/// Compress data in memory
///
/// For files, build [`Job`]s and run them on a [`TaskPool`] instead.
///
/// # Example
///
/// ```rust
/// use packpool::{compress_bytes, CodecKind};
///
/// let compressed = compress_bytes(&[0u8; 4096], CodecKind::Zstd, Some(19)).unwrap();
/// assert!(compressed.len() < 4096);
/// ```
pub fn compress_bytes(
    data: &[u8],
    codec: CodecKind,
    level: Option<i32>,
) -> std::result::Result<Vec<u8>, CodecError> {
    let mut output = Vec::new();
    StreamCodec::new(codec).run(&mut Cursor::new(data), &mut output, Direction::Compress, level)?;
    Ok(output)
}

/// Decompress data in memory
pub fn decompress_bytes(data: &[u8], codec: CodecKind) -> std::result::Result<Vec<u8>, CodecError> {
    let mut output = Vec::new();
    StreamCodec::new(codec).run(&mut Cursor::new(data), &mut output, Direction::Decompress, None)?;
    Ok(output)
}

/// Packpool library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
