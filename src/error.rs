use std::path::PathBuf;
use thiserror::Error;

/// Failure inside a single codec session.
#[derive(Error, Debug)]
pub enum CodecError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("{codec} transform failed: {message}")]
	Transform { codec: &'static str, message: String },

	#[error("{codec} stream ended before its footer")]
	UnexpectedEnd { codec: &'static str },

	#[error("Invalid {codec} level {level} (expected {min}..={max})")]
	InvalidLevel {
		codec: &'static str,
		level: i32,
		min: i32,
		max: i32,
	},

	#[error("{codec} transform stopped making progress while finishing")]
	Stalled { codec: &'static str },
}

#[derive(Error, Debug)]
pub enum PackError {
	#[error("Error opening input file {}: {source}", .path.display())]
	SourceOpen {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Error opening output file {}: {source}", .path.display())]
	DestinationOpen {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Output file {} is the input file {}", .destination.display(), .path.display())]
	SameFile { path: PathBuf, destination: PathBuf },

	#[error("Codec error: {0}")]
	Codec(#[from] CodecError),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("{failed} of {total} jobs failed")]
	BatchFailed { failed: usize, total: usize },

	#[error("Failed to start worker pool: {0}")]
	Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, PackError>;
