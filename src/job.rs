use crate::error::PackError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Compress,
    Decompress,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Compress => f.write_str("compress"),
            Direction::Decompress => f.write_str("decompress"),
        }
    }
}

/// One file to compress or decompress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    source: PathBuf,
    destination: PathBuf,
    direction: Direction,
    level: Option<i32>,
}

impl Job {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        direction: Direction,
        level: Option<i32>,
    ) -> Result<Self, PackError> {
        let source = source.into();
        let destination = destination.into();
        if source == destination {
            return Err(PackError::Config(format!(
                "Source and destination are the same file: {}",
                source.display()
            )));
        }
        Ok(Self { source, destination, direction, level })
    }

    pub fn compress(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        level: Option<i32>,
    ) -> Result<Self, PackError> {
        Self::new(source, destination, Direction::Compress, level)
    }

    pub fn decompress(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Result<Self, PackError> {
        Self::new(source, destination, Direction::Decompress, None)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Compression level; always `None` for decompress jobs.
    pub fn level(&self) -> Option<i32> {
        match self.direction {
            Direction::Compress => self.level,
            Direction::Decompress => None,
        }
    }
}

/// Ordered jobs plus the shared cursor workers claim from.
#[derive(Debug)]
pub struct JobQueue {
    jobs: Vec<Job>,
    cursor: AtomicUsize,
}

impl JobQueue {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self { jobs, cursor: AtomicUsize::new(0) }
    }

    /// Reserves the next unclaimed job. Each index is handed out once.
    pub fn claim(&self) -> Option<(usize, &Job)> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.jobs.get(index).map(|job| (index, job))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }
}
