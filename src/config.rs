use crate::error::{CodecError, PackError};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Working buffer size used by `StreamCodec` when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024; // 1 MiB

/// Stream format used for every job of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecKind {
    /// zlib-wrapped deflate
    #[default]
    Zlib,
    Zstd,
}

impl CodecKind {
    pub fn name(self) -> &'static str {
        match self {
            CodecKind::Zlib => "zlib",
            CodecKind::Zstd => "zstd",
        }
    }

    /// File extension (without the dot) the batch collaborators use for
    /// compressed output.
    pub fn extension(self) -> &'static str {
        match self {
            CodecKind::Zlib => "zz",
            CodecKind::Zstd => "zst",
        }
    }

    pub fn level_range(self) -> RangeInclusive<i32> {
        match self {
            CodecKind::Zlib => 0..=9,
            CodecKind::Zstd => 1..=22,
        }
    }

    pub fn default_level(self) -> i32 {
        match self {
            CodecKind::Zlib => 6,
            CodecKind::Zstd => 3,
        }
    }

    /// Resolves an optional level to the one the transform will use.
    pub fn resolve_level(self, level: Option<i32>) -> Result<i32, CodecError> {
        let level = level.unwrap_or_else(|| self.default_level());
        let range = self.level_range();
        if range.contains(&level) {
            Ok(level)
        } else {
            Err(CodecError::InvalidLevel {
                codec: self.name(),
                level,
                min: *range.start(),
                max: *range.end(),
            })
        }
    }
}

impl FromStr for CodecKind {
    type Err = PackError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zlib" | "deflate" => Ok(CodecKind::Zlib),
            "zstd" => Ok(CodecKind::Zstd),
            _ => Err(PackError::Config(format!("Invalid codec: {}", s))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
    pub codec: CodecKind,
    pub buffer_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            codec: CodecKind::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl PoolConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn validate(&self) -> Result<(), PackError> {
        if self.workers == 0 {
            return Err(PackError::Config("Worker count must be at least 1".into()));
        }
        if self.buffer_size == 0 {
            return Err(PackError::Config("Buffer size must be at least 1 byte".into()));
        }
        Ok(())
    }
}
