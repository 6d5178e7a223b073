//! Builds the job list for a batch from an input file or directory.

use crate::config::CodecKind;
use crate::error::Result;
use crate::job::{Direction, Job};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix given to decompressed files whose name lacks the codec extension.
const RESTORED_SUFFIX: &str = "out";

#[derive(Debug, Clone)]
pub struct BatchPlanner {
    output_dir: PathBuf,
    codec: CodecKind,
    level: Option<i32>,
    recursive: bool,
}

impl BatchPlanner {
    pub fn new(output_dir: impl Into<PathBuf>, codec: CodecKind) -> Self {
        Self {
            output_dir: output_dir.into(),
            codec,
            level: None,
            recursive: false,
        }
    }

    pub fn with_level(mut self, level: Option<i32>) -> Self {
        self.level = level;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// One compress job per input file; outputs get the codec extension
    /// appended (`notes.txt` -> `notes.txt.zz`). Inside a directory, files
    /// already carrying the codec extension are left alone.
    pub fn compress_jobs(&self, input: &Path) -> Result<Vec<Job>> {
        let single_file = !input.is_dir();
        self.discover(input)
            .into_iter()
            .filter(|(source, relative)| {
                let keep = single_file || !self.has_codec_extension(relative);
                if !keep {
                    log::debug!("Skipping already compressed {}", source.display());
                }
                keep
            })
            .map(|(source, relative)| {
                let destination = append_extension(&self.output_dir.join(relative), self.codec.extension());
                Job::compress(source, destination, self.level)
            })
            .collect()
    }

    /// One decompress job per compressed file. Inside a directory only files
    /// carrying the codec extension are taken; the extension is stripped from
    /// the output name.
    pub fn decompress_jobs(&self, input: &Path) -> Result<Vec<Job>> {
        let single_file = !input.is_dir();
        self.discover(input)
            .into_iter()
            .filter(|(_, relative)| single_file || self.has_codec_extension(relative))
            .map(|(source, relative)| {
                let target = self.output_dir.join(&relative);
                let destination = if self.has_codec_extension(&relative) {
                    target.with_extension("")
                } else {
                    append_extension(&target, RESTORED_SUFFIX)
                };
                Job::decompress(source, destination)
            })
            .collect()
    }

    fn has_codec_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case(self.codec.extension()))
            .unwrap_or(false)
    }

    /// Regular files under `input` paired with their path relative to it.
    /// A non-directory input is returned as-is, even when it does not exist,
    /// so that opening it fails inside its own job.
    fn discover(&self, input: &Path) -> Vec<(PathBuf, PathBuf)> {
        if !input.is_dir() {
            let name = input
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| input.to_path_buf());
            return vec![(input.to_path_buf(), name)];
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        WalkDir::new(input)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let relative = entry
                    .path()
                    .strip_prefix(input)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(entry.file_name()));
                (entry.into_path(), relative)
            })
            .collect()
    }
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Creates the parent directory of every destination. Failures are only
/// logged; the affected jobs then fail on their own when opening output.
pub fn prepare_destinations(jobs: &[Job]) {
    for job in jobs {
        if let Some(parent) = job.destination().parent() {
            if parent.as_os_str().is_empty() || parent.is_dir() {
                continue;
            }
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Could not create {}: {}", parent.display(), e);
            }
        }
    }
}

/// Direction-specific entry point used by the command line.
pub fn plan(planner: &BatchPlanner, input: &Path, direction: Direction) -> Result<Vec<Job>> {
    match direction {
        Direction::Compress => planner.compress_jobs(input),
        Direction::Decompress => planner.decompress_jobs(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.bin"), b"bbb").unwrap();
        fs::write(dir.path().join("a.txt"), b"aaa").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.txt"), b"ccc").unwrap();
        dir
    }

    #[test]
    fn test_directory_is_flat_by_default() {
        let dir = layout();
        let out = dir.path().join("out");
        let jobs = BatchPlanner::new(&out, CodecKind::Zlib).compress_jobs(dir.path()).unwrap();

        let destinations: Vec<PathBuf> = jobs.iter().map(|j| j.destination().to_path_buf()).collect();
        assert_eq!(destinations, vec![out.join("a.txt.zz"), out.join("b.bin.zz")]);
        assert!(jobs.iter().all(|j| j.direction() == Direction::Compress));
    }

    #[test]
    fn test_compress_skips_previous_outputs() {
        let dir = layout();
        fs::write(dir.path().join("a.txt.zz"), b"").unwrap();
        fs::write(dir.path().join("b.bin.zst"), b"").unwrap();

        // Compressing a directory into itself a second time.
        let jobs = BatchPlanner::new(dir.path(), CodecKind::Zlib).compress_jobs(dir.path()).unwrap();
        let sources: Vec<PathBuf> = jobs.iter().map(|j| j.source().to_path_buf()).collect();
        assert_eq!(
            sources,
            vec![dir.path().join("a.txt"), dir.path().join("b.bin"), dir.path().join("b.bin.zst")]
        );

        // An explicitly named file is still taken.
        let single = dir.path().join("a.txt.zz");
        let jobs = BatchPlanner::new(dir.path(), CodecKind::Zlib).compress_jobs(&single).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].destination(), dir.path().join("a.txt.zz.zz"));
    }

    #[test]
    fn test_recursive_keeps_relative_layout() {
        let dir = layout();
        let out = dir.path().join("out");
        let jobs = BatchPlanner::new(&out, CodecKind::Zstd)
            .with_level(Some(19))
            .recursive(true)
            .compress_jobs(dir.path())
            .unwrap();

        assert_eq!(jobs.len(), 3);
        assert!(jobs.iter().any(|j| j.destination() == out.join("sub").join("c.txt.zst")));
        assert!(jobs.iter().all(|j| j.level() == Some(19)));
    }

    #[test]
    fn test_decompress_filters_and_strips_extension() {
        let dir = layout();
        fs::write(dir.path().join("a.txt.zz"), b"").unwrap();
        fs::write(dir.path().join("other.zst"), b"").unwrap();
        let out = dir.path().join("restored");

        let jobs = BatchPlanner::new(&out, CodecKind::Zlib).decompress_jobs(dir.path()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].source(), dir.path().join("a.txt.zz"));
        assert_eq!(jobs[0].destination(), out.join("a.txt"));
        assert_eq!(jobs[0].direction(), Direction::Decompress);
    }

    #[test]
    fn test_single_file_without_extension() {
        let dir = layout();
        let input = dir.path().join("b.bin");
        let jobs = BatchPlanner::new(dir.path(), CodecKind::Zlib).decompress_jobs(&input).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].destination(), dir.path().join("b.bin.out"));
    }

    #[test]
    fn test_missing_input_still_yields_a_job() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.txt");
        let jobs = BatchPlanner::new(dir.path(), CodecKind::Zlib).compress_jobs(&missing).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].source(), missing);
    }

    #[test]
    fn test_prepare_destinations_creates_parents() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("x").join("y").join("file.zz");
        let job = Job::compress(dir.path().join("file"), &nested, None).unwrap();
        prepare_destinations(&[job]);
        assert!(dir.path().join("x").join("y").is_dir());
    }
}
