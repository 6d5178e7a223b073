//! Streaming codec loop
//!
//! Turns an arbitrary-length byte stream into compressed or decompressed
//! output using two fixed-size working buffers. Both directions go through
//! the same drain loop; they only differ in which [`Transform`] is opened and
//! in how the end of the stream is recognised.

pub mod deflate;
pub mod zstd_frames;

use crate::config::{CodecKind, DEFAULT_BUFFER_SIZE};
use crate::error::CodecError;
use crate::job::Direction;
use std::io::{ErrorKind, Read, Write};

/// Flush mode requested from a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    /// More input may follow.
    None,
    /// This is the last input; emit everything that is still buffered.
    Finish,
}

/// Outcome of one transform call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Step {
    pub consumed: usize,
    pub produced: usize,
    /// The stream is complete: footer written (compress) or end of the
    /// compressed stream reached (decompress).
    pub done: bool,
}

/// A stateful compress or decompress transform.
pub trait Transform {
    fn codec(&self) -> &'static str;

    fn transform(&mut self, input: &[u8], output: &mut [u8], flush: Flush)
        -> Result<Step, CodecError>;
}

/// Byte counts of one finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

fn open_transform(
    kind: CodecKind,
    direction: Direction,
    level: Option<i32>,
) -> Result<Box<dyn Transform>, CodecError> {
    let transform: Box<dyn Transform> = match (kind, direction) {
        (CodecKind::Zlib, Direction::Compress) => {
            Box::new(deflate::DeflateEncoder::new(kind.resolve_level(level)?))
        }
        (CodecKind::Zlib, Direction::Decompress) => Box::new(deflate::DeflateDecoder::new()),
        (CodecKind::Zstd, Direction::Compress) => {
            Box::new(zstd_frames::ZstdEncoder::new(kind.resolve_level(level)?)?)
        }
        (CodecKind::Zstd, Direction::Decompress) => Box::new(zstd_frames::ZstdDecoder::new()?),
    };
    Ok(transform)
}

/// Per-job codec state: the transform plus its input and output buffers.
pub struct CodecSession {
    transform: Box<dyn Transform>,
    direction: Direction,
    input: Vec<u8>,
    output: Vec<u8>,
}

impl CodecSession {
    pub fn open(
        kind: CodecKind,
        direction: Direction,
        level: Option<i32>,
        buffer_size: usize,
    ) -> Result<Self, CodecError> {
        let transform = open_transform(kind, direction, level)?;
        Ok(Self::with_transform(transform, direction, buffer_size))
    }

    pub fn with_transform(
        transform: Box<dyn Transform>,
        direction: Direction,
        buffer_size: usize,
    ) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            transform,
            direction,
            input: vec![0u8; buffer_size],
            output: vec![0u8; buffer_size],
        }
    }

    /// Pumps `reader` through the transform into `writer` until the stream
    /// is complete. Output already written stays written on failure.
    pub fn run<R, W>(mut self, reader: &mut R, writer: &mut W) -> Result<StreamStats, CodecError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let codec = self.transform.codec();
        let mut stats = StreamStats::default();

        loop {
            let filled = fill_buffer(reader, &mut self.input)?;
            let at_eof = filled < self.input.len();
            let flush = if at_eof { Flush::Finish } else { Flush::None };
            stats.bytes_in += filled as u64;

            let mut pending = &self.input[..filled];
            let mut done = false;

            // Drain loop: keep calling the transform until this chunk is
            // consumed and the output buffer came back less than full.
            loop {
                let step = self.transform.transform(pending, &mut self.output, flush)?;
                pending = &pending[step.consumed..];

                if step.produced > 0 {
                    writer.write_all(&self.output[..step.produced])?;
                    stats.bytes_out += step.produced as u64;
                }

                if step.done {
                    done = true;
                    break;
                }

                if step.consumed == 0 && step.produced == 0 {
                    if !pending.is_empty() {
                        return Err(CodecError::Stalled { codec });
                    }
                    break;
                }

                let drained = step.produced < self.output.len();
                if drained && pending.is_empty() && flush == Flush::None {
                    break;
                }
            }

            if done {
                if self.direction == Direction::Decompress {
                    let trailing = !pending.is_empty()
                        || (!at_eof && fill_buffer(reader, &mut self.input[..1])? > 0);
                    if trailing {
                        log::warn!("{} stream ended before end of input, ignoring trailing bytes", codec);
                    }
                }
                break;
            }

            if at_eof {
                return Err(match self.direction {
                    Direction::Compress => CodecError::Stalled { codec },
                    Direction::Decompress => CodecError::UnexpectedEnd { codec },
                });
            }
        }

        Ok(stats)
    }
}

/// Reads until `buf` is full or the reader hits end of stream.
fn fill_buffer<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Compresses or decompresses whole streams with one codec and a fixed
/// working buffer size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCodec {
    kind: CodecKind,
    buffer_size: usize,
}

impl Default for StreamCodec {
    fn default() -> Self {
        Self::new(CodecKind::default())
    }
}

impl StreamCodec {
    pub fn new(kind: CodecKind) -> Self {
        Self { kind, buffer_size: DEFAULT_BUFFER_SIZE }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn kind(&self) -> CodecKind {
        self.kind
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Runs one stream through the codec. `level` only applies to
    /// [`Direction::Compress`]; `None` picks the codec default.
    pub fn run<R, W>(
        &self,
        input: &mut R,
        output: &mut W,
        direction: Direction,
        level: Option<i32>,
    ) -> Result<StreamStats, CodecError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        CodecSession::open(self.kind, direction, level, self.buffer_size)?.run(input, output)
    }
}
