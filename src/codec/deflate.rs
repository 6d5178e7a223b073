//! zlib-wrapped deflate via flate2's low-level streaming state.

use super::{Flush, Step, Transform};
use crate::error::CodecError;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

const CODEC: &str = "zlib";

pub struct DeflateEncoder {
    inner: Compress,
}

impl DeflateEncoder {
    /// `level` must already be inside 0..=9.
    pub fn new(level: i32) -> Self {
        let level = Compression::new(level.clamp(0, 9) as u32);
        Self { inner: Compress::new(level, true) }
    }
}

impl Transform for DeflateEncoder {
    fn codec(&self) -> &'static str {
        CODEC
    }

    fn transform(&mut self, input: &[u8], output: &mut [u8], flush: Flush)
        -> Result<Step, CodecError> {
        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();
        let mode = match flush {
            Flush::None => FlushCompress::None,
            Flush::Finish => FlushCompress::Finish,
        };

        let status = self
            .inner
            .compress(input, output, mode)
            .map_err(|e| CodecError::Transform { codec: CODEC, message: e.to_string() })?;

        Ok(Step {
            consumed: (self.inner.total_in() - before_in) as usize,
            produced: (self.inner.total_out() - before_out) as usize,
            done: matches!(status, Status::StreamEnd),
        })
    }
}

pub struct DeflateDecoder {
    inner: Decompress,
}

impl DeflateDecoder {
    pub fn new() -> Self {
        Self { inner: Decompress::new(true) }
    }
}

impl Default for DeflateDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for DeflateDecoder {
    fn codec(&self) -> &'static str {
        CODEC
    }

    // The end of a zlib stream is marked in-band, so the flush mode is unused.
    fn transform(&mut self, input: &[u8], output: &mut [u8], _flush: Flush)
        -> Result<Step, CodecError> {
        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();

        let status = self
            .inner
            .decompress(input, output, FlushDecompress::None)
            .map_err(|e| CodecError::Transform { codec: CODEC, message: e.to_string() })?;

        Ok(Step {
            consumed: (self.inner.total_in() - before_in) as usize,
            produced: (self.inner.total_out() - before_out) as usize,
            done: matches!(status, Status::StreamEnd),
        })
    }
}
