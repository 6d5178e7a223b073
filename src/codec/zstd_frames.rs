//! zstd frames via the zstd crate's raw streaming contexts.

use super::{Flush, Step, Transform};
use crate::error::CodecError;
use zstd::stream::raw::{Decoder, Encoder, InBuffer, Operation, OutBuffer};

const CODEC: &str = "zstd";

fn transform_error(e: std::io::Error) -> CodecError {
    CodecError::Transform { codec: CODEC, message: e.to_string() }
}

pub struct ZstdEncoder {
    inner: Encoder<'static>,
    finishing: bool,
}

impl ZstdEncoder {
    pub fn new(level: i32) -> Result<Self, CodecError> {
        let inner = Encoder::new(level).map_err(transform_error)?;
        Ok(Self { inner, finishing: false })
    }
}

impl Transform for ZstdEncoder {
    fn codec(&self) -> &'static str {
        CODEC
    }

    fn transform(&mut self, input: &[u8], output: &mut [u8], flush: Flush)
        -> Result<Step, CodecError> {
        let mut src = InBuffer::around(input);
        let mut dst = OutBuffer::around(output);

        // Once the epilogue has started only `finish` may be called.
        if !self.finishing {
            self.inner.run(&mut src, &mut dst).map_err(transform_error)?;
        }

        let mut done = false;
        if flush == Flush::Finish && src.pos() == input.len() {
            self.finishing = true;
            let remaining = self.inner.finish(&mut dst, true).map_err(transform_error)?;
            done = remaining == 0;
        }

        Ok(Step { consumed: src.pos(), produced: dst.pos(), done })
    }
}

const FRAME_MAGIC: u32 = 0xFD2F_B528;
const SKIPPABLE_MAGIC: u32 = 0x184D_2A50;
const MAGIC_LEN: usize = 4;

fn starts_frame(bytes: &[u8; MAGIC_LEN]) -> bool {
    let magic = u32::from_le_bytes(*bytes);
    magic == FRAME_MAGIC || magic & 0xFFFF_FFF0 == SKIPPABLE_MAGIC
}

pub struct ZstdDecoder {
    inner: Decoder<'static>,
    frame_complete: bool,
    // Start of the next frame when it straddles two input chunks.
    header: [u8; MAGIC_LEN],
    held: usize,
}

impl ZstdDecoder {
    pub fn new() -> Result<Self, CodecError> {
        let inner = Decoder::new().map_err(transform_error)?;
        Ok(Self { inner, frame_complete: false, header: [0; MAGIC_LEN], held: 0 })
    }

    /// Collects the first bytes after a finished frame. Returns `Some` when
    /// the call is settled without touching the decoder.
    fn collect_header(&mut self, input: &[u8], flush: Flush, taken: &mut usize)
        -> Result<Option<Step>, CodecError> {
        if self.held == 0 && input.len() >= MAGIC_LEN {
            let mut magic = [0u8; MAGIC_LEN];
            magic.copy_from_slice(&input[..MAGIC_LEN]);
            if !starts_frame(&magic) {
                // Leave the bytes unconsumed; the session reports them.
                return Ok(Some(Step { consumed: 0, produced: 0, done: true }));
            }
            return Ok(None);
        }

        *taken = (MAGIC_LEN - self.held).min(input.len());
        self.header[self.held..self.held + *taken].copy_from_slice(&input[..*taken]);
        self.held += *taken;

        if self.held < MAGIC_LEN {
            let done = flush == Flush::Finish;
            if done && self.held > 0 {
                log::warn!("{} stream ended before end of input, ignoring {} trailing bytes", CODEC, self.held);
            }
            return Ok(Some(Step { consumed: *taken, produced: 0, done }));
        }

        if !starts_frame(&self.header) {
            return Ok(Some(Step { consumed: 0, produced: 0, done: true }));
        }

        let mut src = InBuffer::around(&self.header[..]);
        let mut none = [0u8; 0];
        let mut dst = OutBuffer::around(&mut none[..]);
        self.inner.run(&mut src, &mut dst).map_err(transform_error)?;
        if src.pos() < MAGIC_LEN {
            return Err(CodecError::Transform {
                codec: CODEC,
                message: "frame header was not accepted".to_string(),
            });
        }
        self.held = 0;
        self.frame_complete = false;
        Ok(None)
    }
}

impl Transform for ZstdDecoder {
    fn codec(&self) -> &'static str {
        CODEC
    }

    // Frames may be concatenated. After a frame ends, the stream only goes
    // on if the next bytes carry a frame magic number; anything else is
    // left over as trailing input.
    fn transform(&mut self, input: &[u8], output: &mut [u8], flush: Flush)
        -> Result<Step, CodecError> {
        let mut taken = 0;
        if self.frame_complete && (self.held > 0 || !input.is_empty()) {
            if let Some(step) = self.collect_header(input, flush, &mut taken)? {
                return Ok(step);
            }
        }

        let rest = &input[taken..];
        let mut src = InBuffer::around(rest);
        let mut dst = OutBuffer::around(output);

        let hint = self.inner.run(&mut src, &mut dst).map_err(transform_error)?;
        let consumed = taken + src.pos();
        let produced = dst.pos();

        if hint == 0 {
            self.frame_complete = true;
        } else if src.pos() > 0 || produced > 0 {
            self.frame_complete = false;
        }

        let done = flush == Flush::Finish && consumed == input.len() && self.frame_complete;
        Ok(Step { consumed, produced, done })
    }
}
