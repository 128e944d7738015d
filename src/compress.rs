//! LZMA adapter over the combined page buffer.
//!
//! Output uses the legacy `.lzma` ("alone") container: a 13-byte header
//! (properties byte, little-endian dictionary size, unknown uncompressed
//! size as eight `0xFF` bytes) followed by a range-coded stream closed with
//! an end marker. `bootstrap/lzma.js` decodes exactly this layout.

use std::io::{Read, Write};

use xz2::read::XzDecoder;
use xz2::stream::{LzmaOptions, Stream};
use xz2::write::XzEncoder;

use crate::error::{CompileError, CompilePhase};

/// liblzma `LZMA_PRESET_EXTREME` flag.
pub const PRESET_EXTREME: u32 = 0x8000_0000;

/// Length of the `.lzma` header.
pub const HEADER_LEN: usize = 13;

/// Encoder effort.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressOptions {
    /// liblzma preset level, 0..=9.
    pub preset: u32,
    /// Spend extra CPU time searching for a slightly smaller stream.
    pub extreme: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            preset: 9,
            extreme: true,
        }
    }
}

impl CompressOptions {
    /// Cheap preset for tests and previews.
    pub fn fast() -> Self {
        Self {
            preset: 1,
            extreme: false,
        }
    }

    fn preset_flags(self) -> u32 {
        let level = self.preset.min(9);
        if self.extreme {
            level | PRESET_EXTREME
        } else {
            level
        }
    }
}

/// Compresses `data` as one `.lzma` block.
pub fn compress(data: &[u8], options: CompressOptions) -> Result<Vec<u8>, CompileError> {
    let lzma = LzmaOptions::new_preset(options.preset_flags()).map_err(|e| {
        CompileError::new(CompilePhase::Compress, "LZMA_PRESET", e.to_string())
    })?;
    let stream = Stream::new_lzma_encoder(&lzma).map_err(|e| {
        CompileError::new(CompilePhase::Compress, "LZMA_ENCODER", e.to_string())
    })?;

    let mut encoder = XzEncoder::new_stream(Vec::with_capacity(data.len() / 3 + 64), stream);
    encoder
        .write_all(data)
        .map_err(|e| CompileError::new(CompilePhase::Compress, "LZMA_ENCODER", e.to_string()))?;
    let out = encoder
        .finish()
        .map_err(|e| CompileError::new(CompilePhase::Compress, "LZMA_ENCODER", e.to_string()))?;

    log::debug!(
        "lzma preset={} extreme={}: {} -> {} bytes",
        options.preset,
        options.extreme,
        data.len(),
        out.len()
    );
    Ok(out)
}

/// Decompresses a `.lzma` stream produced by [`compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CompileError> {
    let stream = Stream::new_lzma_decoder(u64::MAX).map_err(|e| {
        CompileError::new(CompilePhase::Reconstruct, "LZMA_DECODER", e.to_string())
    })?;
    let mut decoder = XzDecoder::new_stream(data, stream);
    let mut out = Vec::with_capacity(data.len().saturating_mul(3));
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CompileError::new(CompilePhase::Reconstruct, "LZMA_DECODER", e.to_string()))?;
    Ok(out)
}
