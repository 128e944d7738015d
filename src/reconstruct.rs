//! Host-side mirror of the bootstrap's reconstruction.

use crate::bootstrap::BootstrapVariant;
use crate::byte_map::{restringify, Interval};
use crate::compress::decompress;
use crate::error::{CompileError, CompilePhase};
use crate::z85;

/// Compressed, encoded page plus the source map needed to rebuild it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledPage {
    /// Z85 text of the compressed combined buffer.
    pub z85: String,
    /// Optimized source map over the decompressed buffer.
    pub source_map: Vec<Interval>,
}

impl CompiledPage {
    pub fn new(z85: String, source_map: Vec<Interval>) -> Self {
        Self { z85, source_map }
    }

    pub fn variant(&self) -> BootstrapVariant {
        BootstrapVariant::select(&self.source_map)
    }

    /// Source map as the `[[tag,start,end],...]` literal the bootstrap embeds.
    pub fn source_map_json(&self) -> Result<String, CompileError> {
        serde_json::to_string(&self.source_map).map_err(|e| {
            CompileError::new(CompilePhase::Bootstrap, "SOURCE_MAP_JSON", e.to_string())
        })
    }

    /// Rebuilds the source document exactly as the browser would.
    ///
    /// Unlike the browser, malformed Z85 text and source maps that do not
    /// tile the decompressed buffer are rejected.
    pub fn reconstruct(&self) -> Result<String, CompileError> {
        let packed = z85::decode_checked(&self.z85)?;
        let combined = decompress(&packed)?;

        let mut out = String::with_capacity(combined.len() + combined.len() / 3);
        let mut expected_start = 0usize;
        for (idx, interval) in self.source_map.iter().enumerate() {
            if interval.start != expected_start || interval.end < interval.start {
                return Err(map_error(idx, interval, "source map interval is not contiguous"));
            }
            let bytes = combined
                .get(interval.start..interval.end)
                .ok_or_else(|| map_error(idx, interval, "source map interval is out of range"))?;
            restringify(interval.tag, bytes, &mut out).map_err(|e| {
                CompileError::new(CompilePhase::Reconstruct, "SEGMENT_UTF8", e.to_string())
                    .with_fragment_index(idx)
                    .with_offset(interval.start)
            })?;
            expected_start = interval.end;
        }
        if expected_start != combined.len() {
            return Err(CompileError::new(
                CompilePhase::Reconstruct,
                "SOURCE_MAP_RANGE",
                format!(
                    "source map covers {} of {} bytes",
                    expected_start,
                    combined.len()
                ),
            ));
        }
        Ok(out)
    }
}

fn map_error(idx: usize, interval: &Interval, message: &str) -> CompileError {
    CompileError::new(CompilePhase::Reconstruct, "SOURCE_MAP_RANGE", message)
        .with_fragment_index(idx)
        .with_offset(interval.start)
}
