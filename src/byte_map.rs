//! Maps segmenter fragments onto one combined byte buffer and its source map.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::ser::{Serialize, Serializer};

use crate::error::{CompileError, CompilePhase};
use crate::segment::{Fragment, FragmentKind};

/// How a byte range is turned back into text during reconstruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncodingTag {
    /// Bytes are UTF-8 text.
    Utf8,
    /// Bytes are decoded base64 and must be re-encoded.
    Base64,
}

impl EncodingTag {
    /// Numeric value used in the emitted source map.
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Utf8 => 0,
            Self::Base64 => 1,
        }
    }

    /// Inverse of [`wire_value`](Self::wire_value).
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Utf8),
            1 => Some(Self::Base64),
            _ => None,
        }
    }
}

impl Serialize for EncodingTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.wire_value())
    }
}

/// Tagged half-open byte range `[start, end)` of the combined buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    pub tag: EncodingTag,
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(tag: EncodingTag, start: usize, end: usize) -> Self {
        Self { tag, start, end }
    }

    /// Zero for an inverted range.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serialized as the 3-tuple `[tag, start, end]`.
impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.tag, self.start, self.end).serialize(serializer)
    }
}

/// Combined buffer pieces and their source map, kept in lockstep.
///
/// `byte_segments[i].len() == source_map[i].len()` for every `i`, and the
/// intervals tile `[0, combined_len)` without gaps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntermediateCompiledPage {
    byte_segments: Vec<Vec<u8>>,
    source_map: Vec<Interval>,
}

impl IntermediateCompiledPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` as the next interval tagged `tag`.
    pub(crate) fn push(&mut self, tag: EncodingTag, bytes: Vec<u8>) {
        let start = self.combined_len();
        let end = start + bytes.len();
        self.source_map.push(Interval::new(tag, start, end));
        self.byte_segments.push(bytes);
    }

    pub fn byte_segments(&self) -> &[Vec<u8>] {
        &self.byte_segments
    }

    pub fn source_map(&self) -> &[Interval] {
        &self.source_map
    }

    /// Number of intervals.
    pub fn len(&self) -> usize {
        self.source_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_map.is_empty()
    }

    /// Total byte length of the combined buffer.
    pub fn combined_len(&self) -> usize {
        self.source_map.last().map_or(0, |interval| interval.end)
    }

    /// Concatenates all segments into the combined buffer.
    pub fn concat(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.combined_len());
        for segment in &self.byte_segments {
            out.extend_from_slice(segment);
        }
        out
    }

    /// Rebuilds the source text from the segments, per their tags.
    pub fn reassemble(&self) -> Result<String, CompileError> {
        let mut out = String::with_capacity(self.combined_len());
        for (idx, (interval, bytes)) in self
            .source_map
            .iter()
            .zip(self.byte_segments.iter())
            .enumerate()
        {
            restringify(interval.tag, bytes, &mut out).map_err(|e| {
                CompileError::new(CompilePhase::Reconstruct, "SEGMENT_UTF8", e.to_string())
                    .with_fragment_index(idx)
                    .with_offset(interval.start)
            })?;
        }
        Ok(out)
    }

    pub fn into_parts(self) -> (Vec<Vec<u8>>, Vec<Interval>) {
        (self.byte_segments, self.source_map)
    }
}

/// Appends the text form of `bytes` under `tag` to `out`.
pub(crate) fn restringify(
    tag: EncodingTag,
    bytes: &[u8],
    out: &mut String,
) -> Result<(), core::str::Utf8Error> {
    match tag {
        EncodingTag::Utf8 => out.push_str(core::str::from_utf8(bytes)?),
        EncodingTag::Base64 => BASE64.encode_string(bytes, out),
    }
    Ok(())
}

/// Maps fragments to byte segments without a payload budget.
pub fn map_fragments(fragments: &[Fragment<'_>]) -> Result<IntermediateCompiledPage, CompileError> {
    map_fragments_with_limits(fragments, usize::MAX)
}

/// Maps fragments to byte segments in order.
///
/// Text fragments become one `Utf8` segment. Data URI fragments become a
/// `Utf8` prefix segment (`data:<mime>;base64,`) followed by a `Base64`
/// segment holding the decoded payload bytes. A payload that is not
/// canonical standard base64 aborts the mapping.
pub fn map_fragments_with_limits(
    fragments: &[Fragment<'_>],
    max_payload_bytes: usize,
) -> Result<IntermediateCompiledPage, CompileError> {
    let mut page = IntermediateCompiledPage::new();
    for (idx, fragment) in fragments.iter().enumerate() {
        match fragment.kind {
            FragmentKind::Text => page.push(EncodingTag::Utf8, fragment.text.as_bytes().to_vec()),
            FragmentKind::Base64DataUri => {
                let (prefix, payload) = fragment.split_data_uri().ok_or_else(|| {
                    CompileError::new(
                        CompilePhase::ByteMap,
                        "DATA_URI_PREFIX",
                        "data URI fragment has no comma",
                    )
                    .with_fragment_index(idx)
                    .with_offset(fragment.offset)
                })?;
                let payload_offset = fragment.offset + prefix.len();
                let decoded = BASE64.decode(payload).map_err(|e| {
                    CompileError::new(
                        CompilePhase::ByteMap,
                        "BASE64_PAYLOAD",
                        format!("malformed base64 payload: {}", e),
                    )
                    .with_fragment_index(idx)
                    .with_offset(payload_offset)
                })?;
                if decoded.len() > max_payload_bytes {
                    return Err(CompileError::new(
                        CompilePhase::ByteMap,
                        "PAYLOAD_TOO_LARGE",
                        "decoded data URI payload exceeds budget",
                    )
                    .with_fragment_index(idx)
                    .with_offset(payload_offset)
                    .with_limit("max_payload_bytes", decoded.len(), max_payload_bytes));
                }
                page.push(EncodingTag::Utf8, prefix.as_bytes().to_vec());
                page.push(EncodingTag::Base64, decoded);
            }
        }
    }

    log::debug!(
        "mapped {} fragments into {} segments ({} bytes)",
        fragments.len(),
        page.len(),
        page.combined_len()
    );
    Ok(page)
}
