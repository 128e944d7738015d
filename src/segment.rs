//! Splits an HTML document into plain-text and base64 `data:` URI fragments.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CompileError, CompilePhase};

/// Matches a `data:` URI with a base64 payload. The media type may span
/// lines but never a comma, so the first comma of a match always ends the
/// `;base64,` marker.
static DATA_URI_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)data:[^,]*?base64,[A-Za-z0-9+/]+={0,2}"));

/// Fragment classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Ordinary markup or text.
    Text,
    /// A complete `data:<mime>;base64,<payload>` URI.
    Base64DataUri,
}

/// One ordered slice of the source document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fragment<'a> {
    /// How the fragment must be mapped to bytes.
    pub kind: FragmentKind,
    /// Borrowed source text.
    pub text: &'a str,
    /// Byte offset of `text` in the source document.
    pub offset: usize,
}

impl<'a> Fragment<'a> {
    fn text(text: &'a str, offset: usize) -> Self {
        Self {
            kind: FragmentKind::Text,
            text,
            offset,
        }
    }

    fn data_uri(text: &'a str, offset: usize) -> Self {
        Self {
            kind: FragmentKind::Base64DataUri,
            text,
            offset,
        }
    }

    /// Splits a data URI fragment at its first comma into the prefix
    /// (`data:<mime>;base64,`, comma included) and the base64 payload.
    ///
    /// Returns `None` for text fragments.
    pub fn split_data_uri(&self) -> Option<(&'a str, &'a str)> {
        if self.kind != FragmentKind::Base64DataUri {
            return None;
        }
        let comma = self.text.find(',')?;
        Some(self.text.split_at(comma + 1))
    }
}

/// Splits `html` into ordered fragments without a fragment budget.
pub fn segment(html: &str) -> Result<Vec<Fragment<'_>>, CompileError> {
    segment_with_limits(html, usize::MAX)
}

/// Splits `html` into ordered fragments, failing once more than
/// `max_fragments` would be produced.
///
/// Empty gaps between adjacent data URIs are dropped. An empty document
/// yields a single empty text fragment.
pub fn segment_with_limits(
    html: &str,
    max_fragments: usize,
) -> Result<Vec<Fragment<'_>>, CompileError> {
    let pattern = DATA_URI_PATTERN.as_ref().map_err(|e| {
        CompileError::new(CompilePhase::Segment, "DATA_URI_PATTERN", e.to_string())
    })?;

    let mut fragments = Vec::new();
    let mut cursor = 0usize;
    for found in pattern.find_iter(html) {
        if found.start() > cursor {
            push_fragment(
                &mut fragments,
                Fragment::text(&html[cursor..found.start()], cursor),
                max_fragments,
            )?;
        }
        push_fragment(
            &mut fragments,
            Fragment::data_uri(found.as_str(), found.start()),
            max_fragments,
        )?;
        cursor = found.end();
    }
    if cursor < html.len() || fragments.is_empty() {
        push_fragment(
            &mut fragments,
            Fragment::text(&html[cursor..], cursor),
            max_fragments,
        )?;
    }

    log::debug!(
        "segmented {} bytes into {} fragments ({} data URIs)",
        html.len(),
        fragments.len(),
        fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Base64DataUri)
            .count()
    );
    Ok(fragments)
}

fn push_fragment<'a>(
    fragments: &mut Vec<Fragment<'a>>,
    fragment: Fragment<'a>,
    max_fragments: usize,
) -> Result<(), CompileError> {
    if fragments.len() >= max_fragments {
        return Err(CompileError::new(
            CompilePhase::Segment,
            "TOO_MANY_FRAGMENTS",
            "document splits into more fragments than allowed",
        )
        .with_offset(fragment.offset)
        .with_limit("max_fragments", fragments.len() + 1, max_fragments));
    }
    fragments.push(fragment);
    Ok(())
}
