//! Merges runs of adjacent same-tag intervals.

use crate::byte_map::{IntermediateCompiledPage, Interval};

/// Collapses every run of consecutive intervals sharing a tag into one
/// interval, concatenating the matching byte segments in order.
///
/// Only immediately adjacent intervals merge, so `Utf8, Base64, Utf8` stays
/// three intervals. The combined buffer is unchanged.
pub fn optimize(page: IntermediateCompiledPage) -> IntermediateCompiledPage {
    let before = page.len();
    let (segments, source_map) = page.into_parts();

    let mut out = IntermediateCompiledPage::new();
    let mut pending: Option<(Interval, Vec<u8>)> = None;
    for (interval, bytes) in source_map.into_iter().zip(segments) {
        pending = Some(match pending.take() {
            Some((run, mut run_bytes)) if run.tag == interval.tag => {
                run_bytes.extend_from_slice(&bytes);
                (Interval::new(run.tag, run.start, interval.end), run_bytes)
            }
            Some((run, run_bytes)) => {
                out.push(run.tag, run_bytes);
                (interval, bytes)
            }
            None => (interval, bytes),
        });
    }
    if let Some((run, run_bytes)) = pending {
        out.push(run.tag, run_bytes);
    }

    log::debug!("optimized source map from {} to {} intervals", before, out.len());
    out
}
