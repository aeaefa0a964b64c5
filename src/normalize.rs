//! Duration repair for transcript segments.
//!
//! Speech-to-text backends and some caption payloads leave durations at
//! zero. [`normalize_durations`] infers them from neighbouring start times.

use crate::types::TranscriptSegment;

/// Fill in missing (`NaN`) or non-positive durations.
///
/// - Not the last segment: gap to the next segment's start.
/// - Last segment with a predecessor: gap from the previous start (an estimate).
/// - Only segment: zero.
///
/// Inferred values are rounded to milliseconds and never negative. Order and
/// length are preserved; valid durations pass through unchanged.
pub fn normalize_durations(mut segments: Vec<TranscriptSegment>) -> Vec<TranscriptSegment> {
    let n = segments.len();
    for i in 0..n {
        if segments[i].duration > 0.0 {
            continue;
        }
        let start = segments[i].start;
        let filled = if i + 1 < n {
            round_millis(segments[i + 1].start - start)
        } else if i > 0 {
            round_millis(start - segments[i - 1].start)
        } else {
            0.0
        };
        segments[i].duration = filled.max(0.0);
    }
    segments
}

fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}
