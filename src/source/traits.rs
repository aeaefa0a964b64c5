//! Caption source trait.
//!
//! A caption source enumerates the caption tracks of a video and fetches
//! them. The selector never talks to the upstream directly; everything goes
//! through this seam so tests can script every failure mode.
//!
//! # Error contract
//!
//! - `list_tracks` returns [`SkaldError::NoTranscripts`] or
//!   [`SkaldError::TranscriptsDisabled`] when the video has no captions at
//!   all. These are terminal and never retried.
//! - Rate limiting is [`SkaldError::RateLimited`]; an empty payload may be
//!   returned as `Ok(vec![])` or [`SkaldError::EmptyTranscript`]. Both are
//!   retried by the [`RetryExecutor`](crate::RetryExecutor).
//! - Anything else is treated as permanent for that track.

use async_trait::async_trait;

use crate::types::{TrackDescriptor, TranscriptSegment};
use crate::{Result, SkaldError};

/// Upstream caption provider.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Source name for logging/debugging.
    fn name(&self) -> &str;

    /// Whether [`list_tracks`](Self::list_tracks) is available. Sources
    /// without listing are only asked for [`direct_fetch`](Self::direct_fetch).
    fn supports_listing(&self) -> bool {
        true
    }

    /// Enumerate caption tracks in the source's native order.
    async fn list_tracks(&self, _video_id: &str) -> Result<Vec<TrackDescriptor>> {
        Err(SkaldError::Unsupported)
    }

    /// Fetch the segments of one track (or translation handle).
    async fn fetch(&self, track: &TrackDescriptor) -> Result<Vec<TranscriptSegment>>;

    /// Produce a fetchable handle for `track` machine-translated to `target`.
    ///
    /// Default implementation marks the descriptor as translated; sources
    /// that need a different locator for translations override this.
    async fn translate(&self, track: &TrackDescriptor, target: &str) -> Result<TrackDescriptor> {
        if !track.is_translatable {
            return Err(SkaldError::TranslationUnavailable(target.to_string()));
        }
        Ok(track.translated(target))
    }

    /// Fetch the first track matching any of `languages`, in order,
    /// without going through listing.
    async fn direct_fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<Vec<TranscriptSegment>>;
}
