//! Caption sources and transcript selection.
//!
//! - [`CaptionSource`]: the upstream seam (list, fetch, translate, direct fetch)
//! - [`TranscriptSourceSelector`]: tiered track selection over a source
//! - [`YtDlpCaptionSource`]: production source backed by `yt-dlp` metadata
//!   and the json3 caption endpoint

mod selector;
mod tiers;
mod traits;
mod ytdlp;

pub use selector::{
    SelectionContext, SelectionTier, TranscriptSourceSelector, default_tiers, first_success,
};
pub use tiers::{AutoLanguage, DirectFallback, ExactLanguage, LastResort, Translate};
pub use traits::CaptionSource;
pub use ytdlp::YtDlpCaptionSource;
