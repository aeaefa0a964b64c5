//! Public types for the Skald API.

mod request;
mod segment;
mod track;

pub use request::{AUTO_LANGUAGE, RequestKey, SttBackendChoice, TranscriptRequest};
pub use segment::TranscriptSegment;
pub use track::TrackDescriptor;
