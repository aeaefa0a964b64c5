//! The built-in selection tiers, in the order the selector runs them.
//!
//! Every tier swallows its own per-track failures (logged at `debug`) so a
//! broken track never stops the cascade.

use async_trait::async_trait;
use tracing::debug;

use super::selector::{SelectionContext, SelectionTier};
use crate::types::TranscriptSegment;

/// Tiers 1 and 3: a track of the given kind whose code matches a preferred
/// language exactly, tried in preference order.
pub struct ExactLanguage {
    generated: bool,
}

impl ExactLanguage {
    pub fn manual() -> Self {
        Self { generated: false }
    }

    pub fn generated() -> Self {
        Self { generated: true }
    }
}

#[async_trait]
impl SelectionTier for ExactLanguage {
    fn name(&self) -> &'static str {
        if self.generated {
            "generated_exact"
        } else {
            "manual_exact"
        }
    }

    async fn attempt(&self, ctx: &SelectionContext<'_>) -> Option<Vec<TranscriptSegment>> {
        for language in &ctx.preferred {
            let Some(track) = ctx
                .tracks
                .iter()
                .find(|t| t.is_generated == self.generated && t.language_code == *language)
            else {
                debug!(tier = self.name(), language, "no matching track");
                continue;
            };
            debug!(tier = self.name(), track = %track.label(), "selected track");
            match ctx.fetch(track, "fetch").await {
                Ok(segments) => return Some(segments),
                Err(e) => debug!(tier = self.name(), language, error = %e, "track not usable"),
            }
        }
        None
    }
}

/// Tier 2: machine-translate a track into the requested language.
///
/// When the translated fetch fails after retries, the original track is
/// returned instead (untranslated beats nothing). Skipped entirely when the
/// request disables translation, and for `auto` requests, which name no
/// target.
pub struct Translate;

#[async_trait]
impl SelectionTier for Translate {
    fn name(&self) -> &'static str {
        "translate"
    }

    async fn attempt(&self, ctx: &SelectionContext<'_>) -> Option<Vec<TranscriptSegment>> {
        if ctx.key.disable_translate || ctx.key.is_auto() {
            return None;
        }
        let target = ctx.key.target_language();
        for track in &ctx.tracks {
            if !track.is_translatable || track.language_code.eq_ignore_ascii_case(target) {
                continue;
            }
            let translated = match ctx.source.translate(track, target).await {
                Ok(handle) => handle,
                Err(e) => {
                    debug!(from = %track.language_code, target, error = %e, "translation setup failed");
                    continue;
                }
            };
            debug!(from = %track.language_code, target, "translate attempt");
            match ctx.fetch(&translated, "fetch_translated").await {
                Ok(segments) => return Some(segments),
                Err(e) => {
                    debug!(
                        from = %track.language_code,
                        error = %e,
                        "translation failed; degrading to original"
                    );
                    match ctx.fetch(track, "fetch_original").await {
                        Ok(segments) => return Some(segments),
                        Err(e) => {
                            debug!(track = %track.label(), error = %e, "degraded fetch failed")
                        }
                    }
                }
            }
        }
        None
    }
}

/// Tier 4: only for `auto` requests. Any manual track, then any generated one.
pub struct AutoLanguage;

#[async_trait]
impl SelectionTier for AutoLanguage {
    fn name(&self) -> &'static str {
        "auto"
    }

    async fn attempt(&self, ctx: &SelectionContext<'_>) -> Option<Vec<TranscriptSegment>> {
        if !ctx.key.is_auto() {
            return None;
        }
        for generated in [false, true] {
            for track in ctx.tracks.iter().filter(|t| t.is_generated == generated) {
                debug!(track = %track.label(), "auto picked track");
                match ctx.fetch(track, "fetch").await {
                    Ok(segments) => return Some(segments),
                    Err(e) => debug!(track = %track.label(), error = %e, "auto candidate failed"),
                }
            }
        }
        None
    }
}

/// Tier 5: every track in enumeration order, whatever its language or kind.
pub struct LastResort;

#[async_trait]
impl SelectionTier for LastResort {
    fn name(&self) -> &'static str {
        "last_resort"
    }

    async fn attempt(&self, ctx: &SelectionContext<'_>) -> Option<Vec<TranscriptSegment>> {
        for track in &ctx.tracks {
            debug!(track = %track.label(), "last-resort try");
            match ctx.fetch(track, "fetch").await {
                Ok(segments) => return Some(segments),
                Err(e) => debug!(track = %track.label(), error = %e, "last-resort failed"),
            }
        }
        None
    }
}

/// Tier 6: ask the source directly with the full preferred-language list.
pub struct DirectFallback;

#[async_trait]
impl SelectionTier for DirectFallback {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn attempt(&self, ctx: &SelectionContext<'_>) -> Option<Vec<TranscriptSegment>> {
        match ctx.source.direct_fetch(&ctx.key.video_id, &ctx.preferred).await {
            Ok(segments) if !segments.is_empty() => Some(segments),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "direct fallback failed");
                None
            }
        }
    }
}
