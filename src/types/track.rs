//! Caption track descriptors

use serde::{Deserialize, Serialize};

/// A caption track as enumerated by a [`CaptionSource`](crate::source::CaptionSource).
///
/// Owned by the source; the selector only iterates and picks. `locator` is
/// opaque to the core and lets the source find the track again on fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Human-readable language name (e.g. "English (auto-generated)").
    pub display_language: String,
    /// Language code as reported by the source (e.g. "en", "pt-BR").
    pub language_code: String,
    pub is_generated: bool,
    pub is_translatable: bool,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub locator: String,
    /// Target language when this descriptor is a translation handle.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub translated_to: Option<String>,
}

impl TrackDescriptor {
    /// A human-authored track.
    pub fn manual(language_code: impl Into<String>, display_language: impl Into<String>) -> Self {
        Self {
            display_language: display_language.into(),
            language_code: language_code.into(),
            is_generated: false,
            is_translatable: true,
            locator: String::new(),
            translated_to: None,
        }
    }

    /// An automatically generated track.
    pub fn generated(
        language_code: impl Into<String>,
        display_language: impl Into<String>,
    ) -> Self {
        Self {
            is_generated: true,
            ..Self::manual(language_code, display_language)
        }
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = locator.into();
        self
    }

    pub fn translatable(mut self, translatable: bool) -> Self {
        self.is_translatable = translatable;
        self
    }

    /// Build the translation handle for `target`.
    pub fn translated(&self, target: impl Into<String>) -> Self {
        Self {
            translated_to: Some(target.into()),
            ..self.clone()
        }
    }

    /// Short label for logs: `en`, `en (generated)`, `de->en`.
    pub fn label(&self) -> String {
        let base = match &self.translated_to {
            Some(target) => format!("{}->{}", self.language_code, target),
            None => self.language_code.clone(),
        };
        if self.is_generated {
            format!("{base} (generated)")
        } else {
            base
        }
    }
}
