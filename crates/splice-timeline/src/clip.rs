//! Clip types for the timeline.

use splice_core::TimeRange;

use crate::item::{Item, Metadata};

/// What kind of media a [`MediaReference`] points at.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaReferenceKind {
    /// Media addressed by URL or path.
    External { target_url: String },
    /// The media is unknown or offline.
    Missing,
    /// Media synthesised on demand (bars, solids, slates).
    Generator {
        generator_kind: String,
        parameters: Metadata,
    },
}

/// Reference to a media source.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaReference {
    pub name: String,
    /// Extent of the media itself, when known.
    pub available_range: Option<TimeRange>,
    pub metadata: Metadata,
    pub kind: MediaReferenceKind,
}

impl MediaReference {
    /// Create a reference to external media.
    pub fn external(target_url: impl Into<String>, available_range: Option<TimeRange>) -> Self {
        Self {
            name: String::new(),
            available_range,
            metadata: Metadata::new(),
            kind: MediaReferenceKind::External {
                target_url: target_url.into(),
            },
        }
    }

    /// Placeholder for media that is not available.
    pub fn missing() -> Self {
        Self {
            name: String::new(),
            available_range: None,
            metadata: Metadata::new(),
            kind: MediaReferenceKind::Missing,
        }
    }

    pub fn generator(generator_kind: impl Into<String>, available_range: Option<TimeRange>) -> Self {
        Self {
            name: String::new(),
            available_range,
            metadata: Metadata::new(),
            kind: MediaReferenceKind::Generator {
                generator_kind: generator_kind.into(),
                parameters: Metadata::new(),
            },
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.kind, MediaReferenceKind::Missing)
    }

    /// Schema name this reference encodes under.
    pub fn schema_name(&self) -> &'static str {
        match self.kind {
            MediaReferenceKind::External { .. } => "ExternalReference",
            MediaReferenceKind::Missing => "MissingReference",
            MediaReferenceKind::Generator { .. } => "GeneratorReference",
        }
    }
}

impl Default for MediaReference {
    fn default() -> Self {
        Self::missing()
    }
}

/// A clip on the timeline: a window onto a piece of media.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Clip {
    pub item: Item,
    pub media_reference: MediaReference,
}

impl Clip {
    /// Create a clip with a missing media reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            item: Item::new(name),
            media_reference: MediaReference::missing(),
        }
    }

    /// Create a clip from a media reference, optionally trimmed.
    pub fn with_media(
        name: impl Into<String>,
        media_reference: MediaReference,
        source_range: Option<TimeRange>,
    ) -> Self {
        Self {
            item: Item {
                source_range,
                ..Item::new(name)
            },
            media_reference,
        }
    }
}
