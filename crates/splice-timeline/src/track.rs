//! Composition payloads: tracks and stacks.
//!
//! Children are not stored here; the owning [`Graph`](crate::graph::Graph)
//! keeps the ordered child handles next to each payload.

use serde::{Deserialize, Serialize};
use splice_core::RationalTime;

use crate::graph::NodeId;
use crate::item::Item;

/// Kind of track.
///
/// Kinds are free-form in the portable encoding; anything other than the
/// two well-known kinds is kept verbatim in [`TrackKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrackKind {
    #[default]
    Video,
    Audio,
    Other(String),
}

impl TrackKind {
    pub fn as_str(&self) -> &str {
        match self {
            TrackKind::Video => "Video",
            TrackKind::Audio => "Audio",
            TrackKind::Other(kind) => kind,
        }
    }

    pub fn parse(kind: &str) -> Self {
        Self::from(kind.to_string())
    }
}

impl From<String> for TrackKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "Video" => TrackKind::Video,
            "Audio" => TrackKind::Audio,
            _ => TrackKind::Other(kind),
        }
    }
}

impl From<TrackKind> for String {
    fn from(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

/// Whether [`Graph::neighbors_of`](crate::graph::Graph::neighbors_of)
/// reports an implicit gap beside a transition at the edge of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeighborGapPolicy {
    #[default]
    Never,
    AroundTransitions,
}

/// One side of a node as reported by
/// [`Graph::neighbors_of`](crate::graph::Graph::neighbors_of).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbor {
    Node(NodeId),
    /// Stand-in gap of the given length beside a transition at a track edge.
    ImplicitGap(RationalTime),
}

/// A sequence of children laid out end to end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub item: Item,
    pub kind: TrackKind,
}

impl Track {
    /// Create a new video track.
    pub fn new_video(name: impl Into<String>) -> Self {
        Self {
            item: Item::new(name),
            kind: TrackKind::Video,
        }
    }

    /// Create a new audio track.
    pub fn new_audio(name: impl Into<String>) -> Self {
        Self {
            item: Item::new(name),
            kind: TrackKind::Audio,
        }
    }
}

/// Children layered over each other, all starting at time 0. Later
/// children sit on top.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stack {
    pub item: Item,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            item: Item::new(name),
        }
    }
}
