//! Splice Timeline - editorial composition model
//!
//! Implements the in-memory timeline that format adapters exchange:
//! - An arena graph of clips, gaps, transitions, tracks and stacks
//! - Range and coordinate queries over that graph
//! - A versioned schema registry and the portable JSON encoding
//! - Structural rewrites: range trim, transition expansion, flattening

pub mod algo;
pub mod clip;
pub mod graph;
pub mod item;
pub mod node;
mod ranges;
pub mod schema;
pub mod serialization;
pub mod timeline;
pub mod track;

pub use algo::{
    flatten_stack, flatten_tracks, track_trimmed_to_range, track_with_expanded_transitions,
    ExpandedEntry, ExpandedTrack,
};
pub use clip::{Clip, MediaReference, MediaReferenceKind};
pub use graph::{Graph, NodeId};
pub use item::{Effect, EffectKind, Item, Marker, MarkerColor, Metadata};
pub use node::{Gap, Node, Transition, TransitionType};
pub use schema::{DecodeFn, EncodeFn, SchemaCodec, SchemaRegistry, SchemaRegistryBuilder, UpgradeFn};
pub use serialization::{
    decode_item, decode_str, encode_document, encode_item, DecodeContext, Decoded, Document,
    EncodeOptions, Encodable, Encoder, Fields, TimelineParts,
};
pub use timeline::Timeline;
pub use track::{Neighbor, NeighborGapPolicy, Stack, Track, TrackKind};
