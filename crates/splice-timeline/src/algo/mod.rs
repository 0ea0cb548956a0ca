//! Structural rewrites of tracks and stacks.
//!
//! Every algorithm reads a [`Graph`] and returns an independent value; the
//! input is never modified, so they can run in parallel over shared graphs.

mod flatten;
mod transitions;
mod trim;

pub use flatten::{flatten_stack, flatten_tracks};
pub use transitions::{track_with_expanded_transitions, ExpandedEntry, ExpandedTrack};
pub use trim::track_trimmed_to_range;

use splice_core::{Result, SpliceError};

use crate::graph::{Graph, NodeId};
use crate::node::Node;
use crate::track::Track;

fn require_track(graph: &Graph, id: NodeId) -> Result<&Track> {
    match graph.get(id)? {
        Node::Track(track) => Ok(track),
        other => Err(SpliceError::TypeMismatch {
            expected: "Track".to_string(),
            found: other.schema_name().to_string(),
        }),
    }
}
