use splice_core::{RationalTime, Result, SpliceError, TimeRange};
use tracing::debug;

use super::require_track;
use crate::graph::{Graph, NodeId};
use crate::node::{Gap, Node, Transition};
use crate::track::{Neighbor, NeighborGapPolicy};

/// One entry of an expanded track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandedEntry {
    /// A non-transition child, its range shortened by the overlap the
    /// transitions around it consume.
    Item(NodeId),
    /// A transition with copies of its neighbours, each re-ranged to the
    /// material the transition overlaps.
    Transition {
        pre: NodeId,
        transition: NodeId,
        post: NodeId,
    },
}

/// Result of [`track_with_expanded_transitions`]. Every handle in
/// `entries` refers to a detached node of `graph`.
#[derive(Debug, Clone)]
pub struct ExpandedTrack {
    pub graph: Graph,
    pub entries: Vec<ExpandedEntry>,
}

fn offsets(graph: &Graph, id: NodeId, transition: &Transition) -> Result<(RationalTime, RationalTime)> {
    let in_offset = transition
        .in_offset
        .ok_or_else(|| SpliceError::TransitionOffsetUnset(graph.describe(id), "in_offset"))?;
    let out_offset = transition
        .out_offset
        .ok_or_else(|| SpliceError::TransitionOffsetUnset(graph.describe(id), "out_offset"))?;
    Ok((in_offset, out_offset))
}

/// Flatten `track` into a sequence in which each transition carries copies
/// of the material it overlaps.
///
/// Every non-transition child is copied with an explicit source range. Two
/// adjacent transitions fail with [`SpliceError::AdjacentTransitions`]; a
/// transition missing an offset fails with
/// [`SpliceError::TransitionOffsetUnset`].
pub fn track_with_expanded_transitions(graph: &Graph, track: NodeId) -> Result<ExpandedTrack> {
    require_track(graph, track)?;
    let children = graph.children(track)?;
    debug!(
        track = %graph.describe(track),
        children = children.len(),
        "Expanding transitions"
    );

    let mut out = Graph::new();
    let mut entries = Vec::with_capacity(children.len());
    for (index, &child) in children.iter().enumerate() {
        let entry = match graph.get(child)? {
            Node::Transition(transition) => expand_transition(graph, child, transition, &mut out)?,
            _ => {
                let pre = transition_at(graph, children, index.checked_sub(1))?;
                let post = transition_at(graph, children, Some(index + 1))?;
                ExpandedEntry::Item(trim_from_transitions(graph, child, pre, post, &mut out)?)
            }
        };
        entries.push(entry);
    }

    debug!(entries = entries.len(), nodes = out.len(), "Expanded transitions");
    Ok(ExpandedTrack {
        graph: out,
        entries,
    })
}

fn transition_at<'g>(
    graph: &'g Graph,
    children: &[NodeId],
    index: Option<usize>,
) -> Result<Option<(NodeId, &'g Transition)>> {
    match index.and_then(|i| children.get(i)) {
        Some(&id) => Ok(graph.get(id)?.as_transition().map(|t| (id, t))),
        None => Ok(None),
    }
}

fn expand_transition(
    graph: &Graph,
    id: NodeId,
    transition: &Transition,
    out: &mut Graph,
) -> Result<ExpandedEntry> {
    let (in_offset, out_offset) = offsets(graph, id, transition)?;
    let overlap = in_offset + out_offset;
    let (before, after) = graph.neighbors_of(id, NeighborGapPolicy::AroundTransitions)?;

    let before = before.unwrap_or(Neighbor::ImplicitGap(in_offset));
    let pre = copy_neighbor(graph, before, (before, Neighbor::Node(id)), out)?;
    let pre_range = out.trimmed_range(pre)?;
    let pre_node = out.get_mut(pre)?;
    let name = format!("{}_transition_pre", pre_node.name());
    pre_node.set_name(name);
    pre_node.set_source_range(Some(TimeRange::new(
        pre_range.end_time_exclusive() - in_offset,
        overlap.rescaled_to_time(pre_range.start_time),
    )));

    let after = after.unwrap_or(Neighbor::ImplicitGap(out_offset));
    let post = copy_neighbor(graph, after, (Neighbor::Node(id), after), out)?;
    let post_range = out.trimmed_range(post)?;
    let post_node = out.get_mut(post)?;
    let name = format!("{}_transition_post", post_node.name());
    post_node.set_name(name);
    post_node.set_source_range(Some(TimeRange::new(
        (post_range.start_time - in_offset).rescaled_to_time(post_range.start_time),
        overlap.rescaled_to_time(post_range.start_time),
    )));

    let transition = out.import(graph, id)?;
    Ok(ExpandedEntry::Transition {
        pre,
        transition,
        post,
    })
}

/// Copy one neighbour of a transition into `out`. `pair` is the
/// neighbour and the transition in track order, for error reporting.
fn copy_neighbor(
    graph: &Graph,
    neighbor: Neighbor,
    pair: (Neighbor, Neighbor),
    out: &mut Graph,
) -> Result<NodeId> {
    match neighbor {
        Neighbor::Node(id) => {
            if graph.get(id)?.is_transition() {
                let describe = |n: Neighbor| match n {
                    Neighbor::Node(id) => graph.describe(id),
                    Neighbor::ImplicitGap(_) => "implicit gap".to_string(),
                };
                return Err(SpliceError::AdjacentTransitions {
                    first: describe(pair.0),
                    second: describe(pair.1),
                });
            }
            out.import(graph, id)
        }
        Neighbor::ImplicitGap(duration) => Ok(out.add(Gap::new(duration))),
    }
}

fn trim_from_transitions(
    graph: &Graph,
    id: NodeId,
    pre: Option<(NodeId, &Transition)>,
    post: Option<(NodeId, &Transition)>,
    out: &mut Graph,
) -> Result<NodeId> {
    let mut range = graph.trimmed_range(id)?;
    if let Some((pre_id, transition)) = pre {
        let (_, out_offset) = offsets(graph, pre_id, transition)?;
        range = TimeRange::new(range.start_time + out_offset, range.duration - out_offset);
    }
    if let Some((post_id, transition)) = post {
        let (in_offset, _) = offsets(graph, post_id, transition)?;
        range = TimeRange::new(range.start_time, range.duration - in_offset);
    }

    let copy = out.import(graph, id)?;
    out.get_mut(copy)?.set_source_range(Some(range));
    Ok(copy)
}
