use splice_core::{Result, SpliceError, TimeRange};
use tracing::debug;

use super::require_track;
use crate::graph::{Graph, NodeId};

/// A copy of `track` holding only what overlaps `trim_range`.
///
/// `trim_range` is in the track's child space. Children outside it are
/// dropped and children crossing an edge get their source range clipped.
/// Time 0 of the result corresponds to `trim_range.start_time`.
///
/// Fails with [`SpliceError::CannotTrimTransition`] if a transition is only
/// partly covered; nothing is returned in that case.
pub fn track_trimmed_to_range(graph: &Graph, track: NodeId, trim_range: TimeRange) -> Result<Graph> {
    require_track(graph, track)?;
    debug!(
        track = %graph.describe(track),
        range = %trim_range,
        children = graph.children(track)?.len(),
        "Trimming track"
    );

    let mut result = graph.extract(track)?;
    let root = result
        .root()
        .ok_or_else(|| SpliceError::InvalidNode("extracted track has no root".to_string()))?;
    result.get_mut(root)?.set_source_range(None);

    let ranges = result.range_of_all_children(root)?;
    // Back to front so removals keep the remaining indices valid.
    for (index, (child, child_range)) in ranges.into_iter().enumerate().rev() {
        if !trim_range.overlaps(child_range) {
            let removed = result.remove_child(root, index)?;
            result.destroy(removed)?;
            continue;
        }
        if trim_range.contains_range(child_range) {
            continue;
        }
        if result.get(child)?.is_transition() {
            return Err(SpliceError::CannotTrimTransition(result.describe(child)));
        }

        let mut source = result.trimmed_range(child)?;
        if trim_range.start_time > child_range.start_time {
            let cut = trim_range.start_time - child_range.start_time;
            source = TimeRange::new(source.start_time + cut, source.duration - cut);
        }
        let trim_end = trim_range.end_time_exclusive();
        let child_end = child_range.end_time_exclusive();
        if trim_end < child_end {
            source = TimeRange::new(source.start_time, source.duration - (child_end - trim_end));
        }
        result.get_mut(child)?.set_source_range(Some(source));
    }

    debug!(kept = result.children(root)?.len(), "Trimmed track");
    Ok(result)
}
