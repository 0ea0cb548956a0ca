//! Range and coordinate queries over a [`Graph`].
//!
//! Every node has its own time coordinate space. A leaf's space is the
//! space of its media; a track's space starts at 0 where its first child
//! begins; a stack's children all start at its 0. These queries answer how
//! long a node is, which part of its space it exposes, and where that part
//! lands in its parent or any other node of the same tree.

use splice_core::{RationalTime, Result, SpliceError, TimeRange};

use crate::graph::{Graph, NodeId};
use crate::node::Node;
use crate::track::{Neighbor, NeighborGapPolicy};

/// Clip `child_range` to a track's explicit source range.
fn trim_child_range(source_range: Option<TimeRange>, child_range: TimeRange) -> Option<TimeRange> {
    let Some(sr) = source_range else {
        return Some(child_range);
    };

    let past_end = sr.start_time >= child_range.end_time_exclusive();
    let before_start = sr.end_time_exclusive() <= child_range.start_time;
    if past_end || before_start {
        return None;
    }

    let mut range = child_range;
    if range.start_time < sr.start_time {
        range = TimeRange::from_start_end_time(sr.start_time, range.end_time_exclusive());
    }
    if range.end_time_exclusive() > sr.end_time_exclusive() {
        range = TimeRange::from_start_end_time(range.start_time, sr.end_time_exclusive());
    }
    Some(range)
}

impl Graph {
    // ── Extents ─────────────────────────────────────────────────

    /// Length of the node's trimmed range. A transition lasts
    /// `in_offset + out_offset`.
    pub fn duration(&self, id: NodeId) -> Result<RationalTime> {
        match self.get(id)? {
            Node::Transition(transition) => Ok(transition.duration()),
            _ => Ok(self.trimmed_range(id)?.duration),
        }
    }

    /// The largest range the node could expose, ignoring its source range.
    pub fn available_range(&self, id: NodeId) -> Result<TimeRange> {
        let unavailable =
            |why: &str| SpliceError::CannotComputeAvailableRange(format!("{} {why}", self.describe(id)));

        match self.get(id)? {
            Node::Item(_) => Err(unavailable("has no media to bound it")),
            Node::Clip(clip) => clip
                .media_reference
                .available_range
                .ok_or_else(|| unavailable("has no media reference range")),
            Node::Gap(gap) => gap
                .item
                .source_range
                .ok_or_else(|| unavailable("has no source range")),
            Node::Transition(transition) => Ok(TimeRange::from_duration(transition.duration())),
            Node::Track(_) => self.track_available_range(id),
            Node::Stack(_) => self.stack_available_range(id),
        }
    }

    fn track_available_range(&self, id: NodeId) -> Result<TimeRange> {
        let children = self.children(id)?;
        let mut total = RationalTime::ZERO;

        if let Some(&first) = children.first() {
            if let Node::Transition(transition) = self.get(first)? {
                total += transition.in_offset.unwrap_or_default();
            }
        }
        if let Some(&last) = children.last() {
            if let Node::Transition(transition) = self.get(last)? {
                total += transition.out_offset.unwrap_or_default();
            }
        }
        for &child in children {
            if !self.get(child)?.is_transition() {
                total += self.duration(child)?;
            }
        }

        Ok(TimeRange::from_duration(total))
    }

    fn stack_available_range(&self, id: NodeId) -> Result<TimeRange> {
        let mut longest = RationalTime::ZERO;
        for &child in self.children(id)? {
            longest = longest.max(self.duration(child)?);
        }
        Ok(TimeRange::from_duration(longest))
    }

    /// The explicit source range if set, otherwise the available range.
    pub fn trimmed_range(&self, id: NodeId) -> Result<TimeRange> {
        match self.get(id)?.source_range() {
            Some(range) => Ok(range),
            None => self.available_range(id),
        }
    }

    // ── Child placement ─────────────────────────────────────────

    /// Where the child at `index` sits in `parent`'s untrimmed space.
    ///
    /// In a track, children follow each other; a transition starts
    /// `in_offset` before the point where the next non-transition child
    /// begins. In a stack every child starts at 0.
    pub fn range_of_child_at_index(&self, parent: NodeId, index: usize) -> Result<TimeRange> {
        let children = self.children(parent)?;
        let child = *children.get(index).ok_or(SpliceError::IndexOutOfBounds {
            index,
            len: children.len(),
        })?;

        match self.get(parent)? {
            Node::Track(_) => {
                let child_duration = self.duration(child)?;
                let mut start = child_duration.zero_at_same_rate();
                for &sibling in &children[..index] {
                    if !self.get(sibling)?.is_transition() {
                        start += self.duration(sibling)?;
                    }
                }
                if let Node::Transition(transition) = self.get(child)? {
                    start -= transition.in_offset.unwrap_or_default();
                }
                Ok(TimeRange::new(start, child_duration))
            }
            Node::Stack(_) => Ok(TimeRange::from_duration(self.duration(child)?)),
            _ => Err(SpliceError::NotAComposition(self.describe(parent))),
        }
    }

    /// Like [`Self::range_of_child_at_index`], clipped to the parent's
    /// source range. `None` when the child lies entirely outside it.
    pub fn trimmed_range_of_child_at_index(
        &self,
        parent: NodeId,
        index: usize,
    ) -> Result<Option<TimeRange>> {
        let range = self.range_of_child_at_index(parent, index)?;
        self.clip_to_composition(parent, range)
    }

    pub(crate) fn clip_to_composition(&self, parent: NodeId, range: TimeRange) -> Result<Option<TimeRange>> {
        let node = self.get(parent)?;
        match (node, node.source_range()) {
            (Node::Stack(_), Some(sr)) => Ok(Some(TimeRange::new(
                sr.start_time,
                range.duration.min(sr.duration),
            ))),
            (_, source_range) => Ok(trim_child_range(source_range, range)),
        }
    }

    /// Ranges of every child of `parent`, in child order, in one pass.
    pub fn range_of_all_children(&self, parent: NodeId) -> Result<Vec<(NodeId, TimeRange)>> {
        let children = self.children(parent)?;
        let mut result = Vec::with_capacity(children.len());

        match self.get(parent)? {
            Node::Track(_) => {
                let mut last_end: Option<RationalTime> = None;
                for &child in children {
                    let duration = self.duration(child)?;
                    let cursor = last_end.unwrap_or_else(|| duration.zero_at_same_rate());
                    match self.get(child)? {
                        Node::Transition(transition) => {
                            let start = cursor - transition.in_offset.unwrap_or_default();
                            result.push((child, TimeRange::new(start, duration)));
                            last_end = Some(cursor);
                        }
                        _ => {
                            let range = TimeRange::new(cursor, duration);
                            last_end = Some(range.end_time_exclusive());
                            result.push((child, range));
                        }
                    }
                }
            }
            Node::Stack(_) => {
                for &child in children {
                    result.push((child, TimeRange::from_duration(self.duration(child)?)));
                }
            }
            _ => return Err(SpliceError::NotAComposition(self.describe(parent))),
        }

        Ok(result)
    }

    /// The node's range in its parent's untrimmed space.
    pub fn range_in_parent(&self, id: NodeId) -> Result<TimeRange> {
        let parent = self.require_parent(id)?;
        let index = self.index_of_child(parent, id)?;
        self.range_of_child_at_index(parent, index)
    }

    /// The node's range in its parent's space after the parent's own trim.
    pub fn trimmed_range_in_parent(&self, id: NodeId) -> Result<Option<TimeRange>> {
        let parent = self.require_parent(id)?;
        let index = self.index_of_child(parent, id)?;
        self.trimmed_range_of_child_at_index(parent, index)
    }

    /// Range of a nested `descendant` expressed in `ancestor`'s space, by
    /// accumulating each level's start offset.
    pub fn range_of_child(&self, ancestor: NodeId, descendant: NodeId) -> Result<TimeRange> {
        let mut current = descendant;
        let mut result: Option<TimeRange> = None;
        loop {
            let parent = self.parent(current)?.ok_or_else(|| {
                SpliceError::NotAChild(format!(
                    "{} is not descended from {}",
                    self.describe(descendant),
                    self.describe(ancestor)
                ))
            })?;
            let index = self.index_of_child(parent, current)?;
            let range = self.range_of_child_at_index(parent, index)?;
            result = Some(match result {
                None => range,
                Some(inner) => TimeRange::new(inner.start_time + range.start_time, inner.duration),
            });
            if parent == ancestor {
                break;
            }
            current = parent;
        }
        // The loop runs at least once, so the range is always set.
        result.ok_or_else(|| SpliceError::NotAChild(self.describe(descendant)))
    }

    fn require_parent(&self, id: NodeId) -> Result<NodeId> {
        self.parent(id)?
            .ok_or_else(|| SpliceError::NotAChild(format!("{} has no parent", self.describe(id))))
    }

    // ── Coordinate transforms ───────────────────────────────────

    /// Map `time` from `from`'s space into `to`'s space.
    ///
    /// Walks from `from` up to the root, leaving each node's trimmed space
    /// for its parent's, then walks from `to` up to the same point applying
    /// the inverse hops.
    pub fn transformed_time(&self, from: NodeId, time: RationalTime, to: NodeId) -> Result<RationalTime> {
        let root = self.highest_ancestor(from)?;
        if self.highest_ancestor(to)? != root {
            return Err(SpliceError::NoCommonAncestor {
                from: self.describe(from),
                to: self.describe(to),
            });
        }

        let mut result = time;
        let mut item = from;
        while item != root && item != to {
            let parent = self.require_parent(item)?;
            result -= self.trimmed_range(item)?.start_time;
            result += self.range_in_parent(item)?.start_time;
            item = parent;
        }

        let ancestor = item;
        item = to;
        while item != root && item != ancestor {
            let parent = self.require_parent(item)?;
            result += self.trimmed_range(item)?.start_time;
            result -= self.range_in_parent(item)?.start_time;
            item = parent;
        }

        Ok(result)
    }

    /// Map a range's start into `to`'s space; the duration is unchanged.
    pub fn transformed_time_range(&self, from: NodeId, range: TimeRange, to: NodeId) -> Result<TimeRange> {
        Ok(TimeRange::new(
            self.transformed_time(from, range.start_time, to)?,
            range.duration,
        ))
    }

    // ── Transitions and neighbours ──────────────────────────────

    /// Extra material a child needs beyond its trimmed range because of the
    /// transitions around it: `(head, tail)`.
    pub fn handles_of_child(
        &self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<(Option<RationalTime>, Option<RationalTime>)> {
        match self.get(parent)? {
            Node::Track(_) => {
                let index = self.index_of_child(parent, child)?;
                let children = self.children(parent)?;
                let mut head = None;
                let mut tail = None;
                if index > 0 {
                    if let Node::Transition(transition) = self.get(children[index - 1])? {
                        head = transition.in_offset;
                    }
                }
                if let Some(&next) = children.get(index + 1) {
                    if let Node::Transition(transition) = self.get(next)? {
                        tail = transition.out_offset;
                    }
                }
                Ok((head, tail))
            }
            Node::Stack(_) => Ok((None, None)),
            _ => Err(SpliceError::NotAComposition(self.describe(parent))),
        }
    }

    /// Trimmed range widened by the handles adjacent transitions need.
    pub fn visible_range(&self, id: NodeId) -> Result<TimeRange> {
        let mut result = self.trimmed_range(id)?;
        if let Some(parent) = self.parent(id)? {
            let (head, tail) = self.handles_of_child(parent, id)?;
            if let Some(head) = head {
                result = TimeRange::new(result.start_time - head, result.duration + head);
            }
            if let Some(tail) = tail {
                result = TimeRange::new(result.start_time, result.duration + tail);
            }
        }
        Ok(result)
    }

    /// The siblings immediately before and after `id`.
    ///
    /// With [`NeighborGapPolicy::AroundTransitions`], a transition at either
    /// edge of its parent reports an implicit gap as long as the offset that
    /// reaches past the edge.
    pub fn neighbors_of(
        &self,
        id: NodeId,
        policy: NeighborGapPolicy,
    ) -> Result<(Option<Neighbor>, Option<Neighbor>)> {
        let parent = self.require_parent(id)?;
        let index = self.index_of_child(parent, id)?;
        let children = self.children(parent)?;
        let edge_gaps = policy == NeighborGapPolicy::AroundTransitions;
        let transition = self.get(id)?.as_transition();

        let before = match (index, transition) {
            (0, Some(transition)) if edge_gaps => Some(Neighbor::ImplicitGap(
                transition.in_offset.unwrap_or_default(),
            )),
            (0, _) => None,
            (i, _) => Some(Neighbor::Node(children[i - 1])),
        };

        let after = match (children.get(index + 1), transition) {
            (Some(&next), _) => Some(Neighbor::Node(next)),
            (None, Some(transition)) if edge_gaps => Some(Neighbor::ImplicitGap(
                transition.out_offset.unwrap_or_default(),
            )),
            (None, _) => None,
        };

        Ok((before, after))
    }

    // ── Search ──────────────────────────────────────────────────

    /// Clips under composition `id`, in timeline order.
    ///
    /// With a `search_range` (in `id`'s space) only children whose trimmed
    /// range overlaps it are visited. `shallow` stops at direct children.
    pub fn find_clips(
        &self,
        id: NodeId,
        search_range: Option<TimeRange>,
        shallow: bool,
    ) -> Result<Vec<NodeId>> {
        if !self.get(id)?.is_composition() {
            return Err(SpliceError::NotAComposition(self.describe(id)));
        }
        let mut found = Vec::new();
        self.collect_clips(id, search_range, shallow, &mut found)?;
        Ok(found)
    }

    fn collect_clips(
        &self,
        parent: NodeId,
        search_range: Option<TimeRange>,
        shallow: bool,
        found: &mut Vec<NodeId>,
    ) -> Result<()> {
        let ranges = match search_range {
            Some(_) => Some(self.range_of_all_children(parent)?),
            None => None,
        };

        for (index, &child) in self.children(parent)?.iter().enumerate() {
            if let (Some(search), Some(ranges)) = (search_range, &ranges) {
                match self.clip_to_composition(parent, ranges[index].1)? {
                    Some(range) if range.overlaps(search) => {}
                    _ => continue,
                }
            }

            match self.get(child)? {
                Node::Clip(_) => found.push(child),
                Node::Track(_) | Node::Stack(_) if !shallow => {
                    let nested = search_range
                        .map(|range| self.transformed_time_range(parent, range, child))
                        .transpose()?;
                    self.collect_clips(child, nested, shallow, found)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{Clip, MediaReference};
    use crate::item::Item;
    use crate::node::{Gap, Transition};
    use crate::track::{Stack, Track};
    use splice_core::ErrorKind;

    fn rt(value: f64) -> RationalTime {
        RationalTime::new(value, 24.0)
    }

    fn range(start: f64, duration: f64) -> TimeRange {
        TimeRange::new(rt(start), rt(duration))
    }

    fn clip(name: &str, source: TimeRange) -> Clip {
        let media = MediaReference::external(format!("/media/{name}.mov"), Some(range(0.0, 100.0)));
        Clip::with_media(name, media, Some(source))
    }

    /// A(0-50) B(50-100) C(100-150), each with source range [0, 50).
    fn sample_track() -> (Graph, NodeId, Vec<NodeId>) {
        let (mut graph, track) = Graph::with_root(Track::new_video("V1"));
        let clips = ["A", "B", "C"]
            .iter()
            .map(|name| {
                let id = graph.add(clip(name, range(0.0, 50.0)));
                graph.append_child(track, id).unwrap();
                id
            })
            .collect();
        (graph, track, clips)
    }

    #[test]
    fn test_clip_ranges() {
        let mut graph = Graph::new();
        let a = graph.add(clip("A", range(10.0, 20.0)));
        assert_eq!(graph.trimmed_range(a).unwrap(), range(10.0, 20.0));
        assert_eq!(graph.available_range(a).unwrap(), range(0.0, 100.0));
        assert_eq!(graph.duration(a).unwrap(), rt(20.0));

        let bare = graph.add(Clip::new("bare"));
        let err = graph.available_range(bare).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeUnavailable);
        assert!(graph.trimmed_range(bare).is_err());

        let item = graph.add(Item::new("generic"));
        assert_eq!(graph.available_range(item).unwrap_err().kind(), ErrorKind::RangeUnavailable);
    }

    #[test]
    fn test_track_layout() {
        let (graph, track, clips) = sample_track();
        assert_eq!(graph.duration(track).unwrap(), rt(150.0));
        assert_eq!(graph.range_of_child_at_index(track, 1).unwrap(), range(50.0, 50.0));
        assert_eq!(graph.range_in_parent(clips[2]).unwrap(), range(100.0, 50.0));

        let all = graph.range_of_all_children(track).unwrap();
        assert_eq!(all.len(), 3);
        for (index, (child, child_range)) in all.iter().enumerate() {
            assert_eq!(*child, clips[index]);
            assert_eq!(*child_range, graph.range_of_child_at_index(track, index).unwrap());
        }
        assert!(graph.range_of_child_at_index(track, 3).is_err());
    }

    #[test]
    fn test_transition_layout() {
        let (mut graph, track, clips) = sample_track();
        let transition = graph.add(Transition::new("AtoB", rt(12.0), rt(20.0)));
        graph.insert_child(track, 1, transition).unwrap();

        // Transitions take no room in the track.
        assert_eq!(graph.duration(track).unwrap(), rt(150.0));
        assert_eq!(graph.range_in_parent(transition).unwrap(), range(38.0, 32.0));
        assert_eq!(graph.range_in_parent(clips[1]).unwrap(), range(50.0, 50.0));

        let all = graph.range_of_all_children(track).unwrap();
        assert_eq!(all[1].1, range(38.0, 32.0));
        assert_eq!(all[2].1, range(50.0, 50.0));

        assert_eq!(
            graph.handles_of_child(track, clips[0]).unwrap(),
            (None, Some(rt(20.0)))
        );
        assert_eq!(
            graph.handles_of_child(track, clips[1]).unwrap(),
            (Some(rt(12.0)), None)
        );
        assert_eq!(graph.visible_range(clips[1]).unwrap(), range(-12.0, 62.0));
        assert_eq!(graph.visible_range(clips[0]).unwrap(), range(0.0, 70.0));
    }

    #[test]
    fn test_track_available_range_counts_edge_transitions() {
        let (mut graph, track) = Graph::with_root(Track::new_video("V1"));
        let lead = graph.add(Transition::new("in", rt(5.0), rt(5.0)));
        let a = graph.add(clip("A", range(0.0, 50.0)));
        let tail = graph.add(Transition::new("out", rt(3.0), rt(7.0)));
        for id in [lead, a, tail] {
            graph.append_child(track, id).unwrap();
        }
        assert_eq!(graph.available_range(track).unwrap(), range(0.0, 62.0));
    }

    #[test]
    fn test_stack_layout() {
        let (mut graph, stack) = Graph::with_root(Stack::new("tracks"));
        let short = graph.add(clip("short", range(0.0, 30.0)));
        let long = graph.add(clip("long", range(10.0, 80.0)));
        graph.append_child(stack, short).unwrap();
        graph.append_child(stack, long).unwrap();

        assert_eq!(graph.available_range(stack).unwrap(), range(0.0, 80.0));
        assert_eq!(graph.range_in_parent(long).unwrap(), range(0.0, 80.0));
        assert_eq!(graph.handles_of_child(stack, long).unwrap(), (None, None));

        let empty = graph.add(Stack::new("empty"));
        assert!(graph.duration(empty).unwrap().is_zero());
    }

    #[test]
    fn test_trimmed_range_of_child_respects_track_source_range() {
        let (mut graph, track, clips) = sample_track();
        graph
            .get_mut(track)
            .unwrap()
            .set_source_range(Some(range(60.0, 50.0)));

        assert_eq!(graph.trimmed_range_of_child_at_index(track, 0).unwrap(), None);
        assert_eq!(
            graph.trimmed_range_of_child_at_index(track, 1).unwrap(),
            Some(range(60.0, 40.0))
        );
        assert_eq!(
            graph.trimmed_range_in_parent(clips[2]).unwrap(),
            Some(range(100.0, 10.0))
        );
    }

    #[test]
    fn test_range_in_parent_requires_parent() {
        let mut graph = Graph::new();
        let a = graph.add(clip("A", range(0.0, 10.0)));
        let err = graph.range_in_parent(a).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvableTransform);
    }

    #[test]
    fn test_range_of_nested_child() {
        let (mut graph, stack) = Graph::with_root(Stack::new("tracks"));
        let (inner, inner_track, _) = sample_track();
        let track = graph.import(&inner, inner_track).unwrap();
        graph.append_child(stack, track).unwrap();
        let clips = graph.children(track).unwrap().to_vec();

        assert_eq!(graph.range_of_child(stack, clips[1]).unwrap(), range(50.0, 50.0));
        assert!(graph.range_of_child(clips[0], clips[1]).is_err());
    }

    #[test]
    fn test_transformed_time() {
        let (mut graph, track) = Graph::with_root(Track::new_video("V1"));
        let a = graph.add(clip("A", range(10.0, 50.0)));
        let b = graph.add(clip("B", range(100.0, 50.0)));
        graph.append_child(track, a).unwrap();
        graph.append_child(track, b).unwrap();

        // Frame 110 of B's media is 10 frames into B, which starts at 50.
        assert_eq!(graph.transformed_time(b, rt(110.0), track).unwrap(), rt(60.0));
        assert_eq!(graph.transformed_time(track, rt(60.0), b).unwrap(), rt(110.0));
        // Between siblings.
        assert_eq!(graph.transformed_time(a, rt(10.0), b).unwrap(), rt(50.0));
        assert_eq!(
            graph
                .transformed_time_range(b, range(110.0, 5.0), track)
                .unwrap(),
            range(60.0, 5.0)
        );

        let stray = graph.add(clip("stray", range(0.0, 10.0)));
        let err = graph.transformed_time(a, rt(0.0), stray).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvableTransform);
    }

    #[test]
    fn test_neighbors_of() {
        let (mut graph, track) = Graph::with_root(Track::new_video("V1"));
        let transition = graph.add(Transition::new("in", rt(5.0), rt(7.0)));
        let a = graph.add(clip("A", range(0.0, 50.0)));
        graph.append_child(track, transition).unwrap();
        graph.append_child(track, a).unwrap();

        assert_eq!(
            graph.neighbors_of(transition, NeighborGapPolicy::Never).unwrap(),
            (None, Some(Neighbor::Node(a)))
        );
        assert_eq!(
            graph
                .neighbors_of(transition, NeighborGapPolicy::AroundTransitions)
                .unwrap(),
            (Some(Neighbor::ImplicitGap(rt(5.0))), Some(Neighbor::Node(a)))
        );
        // Only transitions get implicit gaps.
        assert_eq!(
            graph.neighbors_of(a, NeighborGapPolicy::AroundTransitions).unwrap(),
            (Some(Neighbor::Node(transition)), None)
        );
    }

    #[test]
    fn test_find_clips() {
        let (mut graph, stack) = Graph::with_root(Stack::new("tracks"));
        let (inner, track, _) = sample_track();
        let v1 = graph.import(&inner, track).unwrap();
        graph.append_child(stack, v1).unwrap();
        let v2 = graph.add(Track::new_video("V2"));
        graph.append_child(stack, v2).unwrap();
        let gap = graph.add(Gap::new(rt(120.0)));
        let d = graph.add(clip("D", range(0.0, 10.0)));
        graph.append_child(v2, gap).unwrap();
        graph.append_child(v2, d).unwrap();

        let all = graph.find_clips(stack, None, false).unwrap();
        let names: Vec<_> = all.iter().map(|&id| graph.get(id).unwrap().name().to_string()).collect();
        assert_eq!(names, ["A", "B", "C", "D"]);

        assert!(graph.find_clips(stack, None, true).unwrap().is_empty());

        let in_range = graph.find_clips(stack, Some(range(60.0, 10.0)), false).unwrap();
        let names: Vec<_> = in_range.iter().map(|&id| graph.get(id).unwrap().name()).collect();
        assert_eq!(names, ["B"]);

        assert!(graph.find_clips(d, None, false).is_err());
    }
}
