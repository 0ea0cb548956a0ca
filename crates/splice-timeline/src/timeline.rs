//! The top-level timeline document.

use splice_core::{RationalTime, Result, SpliceError, TimeRange};

use crate::graph::{Graph, NodeId};
use crate::item::Metadata;
use crate::node::Node;
use crate::serialization::TimelineParts;
use crate::track::{Stack, TrackKind};

/// A timeline: a stack of tracks plus document-level settings.
///
/// The graph's root is the `tracks` stack. Tracks are its children, bottom
/// first.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub name: String,
    pub metadata: Metadata,
    /// Timecode of the timeline's first frame, if any.
    pub global_start_time: Option<RationalTime>,
    graph: Graph,
    tracks: NodeId,
}

impl Timeline {
    /// Create a new empty timeline.
    pub fn new(name: impl Into<String>) -> Self {
        let (graph, tracks) = Graph::with_root(Stack::new("tracks"));
        Self {
            name: name.into(),
            metadata: Metadata::new(),
            global_start_time: None,
            graph,
            tracks,
        }
    }

    /// Build a timeline around an existing graph whose root is a stack.
    pub fn from_graph(name: impl Into<String>, graph: Graph) -> Result<Self> {
        let tracks = graph
            .root()
            .ok_or_else(|| SpliceError::InvalidNode("graph has no root".to_string()))?;
        match graph.get(tracks)? {
            Node::Stack(_) => Ok(Self {
                name: name.into(),
                metadata: Metadata::new(),
                global_start_time: None,
                graph,
                tracks,
            }),
            other => Err(SpliceError::TypeMismatch {
                expected: "Stack".to_string(),
                found: other.schema_name().to_string(),
            }),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Handle of the root stack.
    pub fn tracks(&self) -> NodeId {
        self.tracks
    }

    /// Append a detached node of this timeline's graph as the topmost track.
    pub fn append_track(&mut self, track: NodeId) -> Result<()> {
        match self.graph.get(track)? {
            Node::Track(_) => self.graph.append_child(self.tracks, track),
            other => Err(SpliceError::TypeMismatch {
                expected: "Track".to_string(),
                found: other.schema_name().to_string(),
            }),
        }
    }

    fn tracks_of_kind(&self, kind: Option<&TrackKind>) -> Result<Vec<NodeId>> {
        let mut result = Vec::new();
        for &child in self.graph.children(self.tracks)? {
            if let Node::Track(track) = self.graph.get(child)? {
                if kind.map_or(true, |k| &track.kind == k) {
                    result.push(child);
                }
            }
        }
        Ok(result)
    }

    /// Every track directly under the root stack.
    pub fn all_tracks(&self) -> Result<Vec<NodeId>> {
        self.tracks_of_kind(None)
    }

    pub fn video_tracks(&self) -> Result<Vec<NodeId>> {
        self.tracks_of_kind(Some(&TrackKind::Video))
    }

    pub fn audio_tracks(&self) -> Result<Vec<NodeId>> {
        self.tracks_of_kind(Some(&TrackKind::Audio))
    }

    /// Get the total duration of the timeline.
    pub fn duration(&self) -> Result<RationalTime> {
        self.graph.duration(self.tracks)
    }

    /// Get the time range of the timeline.
    pub fn range(&self) -> Result<TimeRange> {
        self.graph.trimmed_range(self.tracks)
    }

    /// Clips in the timeline, optionally limited to `search_range`.
    pub fn find_clips(&self, search_range: Option<TimeRange>, shallow: bool) -> Result<Vec<NodeId>> {
        self.graph.find_clips(self.tracks, search_range, shallow)
    }

    /// Reassemble a decoded timeline around its decode graph.
    pub(crate) fn from_parts(parts: TimelineParts, mut graph: Graph) -> Result<Self> {
        graph.set_root(Some(parts.tracks))?;
        Ok(Self {
            name: parts.name,
            metadata: parts.metadata,
            global_start_time: parts.global_start_time,
            graph,
            tracks: parts.tracks,
        })
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new("Untitled Timeline")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{Clip, MediaReference};
    use crate::track::Track;

    fn rt(value: f64) -> RationalTime {
        RationalTime::new(value, 24.0)
    }

    fn add_track(timeline: &mut Timeline, track: Track, clip_frames: f64) -> NodeId {
        let graph = timeline.graph_mut();
        let track = graph.add(track);
        let media = MediaReference::external("/media/a.mov", Some(TimeRange::from_duration(rt(200.0))));
        let clip = graph.add(Clip::with_media(
            "A",
            media,
            Some(TimeRange::from_duration(rt(clip_frames))),
        ));
        graph.append_child(track, clip).unwrap();
        timeline.append_track(track).unwrap();
        track
    }

    #[test]
    fn test_new_timeline_is_empty() {
        let timeline = Timeline::default();
        assert_eq!(timeline.name, "Untitled Timeline");
        assert!(timeline.all_tracks().unwrap().is_empty());
        assert!(timeline.duration().unwrap().is_zero());
    }

    #[test]
    fn test_tracks_by_kind_and_duration() {
        let mut timeline = Timeline::new("Edit");
        let v1 = add_track(&mut timeline, Track::new_video("V1"), 100.0);
        let a1 = add_track(&mut timeline, Track::new_audio("A1"), 140.0);

        assert_eq!(timeline.video_tracks().unwrap(), vec![v1]);
        assert_eq!(timeline.audio_tracks().unwrap(), vec![a1]);
        assert_eq!(timeline.duration().unwrap(), rt(140.0));
        assert_eq!(timeline.find_clips(None, false).unwrap().len(), 2);
    }

    #[test]
    fn test_append_track_rejects_other_nodes() {
        let mut timeline = Timeline::new("Edit");
        let clip = timeline.graph_mut().add(Clip::new("A"));
        assert!(matches!(
            timeline.append_track(clip),
            Err(SpliceError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_from_graph_requires_stack_root() {
        let (graph, _) = Graph::with_root(Track::new_video("V1"));
        assert!(Timeline::from_graph("bad", graph).is_err());
        let (graph, stack) = Graph::with_root(Stack::new("tracks"));
        let timeline = Timeline::from_graph("ok", graph).unwrap();
        assert_eq!(timeline.tracks(), stack);
    }
}
