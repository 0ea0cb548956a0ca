//! Worked editorial scenarios across graph, algorithms and encoding.

use splice_core::{ErrorKind, RationalTime};
use splice_timeline::{
    flatten_stack, track_trimmed_to_range, track_with_expanded_transitions, Document,
    ExpandedEntry, Graph, Stack, Timeline, Transition,
};

use crate::support::{add_track, clip, gap, init_logging, range, root_children, rt};

// ── Trim ───────────────────────────────────────────────────────

#[test]
fn trim_keeps_boundary_clip_and_interior_clip() {
    init_logging();
    let mut graph = Graph::new();
    let track = add_track(
        &mut graph,
        "A",
        vec![clip("A", 50.0), clip("B", 50.0), clip("C", 50.0)],
    );

    let trimmed = track_trimmed_to_range(&graph, track, range(60.0, 90.0)).unwrap();
    assert_eq!(
        root_children(&trimmed),
        vec![
            ("B".to_string(), Some(range(10.0, 40.0))),
            ("C".to_string(), Some(range(0.0, 50.0))),
        ]
    );
    assert_eq!(graph.children(track).unwrap().len(), 3);
}

#[test]
fn trim_can_be_widened_after_uncuttable_transition() {
    init_logging();
    let mut graph = Graph::new();
    let track = add_track(
        &mut graph,
        "V1",
        vec![
            clip("A", 50.0),
            Transition::new("AtoB", rt(12.0), rt(20.0)).into(),
            clip("B", 50.0),
            clip("C", 50.0),
        ],
    );

    let err = track_trimmed_to_range(&graph, track, range(5.0, 50.0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UncuttableTransition);

    // A caller may react by widening the range past the transition.
    let trimmed = track_trimmed_to_range(&graph, track, range(5.0, 70.0)).unwrap();
    assert_eq!(root_children(&trimmed).len(), 3);
}

// ── Flatten ────────────────────────────────────────────────────

#[test]
fn flatten_falls_through_gap_and_merges_intervals() {
    init_logging();
    let (mut graph, stack) = Graph::with_root(Stack::new("tracks"));
    let bottom = add_track(&mut graph, "Z", vec![clip("Z", 150.0)]);
    let top = add_track(
        &mut graph,
        "Top",
        vec![clip("D", 50.0), gap(50.0), clip("E", 50.0)],
    );
    graph.append_child(stack, bottom).unwrap();
    graph.append_child(stack, top).unwrap();

    let flat = flatten_stack(&graph, stack).unwrap();
    assert_eq!(
        root_children(&flat),
        vec![
            ("D".to_string(), Some(range(0.0, 50.0))),
            ("Z".to_string(), Some(range(50.0, 50.0))),
            ("E".to_string(), Some(range(0.0, 50.0))),
        ]
    );
}

// ── Transitions ────────────────────────────────────────────────

#[test]
fn expanded_transition_exposes_overlapped_material() {
    init_logging();
    let mut graph = Graph::new();
    let track = add_track(
        &mut graph,
        "V1",
        vec![
            clip("A", 50.0),
            Transition::new("AtoB", rt(10.0), rt(10.0)).into(),
            clip("B", 50.0),
        ],
    );

    let expanded = track_with_expanded_transitions(&graph, track).unwrap();
    let kinds: Vec<_> = expanded
        .entries
        .iter()
        .map(|entry| matches!(entry, ExpandedEntry::Transition { .. }))
        .collect();
    assert_eq!(kinds, vec![false, true, false]);

    let ExpandedEntry::Transition { pre, post, .. } = expanded.entries[1] else {
        panic!("expected the transition in the middle");
    };
    let pre = expanded.graph.get(pre).unwrap();
    assert_eq!(pre.source_range(), Some(range(40.0, 20.0)));
    let post = expanded.graph.get(post).unwrap();
    assert_eq!(post.source_range(), Some(range(-10.0, 20.0)));
}

// ── Timeline documents ─────────────────────────────────────────

fn build_timeline() -> Timeline {
    let mut timeline = Timeline::new("Integration Test Timeline");
    let graph = timeline.graph_mut();
    let v1 = add_track(graph, "V1", vec![clip("Intro", 48.0), clip("Body", 240.0)]);
    let v2 = add_track(graph, "V2", vec![gap(100.0), clip("Title", 48.0)]);
    timeline.append_track(v1).unwrap();
    timeline.append_track(v2).unwrap();
    timeline
}

#[test]
fn timeline_duration_is_longest_track() {
    let timeline = build_timeline();
    assert_eq!(timeline.duration().unwrap(), rt(288.0));
    assert_eq!(timeline.video_tracks().unwrap().len(), 2);
    assert_eq!(timeline.find_clips(Some(range(90.0, 20.0)), false).unwrap().len(), 2);
}

#[test]
fn transformed_time_maps_clip_media_to_timeline() {
    let timeline = build_timeline();
    let graph = timeline.graph();
    let title = timeline.find_clips(None, false).unwrap()[2];
    assert_eq!(graph.get(title).unwrap().name(), "Title");

    let in_timeline = graph
        .transformed_time(title, rt(10.0), timeline.tracks())
        .unwrap();
    assert_eq!(in_timeline, rt(110.0));
    let back = graph
        .transformed_time(timeline.tracks(), in_timeline, title)
        .unwrap();
    assert_eq!(back, rt(10.0));
}

#[test]
fn timeline_survives_encode_decode() {
    init_logging();
    let timeline = build_timeline();
    let text = Document::Timeline(timeline.clone()).to_json().unwrap();
    assert!(text.contains("\"OTIO_SCHEMA\": \"Timeline.1\""));

    let loaded = Document::from_json(&text).unwrap().into_timeline().unwrap();
    assert!(timeline
        .graph()
        .same_structure(timeline.tracks(), loaded.graph(), loaded.tracks())
        .unwrap());
    assert_eq!(loaded.duration().unwrap(), RationalTime::new(12.0, 1.0));
}

#[test]
fn flattened_timeline_encodes_as_track() {
    let timeline = build_timeline();
    let flat = flatten_stack(timeline.graph(), timeline.tracks()).unwrap();
    assert_eq!(
        root_children(&flat)
            .into_iter()
            .map(|(name, _)| name)
            .collect::<Vec<_>>(),
        vec!["Intro", "Body", "Title", "Body"]
    );

    let text = Document::Tree(flat).to_json().unwrap();
    let decoded = Document::from_json(&text).unwrap();
    let root = decoded.graph().root().unwrap();
    assert_eq!(decoded.graph().get(root).unwrap().schema_name(), "Track");
    assert_eq!(decoded.graph().duration(root).unwrap(), rt(288.0));
}
