//! Property tests over randomly built tracks and stacks.

use proptest::prelude::*;
use splice_core::{ErrorKind, RationalTime, TimeRange};
use splice_timeline::{flatten_tracks, track_trimmed_to_range, Graph, Node, NodeId, Track};

use crate::support::{add_track, clip, gap, rt};

/// `(is_gap, frames)` per child.
fn layer_strategy() -> impl Strategy<Value = Vec<(bool, u32)>> {
    prop::collection::vec((any::<bool>(), 1u32..60), 0..8)
}

fn children(layer: &[(bool, u32)]) -> Vec<Node> {
    layer
        .iter()
        .enumerate()
        .map(|(i, &(is_gap, frames))| {
            if is_gap {
                gap(frames as f64)
            } else {
                clip(&format!("c{i}"), frames as f64)
            }
        })
        .collect()
}

fn track_from(layer: &[(bool, u32)]) -> (Graph, NodeId) {
    let mut graph = Graph::new();
    let track = add_track(&mut graph, "V1", children(layer));
    graph.set_root(Some(track)).unwrap();
    (graph, track)
}

proptest! {
    #[test]
    fn inserting_a_parented_node_fails_and_changes_nothing(
        layer in layer_strategy(),
        pick in any::<prop::sample::Index>(),
        at in 0usize..10,
    ) {
        prop_assume!(!layer.is_empty());
        let (mut graph, first) = track_from(&layer);
        let second = graph.add(Track::new_video("V2"));
        let before_first = graph.children(first).unwrap().to_vec();

        let child = before_first[pick.index(before_first.len())];
        let err = graph.insert_child(second, at, child).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::StructuralViolation);
        prop_assert_eq!(graph.children(first).unwrap(), before_first.as_slice());
        prop_assert!(graph.children(second).unwrap().is_empty());
        prop_assert_eq!(graph.parent(child).unwrap(), Some(first));

        // The whole track is parented once attached, too.
        let stack = graph.add(splice_timeline::Stack::new("tracks"));
        graph.append_child(stack, second).unwrap();
        prop_assert!(graph.append_child(first, second).is_err());
        prop_assert_eq!(graph.parent(second).unwrap(), Some(stack));
    }

    #[test]
    fn trim_is_idempotent_and_contained(
        layer in layer_strategy(),
        start in 0u32..200,
        length in 1u32..200,
    ) {
        let (graph, track) = track_from(&layer);
        let trim = TimeRange::new(rt(start as f64), rt(length as f64));

        let once = track_trimmed_to_range(&graph, track, trim).unwrap();
        let once_root = once.root().unwrap();
        for (_, child_range) in once.range_of_all_children(once_root).unwrap() {
            let placed = TimeRange::new(child_range.start_time + trim.start_time, child_range.duration);
            prop_assert!(trim.contains_range(placed), "{} not in {}", placed, trim);
        }

        let rebased = TimeRange::new(RationalTime::ZERO, trim.duration);
        let twice = track_trimmed_to_range(&once, once_root, rebased).unwrap();
        prop_assert!(once
            .same_structure(once_root, &twice, twice.root().unwrap())
            .unwrap());
    }

    #[test]
    fn flatten_duration_is_longest_layer(
        layers in prop::collection::vec(layer_strategy(), 1..4),
    ) {
        let mut graph = Graph::new();
        let ids: Vec<NodeId> = layers
            .iter()
            .enumerate()
            .map(|(i, layer)| add_track(&mut graph, &format!("L{i}"), children(layer)))
            .collect();

        let longest = ids
            .iter()
            .map(|&id| graph.duration(id).unwrap())
            .max()
            .unwrap_or_default();
        let flat = flatten_tracks(&graph, &ids).unwrap();
        let root = flat.root().unwrap();
        prop_assert_eq!(flat.duration(root).unwrap(), longest);
    }
}
