//! Sharing the process-wide registry and read-only graphs across threads.

use rayon::prelude::*;
use splice_core::Result;
use splice_timeline::{
    flatten_stack, track_trimmed_to_range, Document, SchemaRegistry, Timeline,
};

use crate::support::{add_track, clip, gap, init_logging, range};

fn timeline() -> Timeline {
    let mut timeline = Timeline::new("Shared");
    let graph = timeline.graph_mut();
    let v1 = add_track(graph, "V1", vec![clip("A", 100.0), clip("B", 100.0)]);
    let v2 = add_track(graph, "V2", vec![gap(50.0), clip("C", 100.0)]);
    timeline.append_track(v1).unwrap();
    timeline.append_track(v2).unwrap();
    timeline
}

#[test]
fn concurrent_decodes_share_global_registry() {
    init_logging();
    let original = timeline();
    let text = Document::Timeline(original.clone()).to_json().unwrap();

    let decoded: Vec<Timeline> = (0..64)
        .into_par_iter()
        .map(|_| Document::from_json(&text)?.into_timeline())
        .collect::<Result<_>>()
        .unwrap();

    assert_eq!(decoded.len(), 64);
    for timeline in &decoded {
        assert!(original
            .graph()
            .same_structure(original.tracks(), timeline.graph(), timeline.tracks())
            .unwrap());
    }
    assert_eq!(SchemaRegistry::global().current_version("Timeline"), Some(1));
}

#[test]
fn concurrent_decode_errors_are_isolated() {
    let good = Document::Timeline(timeline()).to_json().unwrap();
    let bad = r#"{"OTIO_SCHEMA": "Timeline.9"}"#;

    let results: Vec<bool> = (0..32)
        .into_par_iter()
        .map(|i| {
            let text = if i % 2 == 0 { good.as_str() } else { bad };
            Document::from_json(text).is_ok()
        })
        .collect();

    for (i, ok) in results.into_iter().enumerate() {
        assert_eq!(ok, i % 2 == 0);
    }
}

#[test]
fn algorithms_run_in_parallel_over_one_graph() {
    let timeline = timeline();
    let graph = timeline.graph();
    let v1 = timeline.video_tracks().unwrap()[0];

    let trimmed: Vec<usize> = (0..20)
        .into_par_iter()
        .map(|i| {
            let trim = range(i as f64 * 10.0, 50.0);
            let result = track_trimmed_to_range(graph, v1, trim)?;
            let root = result.root().expect("trimmed track has a root");
            Ok(result.children(root)?.len())
        })
        .collect::<Result<_>>()
        .unwrap();
    assert!(trimmed.iter().all(|&n| (1..=2).contains(&n)));

    let flats: Vec<usize> = (0..8)
        .into_par_iter()
        .map(|_| flatten_stack(graph, timeline.tracks()).map(|g| g.len()))
        .collect::<Result<_>>()
        .unwrap();
    assert!(flats.windows(2).all(|w| w[0] == w[1]));
}
