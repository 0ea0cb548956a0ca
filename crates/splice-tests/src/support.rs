//! Shared fixtures and logging setup.

use std::sync::Once;

use splice_core::{RationalTime, TimeRange};
use splice_timeline::{Clip, Gap, Graph, MediaReference, Node, NodeId, Track};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

static INIT: Once = Once::new();

/// Install a test-writer subscriber filtered by `RUST_LOG`, once per binary.
pub fn init_logging() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        // Another harness may already own the global default.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

pub fn rt(frames: f64) -> RationalTime {
    RationalTime::new(frames, 24.0)
}

pub fn range(start: f64, duration: f64) -> TimeRange {
    TimeRange::new(rt(start), rt(duration))
}

/// A clip over `frames` frames of a 1000-frame media file.
pub fn clip(name: &str, frames: f64) -> Node {
    let media = MediaReference::external(format!("/media/{name}.mov"), Some(range(0.0, 1000.0)));
    Clip::with_media(name, media, Some(range(0.0, frames))).into()
}

pub fn gap(frames: f64) -> Node {
    Gap::new(rt(frames)).into()
}

/// Add a detached video track holding `children` in order.
pub fn add_track(graph: &mut Graph, name: &str, children: Vec<Node>) -> NodeId {
    let track = graph.add(Track::new_video(name));
    for child in children {
        let id = graph.add(child);
        graph
            .append_child(track, id)
            .expect("fresh child has no parent");
    }
    track
}

/// `(name, source_range)` for each child of the graph's root.
pub fn root_children(graph: &Graph) -> Vec<(String, Option<TimeRange>)> {
    let root = graph.root().expect("graph has a root");
    graph
        .children(root)
        .expect("root is a composition")
        .iter()
        .map(|&child| {
            let node = graph.get(child).expect("live child");
            (node.name().to_string(), node.source_range())
        })
        .collect()
}
