use std::collections::{BTreeMap, BTreeSet};

use splice_core::{RationalTime, Result, SpliceError, TimeRange};
use tracing::debug;

use super::require_track;
use crate::graph::{Graph, NodeId};
use crate::item::Item;
use crate::node::{Gap, Node};
use crate::track::{Track, TrackKind};

/// Where one child of a layer shows up in the layer's trimmed space.
#[derive(Debug, Clone, Copy)]
struct Span {
    node: NodeId,
    start: RationalTime,
    end: RationalTime,
    /// Source time of the child at `start`.
    source_start: RationalTime,
    /// Not cut by the layer's own source range.
    whole: bool,
}

/// A maximal stretch of output time showing one span (or nothing).
#[derive(Debug, Clone, Copy)]
struct Run {
    source: Option<(usize, usize)>,
    start: RationalTime,
    end: RationalTime,
}

/// One layer as seen through its own trim.
struct Layer {
    spans: Vec<Span>,
    /// Each transition with its cut: the instant between its neighbours.
    transitions: Vec<(RationalTime, NodeId)>,
    extent: RationalTime,
}

fn read_layer(graph: &Graph, layer: NodeId) -> Result<Layer> {
    let base = match graph.get(layer)?.source_range() {
        Some(range) => range.start_time,
        None => RationalTime::ZERO,
    };
    let extent = graph.duration(layer)?;

    let mut spans = Vec::new();
    let mut transitions = Vec::new();
    for (child, range) in graph.range_of_all_children(layer)? {
        if let Node::Transition(transition) = graph.get(child)? {
            let cut = range.start_time + transition.in_offset.unwrap_or_default() - base;
            if cut >= RationalTime::ZERO && cut <= extent {
                transitions.push((cut, child));
            }
            continue;
        }
        let Some(visible) = graph.clip_to_composition(layer, range)? else {
            continue;
        };
        if visible.duration.is_zero() {
            continue;
        }
        let source = graph.trimmed_range(child)?;
        spans.push(Span {
            node: child,
            start: visible.start_time - base,
            end: visible.end_time_exclusive() - base,
            source_start: source.start_time + (visible.start_time - range.start_time),
            whole: visible == range,
        });
    }
    Ok(Layer {
        spans,
        transitions,
        extent,
    })
}

/// Transitions whose layer has nothing visible above it on either side of
/// the cut, keyed by cut. At a shared cut the topmost layer wins.
fn exposed_transitions(layers: &[Layer], windows: &[Run]) -> BTreeMap<RationalTime, NodeId> {
    let mut chosen = BTreeMap::new();
    for (index, layer) in layers.iter().enumerate().rev() {
        for &(cut, transition) in &layer.transitions {
            if chosen.contains_key(&cut) {
                continue;
            }
            let exposed = windows
                .iter()
                .filter(|w| (w.end == cut || w.start == cut) && w.end <= layer.extent)
                .all(|w| w.source.map_or(true, |(top, _)| index >= top));
            if exposed {
                chosen.insert(cut, transition);
            }
        }
    }
    chosen
}

/// Flatten the track children of `stack`, later children on top.
pub fn flatten_stack(graph: &Graph, stack: NodeId) -> Result<Graph> {
    match graph.get(stack)? {
        Node::Stack(_) => flatten_tracks(graph, graph.children(stack)?),
        other => Err(SpliceError::TypeMismatch {
            expected: "Stack".to_string(),
            found: other.schema_name().to_string(),
        }),
    }
}

/// Collapse `layers` (bottom first) into one track named `Flattened`.
///
/// At every instant the output shows the topmost layer's item, falling
/// through gaps and disabled items. Consecutive stretches showing the same
/// child of the same layer become one output item. A transition is copied
/// between its neighbours when its layer is the one showing on both sides
/// of it, or nothing above covers it; otherwise it is dropped. The output
/// takes the kind of the topmost layer.
pub fn flatten_tracks(graph: &Graph, layers: &[NodeId]) -> Result<Graph> {
    let mut kind = TrackKind::Video;
    for &layer in layers {
        kind = require_track(graph, layer)?.kind.clone();
    }
    debug!(layers = layers.len(), "Flattening tracks");

    let mut read = Vec::with_capacity(layers.len());
    let mut cuts = BTreeSet::new();
    cuts.insert(RationalTime::ZERO);
    for &layer in layers {
        let layer = read_layer(graph, layer)?;
        cuts.insert(layer.extent);
        for span in &layer.spans {
            cuts.insert(span.start);
            cuts.insert(span.end);
        }
        for &(cut, _) in &layer.transitions {
            cuts.insert(cut);
        }
        read.push(layer);
    }

    let cuts: Vec<RationalTime> = cuts.into_iter().collect();
    let mut cursors = vec![0usize; read.len()];
    let mut windows: Vec<Run> = Vec::new();
    for window in cuts.windows(2) {
        let (start, end) = (window[0], window[1]);
        if start < RationalTime::ZERO {
            continue;
        }

        let mut source = None;
        for index in (0..read.len()).rev() {
            let spans = &read[index].spans;
            let cursor = &mut cursors[index];
            while *cursor < spans.len() && spans[*cursor].end <= start {
                *cursor += 1;
            }
            let Some(span) = spans.get(*cursor) else {
                continue;
            };
            if span.start > start {
                continue;
            }
            let node = graph.get(span.node)?;
            if node.is_gap() || !node.enabled() {
                continue;
            }
            source = Some((index, *cursor));
            break;
        }
        windows.push(Run { source, start, end });
    }

    let transitions = exposed_transitions(&read, &windows);
    let mut runs: Vec<Run> = Vec::new();
    for window in windows {
        match runs.last_mut() {
            Some(run)
                if run.source == window.source
                    && run.end == window.start
                    && !transitions.contains_key(&window.start) =>
            {
                run.end = window.end
            }
            _ => runs.push(window),
        }
    }

    let (mut out, track) = Graph::with_root(Track {
        item: Item::new("Flattened"),
        kind,
    });
    let mut pending = transitions.into_iter().peekable();
    for run in &runs {
        while let Some((_, transition)) = pending.next_if(|&(cut, _)| cut <= run.start) {
            let copy = out.import(graph, transition)?;
            out.append_child(track, copy)?;
        }

        let duration = run.end - run.start;
        let child = match run.source {
            Some((layer, index)) => {
                let span = read[layer].spans[index];
                let copy = out.import(graph, span.node)?;
                let covers_span = run.start == span.start && run.end == span.end;
                if !(span.whole && covers_span) {
                    let offset = run.start - span.start;
                    out.get_mut(copy)?
                        .set_source_range(Some(TimeRange::new(span.source_start + offset, duration)));
                }
                copy
            }
            None => out.add(Gap::new(duration)),
        };
        out.append_child(track, child)?;
    }
    for (_, transition) in pending {
        let copy = out.import(graph, transition)?;
        out.append_child(track, copy)?;
    }

    debug!(items = out.children(track)?.len(), "Flattened tracks");
    Ok(out)
}
