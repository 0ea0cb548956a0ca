//! Schema registry behaviour: version upgrades, rejection of newer
//! versions, and independence from registration order.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use splice_core::{ErrorKind, Result, SpliceError};
use splice_timeline::{
    decode_item, encode_item, DecodeContext, Decoded, Encodable, Encoder, Fields, Node,
    SchemaRegistry, SchemaRegistryBuilder, Track, TrackKind,
};

use crate::support::init_logging;

// ── A version 2 Track schema ───────────────────────────────────

fn upgrade_track_to_2(fields: &mut Map<String, Value>) {
    if let Some(kind) = fields.remove("kind") {
        fields.insert("track_kind".to_string(), kind);
    }
}

fn decode_track_v2(fields: &mut Fields, ctx: &mut DecodeContext<'_>) -> Result<Decoded> {
    let item = decode_item(fields, ctx)?;
    let kind = match fields.opt_string("track_kind")? {
        Some(kind) => TrackKind::from(kind),
        None => TrackKind::default(),
    };
    let children = fields.list("children")?;
    let children = ctx.decode_children(children)?;
    let id = ctx.add_with_children(Track { item, kind }, children)?;
    Ok(Decoded::Node(id))
}

fn encode_track_v2(encodable: Encodable<'_>, encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    let Encodable::Node { graph, id } = encodable else {
        return Err(SpliceError::TypeMismatch {
            expected: "Track".to_string(),
            found: encodable.schema_name()?.to_string(),
        });
    };
    let Node::Track(track) = graph.get(id)? else {
        return Err(SpliceError::TypeMismatch {
            expected: "Track".to_string(),
            found: graph.get(id)?.schema_name().to_string(),
        });
    };
    let mut map = encode_item(&track.item, encoder)?;
    map.insert(
        "track_kind".to_string(),
        Value::String(track.kind.as_str().to_string()),
    );
    map.insert("children".to_string(), encoder.encode_children(graph, id)?);
    Ok(map)
}

fn registry_with_track_v2() -> SchemaRegistry {
    SchemaRegistryBuilder::new()
        .with_builtins()
        .register("Track", 2, decode_track_v2, encode_track_v2)
        .register_upgrade("Track", 2, upgrade_track_to_2)
        .build()
        .unwrap()
}

fn clip_json(name: &str) -> Value {
    json!({
        "OTIO_SCHEMA": "Clip.1",
        "name": name,
        "source_range": {
            "OTIO_SCHEMA": "TimeRange.1",
            "start_time": {"OTIO_SCHEMA": "RationalTime.1", "value": 0.0, "rate": 24.0},
            "duration": {"OTIO_SCHEMA": "RationalTime.1", "value": 48.0, "rate": 24.0},
        },
    })
}

#[test]
fn version_1_track_upgrades_to_version_2() {
    init_logging();
    let registry = registry_with_track_v2();
    let v1 = json!({
        "OTIO_SCHEMA": "Track.1",
        "name": "A1",
        "kind": "Audio",
        "children": [clip_json("dialog")],
    });
    let v2 = json!({
        "OTIO_SCHEMA": "Track.2",
        "name": "A1",
        "track_kind": "Audio",
        "children": [clip_json("dialog")],
    });

    let upgraded = registry.decode_value(v1).unwrap();
    let fresh = registry.decode_value(v2).unwrap();
    let (a, b) = (upgraded.graph(), fresh.graph());
    let root = a.root().unwrap();
    assert!(a.same_structure(root, b, b.root().unwrap()).unwrap());
    assert_eq!(a.get(root).unwrap().as_track().unwrap().kind, TrackKind::Audio);

    let encoded = registry.encode_value(&upgraded).unwrap();
    assert_eq!(encoded["OTIO_SCHEMA"], "Track.2");
    assert_eq!(encoded["track_kind"], "Audio");
    assert!(encoded.get("kind").is_none());
}

#[test]
fn newer_track_version_is_rejected() {
    let registry = registry_with_track_v2();
    let err = registry
        .decode_value(json!({"OTIO_SCHEMA": "Track.3", "name": "V1"}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaVersionUnsupported);
    assert!(matches!(
        err,
        SpliceError::UnsupportedSchemaVersion {
            version: 3,
            current: 2,
            ..
        }
    ));

    // The failed decode leaves the registry usable.
    assert!(registry.decode_value(clip_json("after")).is_ok());
}

#[test]
fn alias_follows_upgraded_schema() {
    let registry = registry_with_track_v2();
    let document = registry
        .decode_value(json!({"OTIO_SCHEMA": "Sequence.1", "kind": "Audio"}))
        .unwrap();
    let graph = document.graph();
    let track = graph.get(graph.root().unwrap()).unwrap().as_track().unwrap();
    assert_eq!(track.kind, TrackKind::Audio);
}

// ── Registration order ─────────────────────────────────────────

fn noop_upgrade(_fields: &mut Map<String, Value>) {}

fn apply_registration(builder: SchemaRegistryBuilder, which: usize) -> SchemaRegistryBuilder {
    let clip = SchemaRegistry::builtin_codec("Clip").unwrap();
    match which {
        0 => builder.with_builtins(),
        1 => builder.register("Track", 2, decode_track_v2, encode_track_v2),
        2 => builder.register_upgrade("Track", 2, upgrade_track_to_2),
        3 => builder.register("Clip", 3, clip.decode, clip.encode),
        4 => builder.register_upgrade("Clip", 3, noop_upgrade),
        5 => builder.register_alias("Lane", "Track"),
        _ => builder.register_alias("Shot", "Clip"),
    }
}

const REGISTRATIONS: usize = 7;

fn fingerprint(registry: &SchemaRegistry) -> (Vec<(String, u32)>, Vec<(String, u32)>, String) {
    let document = registry
        .decode_value(json!({
            "OTIO_SCHEMA": "Lane.1",
            "kind": "Video",
            "children": [{"OTIO_SCHEMA": "Shot.1", "name": "s"}],
        }))
        .unwrap();
    let encoded = registry.encode_value(&document).unwrap();
    (
        registry.schema_versions(),
        registry.upgrade_steps(),
        encoded.to_string(),
    )
}

proptest! {
    #[test]
    fn registration_order_is_irrelevant(
        order in Just((0..REGISTRATIONS).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let in_order = (0..REGISTRATIONS)
            .fold(SchemaRegistryBuilder::new(), apply_registration)
            .build()
            .unwrap();
        let shuffled = order
            .iter()
            .fold(SchemaRegistryBuilder::new(), |b, &which| apply_registration(b, which))
            .build()
            .unwrap();
        prop_assert_eq!(fingerprint(&in_order), fingerprint(&shuffled));
    }
}
