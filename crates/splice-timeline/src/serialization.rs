//! Portable encoding with versioning and upgrades.
//!
//! Every object is JSON tagged with `"OTIO_SCHEMA": "<Name>.<Version>"`.
//! The [`SchemaRegistry`] maps the label to a decode function, after any
//! registered upgrades have brought an older field set forward. Encoding
//! always writes the current registered version.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use splice_core::{RationalTime, Result, SchemaLabel, SpliceError, TimeRange};
use tracing::trace;

use crate::clip::{Clip, MediaReference, MediaReferenceKind};
use crate::graph::{Graph, NodeId};
use crate::item::{Effect, EffectKind, Item, Marker, MarkerColor, Metadata};
use crate::node::{Gap, Node, Transition, TransitionType};
use crate::schema::SchemaRegistry;
use crate::timeline::Timeline;
use crate::track::{Stack, Track, TrackKind};

// ── Options ─────────────────────────────────────────────────────

/// Controls the text form of encoded documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Spaces per indentation level; `None` writes compact JSON.
    pub indent: Option<usize>,
}

impl EncodeOptions {
    pub fn compact() -> Self {
        Self { indent: None }
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { indent: Some(4) }
    }
}

pub(crate) fn render(value: &Value, options: &EncodeOptions) -> Result<String> {
    match options.indent {
        None => serde_json::to_string(value).map_err(|e| codec_error("Failed to encode", e)),
        Some(width) => {
            let indent = vec![b' '; width];
            let mut buf = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
            let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
            value
                .serialize(&mut serializer)
                .map_err(|e| codec_error("Failed to encode", e))?;
            String::from_utf8(buf).map_err(|e| SpliceError::Serialization(e.to_string()))
        }
    }
}

fn codec_error(context: &str, err: serde_json::Error) -> SpliceError {
    SpliceError::Serialization(format!("{context}: {err}"))
}

fn mismatch(expected: &str, found: &str) -> SpliceError {
    SpliceError::TypeMismatch {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

/// Serialize a field value, e.g. an optional range (`None` becomes `null`).
pub fn to_field<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| codec_error("Failed to encode field", e))
}

// ── Decoding ────────────────────────────────────────────────────

/// The field set of one encoded object, minus its schema label.
///
/// Decode functions take the fields they understand; whatever is left
/// when decoding finishes is ignored.
#[derive(Debug)]
pub struct Fields {
    schema: String,
    map: Map<String, Value>,
}

impl Fields {
    pub fn new(schema: impl Into<String>, map: Map<String, Value>) -> Self {
        Self {
            schema: schema.into(),
            map,
        }
    }

    /// Canonical schema name the fields were tagged with.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Remove a field. Absent and `null` fields both read as `None`.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key).filter(|value| !value.is_null())
    }

    fn invalid(&self, key: &str, expected: &str) -> SpliceError {
        SpliceError::Serialization(format!("{}.{key}: expected {expected}", self.schema))
    }

    pub fn opt_string(&mut self, key: &str) -> Result<Option<String>> {
        match self.take(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.invalid(key, "a string")),
        }
    }

    /// A string field, empty when absent.
    pub fn string(&mut self, key: &str) -> Result<String> {
        Ok(self.opt_string(key)?.unwrap_or_default())
    }

    pub fn bool_or(&mut self, key: &str, default: bool) -> Result<bool> {
        match self.take(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(b),
            Some(_) => Err(self.invalid(key, "a boolean")),
        }
    }

    pub fn f64_or(&mut self, key: &str, default: f64) -> Result<f64> {
        match self.take(key) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| self.invalid(key, "a number")),
        }
    }

    pub fn metadata(&mut self, key: &str) -> Result<Metadata> {
        match self.take(key) {
            None => Ok(Metadata::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(self.invalid(key, "an object")),
        }
    }

    /// Deserialize a field with serde, e.g. a `TimeRange`.
    pub fn parse<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| SpliceError::Serialization(format!("{}.{key}: {e}", self.schema))),
        }
    }

    pub fn list(&mut self, key: &str) -> Result<Vec<Value>> {
        match self.take(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(values)) => Ok(values),
            Some(_) => Err(self.invalid(key, "an array")),
        }
    }

    pub(crate) fn finish(self) {
        for key in self.map.keys() {
            trace!(schema = %self.schema, field = %key, "Ignoring unknown field");
        }
    }
}

/// What a decode function produced.
#[derive(Debug)]
pub enum Decoded {
    /// A node added to the decode graph, still detached.
    Node(NodeId),
    Marker(Marker),
    Effect(Effect),
    MediaReference(MediaReference),
    Timeline(TimelineParts),
}

impl Decoded {
    fn kind_name(&self) -> &'static str {
        match self {
            Decoded::Node(_) => "node",
            Decoded::Marker(_) => "Marker",
            Decoded::Effect(_) => "Effect",
            Decoded::MediaReference(_) => "media reference",
            Decoded::Timeline(_) => "Timeline",
        }
    }
}

/// A decoded timeline whose tracks stack lives in the decode graph.
#[derive(Debug, Clone)]
pub struct TimelineParts {
    pub name: String,
    pub metadata: Metadata,
    pub global_start_time: Option<RationalTime>,
    pub tracks: NodeId,
}

/// State threaded through one decode call: the registry in use and the
/// graph that decoded nodes are added to.
pub struct DecodeContext<'r> {
    registry: &'r SchemaRegistry,
    graph: Graph,
}

impl<'r> DecodeContext<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            graph: Graph::new(),
        }
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Decode one tagged object, upgrading its fields first if it was
    /// written by an older schema version.
    pub fn decode(&mut self, value: Value) -> Result<Decoded> {
        let Value::Object(mut map) = value else {
            return Err(SpliceError::Serialization(
                "expected a tagged object".to_string(),
            ));
        };
        let label = match map.remove(SchemaLabel::KEY) {
            Some(Value::String(label)) => SchemaLabel::parse(&label)?,
            _ => {
                return Err(SpliceError::Serialization(format!(
                    "object has no {} label",
                    SchemaLabel::KEY
                )))
            }
        };
        let registry = self.registry;
        let (name, codec) = registry.upgrade_fields(&label, &mut map)?;
        let mut fields = Fields::new(name, map);
        let decoded = (codec.decode)(&mut fields, self)?;
        fields.finish();
        Ok(decoded)
    }

    /// Decode an object that must produce a node.
    pub fn decode_node(&mut self, value: Value) -> Result<NodeId> {
        match self.decode(value)? {
            Decoded::Node(id) => Ok(id),
            other => Err(mismatch("node", other.kind_name())),
        }
    }

    pub fn decode_children(&mut self, values: Vec<Value>) -> Result<Vec<NodeId>> {
        values
            .into_iter()
            .map(|value| self.decode_node(value))
            .collect()
    }

    pub fn add(&mut self, node: impl Into<Node>) -> NodeId {
        self.graph.add(node)
    }

    /// Add a composition and attach `children` under it in order.
    pub fn add_with_children(
        &mut self,
        node: impl Into<Node>,
        children: Vec<NodeId>,
    ) -> Result<NodeId> {
        let id = self.graph.add(node);
        for child in children {
            self.graph.append_child(id, child)?;
        }
        Ok(id)
    }

    fn decode_marker(&mut self, value: Value) -> Result<Marker> {
        match self.decode(value)? {
            Decoded::Marker(marker) => Ok(marker),
            other => Err(mismatch("Marker", other.kind_name())),
        }
    }

    fn decode_effect(&mut self, value: Value) -> Result<Effect> {
        match self.decode(value)? {
            Decoded::Effect(effect) => Ok(effect),
            other => Err(mismatch("Effect", other.kind_name())),
        }
    }

    fn decode_media_reference(&mut self, value: Value) -> Result<MediaReference> {
        match self.decode(value)? {
            Decoded::MediaReference(media) => Ok(media),
            other => Err(mismatch("media reference", other.kind_name())),
        }
    }
}

// ── Encoding ────────────────────────────────────────────────────

/// Something an encode function can write.
#[derive(Debug, Clone, Copy)]
pub enum Encodable<'a> {
    Node { graph: &'a Graph, id: NodeId },
    Marker(&'a Marker),
    Effect(&'a Effect),
    MediaReference(&'a MediaReference),
    Timeline(&'a Timeline),
}

impl Encodable<'_> {
    /// Schema name the value encodes under.
    pub fn schema_name(&self) -> Result<&'static str> {
        Ok(match self {
            Encodable::Node { graph, id } => graph.get(*id)?.schema_name(),
            Encodable::Marker(_) => "Marker",
            Encodable::Effect(effect) => effect.schema_name(),
            Encodable::MediaReference(media) => media.schema_name(),
            Encodable::Timeline(_) => "Timeline",
        })
    }
}

/// Writes values through the registry's encode functions, tagging each
/// object with its current schema label.
#[derive(Clone, Copy)]
pub struct Encoder<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> Encoder<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn encode(&self, encodable: Encodable<'_>) -> Result<Value> {
        let name = encodable.schema_name()?;
        let (version, codec) = self.registry.codec_for_encode(name)?;
        let mut map = (codec.encode)(encodable, self)?;
        map.insert(
            SchemaLabel::KEY.to_string(),
            Value::String(SchemaLabel::new(name, version).to_string()),
        );
        Ok(Value::Object(map))
    }

    pub fn encode_node(&self, graph: &Graph, id: NodeId) -> Result<Value> {
        self.encode(Encodable::Node { graph, id })
    }

    /// Encode a composition's children as an array.
    pub fn encode_children(&self, graph: &Graph, id: NodeId) -> Result<Value> {
        graph
            .children(id)?
            .iter()
            .map(|&child| self.encode_node(graph, child))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

// ── Shared item fields ──────────────────────────────────────────

/// Read the fields every item-like schema shares.
pub fn decode_item(fields: &mut Fields, ctx: &mut DecodeContext<'_>) -> Result<Item> {
    let name = fields.string("name")?;
    let source_range = fields.parse::<TimeRange>("source_range")?;
    let metadata = fields.metadata("metadata")?;
    let effects = fields
        .list("effects")?
        .into_iter()
        .map(|value| ctx.decode_effect(value))
        .collect::<Result<Vec<_>>>()?;
    let markers = fields
        .list("markers")?
        .into_iter()
        .map(|value| ctx.decode_marker(value))
        .collect::<Result<Vec<_>>>()?;
    let enabled = fields.bool_or("enabled", true)?;
    Ok(Item {
        name,
        source_range,
        metadata,
        effects,
        markers,
        enabled,
    })
}

/// Write the fields every item-like schema shares.
pub fn encode_item(item: &Item, encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    let effects = item
        .effects
        .iter()
        .map(|effect| encoder.encode(Encodable::Effect(effect)))
        .collect::<Result<Vec<_>>>()?;
    let markers = item
        .markers
        .iter()
        .map(|marker| encoder.encode(Encodable::Marker(marker)))
        .collect::<Result<Vec<_>>>()?;

    let mut map = Map::new();
    map.insert("name".into(), Value::String(item.name.clone()));
    map.insert("source_range".into(), to_field(&item.source_range)?);
    map.insert("metadata".into(), Value::Object(item.metadata.clone()));
    map.insert("effects".into(), Value::Array(effects));
    map.insert("markers".into(), Value::Array(markers));
    map.insert("enabled".into(), Value::Bool(item.enabled));
    Ok(map)
}

fn node_of<'a>(encodable: Encodable<'a>) -> Result<(&'a Graph, NodeId, &'a Node)> {
    match encodable {
        Encodable::Node { graph, id } => Ok((graph, id, graph.get(id)?)),
        other => Err(mismatch("node", other.schema_name()?)),
    }
}

// ── Built-in codecs ─────────────────────────────────────────────

pub(crate) fn decode_generic_item(fields: &mut Fields, ctx: &mut DecodeContext<'_>) -> Result<Decoded> {
    let item = decode_item(fields, ctx)?;
    Ok(Decoded::Node(ctx.add(item)))
}

pub(crate) fn encode_generic_item(encodable: Encodable<'_>, encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    match node_of(encodable)? {
        (_, _, Node::Item(item)) => encode_item(item, encoder),
        (_, _, other) => Err(mismatch("Item", other.schema_name())),
    }
}

pub(crate) fn decode_clip(fields: &mut Fields, ctx: &mut DecodeContext<'_>) -> Result<Decoded> {
    let item = decode_item(fields, ctx)?;
    let media_reference = match fields.take("media_reference") {
        Some(value) => ctx.decode_media_reference(value)?,
        None => MediaReference::missing(),
    };
    Ok(Decoded::Node(ctx.add(Clip {
        item,
        media_reference,
    })))
}

pub(crate) fn encode_clip(encodable: Encodable<'_>, encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    let (_, _, node) = node_of(encodable)?;
    let Node::Clip(clip) = node else {
        return Err(mismatch("Clip", node.schema_name()));
    };
    let mut map = encode_item(&clip.item, encoder)?;
    map.insert(
        "media_reference".into(),
        encoder.encode(Encodable::MediaReference(&clip.media_reference))?,
    );
    Ok(map)
}

pub(crate) fn decode_gap(fields: &mut Fields, ctx: &mut DecodeContext<'_>) -> Result<Decoded> {
    let item = decode_item(fields, ctx)?;
    Ok(Decoded::Node(ctx.add(Gap { item })))
}

pub(crate) fn encode_gap(encodable: Encodable<'_>, encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    match node_of(encodable)? {
        (_, _, Node::Gap(gap)) => encode_item(&gap.item, encoder),
        (_, _, other) => Err(mismatch("Gap", other.schema_name())),
    }
}

pub(crate) fn decode_transition(fields: &mut Fields, ctx: &mut DecodeContext<'_>) -> Result<Decoded> {
    let transition = Transition {
        name: fields.string("name")?,
        metadata: fields.metadata("metadata")?,
        transition_type: fields
            .opt_string("transition_type")?
            .map(|name| TransitionType::parse(&name))
            .unwrap_or_default(),
        parameters: fields.metadata("parameters")?,
        in_offset: fields.parse::<RationalTime>("in_offset")?,
        out_offset: fields.parse::<RationalTime>("out_offset")?,
    };
    Ok(Decoded::Node(ctx.add(transition)))
}

pub(crate) fn encode_transition(encodable: Encodable<'_>, _encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    let (_, _, node) = node_of(encodable)?;
    let Node::Transition(transition) = node else {
        return Err(mismatch("Transition", node.schema_name()));
    };
    let mut map = Map::new();
    map.insert("name".into(), Value::String(transition.name.clone()));
    map.insert("metadata".into(), Value::Object(transition.metadata.clone()));
    map.insert(
        "transition_type".into(),
        Value::String(transition.transition_type.as_str().to_string()),
    );
    map.insert("parameters".into(), Value::Object(transition.parameters.clone()));
    map.insert("in_offset".into(), to_field(&transition.in_offset)?);
    map.insert("out_offset".into(), to_field(&transition.out_offset)?);
    Ok(map)
}

pub(crate) fn decode_track(fields: &mut Fields, ctx: &mut DecodeContext<'_>) -> Result<Decoded> {
    let item = decode_item(fields, ctx)?;
    let kind = match fields.opt_string("kind")? {
        Some(kind) => TrackKind::from(kind),
        None => TrackKind::default(),
    };
    let children = fields.list("children")?;
    let children = ctx.decode_children(children)?;
    let id = ctx.add_with_children(Track { item, kind }, children)?;
    Ok(Decoded::Node(id))
}

pub(crate) fn encode_track(encodable: Encodable<'_>, encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    let (graph, id, node) = node_of(encodable)?;
    let Node::Track(track) = node else {
        return Err(mismatch("Track", node.schema_name()));
    };
    let mut map = encode_item(&track.item, encoder)?;
    map.insert("kind".into(), Value::String(track.kind.as_str().to_string()));
    map.insert("children".into(), encoder.encode_children(graph, id)?);
    Ok(map)
}

pub(crate) fn decode_stack(fields: &mut Fields, ctx: &mut DecodeContext<'_>) -> Result<Decoded> {
    let item = decode_item(fields, ctx)?;
    let children = fields.list("children")?;
    let children = ctx.decode_children(children)?;
    let id = ctx.add_with_children(Stack { item }, children)?;
    Ok(Decoded::Node(id))
}

pub(crate) fn encode_stack(encodable: Encodable<'_>, encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    let (graph, id, node) = node_of(encodable)?;
    let Node::Stack(stack) = node else {
        return Err(mismatch("Stack", node.schema_name()));
    };
    let mut map = encode_item(&stack.item, encoder)?;
    map.insert("children".into(), encoder.encode_children(graph, id)?);
    Ok(map)
}

pub(crate) fn decode_timeline(fields: &mut Fields, ctx: &mut DecodeContext<'_>) -> Result<Decoded> {
    let name = fields.string("name")?;
    let metadata = fields.metadata("metadata")?;
    let global_start_time = fields.parse::<RationalTime>("global_start_time")?;
    let tracks = match fields.take("tracks") {
        Some(value) => {
            let id = ctx.decode_node(value)?;
            let node = ctx.graph().get(id)?;
            if !matches!(node, Node::Stack(_)) {
                return Err(mismatch("Stack", node.schema_name()));
            }
            id
        }
        None => ctx.add(Stack::new("tracks")),
    };
    Ok(Decoded::Timeline(TimelineParts {
        name,
        metadata,
        global_start_time,
        tracks,
    }))
}

pub(crate) fn encode_timeline(encodable: Encodable<'_>, encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    let Encodable::Timeline(timeline) = encodable else {
        return Err(mismatch("Timeline", encodable.schema_name()?));
    };
    let mut map = Map::new();
    map.insert("name".into(), Value::String(timeline.name.clone()));
    map.insert("metadata".into(), Value::Object(timeline.metadata.clone()));
    map.insert("global_start_time".into(), to_field(&timeline.global_start_time)?);
    map.insert(
        "tracks".into(),
        encoder.encode_node(timeline.graph(), timeline.tracks())?,
    );
    Ok(map)
}

pub(crate) fn decode_marker(fields: &mut Fields, _ctx: &mut DecodeContext<'_>) -> Result<Decoded> {
    let marker = Marker {
        name: fields.string("name")?,
        marked_range: fields.parse::<TimeRange>("marked_range")?.unwrap_or_default(),
        color: fields.parse::<MarkerColor>("color")?.unwrap_or_default(),
        comment: fields.string("comment")?,
        metadata: fields.metadata("metadata")?,
    };
    Ok(Decoded::Marker(marker))
}

pub(crate) fn encode_marker(encodable: Encodable<'_>, _encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    let Encodable::Marker(marker) = encodable else {
        return Err(mismatch("Marker", encodable.schema_name()?));
    };
    let mut map = Map::new();
    map.insert("name".into(), Value::String(marker.name.clone()));
    map.insert("marked_range".into(), to_field(&marker.marked_range)?);
    map.insert("color".into(), to_field(&marker.color)?);
    map.insert("comment".into(), Value::String(marker.comment.clone()));
    map.insert("metadata".into(), Value::Object(marker.metadata.clone()));
    Ok(map)
}

/// Decodes `Effect`, `LinearTimeWarp` and `FreezeFrame`.
pub(crate) fn decode_effect(fields: &mut Fields, _ctx: &mut DecodeContext<'_>) -> Result<Decoded> {
    let name = fields.string("name")?;
    let effect_name = fields.string("effect_name")?;
    let metadata = fields.metadata("metadata")?;
    let schema = fields.schema().to_string();
    let kind = match schema.as_str() {
        "LinearTimeWarp" => EffectKind::LinearTimeWarp {
            time_scalar: fields.f64_or("time_scalar", 1.0)?,
        },
        "FreezeFrame" => {
            fields.take("time_scalar");
            EffectKind::FreezeFrame
        }
        _ => EffectKind::Generic,
    };
    Ok(Decoded::Effect(Effect {
        name,
        effect_name,
        metadata,
        kind,
    }))
}

pub(crate) fn encode_effect(encodable: Encodable<'_>, _encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    let Encodable::Effect(effect) = encodable else {
        return Err(mismatch("Effect", encodable.schema_name()?));
    };
    let mut map = Map::new();
    map.insert("name".into(), Value::String(effect.name.clone()));
    map.insert("effect_name".into(), Value::String(effect.effect_name.clone()));
    map.insert("metadata".into(), Value::Object(effect.metadata.clone()));
    if let Some(time_scalar) = effect.time_scalar() {
        map.insert("time_scalar".into(), to_field(&time_scalar)?);
    }
    Ok(map)
}

/// Decodes `ExternalReference`, `MissingReference` and `GeneratorReference`.
pub(crate) fn decode_media_reference(fields: &mut Fields, _ctx: &mut DecodeContext<'_>) -> Result<Decoded> {
    let name = fields.string("name")?;
    let metadata = fields.metadata("metadata")?;
    let available_range = fields.parse::<TimeRange>("available_range")?;
    let schema = fields.schema().to_string();
    let kind = match schema.as_str() {
        "ExternalReference" => MediaReferenceKind::External {
            target_url: fields.string("target_url")?,
        },
        "GeneratorReference" => MediaReferenceKind::Generator {
            generator_kind: fields.string("generator_kind")?,
            parameters: fields.metadata("parameters")?,
        },
        _ => MediaReferenceKind::Missing,
    };
    Ok(Decoded::MediaReference(MediaReference {
        name,
        available_range,
        metadata,
        kind,
    }))
}

pub(crate) fn encode_media_reference(encodable: Encodable<'_>, _encoder: &Encoder<'_>) -> Result<Map<String, Value>> {
    let Encodable::MediaReference(media) = encodable else {
        return Err(mismatch("media reference", encodable.schema_name()?));
    };
    let mut map = Map::new();
    map.insert("name".into(), Value::String(media.name.clone()));
    map.insert("metadata".into(), Value::Object(media.metadata.clone()));
    map.insert("available_range".into(), to_field(&media.available_range)?);
    match &media.kind {
        MediaReferenceKind::External { target_url } => {
            map.insert("target_url".into(), Value::String(target_url.clone()));
        }
        MediaReferenceKind::Generator {
            generator_kind,
            parameters,
        } => {
            map.insert("generator_kind".into(), Value::String(generator_kind.clone()));
            map.insert("parameters".into(), Value::Object(parameters.clone()));
        }
        MediaReferenceKind::Missing => {}
    }
    Ok(map)
}

// ── Documents ───────────────────────────────────────────────────

/// A top-level encoded document.
#[derive(Debug, Clone)]
pub enum Document {
    Timeline(Timeline),
    /// Any other node, as the root of its own graph.
    Tree(Graph),
}

impl Document {
    /// Encode with the global registry and default options.
    pub fn to_json(&self) -> Result<String> {
        encode_document(self, &EncodeOptions::default())
    }

    /// Decode with the global registry.
    pub fn from_json(text: &str) -> Result<Self> {
        decode_str(text)
    }

    /// Save the document to a file path.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let text = self.to_json()?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Load a document from a file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn as_timeline(&self) -> Option<&Timeline> {
        match self {
            Document::Timeline(timeline) => Some(timeline),
            Document::Tree(_) => None,
        }
    }

    pub fn into_timeline(self) -> Result<Timeline> {
        match self {
            Document::Timeline(timeline) => Ok(timeline),
            Document::Tree(graph) => {
                let found = match graph.root() {
                    Some(root) => graph.get(root)?.schema_name(),
                    None => "empty graph",
                };
                Err(mismatch("Timeline", found))
            }
        }
    }

    /// The document's graph; a timeline's root is its tracks stack.
    pub fn graph(&self) -> &Graph {
        match self {
            Document::Timeline(timeline) => timeline.graph(),
            Document::Tree(graph) => graph,
        }
    }
}

/// Decode a document with the global registry.
pub fn decode_str(text: &str) -> Result<Document> {
    SchemaRegistry::global().decode_str(text)
}

/// Encode a document with the global registry.
pub fn encode_document(document: &Document, options: &EncodeOptions) -> Result<String> {
    SchemaRegistry::global().encode_document(document, options)
}
