//! Schema registry: maps `(name, version)` to decode/encode functions and
//! holds the upgrade chain that brings older field sets forward.
//!
//! A registry is assembled once with [`SchemaRegistryBuilder`] and is
//! immutable afterwards. The process-wide instance is either installed
//! explicitly with [`SchemaRegistry::install`] or lazily initialised with
//! the built-in schemas on first use.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use serde_json::{Map, Value};
use splice_core::{Result, SchemaLabel, SpliceError};
use tracing::{debug, trace};

use crate::graph::{Graph, NodeId};
use crate::serialization::{
    decode_clip, decode_effect, decode_gap, decode_generic_item, decode_marker,
    decode_media_reference, decode_stack, decode_timeline, decode_track, decode_transition,
    encode_clip, encode_effect, encode_gap, encode_generic_item, encode_marker,
    encode_media_reference, encode_stack, encode_timeline, encode_track, encode_transition,
    render, DecodeContext, Decoded, Document, EncodeOptions, Encodable, Encoder, Fields,
};
use crate::timeline::Timeline;

/// Builds a value from an upgraded field set.
pub type DecodeFn = fn(&mut Fields, &mut DecodeContext<'_>) -> Result<Decoded>;

/// Writes a value's fields; the encoder adds the schema label.
pub type EncodeFn = fn(Encodable<'_>, &Encoder<'_>) -> Result<Map<String, Value>>;

/// Rewrites the fields of version `N - 1` into the shape of version `N`.
pub type UpgradeFn = fn(&mut Map<String, Value>);

/// The decode/encode pair registered for one schema.
#[derive(Clone, Copy, Debug)]
pub struct SchemaCodec {
    pub decode: DecodeFn,
    pub encode: EncodeFn,
}

impl SchemaCodec {
    pub fn new(decode: DecodeFn, encode: EncodeFn) -> Self {
        Self { decode, encode }
    }
}

#[derive(Clone, Copy, Debug)]
struct SchemaEntry {
    version: u32,
    codec: SchemaCodec,
}

// ── Built-ins ───────────────────────────────────────────────────

fn builtin_schemas() -> Vec<(&'static str, u32, SchemaCodec)> {
    vec![
        ("Item", 1, SchemaCodec::new(decode_generic_item, encode_generic_item)),
        ("Clip", 1, SchemaCodec::new(decode_clip, encode_clip)),
        ("Gap", 1, SchemaCodec::new(decode_gap, encode_gap)),
        ("Transition", 1, SchemaCodec::new(decode_transition, encode_transition)),
        ("Track", 1, SchemaCodec::new(decode_track, encode_track)),
        ("Stack", 1, SchemaCodec::new(decode_stack, encode_stack)),
        ("Timeline", 1, SchemaCodec::new(decode_timeline, encode_timeline)),
        ("Marker", 2, SchemaCodec::new(decode_marker, encode_marker)),
        ("Effect", 1, SchemaCodec::new(decode_effect, encode_effect)),
        ("LinearTimeWarp", 1, SchemaCodec::new(decode_effect, encode_effect)),
        ("FreezeFrame", 1, SchemaCodec::new(decode_effect, encode_effect)),
        ("ExternalReference", 1, SchemaCodec::new(decode_media_reference, encode_media_reference)),
        ("MissingReference", 1, SchemaCodec::new(decode_media_reference, encode_media_reference)),
        ("GeneratorReference", 1, SchemaCodec::new(decode_media_reference, encode_media_reference)),
    ]
}

const BUILTIN_ALIASES: &[(&str, &str)] = &[("Sequence", "Track"), ("Filler", "Gap")];

fn upgrade_marker_to_2(fields: &mut Map<String, Value>) {
    if let Some(range) = fields.remove("range") {
        fields.insert("marked_range".to_string(), range);
    }
}

fn builtin_upgrades() -> Vec<(&'static str, u32, UpgradeFn)> {
    vec![("Marker", 2, upgrade_marker_to_2 as UpgradeFn)]
}

// ── Builder ─────────────────────────────────────────────────────

/// Collects registrations; [`build`](Self::build) validates them as a set,
/// so the order of calls never matters.
#[derive(Default)]
pub struct SchemaRegistryBuilder {
    builtins: bool,
    schemas: Vec<(String, u32, SchemaCodec)>,
    aliases: Vec<(String, String)>,
    upgrades: Vec<(String, u32, UpgradeFn)>,
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the built-in schemas, aliases and upgrades. Explicit
    /// registrations of a built-in name replace the built-in entry.
    pub fn with_builtins(mut self) -> Self {
        self.builtins = true;
        self
    }

    pub fn register(
        mut self,
        name: impl Into<String>,
        version: u32,
        decode: DecodeFn,
        encode: EncodeFn,
    ) -> Self {
        self.schemas
            .push((name.into(), version, SchemaCodec::new(decode, encode)));
        self
    }

    /// Decode objects labelled `alias` with the schema `target`.
    pub fn register_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), target.into()));
        self
    }

    /// Register the step that brings `name` from `to_version - 1` to
    /// `to_version`.
    pub fn register_upgrade(
        mut self,
        name: impl Into<String>,
        to_version: u32,
        upgrade: UpgradeFn,
    ) -> Self {
        self.upgrades.push((name.into(), to_version, upgrade));
        self
    }

    pub fn build(self) -> Result<SchemaRegistry> {
        let mut registry = if self.builtins {
            SchemaRegistry::builtin()
        } else {
            SchemaRegistry::empty()
        };

        let mut schemas = self.schemas;
        schemas.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        for pair in schemas.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(SpliceError::SchemaAlreadyRegistered(pair[0].0.clone()));
            }
        }
        for (name, version, codec) in schemas {
            if name.is_empty() || name.contains('.') || version == 0 {
                return Err(SpliceError::MalformedSchemaLabel(format!("{name}.{version}")));
            }
            registry.schemas.insert(name, SchemaEntry { version, codec });
        }

        // Built-in upgrades only survive if they still lead to a registered
        // version of the schema they were written for.
        registry.upgrades.retain(|(name, to_version), _| {
            registry
                .schemas
                .get(name)
                .is_some_and(|entry| *to_version <= entry.version)
        });

        let mut aliases = self.aliases;
        aliases.sort();
        aliases.dedup();
        for pair in aliases.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(SpliceError::SchemaAlreadyRegistered(pair[0].0.clone()));
            }
        }
        for (alias, target) in aliases {
            if registry.schemas.contains_key(&alias) {
                return Err(SpliceError::SchemaAlreadyRegistered(alias));
            }
            registry.aliases.insert(alias, target);
        }
        for (alias, target) in &registry.aliases {
            if !registry.schemas.contains_key(target) {
                return Err(SpliceError::SchemaNotRegistered(format!("{target} (alias {alias})")));
            }
        }

        let mut upgrades = self.upgrades;
        upgrades.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        for pair in upgrades.windows(2) {
            if pair[0].0 == pair[1].0 && pair[0].1 == pair[1].1 {
                return Err(SpliceError::SchemaAlreadyRegistered(format!(
                    "upgrade of {} to version {}",
                    pair[0].0, pair[0].1
                )));
            }
        }
        for (name, to_version, upgrade) in upgrades {
            let current = registry
                .schemas
                .get(&name)
                .map(|entry| entry.version)
                .ok_or_else(|| SpliceError::SchemaNotRegistered(name.clone()))?;
            if to_version < 2 || to_version > current {
                return Err(SpliceError::SchemaNotRegistered(format!("{name}.{to_version}")));
            }
            registry.upgrades.insert((name, to_version), upgrade);
        }

        Ok(registry)
    }
}

// ── Registry ────────────────────────────────────────────────────

static GLOBAL: OnceLock<SchemaRegistry> = OnceLock::new();

/// Immutable mapping from schema identity to behaviour.
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: HashMap<String, SchemaEntry>,
    aliases: HashMap<String, String>,
    upgrades: HashMap<(String, u32), UpgradeFn>,
}

impl SchemaRegistry {
    fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
            aliases: HashMap::new(),
            upgrades: HashMap::new(),
        }
    }

    /// A registry holding only the built-in schemas.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (name, version, codec) in builtin_schemas() {
            registry
                .schemas
                .insert(name.to_string(), SchemaEntry { version, codec });
        }
        for (alias, target) in BUILTIN_ALIASES {
            registry
                .aliases
                .insert(alias.to_string(), target.to_string());
        }
        for (name, to_version, upgrade) in builtin_upgrades() {
            registry
                .upgrades
                .insert((name.to_string(), to_version), upgrade);
        }
        registry
    }

    /// The built-in codec for `name`, for custom registrations that only
    /// change one direction.
    pub fn builtin_codec(name: &str) -> Option<SchemaCodec> {
        builtin_schemas()
            .into_iter()
            .find(|(builtin, _, _)| *builtin == name)
            .map(|(_, _, codec)| codec)
    }

    /// The process-wide registry, initialised with the built-ins on first
    /// use unless one was installed.
    pub fn global() -> &'static SchemaRegistry {
        GLOBAL.get_or_init(|| {
            debug!("Initializing built-in schema registry");
            Self::builtin()
        })
    }

    /// Install `registry` as the process-wide registry. Fails once the
    /// global registry has been installed or used.
    pub fn install(registry: SchemaRegistry) -> Result<&'static SchemaRegistry> {
        let mut installed = false;
        let global = GLOBAL.get_or_init(|| {
            installed = true;
            registry
        });
        if !installed {
            return Err(SpliceError::RegistryAlreadyInstalled);
        }
        debug!(schemas = global.schemas.len(), "Installed schema registry");
        Ok(global)
    }

    /// Canonical schema name for `name`, following aliases.
    pub fn resolve(&self, name: &str) -> Result<&str> {
        if let Some((key, _)) = self.schemas.get_key_value(name) {
            return Ok(key);
        }
        self.aliases
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| SpliceError::UnknownSchema(name.to_string()))
    }

    /// Current version of `name` (aliases included).
    pub fn current_version(&self, name: &str) -> Option<u32> {
        let name = self.resolve(name).ok()?;
        self.schemas.get(name).map(|entry| entry.version)
    }

    /// Every registered schema with its current version, sorted by name.
    pub fn schema_versions(&self) -> Vec<(String, u32)> {
        let sorted: BTreeMap<_, _> = self
            .schemas
            .iter()
            .map(|(name, entry)| (name.clone(), entry.version))
            .collect();
        sorted.into_iter().collect()
    }

    /// Every registered upgrade step as `(name, to_version)`, sorted.
    pub fn upgrade_steps(&self) -> Vec<(String, u32)> {
        let mut steps: Vec<_> = self.upgrades.keys().cloned().collect();
        steps.sort();
        steps
    }

    /// Resolve `label`, check its version and upgrade `fields` in place to
    /// the current version. Returns the canonical name and codec.
    pub(crate) fn upgrade_fields(
        &self,
        label: &SchemaLabel,
        fields: &mut Map<String, Value>,
    ) -> Result<(&str, SchemaCodec)> {
        let name = self.resolve(&label.name)?;
        let entry = self
            .schemas
            .get(name)
            .ok_or_else(|| SpliceError::UnknownSchema(name.to_string()))?;
        if label.version > entry.version {
            return Err(SpliceError::UnsupportedSchemaVersion {
                name: name.to_string(),
                version: label.version,
                current: entry.version,
            });
        }
        for to_version in label.version + 1..=entry.version {
            match self.upgrades.get(&(name.to_string(), to_version)) {
                Some(upgrade) => {
                    trace!(schema = %name, to_version, "Applying schema upgrade");
                    upgrade(fields);
                }
                None => trace!(schema = %name, to_version, "No upgrade registered for step"),
            }
        }
        Ok((name, entry.codec))
    }

    pub(crate) fn codec_for_encode(&self, name: &str) -> Result<(u32, SchemaCodec)> {
        self.schemas
            .get(name)
            .map(|entry| (entry.version, entry.codec))
            .ok_or_else(|| SpliceError::SchemaNotRegistered(name.to_string()))
    }

    // ── Decoding ────────────────────────────────────────────────

    pub fn decode_str(&self, text: &str) -> Result<Document> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SpliceError::Serialization(format!("Invalid JSON: {e}")))?;
        self.decode_value(value)
    }

    pub fn decode_slice(&self, data: &[u8]) -> Result<Document> {
        let value: Value = serde_json::from_slice(data)
            .map_err(|e| SpliceError::Serialization(format!("Invalid JSON: {e}")))?;
        self.decode_value(value)
    }

    /// Decode a top-level timeline or node.
    pub fn decode_value(&self, value: Value) -> Result<Document> {
        let mut ctx = DecodeContext::new(self);
        let decoded = ctx.decode(value)?;
        let mut graph = ctx.into_graph();
        match decoded {
            Decoded::Node(id) => {
                graph.set_root(Some(id))?;
                Ok(Document::Tree(graph))
            }
            Decoded::Timeline(parts) => Ok(Document::Timeline(Timeline::from_parts(parts, graph)?)),
            _ => Err(SpliceError::TypeMismatch {
                expected: "Timeline or node".to_string(),
                found: "a non-node object".to_string(),
            }),
        }
    }

    // ── Encoding ────────────────────────────────────────────────

    pub fn encode_value(&self, document: &Document) -> Result<Value> {
        let encoder = Encoder::new(self);
        match document {
            Document::Timeline(timeline) => encoder.encode(Encodable::Timeline(timeline)),
            Document::Tree(graph) => {
                let root = graph
                    .root()
                    .ok_or_else(|| SpliceError::InvalidNode("graph has no root".to_string()))?;
                encoder.encode_node(graph, root)
            }
        }
    }

    pub fn encode_document(&self, document: &Document, options: &EncodeOptions) -> Result<String> {
        render(&self.encode_value(document)?, options)
    }

    /// Encode the subtree at `id`.
    pub fn encode_node(&self, graph: &Graph, id: NodeId) -> Result<Value> {
        Encoder::new(self).encode_node(graph, id)
    }
}
