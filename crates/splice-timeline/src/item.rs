//! Payloads shared by every item-like node: the common `Item` fields,
//! markers and effects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use splice_core::TimeRange;

/// Free-form, string-keyed metadata carried by most objects.
pub type Metadata = serde_json::Map<String, Value>;

/// Fields common to clips, gaps, generic items and compositions.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub name: String,
    /// Explicit trim of the node's available range. `None` means the whole
    /// available range is used.
    pub source_range: Option<TimeRange>,
    pub metadata: Metadata,
    pub effects: Vec<Effect>,
    pub markers: Vec<Marker>,
    /// Disabled items are skipped when flattening.
    pub enabled: bool,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_source_range(name: impl Into<String>, source_range: TimeRange) -> Self {
        Self {
            name: name.into(),
            source_range: Some(source_range),
            ..Self::default()
        }
    }
}

impl Default for Item {
    fn default() -> Self {
        Self {
            name: String::new(),
            source_range: None,
            metadata: Metadata::new(),
            effects: Vec::new(),
            markers: Vec::new(),
            enabled: true,
        }
    }
}

// ── Markers ─────────────────────────────────────────────────────

/// Standard marker colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkerColor {
    Pink,
    #[default]
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Magenta,
    Black,
    White,
}

/// A named, coloured annotation over a range of its owner's time.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub name: String,
    pub marked_range: TimeRange,
    pub color: MarkerColor,
    pub comment: String,
    pub metadata: Metadata,
}

impl Marker {
    pub fn new(name: impl Into<String>, marked_range: TimeRange) -> Self {
        Self {
            name: name.into(),
            marked_range,
            color: MarkerColor::default(),
            comment: String::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_color(mut self, color: MarkerColor) -> Self {
        self.color = color;
        self
    }
}

// ── Effects ─────────────────────────────────────────────────────

/// The behaviour an [`Effect`] describes.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectKind {
    /// Opaque effect identified only by `effect_name`.
    Generic,
    /// Constant speed change; 2.0 plays twice as fast, negative plays backwards.
    LinearTimeWarp { time_scalar: f64 },
    /// Holds the first frame for the item's duration.
    FreezeFrame,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub name: String,
    pub effect_name: String,
    pub metadata: Metadata,
    pub kind: EffectKind,
}

impl Effect {
    pub fn new(name: impl Into<String>, effect_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            effect_name: effect_name.into(),
            metadata: Metadata::new(),
            kind: EffectKind::Generic,
        }
    }

    pub fn linear_time_warp(name: impl Into<String>, time_scalar: f64) -> Self {
        Self {
            name: name.into(),
            effect_name: "LinearTimeWarp".to_string(),
            metadata: Metadata::new(),
            kind: EffectKind::LinearTimeWarp { time_scalar },
        }
    }

    pub fn freeze_frame(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            effect_name: "FreezeFrame".to_string(),
            metadata: Metadata::new(),
            kind: EffectKind::FreezeFrame,
        }
    }

    /// Playback speed this effect applies, or `None` for generic effects.
    pub fn time_scalar(&self) -> Option<f64> {
        match self.kind {
            EffectKind::Generic => None,
            EffectKind::LinearTimeWarp { time_scalar } => Some(time_scalar),
            EffectKind::FreezeFrame => Some(0.0),
        }
    }

    /// Schema name this effect encodes under.
    pub fn schema_name(&self) -> &'static str {
        match self.kind {
            EffectKind::Generic => "Effect",
            EffectKind::LinearTimeWarp { .. } => "LinearTimeWarp",
            EffectKind::FreezeFrame => "FreezeFrame",
        }
    }
}
