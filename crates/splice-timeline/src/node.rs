//! The closed set of node payloads a [`Graph`](crate::graph::Graph) holds.

use splice_core::{RationalTime, TimeRange};

use crate::clip::Clip;
use crate::item::{Item, Metadata};
use crate::track::{Stack, Track};

/// Empty space in a track.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Gap {
    pub item: Item,
}

impl Gap {
    /// A gap lasting `duration`, starting at zero.
    pub fn new(duration: RationalTime) -> Self {
        Self {
            item: Item {
                source_range: Some(TimeRange::from_duration(duration)),
                ..Item::default()
            },
        }
    }
}

/// Kind of transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransitionType {
    #[default]
    SmpteDissolve,
    Custom(String),
}

impl TransitionType {
    pub fn as_str(&self) -> &str {
        match self {
            TransitionType::SmpteDissolve => "SMPTE_Dissolve",
            TransitionType::Custom(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "SMPTE_Dissolve" => TransitionType::SmpteDissolve,
            other => TransitionType::Custom(other.to_string()),
        }
    }
}

/// Overlap between the two siblings around it in a track.
///
/// A transition occupies no span of its own: it reaches `in_offset` back
/// into the previous sibling and `out_offset` forward into the next one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transition {
    pub name: String,
    pub metadata: Metadata,
    pub transition_type: TransitionType,
    pub parameters: Metadata,
    pub in_offset: Option<RationalTime>,
    pub out_offset: Option<RationalTime>,
}

impl Transition {
    pub fn new(name: impl Into<String>, in_offset: RationalTime, out_offset: RationalTime) -> Self {
        Self {
            name: name.into(),
            in_offset: Some(in_offset),
            out_offset: Some(out_offset),
            ..Self::default()
        }
    }

    /// `in_offset + out_offset`, treating unset offsets as zero.
    pub fn duration(&self) -> RationalTime {
        let in_offset = self.in_offset.unwrap_or_default();
        let out_offset = self.out_offset.unwrap_or_default();
        in_offset + out_offset
    }
}

/// A node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Item(Item),
    Clip(Clip),
    Gap(Gap),
    Transition(Transition),
    Track(Track),
    Stack(Stack),
}

impl Node {
    /// Schema name the node encodes under.
    pub fn schema_name(&self) -> &'static str {
        match self {
            Node::Item(_) => "Item",
            Node::Clip(_) => "Clip",
            Node::Gap(_) => "Gap",
            Node::Transition(_) => "Transition",
            Node::Track(_) => "Track",
            Node::Stack(_) => "Stack",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Transition(transition) => &transition.name,
            _ => self.item().map(|item| item.name.as_str()).unwrap_or_default(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            Node::Transition(transition) => transition.name = name,
            _ => {
                if let Some(item) = self.item_mut() {
                    item.name = name;
                }
            }
        }
    }

    /// Shared item fields; `None` for transitions.
    pub fn item(&self) -> Option<&Item> {
        match self {
            Node::Item(item) => Some(item),
            Node::Clip(clip) => Some(&clip.item),
            Node::Gap(gap) => Some(&gap.item),
            Node::Track(track) => Some(&track.item),
            Node::Stack(stack) => Some(&stack.item),
            Node::Transition(_) => None,
        }
    }

    pub fn item_mut(&mut self) -> Option<&mut Item> {
        match self {
            Node::Item(item) => Some(item),
            Node::Clip(clip) => Some(&mut clip.item),
            Node::Gap(gap) => Some(&mut gap.item),
            Node::Track(track) => Some(&mut track.item),
            Node::Stack(stack) => Some(&mut stack.item),
            Node::Transition(_) => None,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Node::Transition(transition) => &transition.metadata,
            Node::Item(item) => &item.metadata,
            Node::Clip(clip) => &clip.item.metadata,
            Node::Gap(gap) => &gap.item.metadata,
            Node::Track(track) => &track.item.metadata,
            Node::Stack(stack) => &stack.item.metadata,
        }
    }

    pub fn source_range(&self) -> Option<TimeRange> {
        self.item().and_then(|item| item.source_range)
    }

    /// Set the explicit source range. Transitions have none and ignore it.
    pub fn set_source_range(&mut self, range: Option<TimeRange>) {
        if let Some(item) = self.item_mut() {
            item.source_range = range;
        }
    }

    pub fn enabled(&self) -> bool {
        self.item().map_or(true, |item| item.enabled)
    }

    /// Tracks and stacks own children.
    pub fn is_composition(&self) -> bool {
        matches!(self, Node::Track(_) | Node::Stack(_))
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, Node::Transition(_))
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Node::Gap(_))
    }

    pub fn as_transition(&self) -> Option<&Transition> {
        match self {
            Node::Transition(transition) => Some(transition),
            _ => None,
        }
    }

    pub fn as_track(&self) -> Option<&Track> {
        match self {
            Node::Track(track) => Some(track),
            _ => None,
        }
    }

    pub fn as_clip(&self) -> Option<&Clip> {
        match self {
            Node::Clip(clip) => Some(clip),
            _ => None,
        }
    }

    /// Short human-readable label for error messages, e.g. `Clip "A"`.
    pub fn describe(&self) -> String {
        format!("{} {:?}", self.schema_name(), self.name())
    }
}

impl From<Item> for Node {
    fn from(item: Item) -> Self {
        Node::Item(item)
    }
}

impl From<Clip> for Node {
    fn from(clip: Clip) -> Self {
        Node::Clip(clip)
    }
}

impl From<Gap> for Node {
    fn from(gap: Gap) -> Self {
        Node::Gap(gap)
    }
}

impl From<Transition> for Node {
    fn from(transition: Transition) -> Self {
        Node::Transition(transition)
    }
}

impl From<Track> for Node {
    fn from(track: Track) -> Self {
        Node::Track(track)
    }
}

impl From<Stack> for Node {
    fn from(stack: Stack) -> Self {
        Node::Stack(stack)
    }
}
