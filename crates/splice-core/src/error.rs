//! Error types for Splice.

use thiserror::Error;

/// Broad classes of failure, shared by every crate in the workspace.
///
/// Callers that want to react to a category of failure (for instance an
/// adapter widening a trim range after an [`ErrorKind::UncuttableTransition`])
/// should match on [`SpliceError::kind`] instead of individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The ownership or sequencing rules of the composition graph were broken.
    StructuralViolation,
    /// No available range can be computed for a node.
    RangeUnavailable,
    /// A coordinate transform has no path between the two nodes.
    UnresolvableTransform,
    /// A trim would cut through the interior of a transition.
    UncuttableTransition,
    /// An encoded object carries a schema version newer than the registry knows.
    SchemaVersionUnsupported,
    /// A time does not land on a whole frame at the requested timecode rate.
    RateMismatchOverflow,
    /// A timecode or time string, or its rate, is malformed.
    InvalidTimecode,
    /// Schema registry misuse: an unknown or malformed label, or a
    /// conflicting registration.
    UnknownSchema,
    /// A node handle is stale or belongs to a different graph.
    InvalidNode,
    /// The portable encoding could not be read or written.
    Codec,
    /// Filesystem failure.
    Io,
}

/// Main error type for Splice operations.
#[derive(Error, Debug)]
pub enum SpliceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Graph structure ─────────────────────────────────────────
    #[error("{child} already has a parent; remove it before inserting it elsewhere")]
    ChildAlreadyParented { child: String },

    #[error("inserting {child} under {parent} would create a cycle")]
    WouldCreateCycle { child: String, parent: String },

    #[error("cannot put two transitions next to each other in a track: {first}, {second}")]
    AdjacentTransitions { first: String, second: String },

    #[error("transition {0} has no {1} set")]
    TransitionOffsetUnset(String, &'static str),

    #[error("{0} is not a composition")]
    NotAComposition(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("index {index} is out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("{0} still has a parent and cannot be destroyed")]
    NodeStillParented(String),

    #[error("invalid node handle: {0}")]
    InvalidNode(String),

    // ── Range queries ───────────────────────────────────────────
    #[error("cannot compute available range: {0}")]
    CannotComputeAvailableRange(String),

    #[error("not a child: {0}")]
    NotAChild(String),

    #[error("{from} and {to} share no common ancestor")]
    NoCommonAncestor { from: String, to: String },

    #[error("cannot trim in the middle of transition {0}")]
    CannotTrimTransition(String),

    // ── Schema registry ─────────────────────────────────────────
    #[error("schema {name} version {version} is newer than the supported version {current}")]
    UnsupportedSchemaVersion {
        name: String,
        version: u32,
        current: u32,
    },

    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    #[error("schema {0} is already registered")]
    SchemaAlreadyRegistered(String),

    #[error("schema {0} has not been registered")]
    SchemaNotRegistered(String),

    #[error("malformed schema label: {0:?}")]
    MalformedSchemaLabel(String),

    #[error("the process-wide schema registry is already initialized")]
    RegistryAlreadyInstalled,

    // ── Time algebra ────────────────────────────────────────────
    #[error("{0} is not a valid timecode rate")]
    InvalidTimecodeRate(f64),

    #[error("invalid timecode string: {0:?}")]
    InvalidTimecodeString(String),

    #[error("timecode {timecode:?} has frames beyond the nominal rate {rate}")]
    TimecodeRateMismatch { timecode: String, rate: f64 },

    #[error("timecode {timecode:?} uses the drop-frame divider but {rate} is not a drop-frame rate")]
    NonDropFrameRate { timecode: String, rate: f64 },

    #[error("{0} is not a drop-frame rate")]
    InvalidRateForDropFrame(f64),

    #[error("cannot express a negative time as timecode")]
    NegativeTimecode,

    #[error("{frames} is not a whole frame count at rate {rate}; supply a rounding policy")]
    FractionalFrame { frames: f64, rate: f64 },

    #[error("invalid time string: {0:?}")]
    InvalidTimeString(String),

    // ── Encoding ────────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SpliceError {
    /// The taxonomy class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::ChildAlreadyParented { .. }
            | Self::WouldCreateCycle { .. }
            | Self::AdjacentTransitions { .. }
            | Self::TransitionOffsetUnset(..)
            | Self::NotAComposition(_)
            | Self::TypeMismatch { .. }
            | Self::IndexOutOfBounds { .. }
            | Self::NodeStillParented(_) => ErrorKind::StructuralViolation,
            Self::InvalidNode(_) => ErrorKind::InvalidNode,
            Self::CannotComputeAvailableRange(_) => ErrorKind::RangeUnavailable,
            Self::NotAChild(_) | Self::NoCommonAncestor { .. } => {
                ErrorKind::UnresolvableTransform
            }
            Self::CannotTrimTransition(_) => ErrorKind::UncuttableTransition,
            Self::UnsupportedSchemaVersion { .. } => ErrorKind::SchemaVersionUnsupported,
            Self::UnknownSchema(_)
            | Self::SchemaAlreadyRegistered(_)
            | Self::SchemaNotRegistered(_)
            | Self::MalformedSchemaLabel(_)
            | Self::RegistryAlreadyInstalled => ErrorKind::UnknownSchema,
            Self::FractionalFrame { .. } => ErrorKind::RateMismatchOverflow,
            Self::InvalidTimecodeRate(_)
            | Self::InvalidTimecodeString(_)
            | Self::TimecodeRateMismatch { .. }
            | Self::NonDropFrameRate { .. }
            | Self::InvalidRateForDropFrame(_)
            | Self::NegativeTimecode
            | Self::InvalidTimeString(_) => ErrorKind::InvalidTimecode,
            Self::Serialization(_) => ErrorKind::Codec,
        }
    }
}

/// Result type alias for Splice operations.
pub type Result<T> = std::result::Result<T, SpliceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        let err = SpliceError::ChildAlreadyParented {
            child: "Clip \"a\"".into(),
        };
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
        assert_eq!(
            SpliceError::CannotTrimTransition("t".into()).kind(),
            ErrorKind::UncuttableTransition
        );
        assert_eq!(
            SpliceError::FractionalFrame {
                frames: 1.5,
                rate: 24.0
            }
            .kind(),
            ErrorKind::RateMismatchOverflow
        );
        assert_eq!(
            SpliceError::NotAChild("x".into()).kind(),
            ErrorKind::UnresolvableTransform
        );
    }

    #[test]
    fn test_display_mentions_versions() {
        let err = SpliceError::UnsupportedSchemaVersion {
            name: "Track".into(),
            version: 3,
            current: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("Track"));
        assert!(msg.contains('3'));
    }
}
