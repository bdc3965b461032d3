//! Error types for the diagram engine
//!
//! Only [`DiagramError::NotInitialized`] ever reaches a caller. The other variants
//! describe rendering gaps that are logged where they happen and absorbed: the arrow is
//! left out, or the value is drawn as an opaque primitive.

use super::EngineState;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagramError {
    /// An operation was called out of the engine's state-machine order
    #[error("diagram engine not initialized: {reason} (state: {state:?})")]
    NotInitialized {
        reason: &'static str,
        state: EngineState,
    },

    /// An arrow's target never received a position
    #[error("unresolved reference: {arrow}")]
    UnresolvedReference { arrow: String },

    /// A raw value matches none of the drawable variants
    #[error("unknown value variant: {description}")]
    UnknownVariant { description: String },
}

pub type Result<T> = std::result::Result<T, DiagramError>;
