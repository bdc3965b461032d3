//! Input model: the machine state the diagram is drawn from
//!
//! This module provides the types a host interpreter fills in for each step:
//! - [`value`]: raw values, with reference-counted heap objects
//! - [`scope`]: the scope tree, addressed by [`scope::ScopeId`]
//! - [`control`]: control and stash entries, and the [`control::MachineState`] aggregate
//!
//! The engine treats all of these as read-only; ingestion copies what it needs.

pub mod control;
pub mod scope;
pub mod value;

pub use control::{ControlEntry, MachineState, SourceSpan, StashEntry};
pub use scope::{BindingSlot, ScopeId, ScopeKind, ScopeNode, ScopeTree};
pub use value::{ArrayRef, Builtin, Closure, RawArray, RawValue};

/// Check whether a binding name is an internal, machine-generated key
///
/// Internal keys are purely numeric (`"0"`, `"17"`); they never compete for value
/// anchoring and are laid out after user-visible bindings.
pub fn is_dummy_key(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}
