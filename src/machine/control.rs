//! Control and stash entries
//!
//! The control stack holds pending instructions and program fragments; the stash holds
//! intermediate results. Both are ordered bottom first, so the top of each stack is the
//! last element.

use super::scope::{ScopeId, ScopeTree};
use super::value::RawValue;
use serde::{Deserialize, Serialize};

/// Inclusive range of source lines a control or stash entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start_line: usize,
    pub end_line: usize,
}

impl SourceSpan {
    pub fn new(start_line: usize, end_line: usize) -> Self {
        SourceSpan {
            start_line,
            end_line: end_line.max(start_line),
        }
    }

    /// Span covering a single line
    pub fn line(line: usize) -> Self {
        SourceSpan::new(line, line)
    }
}

/// An entry of the control stack
#[derive(Debug, Clone)]
pub struct ControlEntry {
    /// Instruction or node tag, e.g. `BinaryOp`, `Pop`, `Literal`
    pub tag: String,
    /// Tag-specific detail: the operator, the literal text, the identifier name
    pub detail: Option<String>,
    /// Value carried by the entry (a literal, a closure about to be applied)
    pub value: Option<RawValue>,
    /// Scope the entry refers to (environment restoration)
    pub scope: Option<ScopeId>,
    pub source: Option<SourceSpan>,
}

impl ControlEntry {
    pub fn new(tag: &str) -> Self {
        ControlEntry {
            tag: tag.to_string(),
            detail: None,
            value: None,
            scope: None,
            source: None,
        }
    }

    pub fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn with_value(mut self, value: RawValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_source(mut self, source: SourceSpan) -> Self {
        self.source = Some(source);
        self
    }
}

/// An entry of the stash
#[derive(Debug, Clone)]
pub struct StashEntry {
    pub value: RawValue,
    pub source: Option<SourceSpan>,
}

impl StashEntry {
    pub fn new(value: RawValue) -> Self {
        StashEntry {
            value,
            source: None,
        }
    }

    pub fn with_source(mut self, source: SourceSpan) -> Self {
        self.source = Some(source);
        self
    }
}

/// Everything the machine exposes for one step
#[derive(Debug, Clone)]
pub struct MachineState {
    pub scopes: ScopeTree,
    pub control: Vec<ControlEntry>,
    pub stash: Vec<StashEntry>,
}

impl MachineState {
    pub fn new(scopes: ScopeTree) -> Self {
        MachineState {
            scopes,
            control: Vec::new(),
            stash: Vec::new(),
        }
    }

    /// Rough size estimate in bytes, used to bound step history
    pub fn estimated_size(&self) -> usize {
        // Assume 64 bytes per binding and 48 per stack entry on average
        let bindings: usize = self
            .scopes
            .scopes()
            .iter()
            .map(|s| s.bindings.len())
            .sum();
        self.scopes.len() * 32 + bindings * 64 + (self.control.len() + self.stash.len()) * 48
    }
}
