//! JSON machine traces
//!
//! A trace is a recorded run of the machine, one entry per step:
//!
//! ```json
//! {
//!   "language_level": 2,
//!   "config": { "truncation_limit": 8 },
//!   "steps": [{
//!     "heap":   { "1": { "kind": "array", "elements": [1, { "ref": 1 }], "origin": 0 } },
//!     "scopes": [{ "id": 0, "name": "global", "kind": "global", "parent": null,
//!                  "bindings": [{ "name": "xs", "value": { "ref": 1 }, "constant": true }] }],
//!     "control": [{ "tag": "Pop", "source": { "start_line": 3, "end_line": 3 } }],
//!     "stash":   [{ "value": 42 }]
//!   }]
//! }
//! ```
//!
//! Heap objects are referenced by id, so sharing and cycles survive serialization. Each
//! step converts into a [`MachineState`] whose `Rc` graph mirrors those references.

use crate::config::EngineConfig;
use crate::machine::{
    ControlEntry, MachineState, RawValue, ScopeId, ScopeKind, ScopeTree, SourceSpan, StashEntry,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed trace: {0}")]
    Json(#[from] serde_json::Error),

    #[error("step {step}: reference to missing heap object #{id}")]
    DanglingRef { step: usize, id: u32 },

    #[error("step {step}: reference to missing scope {id}")]
    UnknownScope { step: usize, id: usize },

    #[error("step {step}: no root scope")]
    NoRootScope { step: usize },
}

/// A value as written in a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceValue {
    Ref {
        #[serde(rename = "ref")]
        id: u32,
    },
    Special {
        special: SpecialValue,
    },
    Opaque {
        opaque: String,
    },
    Bool(bool),
    Number(f64),
    Str(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialValue {
    Undefined,
    Unassigned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TraceObject {
    Array {
        elements: Vec<TraceValue>,
        #[serde(default)]
        origin: Option<usize>,
    },
    Closure {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        params: Vec<String>,
        #[serde(default)]
        body: String,
        env: usize,
    },
    Builtin {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceBinding {
    pub name: String,
    pub value: TraceValue,
    #[serde(default)]
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceScope {
    pub id: usize,
    pub name: String,
    pub kind: ScopeKind,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub bindings: Vec<TraceBinding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceControl {
    pub tag: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub value: Option<TraceValue>,
    #[serde(default)]
    pub scope: Option<usize>,
    #[serde(default)]
    pub source: Option<SourceSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStash {
    pub value: TraceValue,
    #[serde(default)]
    pub source: Option<SourceSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    #[serde(default)]
    pub heap: BTreeMap<u32, TraceObject>,
    pub scopes: Vec<TraceScope>,
    #[serde(default)]
    pub control: Vec<TraceControl>,
    #[serde(default)]
    pub stash: Vec<TraceStash>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default = "default_language_level")]
    pub language_level: u8,
    #[serde(default)]
    pub config: EngineConfig,
    pub steps: Vec<TraceStep>,
}

fn default_language_level() -> u8 {
    4
}

impl Trace {
    pub fn from_json(text: &str) -> Result<Self, TraceError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Convert every step
    pub fn machine_states(&self) -> Result<Vec<MachineState>, TraceError> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| step.to_machine_state(index))
            .collect()
    }
}

impl TraceStep {
    /// Rebuild the machine state of this step; `index` is only used in errors
    pub fn to_machine_state(&self, index: usize) -> Result<MachineState, TraceError> {
        let (mut tree, scope_ids) = self.build_scopes(index)?;
        let scope = |id: usize| {
            scope_ids
                .get(&id)
                .copied()
                .ok_or(TraceError::UnknownScope { step: index, id })
        };

        // Shells first so references between objects (and cycles) resolve
        let mut objects: FxHashMap<u32, RawValue> = FxHashMap::default();
        for (&id, object) in &self.heap {
            let shell = match object {
                TraceObject::Array { origin, .. } => {
                    let origin = origin.map(&scope).transpose()?;
                    RawValue::array(Vec::new(), origin)
                }
                TraceObject::Closure {
                    name,
                    params,
                    body,
                    env,
                } => {
                    let params: Vec<&str> = params.iter().map(String::as_str).collect();
                    RawValue::closure(name.as_deref(), &params, body, scope(*env)?)
                }
                TraceObject::Builtin { name } => RawValue::builtin(name),
            };
            objects.insert(id, shell);
        }

        let value = |v: &TraceValue| convert_value(v, &objects, index);

        for (&id, object) in &self.heap {
            if let TraceObject::Array { elements, .. } = object {
                let converted = elements.iter().map(&value).collect::<Result<Vec<_>, _>>()?;
                if let Some(array) = objects.get(&id).and_then(RawValue::as_array) {
                    array.borrow_mut().elements = converted;
                }
            }
        }

        for trace_scope in &self.scopes {
            let id = scope(trace_scope.id)?;
            for binding in &trace_scope.bindings {
                tree.bind(id, &binding.name, value(&binding.value)?, binding.constant);
            }
        }

        let mut state = MachineState::new(tree);
        for entry in &self.control {
            let mut control = ControlEntry::new(&entry.tag);
            control.detail = entry.detail.clone();
            control.value = entry.value.as_ref().map(&value).transpose()?;
            control.scope = entry.scope.map(&scope).transpose()?;
            control.source = entry.source;
            state.control.push(control);
        }
        for entry in &self.stash {
            let mut stash = StashEntry::new(value(&entry.value)?);
            stash.source = entry.source;
            state.stash.push(stash);
        }
        Ok(state)
    }

    /// Insert scopes breadth-first from the root, mapping trace ids to tree ids
    fn build_scopes(&self, index: usize) -> Result<(ScopeTree, FxHashMap<usize, ScopeId>), TraceError> {
        let root = self
            .scopes
            .iter()
            .find(|s| s.parent.is_none())
            .ok_or(TraceError::NoRootScope { step: index })?;

        let mut tree = ScopeTree::new(&root.name);
        let mut ids = FxHashMap::default();
        ids.insert(root.id, tree.root());

        let mut pending = VecDeque::from([root.id]);
        while let Some(parent) = pending.pop_front() {
            let Some(&parent_id) = ids.get(&parent) else {
                continue;
            };
            for child in self.scopes.iter().filter(|s| s.parent == Some(parent)) {
                if ids.contains_key(&child.id) {
                    continue;
                }
                let id = tree.add_scope(parent_id, &child.name, child.kind);
                ids.insert(child.id, id);
                pending.push_back(child.id);
            }
        }

        if let Some(orphan) = self.scopes.iter().find(|s| !ids.contains_key(&s.id)) {
            return Err(TraceError::UnknownScope {
                step: index,
                id: orphan.parent.unwrap_or(orphan.id),
            });
        }
        Ok((tree, ids))
    }
}

fn convert_value(
    value: &TraceValue,
    objects: &FxHashMap<u32, RawValue>,
    step: usize,
) -> Result<RawValue, TraceError> {
    Ok(match value {
        TraceValue::Ref { id } => objects
            .get(id)
            .cloned()
            .ok_or(TraceError::DanglingRef { step, id: *id })?,
        TraceValue::Special {
            special: SpecialValue::Undefined,
        } => RawValue::Undefined,
        TraceValue::Special {
            special: SpecialValue::Unassigned,
        } => RawValue::Unassigned,
        TraceValue::Opaque { opaque } => RawValue::Opaque(opaque.clone()),
        TraceValue::Bool(b) => RawValue::Bool(*b),
        TraceValue::Number(n) => RawValue::Number(*n),
        TraceValue::Str(s) => RawValue::Str(s.clone()),
        TraceValue::Null => RawValue::Null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYCLE: &str = r#"{
        "language_level": 2,
        "config": { "truncation_limit": 4 },
        "steps": [{
            "heap": {
                "1": { "kind": "array", "elements": [7, { "ref": 1 }], "origin": 0 },
                "2": { "kind": "closure", "params": ["n"], "body": "n", "env": 5 }
            },
            "scopes": [
                { "id": 0, "name": "global", "kind": "global",
                  "bindings": [{ "name": "xs", "value": { "ref": 1 }, "constant": true }] },
                { "id": 5, "name": "f", "kind": "function", "parent": 0,
                  "bindings": [
                      { "name": "g", "value": { "ref": 2 } },
                      { "name": "u", "value": { "special": "unassigned" } }
                  ] }
            ],
            "control": [{ "tag": "EnvRestore", "scope": 5, "source": { "start_line": 2, "end_line": 4 } }],
            "stash": [{ "value": null }, { "value": "hi" }]
        }]
    }"#;

    #[test]
    fn cycle_survives_conversion() {
        let trace = Trace::from_json(CYCLE).unwrap();
        assert_eq!(trace.language_level, 2);
        assert_eq!(trace.config.truncation_limit, 4);

        let states = trace.machine_states().unwrap();
        let state = &states[0];
        let root = state.scopes.get(state.scopes.root()).unwrap();
        let xs = &root.get("xs").unwrap().value;
        let array = xs.as_array().unwrap().borrow();
        assert!(array.elements[1].same_object(xs));
        assert_eq!(array.origin, Some(state.scopes.root()));
    }

    #[test]
    fn scopes_are_remapped() {
        let states = Trace::from_json(CYCLE).unwrap().machine_states().unwrap();
        let state = &states[0];
        let f = state.control[0].scope.unwrap();
        let node = state.scopes.get(f).unwrap();
        assert_eq!(node.name, "f");
        assert!(matches!(node.get("u").unwrap().value, RawValue::Unassigned));
        match &node.get("g").unwrap().value {
            RawValue::Closure(c) => assert_eq!(c.env, f),
            other => panic!("expected closure, got {:?}", other),
        }
        assert!(matches!(state.stash[0].value, RawValue::Null));
        assert_eq!(state.control[0].source, Some(SourceSpan::new(2, 4)));
    }

    #[test]
    fn dangling_reference_is_reported() {
        let text = r#"{ "steps": [{ "scopes": [
            { "id": 0, "name": "global", "kind": "global",
              "bindings": [{ "name": "a", "value": { "ref": 9 } }] }
        ] }] }"#;
        let err = Trace::from_json(text).unwrap().machine_states().unwrap_err();
        assert!(matches!(err, TraceError::DanglingRef { step: 0, id: 9 }));
    }

    #[test]
    fn missing_root_is_reported() {
        let text = r#"{ "steps": [{ "scopes": [
            { "id": 1, "name": "orphan", "kind": "block", "parent": 0 }
        ] }] }"#;
        let err = Trace::from_json(text).unwrap().machine_states().unwrap_err();
        assert!(matches!(err, TraceError::NoRootScope { step: 0 }));
    }
}
