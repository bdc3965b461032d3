//! Snapshot ingestion and normalization
//!
//! [`ingest_state`] deep-copies a [`MachineState`] into engine-owned structures and then
//! normalizes it:
//!
//! 1. **Prelude collapse**: a lone program pass-through scope under the root is merged
//!    into the root, and functions it defined become global functions.
//! 2. **Liveness pruning**: root bindings whose values nothing else reaches are dropped,
//!    so a large library scope does not dominate the diagram.
//!
//! The machine state itself is never touched.

use super::heap::{Datum, Heap, HeapCopier, HeapObject};
use crate::machine::{is_dummy_key, MachineState, ScopeId, ScopeKind, SourceSpan};
use rustc_hash::FxHashMap;
use tracing::debug;

/// A binding after ingestion
#[derive(Debug, Clone)]
pub struct EnvBinding {
    pub name: String,
    pub value: Datum,
    pub constant: bool,
}

impl EnvBinding {
    pub fn is_dummy(&self) -> bool {
        is_dummy_key(&self.name)
    }
}

/// A scope after ingestion
#[derive(Debug, Clone)]
pub struct EnvNode {
    pub id: ScopeId,
    pub name: String,
    pub kind: ScopeKind,
    pub bindings: Vec<EnvBinding>,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
}

/// The engine's own copy of the scope tree
#[derive(Debug, Clone)]
pub struct EnvTree {
    root: ScopeId,
    nodes: FxHashMap<ScopeId, EnvNode>,
}

impl EnvTree {
    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn get(&self, id: ScopeId) -> Option<&EnvNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut EnvNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: ScopeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A control entry after ingestion
#[derive(Debug, Clone)]
pub struct NormControl {
    pub tag: String,
    pub detail: Option<String>,
    pub value: Option<Datum>,
    pub scope: Option<ScopeId>,
    pub source: Option<SourceSpan>,
}

/// A stash entry after ingestion
#[derive(Debug, Clone)]
pub struct NormStash {
    pub value: Datum,
    pub source: Option<SourceSpan>,
}

/// Normalization switches
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub prune_globals: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            prune_globals: true,
        }
    }
}

/// The normalized, engine-owned copy of one machine step
#[derive(Debug, Clone)]
pub struct IngestedState {
    pub heap: Heap,
    pub env: EnvTree,
    pub control: Vec<NormControl>,
    pub stash: Vec<NormStash>,
    pub language_level: u8,
}

/// Copy and normalize a machine state
pub fn ingest_state(
    state: &MachineState,
    language_level: u8,
    options: IngestOptions,
) -> IngestedState {
    let mut copier = HeapCopier::new();

    let mut nodes = FxHashMap::default();
    for scope in state.scopes.scopes() {
        let bindings = scope
            .bindings
            .iter()
            .map(|slot| EnvBinding {
                name: slot.name.clone(),
                value: copier.copy(&slot.value),
                constant: slot.constant,
            })
            .collect();
        nodes.insert(
            scope.id,
            EnvNode {
                id: scope.id,
                name: scope.name.clone(),
                kind: scope.kind,
                bindings,
                parent: scope.parent,
                children: scope.children.clone(),
            },
        );
    }

    let mut control: Vec<NormControl> = state
        .control
        .iter()
        .map(|entry| NormControl {
            tag: entry.tag.clone(),
            detail: entry.detail.clone(),
            value: entry.value.as_ref().map(|v| copier.copy(v)),
            scope: entry.scope,
            source: entry.source,
        })
        .collect();

    let stash: Vec<NormStash> = state
        .stash
        .iter()
        .map(|entry| NormStash {
            value: copier.copy(&entry.value),
            source: entry.source,
        })
        .collect();

    let mut env = EnvTree {
        root: state.scopes.root(),
        nodes,
    };
    let mut heap = copier.finish();

    collapse_prelude(&mut env, &mut heap, &mut control);
    if options.prune_globals {
        prune_globals(&mut env, &heap, &control, &stash);
    }

    IngestedState {
        heap,
        env,
        control,
        stash,
        language_level,
    }
}

/// Merge a lone program pass-through scope into the root
///
/// Returns true when a collapse happened.
pub fn collapse_prelude(env: &mut EnvTree, heap: &mut Heap, control: &mut [NormControl]) -> bool {
    let root = env.root;
    let program = match env.get(root) {
        Some(node) if node.children.len() == 1 => node.children[0],
        _ => return false,
    };
    if env.get(program).map(|n| n.kind) != Some(ScopeKind::Program) {
        return false;
    }

    let Some(program_node) = env.nodes.remove(&program) else {
        return false;
    };

    for child in &program_node.children {
        if let Some(node) = env.nodes.get_mut(child) {
            node.parent = Some(root);
        }
    }

    if let Some(root_node) = env.nodes.get_mut(&root) {
        for binding in program_node.bindings {
            // Root bindings win on name collision
            if root_node.bindings.iter().any(|b| b.name == binding.name) {
                continue;
            }
            root_node.bindings.push(binding);
        }
        root_node.children = program_node.children;
    }

    for object in heap.iter_mut() {
        match object {
            HeapObject::Function {
                name,
                env: captured,
                ..
            } if *captured == Some(program) => {
                *name = None;
                *captured = None;
            }
            HeapObject::Array { origin, .. } if *origin == Some(program) => {
                *origin = Some(root);
            }
            _ => {}
        }
    }

    for entry in control.iter_mut() {
        if entry.scope == Some(program) {
            entry.scope = Some(root);
        }
    }

    debug!(program = program.0, "collapsed program scope into root");
    true
}

/// Drop root bindings that nothing outside the root reaches
///
/// Runs after [`collapse_prelude`], so bindings merged in from the program scope are
/// pruned like any other root binding. Returns the number of bindings removed.
pub fn prune_globals(
    env: &mut EnvTree,
    heap: &Heap,
    control: &[NormControl],
    stash: &[NormStash],
) -> usize {
    let root = env.root;
    let mut roots = Vec::new();

    for node in env.nodes.values().filter(|node| node.id != root) {
        roots.extend(node.bindings.iter().filter_map(|b| b.value.heap_id()));
    }
    roots.extend(stash.iter().filter_map(|s| s.value.heap_id()));
    roots.extend(
        control
            .iter()
            .filter_map(|c| c.value.as_ref().and_then(Datum::heap_id)),
    );

    let live = heap.reachable_from(roots);

    let Some(root_node) = env.nodes.get_mut(&root) else {
        return 0;
    };
    let before = root_node.bindings.len();
    root_node
        .bindings
        .retain(|b| b.is_dummy() || b.value.heap_id().is_some_and(|id| live.contains(&id)));
    let removed = before - root_node.bindings.len();
    if removed > 0 {
        debug!(removed, "pruned unreferenced root bindings");
    }
    removed
}
