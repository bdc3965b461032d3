//! Value memoization and main-reference election
//!
//! [`ValueTable::resolve`] turns ingested data into [`Value`]s. Heap objects are
//! memoized by [`HeapId`]: the first reference allocates the value, every later
//! reference is appended to it. The value shell is memoized *before* its children are
//! resolved, so an array that contains itself resolves back to the in-progress value
//! instead of recursing forever.
//!
//! Once every binding has been resolved, [`ValueTable::elect_main_references`] picks the
//! single reference that anchors each value's body.

use super::model::{BindingId, FrameId, Reference, Value, ValueId, ValueKind};
use crate::engine::errors::DiagramError;
use crate::machine::ScopeId;
use crate::snapshot::{Datum, Heap, HeapId, HeapObject};
use rustc_hash::FxHashMap;
use tracing::warn;

/// Inputs needed while resolving
pub struct ResolveCtx<'a> {
    pub heap: &'a Heap,
    pub root: ScopeId,
    pub language_level: u8,
}

/// What the election needs to know about the owners of references
pub trait ReferenceOwners {
    fn binding_frame(&self, binding: BindingId) -> FrameId;
    fn binding_is_dummy(&self, binding: BindingId) -> bool;
    /// Frame drawing `scope`, or its nearest bound ancestor
    fn frame_of_scope(&self, scope: ScopeId) -> Option<FrameId>;
    fn root_frame(&self) -> Option<FrameId>;
}

/// Per-snapshot value arena plus its memo table
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    values: Vec<Value>,
    memo: FxHashMap<HeapId, ValueId>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ValueId) -> &Value {
        &self.values[id.index()]
    }

    pub fn get_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.values[id.index()]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Value already resolved for a heap object
    pub fn lookup(&self, heap: HeapId) -> Option<ValueId> {
        self.memo.get(&heap).copied()
    }

    /// Resolve `datum` as seen through `reference`
    pub fn resolve(&mut self, ctx: &ResolveCtx, datum: &Datum, reference: Reference) -> ValueId {
        match datum {
            Datum::Unassigned => self.alloc(ValueKind::Unassigned, None, None, reference),
            Datum::Primitive(p) => self.alloc(
                ValueKind::Primitive {
                    text: p.display(),
                    opaque: false,
                },
                None,
                None,
                reference,
            ),
            Datum::Opaque(text) => {
                warn!(
                    "{}",
                    DiagramError::UnknownVariant {
                        description: text.clone()
                    }
                );
                self.alloc(opaque(text), None, None, reference)
            }
            Datum::Heap(heap_id) => {
                if let Some(&existing) = self.memo.get(heap_id) {
                    self.values[existing.index()].references.push(reference);
                    return existing;
                }

                // Memoize the shell first; children may point back at it
                let id = self.alloc(ValueKind::Unassigned, Some(*heap_id), None, reference);
                self.memo.insert(*heap_id, id);

                let (kind, origin) = match ctx.heap.get(*heap_id) {
                    Some(HeapObject::Array { elements, origin }) => {
                        let pair = ctx.language_level <= 2 && elements.len() == 2;
                        let slots = elements
                            .iter()
                            .enumerate()
                            .map(|(index, element)| {
                                self.resolve(ctx, element, Reference::Slot { array: id, index })
                            })
                            .collect();
                        (ValueKind::Array { slots, pair }, *origin)
                    }
                    Some(HeapObject::Function {
                        name,
                        params,
                        body,
                        env: Some(env),
                    }) => (
                        ValueKind::Function {
                            name: name.clone(),
                            params: params.clone(),
                            body: body.clone(),
                            env: *env,
                        },
                        Some(*env),
                    ),
                    Some(HeapObject::Function {
                        name,
                        params,
                        env: None,
                        ..
                    }) => (
                        ValueKind::GlobalFunction {
                            name: name.clone(),
                            params: params.clone(),
                        },
                        Some(ctx.root),
                    ),
                    Some(HeapObject::Builtin { name }) => (
                        ValueKind::GlobalFunction {
                            name: Some(name.clone()),
                            params: Vec::new(),
                        },
                        Some(ctx.root),
                    ),
                    None => {
                        let description = format!("dangling heap object #{}", heap_id.0);
                        warn!(
                            "{}",
                            DiagramError::UnknownVariant {
                                description: description.clone()
                            }
                        );
                        (opaque(&description), None)
                    }
                };

                let value = &mut self.values[id.index()];
                value.kind = kind;
                value.origin = origin;
                id
            }
        }
    }

    /// Choose the main reference of every value
    pub fn elect_main_references(&mut self, owners: &impl ReferenceOwners) {
        for index in 0..self.values.len() {
            let main = self.elect(ValueId(index as u32), owners);
            self.values[index].main = main;
        }
    }

    fn elect(&self, id: ValueId, owners: &impl ReferenceOwners) -> Option<Reference> {
        let value = self.get(id);

        // A slot may only anchor a value created after its array, so anchors form a forest
        let eligible: Vec<Reference> = value
            .references
            .iter()
            .copied()
            .filter(|r| match r {
                Reference::Binding(_) => true,
                Reference::Slot { array, .. } => *array < id,
            })
            .collect();

        let visible: Vec<Reference> = eligible
            .iter()
            .copied()
            .filter(|r| !matches!(r, Reference::Binding(b) if owners.binding_is_dummy(*b)))
            .collect();
        let candidates = if visible.is_empty() { eligible } else { visible };

        if matches!(value.kind, ValueKind::GlobalFunction { .. }) {
            if let Some(root_frame) = owners.root_frame() {
                let in_root = candidates.iter().copied().find(|r| {
                    matches!(r, Reference::Binding(b) if owners.binding_frame(*b) == root_frame)
                });
                if in_root.is_some() {
                    return in_root;
                }
            }
        }

        if let Some(origin_frame) = value.origin.and_then(|s| owners.frame_of_scope(s)) {
            let home = candidates
                .iter()
                .copied()
                .find(|r| self.owner_frame(*r, owners) == Some(origin_frame));
            if home.is_some() {
                return home;
            }
        }

        // No reference lives where the value was created; fall back to creation order
        candidates
            .first()
            .copied()
            .or_else(|| value.references.first().copied())
    }

    fn owner_frame(&self, reference: Reference, owners: &impl ReferenceOwners) -> Option<FrameId> {
        match reference {
            Reference::Binding(b) => Some(owners.binding_frame(b)),
            Reference::Slot { array, .. } => self
                .get(array)
                .origin
                .and_then(|s| owners.frame_of_scope(s)),
        }
    }

    fn alloc(
        &mut self,
        kind: ValueKind,
        heap: Option<HeapId>,
        origin: Option<ScopeId>,
        reference: Reference,
    ) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(Value {
            id,
            kind,
            heap,
            origin,
            references: vec![reference],
            main: None,
            rect: Default::default(),
            positioned: false,
        });
        id
    }
}

fn opaque(text: &str) -> ValueKind {
    ValueKind::Primitive {
        text: if text.is_empty() {
            "<?>".to_string()
        } else {
            text.to_string()
        },
        opaque: true,
    }
}
