//! Heap arena built during ingestion
//!
//! The machine shares heap objects through `Rc`; the engine copies every reachable
//! object into a flat [`Heap`] addressed by [`HeapId`]. The copy keeps sharing intact:
//! an object reached twice is copied once and both places receive the same id, which
//! is also what makes self-containing arrays terminate.

use crate::machine::{RawValue, ScopeId};
use rustc_hash::{FxHashMap, FxHashSet};

/// Index of an object in the [`Heap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapId(pub u32);

/// Values without identity
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Primitive {
    /// Text drawn for this primitive
    pub fn display(&self) -> String {
        match self {
            Primitive::Undefined => "undefined".to_string(),
            Primitive::Null => "null".to_string(),
            Primitive::Bool(b) => b.to_string(),
            Primitive::Number(n) => format_number(*n),
            Primitive::Str(s) => format!("\"{}\"", s),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A value slot after ingestion
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Unassigned,
    Primitive(Primitive),
    Heap(HeapId),
    /// Something the machine produced that matches no known variant
    Opaque(String),
}

impl Datum {
    pub fn heap_id(&self) -> Option<HeapId> {
        match self {
            Datum::Heap(id) => Some(*id),
            _ => None,
        }
    }
}

/// A copied heap object
#[derive(Debug, Clone)]
pub enum HeapObject {
    Array {
        elements: Vec<Datum>,
        origin: Option<ScopeId>,
    },
    Function {
        name: Option<String>,
        params: Vec<String>,
        body: String,
        /// `None` once the function no longer captures a drawable scope
        env: Option<ScopeId>,
    },
    Builtin {
        name: String,
    },
}

/// Flat arena of heap objects for one snapshot
#[derive(Debug, Clone, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    pub fn get(&self, id: HeapId) -> Option<&HeapObject> {
        self.objects.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: HeapId) -> Option<&mut HeapObject> {
        self.objects.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All objects with their ids
    pub fn iter(&self) -> impl Iterator<Item = (HeapId, &HeapObject)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, obj)| (HeapId(i as u32), obj))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut HeapObject> {
        self.objects.iter_mut()
    }

    /// Every object reachable from `roots` through array contents
    pub fn reachable_from(&self, roots: impl IntoIterator<Item = HeapId>) -> FxHashSet<HeapId> {
        let mut seen = FxHashSet::default();
        let mut pending: Vec<HeapId> = roots.into_iter().collect();
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(HeapObject::Array { elements, .. }) = self.get(id) {
                pending.extend(elements.iter().filter_map(Datum::heap_id));
            }
        }
        seen
    }

    fn alloc(&mut self, object: HeapObject) -> HeapId {
        let id = HeapId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }
}

/// Copies machine values into a [`Heap`], one object per distinct `Rc`
#[derive(Debug, Default)]
pub struct HeapCopier {
    heap: Heap,
    seen: FxHashMap<usize, HeapId>, // Rc address -> copied object
}

impl HeapCopier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy one value, reusing the object already copied for the same `Rc`
    pub fn copy(&mut self, value: &RawValue) -> Datum {
        if let Some(key) = value.identity() {
            if let Some(&id) = self.seen.get(&key) {
                return Datum::Heap(id);
            }
        }

        match value {
            RawValue::Unassigned => Datum::Unassigned,
            RawValue::Undefined => Datum::Primitive(Primitive::Undefined),
            RawValue::Null => Datum::Primitive(Primitive::Null),
            RawValue::Bool(b) => Datum::Primitive(Primitive::Bool(*b)),
            RawValue::Number(n) => Datum::Primitive(Primitive::Number(*n)),
            RawValue::Str(s) => Datum::Primitive(Primitive::Str(s.clone())),
            RawValue::Opaque(text) => Datum::Opaque(text.clone()),
            RawValue::Array(rc) => {
                let source = rc.borrow();
                // Register the shell before descending so cycles come back to it
                let id = self.alloc_shared(
                    value,
                    HeapObject::Array {
                        elements: Vec::new(),
                        origin: source.origin,
                    },
                );
                let copied: Vec<Datum> = source.elements.iter().map(|e| self.copy(e)).collect();
                if let Some(HeapObject::Array { elements, .. }) = self.heap.get_mut(id) {
                    *elements = copied;
                }
                Datum::Heap(id)
            }
            RawValue::Closure(closure) => {
                let id = self.alloc_shared(
                    value,
                    HeapObject::Function {
                        name: closure.name.clone(),
                        params: closure.params.clone(),
                        body: closure.body.clone(),
                        env: Some(closure.env),
                    },
                );
                Datum::Heap(id)
            }
            RawValue::Builtin(builtin) => {
                let id = self.alloc_shared(
                    value,
                    HeapObject::Builtin {
                        name: builtin.name.clone(),
                    },
                );
                Datum::Heap(id)
            }
        }
    }

    /// Finish copying and hand over the arena
    pub fn finish(self) -> Heap {
        self.heap
    }

    fn alloc_shared(&mut self, value: &RawValue, object: HeapObject) -> HeapId {
        let id = self.heap.alloc(object);
        if let Some(key) = value.identity() {
            self.seen.insert(key, id);
        }
        id
    }
}
