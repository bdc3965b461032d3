//! Diagram entities
//!
//! Levels, frames, bindings and values live in per-snapshot arenas inside
//! [`DiagramSnapshot`](super::DiagramSnapshot) and link to each other through the typed
//! ids defined here. Nothing owns anything across entity boundaries, which keeps shared
//! and cyclic data structures trivial to represent.

use super::geometry::Rect;
use crate::machine::ScopeId;
use crate::snapshot::HeapId;

/// Index of a [`Level`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelId(pub u32);

/// Index of a [`Frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

/// Index of a [`Binding`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

/// Index of a [`Value`]; ids follow creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl LevelId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FrameId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl BindingId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ValueId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// All frames at one depth of the (collapsed) scope tree
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub id: LevelId,
    pub rect: Rect,
    pub frames: Vec<FrameId>,
    pub above: Option<LevelId>,
}

/// The drawn form of one scope
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: FrameId,
    pub scope: ScopeId,
    pub name: String,
    pub level: LevelId,
    pub parent: Option<FrameId>,
    /// Layout order: user bindings first, internal ones last
    pub bindings: Vec<BindingId>,
    /// Frame body; the title sits on the rows just above it
    pub rect: Rect,
}

impl Frame {
    /// Full extent including the title rows
    pub fn outer_rect(&self, name_height: i32) -> Rect {
        Rect::new(
            self.rect.x,
            self.rect.y - name_height,
            self.rect.width,
            self.rect.height + name_height,
        )
    }
}

/// A named slot inside a frame
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub id: BindingId,
    pub frame: FrameId,
    pub name: String,
    pub constant: bool,
    pub dummy: bool,
    pub value: ValueId,
    pub rect: Rect,
}

impl Binding {
    /// Text of the name label
    pub fn label(&self) -> String {
        format!("{}:", self.name)
    }

    pub fn label_width(&self) -> i32 {
        self.label().chars().count() as i32
    }
}

/// Something that points at a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    Binding(BindingId),
    Slot { array: ValueId, index: usize },
}

/// Drawable classification of a value
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Unassigned,
    /// Text drawn inline; `opaque` marks the fallback for unclassifiable data
    Primitive { text: String, opaque: bool },
    Array { slots: Vec<ValueId>, pair: bool },
    Function {
        name: Option<String>,
        params: Vec<String>,
        body: String,
        env: ScopeId,
    },
    GlobalFunction { name: Option<String>, params: Vec<String> },
}

impl ValueKind {
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            ValueKind::Function { .. } | ValueKind::GlobalFunction { .. }
        )
    }
}

/// A resolved value, drawn once at its main reference
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub id: ValueId,
    pub kind: ValueKind,
    /// Memo key; `None` for primitives, which are never shared
    pub heap: Option<HeapId>,
    /// Scope the value was created in, when known
    pub origin: Option<ScopeId>,
    /// References in creation order
    pub references: Vec<Reference>,
    pub main: Option<Reference>,
    pub rect: Rect,
    pub positioned: bool,
}

impl Value {
    pub fn is_main(&self, reference: Reference) -> bool {
        self.main == Some(reference)
    }
}

/// Endpoint of an arrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Binding(BindingId),
    Slot(ValueId, usize),
    Frame(FrameId),
    Value(ValueId),
    ControlItem(usize),
    StashItem(usize),
}

/// Which routing policy an arrow uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowKind {
    BindingToValue,
    SlotToValue,
    FrameToParent,
    FunctionToFrame,
    StackItemToValue,
    StackItemToFrame,
}

/// An arrow between two anchors; its path is derived from their current positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrowSpec {
    pub kind: ArrowKind,
    pub source: Anchor,
    pub target: Anchor,
}
