//! Control and stash rendering
//!
//! Entries are labelled through a classification table keyed on the control tag; tags
//! missing from the table render as [`UNKNOWN_LABEL`]. Entries that point at a drawn
//! value or frame carry an [`Anchor`] used for their arrow.
//!
//! [`render_stacks`] runs once per snapshot. [`place_stacks`] runs per draw because the
//! visible window (truncation) and the column position (container width) are display
//! concerns.

use super::geometry::Rect;
use super::layout::{truncate, value_text, FrameGraph, UNASSIGNED_TEXT};
use super::model::Anchor;
use crate::config::LayoutConfig;
use crate::machine::SourceSpan;
use crate::snapshot::{Datum, Heap, HeapObject, NormControl, NormStash};

/// Label for control entries with an unrecognized tag
pub const UNKNOWN_LABEL: &str = "INSTRUCTION";

/// Control entry classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrTag {
    Literal,
    Identifier,
    Block,
    Sequence,
    UnaryOp,
    BinaryOp,
    Pop,
    Assign,
    Declare,
    Application,
    Branch,
    Conditional,
    Mark,
    EnvRestore,
    ArrayLiteral,
    ArrayAccess,
    ArrayAssign,
    While,
    For,
    Break,
    Continue,
    Return,
    Lambda,
}

/// Tag, classification, tooltip
const TAG_TABLE: &[(&str, InstrTag, &str)] = &[
    ("Literal", InstrTag::Literal, "Push the literal onto the stash"),
    ("Identifier", InstrTag::Identifier, "Look up a name and push its value"),
    ("Block", InstrTag::Block, "Enter a block and push its statements"),
    ("Sequence", InstrTag::Sequence, "Push the statements of a sequence"),
    ("UnaryOp", InstrTag::UnaryOp, "Apply a unary operator to the stash top"),
    ("BinaryOp", InstrTag::BinaryOp, "Apply a binary operator to the two stash tops"),
    ("Pop", InstrTag::Pop, "Discard the stash top"),
    ("Assign", InstrTag::Assign, "Assign the stash top to a name"),
    ("Declare", InstrTag::Declare, "Bind a declared name"),
    ("Application", InstrTag::Application, "Call a function with arguments from the stash"),
    ("Branch", InstrTag::Branch, "Pick a branch using the stash top"),
    ("Conditional", InstrTag::Conditional, "Evaluate a conditional"),
    ("Mark", InstrTag::Mark, "Mark the return point of a call"),
    ("EnvRestore", InstrTag::EnvRestore, "Restore the environment"),
    ("ArrayLiteral", InstrTag::ArrayLiteral, "Build an array from the stash"),
    ("ArrayAccess", InstrTag::ArrayAccess, "Read an array element"),
    ("ArrayAssign", InstrTag::ArrayAssign, "Write an array element"),
    ("While", InstrTag::While, "Test a while loop condition"),
    ("For", InstrTag::For, "Run one iteration of a for loop"),
    ("Break", InstrTag::Break, "Leave the enclosing loop"),
    ("Continue", InstrTag::Continue, "Skip to the next loop iteration"),
    ("Return", InstrTag::Return, "Return from the current call"),
    ("Lambda", InstrTag::Lambda, "Create a closure"),
];

impl InstrTag {
    /// Look a control tag up in the classification table
    pub fn classify(tag: &str) -> Option<InstrTag> {
        TAG_TABLE
            .iter()
            .find(|(name, _, _)| *name == tag)
            .map(|(_, kind, _)| *kind)
    }

    pub fn description(self) -> &'static str {
        TAG_TABLE
            .iter()
            .find(|(_, kind, _)| *kind == self)
            .map(|(_, _, text)| *text)
            .unwrap_or(UNKNOWN_LABEL)
    }

    fn label(self, detail: Option<&str>) -> String {
        let with = |prefix: &str| match detail {
            Some(d) => format!("{} {}", prefix, d),
            None => prefix.to_string(),
        };
        match self {
            InstrTag::Literal => detail.unwrap_or("literal").to_string(),
            InstrTag::Identifier => detail.unwrap_or("name").to_string(),
            InstrTag::Block => detail.unwrap_or("{ … }").to_string(),
            InstrTag::Sequence => detail.unwrap_or("sequence").to_string(),
            InstrTag::Conditional => detail.unwrap_or("conditional").to_string(),
            InstrTag::Lambda => detail.unwrap_or("lambda").to_string(),
            InstrTag::UnaryOp => with("unop"),
            InstrTag::BinaryOp => with("binop"),
            InstrTag::Assign => with("asgn"),
            InstrTag::Declare => with("decl"),
            InstrTag::Application => with("call"),
            InstrTag::ArrayLiteral => with("arr lit"),
            InstrTag::Pop => "pop".to_string(),
            InstrTag::Branch => "branch".to_string(),
            InstrTag::Mark => "mark".to_string(),
            InstrTag::EnvRestore => "env".to_string(),
            InstrTag::ArrayAccess => "arr acc".to_string(),
            InstrTag::ArrayAssign => "arr asgn".to_string(),
            InstrTag::While => "while".to_string(),
            InstrTag::For => "for".to_string(),
            InstrTag::Break => "break".to_string(),
            InstrTag::Continue => "continue".to_string(),
            InstrTag::Return => "return".to_string(),
        }
    }
}

/// Which auxiliary stack an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackSide {
    Control,
    Stash,
}

/// One rendered stack entry
#[derive(Debug, Clone, PartialEq)]
pub struct StackItem {
    pub side: StackSide,
    /// Position counted from the bottom of the stack
    pub index: usize,
    /// Classification of a control entry; `None` for stash items and unknown tags
    pub instr: Option<InstrTag>,
    pub label: String,
    pub tooltip: String,
    pub source: Option<SourceSpan>,
    pub target: Option<Anchor>,
    /// Zero until placed
    pub rect: Rect,
}

pub type ControlItem = StackItem;
pub type StashItem = StackItem;

/// Map both stacks onto unplaced items
pub fn render_stacks(
    control: &[NormControl],
    stash: &[NormStash],
    graph: &FrameGraph,
    heap: &Heap,
    config: &LayoutConfig,
) -> (Vec<ControlItem>, Vec<StashItem>) {
    let control_items = control
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let kind = InstrTag::classify(&entry.tag);
            let value_label = entry
                .value
                .as_ref()
                .map(|v| datum_text(v, graph, heap, config));
            let detail = entry.detail.clone().or(value_label);

            let (label, description) = match kind {
                Some(kind) => (kind.label(detail.as_deref()), kind.description()),
                None => (UNKNOWN_LABEL.to_string(), UNKNOWN_LABEL),
            };
            let tooltip = match &detail {
                Some(d) => format!("{}: {}", description, d),
                None => description.to_string(),
            };

            let target = entry
                .value
                .as_ref()
                .and_then(|v| value_anchor(v, graph))
                .or_else(|| {
                    entry
                        .scope
                        .and_then(|s| graph.frame_of_scope(s))
                        .map(Anchor::Frame)
                });

            StackItem {
                side: StackSide::Control,
                index,
                instr: kind,
                label,
                tooltip,
                source: entry.source,
                target,
                rect: Rect::default(),
            }
        })
        .collect();

    let stash_items = stash
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let label = datum_text(&entry.value, graph, heap, config);
            StackItem {
                side: StackSide::Stash,
                index,
                instr: None,
                tooltip: format!("Stash value: {}", label),
                label,
                source: entry.source,
                target: value_anchor(&entry.value, graph),
                rect: Rect::default(),
            }
        })
        .collect();

    (control_items, stash_items)
}

fn value_anchor(datum: &Datum, graph: &FrameGraph) -> Option<Anchor> {
    let id = graph.values.lookup(datum.heap_id()?)?;
    graph.values.get(id).positioned.then_some(Anchor::Value(id))
}

fn datum_text(datum: &Datum, graph: &FrameGraph, heap: &Heap, config: &LayoutConfig) -> String {
    match datum {
        Datum::Unassigned => UNASSIGNED_TEXT.to_string(),
        Datum::Primitive(p) => p.display(),
        Datum::Opaque(text) => text.clone(),
        Datum::Heap(id) => {
            if let Some(value) = graph.values.lookup(*id) {
                return value_text(&graph.values.get(value).kind, config.function_max_width);
            }
            // Not drawn anywhere in the frame grid
            match heap.get(*id) {
                Some(HeapObject::Array { elements, .. }) => format!("[{}]", elements.len()),
                Some(HeapObject::Function { params, .. }) => {
                    truncate(&format!("λ({})", params.join(", ")), config.function_max_width)
                }
                Some(HeapObject::Builtin { name }) => format!("{}()", name),
                None => UNKNOWN_LABEL.to_string(),
            }
        }
    }
}

/// Stack items positioned for one draw
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackLayout {
    /// Visible control items, top of stack first
    pub control: Vec<ControlItem>,
    /// Visible stash items, top of stack first
    pub stash: Vec<StashItem>,
    pub control_header: Rect,
    pub stash_header: Rect,
    /// The "show more" affordance, present while truncation hides entries
    pub show_more: Option<Rect>,
    pub hidden: usize,
}

impl StackLayout {
    /// Item under a cell, if any
    pub fn hit(&self, x: i32, y: i32) -> Option<&StackItem> {
        let point = super::geometry::Point::new(x, y);
        self.control
            .iter()
            .chain(&self.stash)
            .find(|item| item.rect.contains(point))
    }
}

/// Place the two stack columns right of the frame grid
///
/// With `limit` set only the top `limit` entries of each stack are placed, followed by
/// a "show more" affordance. The columns right-align to the container when it is wider
/// than the grid plus the columns.
pub fn place_stacks(
    control: &[ControlItem],
    stash: &[StashItem],
    limit: Option<usize>,
    grid_width: i32,
    container_width: i32,
    config: &LayoutConfig,
) -> StackLayout {
    let columns_width = 2 * config.stack_item_width + config.stack_gap;
    let control_x = (grid_width + config.stack_margin).max(container_width - columns_width);
    let stash_x = control_x + config.stack_item_width + config.stack_gap;
    let first_row = 2;

    let place = |items: &[StackItem], x: i32| -> (Vec<StackItem>, usize) {
        let visible = limit.map_or(items.len(), |k| k.min(items.len()));
        let hidden = items.len() - visible;
        let placed = items[hidden..]
            .iter()
            .rev()
            .enumerate()
            .map(|(row, item)| StackItem {
                rect: Rect::new(
                    x,
                    first_row + row as i32 * config.stack_item_height,
                    config.stack_item_width,
                    config.stack_item_height,
                ),
                ..item.clone()
            })
            .collect();
        (placed, hidden)
    };

    let (control_items, hidden_control) = place(control, control_x);
    let (stash_items, hidden_stash) = place(stash, stash_x);
    let hidden = hidden_control + hidden_stash;

    let rows = control_items.len().max(stash_items.len()) as i32;
    let show_more = (hidden > 0).then(|| {
        Rect::new(
            control_x,
            first_row + rows * config.stack_item_height + 1,
            config.stack_item_width,
            1,
        )
    });

    StackLayout {
        control: control_items,
        stash: stash_items,
        control_header: Rect::new(control_x, 0, config.stack_item_width, 1),
        stash_header: Rect::new(stash_x, 0, config.stack_item_width, 1),
        show_more,
        hidden,
    }
}
