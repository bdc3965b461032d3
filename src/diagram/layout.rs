//! Frame/level builder
//!
//! Turns the normalized scope tree into positioned levels, frames, bindings and values.
//!
//! Levels are assigned breadth-first. A scope without bindings is transparent: its
//! children are hoisted into its place, so no level ever contains an empty frame and a
//! frame's parent is its nearest *bound* ancestor.
//!
//! Values are positioned at their main reference only. A value anchored at a binding is
//! drawn inline to the right of the name; a heap value anchored at an array slot is
//! stacked under the array, at the slot's column.

use super::geometry::Rect;
use super::memo::{ReferenceOwners, ResolveCtx, ValueTable};
use super::model::{
    Anchor, ArrowKind, ArrowSpec, Binding, BindingId, Frame, FrameId, Level, LevelId, Reference,
    ValueId, ValueKind,
};
use crate::config::LayoutConfig;
use crate::machine::ScopeId;
use crate::snapshot::{EnvTree, Heap};
use rustc_hash::FxHashMap;

/// Text drawn for a declared name that has no value yet
pub const UNASSIGNED_TEXT: &str = "unassigned";

/// Positioned level/frame/binding/value graph of one snapshot
#[derive(Debug, Clone)]
pub struct FrameGraph {
    pub levels: Vec<Level>,
    pub frames: Vec<Frame>,
    pub bindings: Vec<Binding>,
    pub values: ValueTable,
    /// Drawn scopes plus transparent scopes mapped to their nearest bound ancestor
    scope_frames: FxHashMap<ScopeId, FrameId>,
    root_frame: Option<FrameId>,
}

impl FrameGraph {
    /// Build and position the graph for a normalized environment
    pub fn build(env: &EnvTree, heap: &Heap, language_level: u8, config: &LayoutConfig) -> Self {
        let (level_scopes, transparent) = assign_levels(env);
        let ctx = ResolveCtx {
            heap,
            root: env.root(),
            language_level,
        };

        let mut levels = Vec::with_capacity(level_scopes.len());
        let mut frames: Vec<Frame> = Vec::new();
        let mut bindings: Vec<Binding> = Vec::new();
        let mut values = ValueTable::new();
        let mut scope_frames: FxHashMap<ScopeId, FrameId> = FxHashMap::default();

        for (depth, scopes) in level_scopes.iter().enumerate() {
            let level_id = LevelId(depth as u32);
            let mut level_frames = Vec::with_capacity(scopes.len());

            for &(scope, bound_parent) in scopes {
                let Some(node) = env.get(scope) else {
                    continue;
                };
                let frame_id = FrameId(frames.len() as u32);
                scope_frames.insert(scope, frame_id);
                let parent = bound_parent.and_then(|p| scope_frames.get(&p).copied());

                // Internal bindings go last so they never shift user-visible ones
                let ordered = node
                    .bindings
                    .iter()
                    .filter(|b| !b.is_dummy())
                    .chain(node.bindings.iter().filter(|b| b.is_dummy()));

                let mut frame_bindings = Vec::with_capacity(node.bindings.len());
                for binding in ordered {
                    let binding_id = BindingId(bindings.len() as u32);
                    let value = values.resolve(&ctx, &binding.value, Reference::Binding(binding_id));
                    bindings.push(Binding {
                        id: binding_id,
                        frame: frame_id,
                        name: binding.name.clone(),
                        constant: binding.constant,
                        dummy: binding.is_dummy(),
                        value,
                        rect: Rect::default(),
                    });
                    frame_bindings.push(binding_id);
                }

                frames.push(Frame {
                    id: frame_id,
                    scope,
                    name: node.name.clone(),
                    level: level_id,
                    parent,
                    bindings: frame_bindings,
                    rect: Rect::default(),
                });
                level_frames.push(frame_id);
            }

            levels.push(Level {
                id: level_id,
                rect: Rect::default(),
                frames: level_frames,
                above: depth.checked_sub(1).map(|d| LevelId(d as u32)),
            });
        }

        for (scope, bound) in transparent {
            if let Some(frame) = bound.and_then(|b| scope_frames.get(&b).copied()) {
                scope_frames.insert(scope, frame);
            }
        }
        let root_frame = scope_frames.get(&env.root()).copied();

        values.elect_main_references(&GraphOwners {
            bindings: &bindings,
            scope_frames: &scope_frames,
            root_frame,
        });

        let mut graph = FrameGraph {
            levels,
            frames,
            bindings,
            values,
            scope_frames,
            root_frame,
        };
        graph.position(config);
        graph
    }

    /// Frame drawing `scope`, or the frame of its nearest bound ancestor
    pub fn frame_of_scope(&self, scope: ScopeId) -> Option<FrameId> {
        self.scope_frames.get(&scope).copied()
    }

    pub fn root_frame(&self) -> Option<FrameId> {
        self.root_frame
    }

    pub fn frame(&self, id: FrameId) -> &Frame {
        &self.frames[id.index()]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.index()]
    }

    /// Bounding box of all levels
    pub fn extent(&self) -> Rect {
        self.levels
            .iter()
            .map(|l| l.rect)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default()
    }

    /// Arrows implied by the graph: non-main references, nested slots, parent frames and
    /// captured environments
    pub fn arrows(&self) -> Vec<ArrowSpec> {
        let mut arrows = Vec::new();

        for frame in &self.frames {
            if let Some(parent) = frame.parent {
                arrows.push(ArrowSpec {
                    kind: ArrowKind::FrameToParent,
                    source: Anchor::Frame(frame.id),
                    target: Anchor::Frame(parent),
                });
            }
        }

        for binding in &self.bindings {
            let value = self.values.get(binding.value);
            if !value.is_main(Reference::Binding(binding.id)) {
                arrows.push(ArrowSpec {
                    kind: ArrowKind::BindingToValue,
                    source: Anchor::Binding(binding.id),
                    target: Anchor::Value(binding.value),
                });
            }
        }

        for value in self.values.iter().filter(|v| v.positioned) {
            match &value.kind {
                ValueKind::Array { slots, .. } => {
                    for (index, &slot) in slots.iter().enumerate() {
                        let child = self.values.get(slot);
                        let inline = child.is_main(Reference::Slot {
                            array: value.id,
                            index,
                        }) && is_inline(&child.kind);
                        if !inline {
                            arrows.push(ArrowSpec {
                                kind: ArrowKind::SlotToValue,
                                source: Anchor::Slot(value.id, index),
                                target: Anchor::Value(slot),
                            });
                        }
                    }
                }
                ValueKind::Function { env, .. } => {
                    if let Some(frame) = self.frame_of_scope(*env) {
                        arrows.push(ArrowSpec {
                            kind: ArrowKind::FunctionToFrame,
                            source: Anchor::Value(value.id),
                            target: Anchor::Frame(frame),
                        });
                    }
                }
                _ => {}
            }
        }

        arrows
    }

    fn position(&mut self, config: &LayoutConfig) {
        let mut y = 0;
        for level_index in 0..self.levels.len() {
            let mut next_x = 0;
            let mut right = 0;
            let mut tallest = 0;

            for frame_index in 0..self.levels[level_index].frames.len() {
                let frame_id = self.levels[level_index].frames[frame_index];
                let x = next_x;
                let rect = self.position_frame(frame_id, x, y + config.name_height, config);
                next_x = rect.right() + config.frame_margin;
                right = rect.right();
                tallest = tallest.max(rect.height + config.name_height);
            }

            let level = &mut self.levels[level_index];
            level.rect = Rect::new(0, y, right + config.padding_x, tallest);
            y = level.rect.bottom() + config.level_gap;
        }
    }

    fn position_frame(&mut self, id: FrameId, x: i32, y: i32, config: &LayoutConfig) -> Rect {
        let binding_ids = self.frames[id.index()].bindings.clone();
        let binding_x = x + config.padding_x;
        let mut binding_y = y + config.name_height + config.padding_y;
        let mut widest = 0;

        for (i, binding_id) in binding_ids.iter().enumerate() {
            if i > 0 {
                binding_y += config.binding_spacing;
            }
            let binding = &self.bindings[binding_id.index()];
            let label_width = binding.label_width();
            let value_id = binding.value;

            let mut width = label_width;
            let mut height = config.binding_height;
            if self.values.get(value_id).is_main(Reference::Binding(*binding_id)) {
                let value_x = binding_x + label_width + config.value_gap;
                let extent = place_value(&mut self.values, value_id, value_x, binding_y, config);
                width = extent.right() - binding_x;
                height = height.max(extent.height);
            }

            self.bindings[binding_id.index()].rect = Rect::new(binding_x, binding_y, width, height);
            widest = widest.max(width);
            binding_y += height;
        }

        let frame = &mut self.frames[id.index()];
        let width = (widest + 2 * config.padding_x).max(config.min_frame_width);
        let height = binding_y - y + config.padding_y;
        frame.rect = Rect::new(x, y, width, height);
        frame.rect
    }
}

struct GraphOwners<'a> {
    bindings: &'a [Binding],
    scope_frames: &'a FxHashMap<ScopeId, FrameId>,
    root_frame: Option<FrameId>,
}

impl ReferenceOwners for GraphOwners<'_> {
    fn binding_frame(&self, binding: BindingId) -> FrameId {
        self.bindings[binding.index()].frame
    }

    fn binding_is_dummy(&self, binding: BindingId) -> bool {
        self.bindings[binding.index()].dummy
    }

    fn frame_of_scope(&self, scope: ScopeId) -> Option<FrameId> {
        self.scope_frames.get(&scope).copied()
    }

    fn root_frame(&self) -> Option<FrameId> {
        self.root_frame
    }
}

type LevelScopes = Vec<Vec<(ScopeId, Option<ScopeId>)>>;

/// Breadth-first levels of bound scopes, each paired with its nearest bound ancestor,
/// plus every transparent scope with its nearest bound ancestor
fn assign_levels(env: &EnvTree) -> (LevelScopes, Vec<(ScopeId, Option<ScopeId>)>) {
    let mut levels = Vec::new();
    let mut transparent = Vec::new();

    let mut frontier = Vec::new();
    hoist(env, env.root(), None, &mut frontier, &mut transparent);

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for &(scope, _) in &frontier {
            if let Some(node) = env.get(scope) {
                for &child in &node.children {
                    hoist(env, child, Some(scope), &mut next, &mut transparent);
                }
            }
        }
        levels.push(frontier);
        frontier = next;
    }

    (levels, transparent)
}

fn hoist(
    env: &EnvTree,
    scope: ScopeId,
    bound_parent: Option<ScopeId>,
    out: &mut Vec<(ScopeId, Option<ScopeId>)>,
    transparent: &mut Vec<(ScopeId, Option<ScopeId>)>,
) {
    let Some(node) = env.get(scope) else {
        return;
    };
    if !node.bindings.is_empty() {
        out.push((scope, bound_parent));
        return;
    }
    transparent.push((scope, bound_parent));
    for &child in &node.children {
        hoist(env, child, bound_parent, out, transparent);
    }
}

/// Values drawn as text inside their anchor rather than as a box of their own
pub fn is_inline(kind: &ValueKind) -> bool {
    matches!(kind, ValueKind::Unassigned | ValueKind::Primitive { .. })
}

/// Text drawn for a value that is not an array
pub fn value_text(kind: &ValueKind, max_width: i32) -> String {
    match kind {
        ValueKind::Unassigned => UNASSIGNED_TEXT.to_string(),
        ValueKind::Primitive { text, .. } => text.clone(),
        ValueKind::Function { params, .. } => {
            truncate(&format!("λ({})", params.join(", ")), max_width)
        }
        ValueKind::GlobalFunction { name, params } => {
            let text = match name {
                Some(name) => format!("{}({})", name, params.join(", ")),
                None => format!("λ({})", params.join(", ")),
            };
            truncate(&text, max_width)
        }
        ValueKind::Array { slots, pair } => {
            if *pair {
                "[·, ·]".to_string()
            } else {
                format!("[{}]", slots.len())
            }
        }
    }
}

/// Cut `text` to `max_width` characters, marking the cut with an ellipsis
pub fn truncate(text: &str, max_width: i32) -> String {
    let max = max_width.max(1) as usize;
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

fn value_size(kind: &ValueKind, config: &LayoutConfig) -> (i32, i32) {
    match kind {
        ValueKind::Array { slots, .. } => (
            slots.len().max(1) as i32 * config.slot_width,
            config.slot_height,
        ),
        other => (
            value_text(other, config.function_max_width).chars().count() as i32,
            1,
        ),
    }
}

/// Rectangle of one array slot
pub fn slot_rect(array: Rect, index: usize, config: &LayoutConfig) -> Rect {
    Rect::new(
        array.x + index as i32 * config.slot_width,
        array.y,
        config.slot_width,
        config.slot_height,
    )
}

/// Position a value and everything anchored under it; returns the covered area
fn place_value(
    values: &mut ValueTable,
    id: ValueId,
    x: i32,
    y: i32,
    config: &LayoutConfig,
) -> Rect {
    let (width, height) = value_size(&values.get(id).kind, config);
    let rect = Rect::new(x, y, width, height);
    {
        let value = values.get_mut(id);
        value.rect = rect;
        value.positioned = true;
    }

    let slots = match &values.get(id).kind {
        ValueKind::Array { slots, .. } => slots.clone(),
        _ => return rect,
    };

    let mut covered = rect;
    let mut below = rect.bottom();
    for (index, slot) in slots.into_iter().enumerate() {
        let child = values.get(slot);
        if child.positioned || !child.is_main(Reference::Slot { array: id, index }) {
            continue;
        }
        let cell = slot_rect(rect, index, config);
        if is_inline(&child.kind) {
            let value = values.get_mut(slot);
            value.rect = Rect::new(cell.x + 1, cell.mid_y(), (cell.width - 2).max(1), 1);
            value.positioned = true;
        } else {
            let nested = place_value(values, slot, cell.x, below + config.nested_spacing, config);
            covered = covered.union(&nested);
            below = nested.bottom();
        }
    }
    covered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{MachineState, RawValue, ScopeKind, ScopeTree};
    use crate::snapshot::{ingest_state, IngestOptions};

    fn graph_for(tree: ScopeTree) -> FrameGraph {
        let ingested = ingest_state(
            &MachineState::new(tree),
            3,
            IngestOptions {
                prune_globals: false,
            },
        );
        FrameGraph::build(
            &ingested.env,
            &ingested.heap,
            3,
            &LayoutConfig::default(),
        )
    }

    #[test]
    fn empty_scopes_are_transparent() {
        let mut tree = ScopeTree::new("global");
        let root = tree.root();
        tree.bind(root, "a", RawValue::Number(1.0), true);
        let empty = tree.add_scope(root, "block", ScopeKind::Block);
        let inner = tree.add_scope(empty, "inner", ScopeKind::Block);
        tree.bind(inner, "b", RawValue::Number(2.0), false);

        let graph = graph_for(tree);
        assert_eq!(graph.levels.len(), 2);
        let inner_frame = graph.frame_of_scope(inner).unwrap();
        assert_eq!(graph.frame(inner_frame).parent, graph.root_frame());
        assert_eq!(graph.frame_of_scope(empty), graph.root_frame());
    }

    #[test]
    fn dummy_bindings_go_last() {
        let mut tree = ScopeTree::new("global");
        let root = tree.root();
        tree.bind(root, "0", RawValue::Number(0.0), true);
        tree.bind(root, "x", RawValue::Number(1.0), true);

        let graph = graph_for(tree);
        let names: Vec<_> = graph.frames[0]
            .bindings
            .iter()
            .map(|b| graph.binding(*b).name.clone())
            .collect();
        assert_eq!(names, ["x", "0"]);
    }

    #[test]
    fn bindings_stack_inside_frame() {
        let config = LayoutConfig::default();
        let mut tree = ScopeTree::new("global");
        let root = tree.root();
        tree.bind(root, "first", RawValue::Number(1.0), true);
        tree.bind(root, "second", RawValue::Str("two".into()), true);

        let graph = graph_for(tree);
        let frame = &graph.frames[0];
        let first = graph.binding(frame.bindings[0]);
        let second = graph.binding(frame.bindings[1]);

        assert_eq!(frame.rect.y, config.name_height);
        assert_eq!(first.rect.x, frame.rect.x + config.padding_x);
        assert_eq!(
            first.rect.y,
            frame.rect.y + config.name_height + config.padding_y
        );
        assert_eq!(second.rect.y, first.rect.bottom() + config.binding_spacing);
        // "second:" + gap + "\"two\""
        assert_eq!(second.rect.width, 7 + config.value_gap + 5);
        assert_eq!(
            frame.rect.width,
            (second.rect.width + 2 * config.padding_x).max(config.min_frame_width)
        );
    }

    #[test]
    fn nested_arrays_stack_under_their_slot() {
        let config = LayoutConfig::default();
        let inner = RawValue::array(vec![RawValue::Number(2.0)], None);
        let outer = RawValue::array(vec![RawValue::Number(1.0), inner], None);
        let mut tree = ScopeTree::new("global");
        let root = tree.root();
        tree.bind(root, "xs", outer, true);

        let graph = graph_for(tree);
        let binding = graph.binding(graph.frames[0].bindings[0]);
        let outer_value = graph.values.get(binding.value);
        let inner_id = match &outer_value.kind {
            ValueKind::Array { slots, .. } => slots[1],
            other => panic!("expected array, got {:?}", other),
        };
        let inner_value = graph.values.get(inner_id);

        assert_eq!(inner_value.rect.x, outer_value.rect.x + config.slot_width);
        assert_eq!(
            inner_value.rect.y,
            outer_value.rect.bottom() + config.nested_spacing
        );
        assert_eq!(binding.rect.bottom(), inner_value.rect.bottom());
        assert!(graph
            .arrows()
            .iter()
            .any(|a| a.source == Anchor::Slot(outer_value.id, 1)
                && a.target == Anchor::Value(inner_id)));
    }

    #[test]
    fn levels_do_not_overlap() {
        let config = LayoutConfig::default();
        let mut tree = ScopeTree::new("global");
        let root = tree.root();
        tree.bind(root, "a", RawValue::Number(1.0), true);
        let child = tree.add_scope(root, "f", ScopeKind::Function);
        tree.bind(child, "n", RawValue::Number(3.0), true);

        let graph = graph_for(tree);
        let top = graph.levels[0].rect;
        let bottom = graph.levels[1].rect;
        assert_eq!(bottom.y, top.bottom() + config.level_gap);
        assert_eq!(graph.levels[1].above, Some(LevelId(0)));
    }

    #[test]
    fn levels_stack_flush_by_default() {
        let config = LayoutConfig::default();
        let mut tree = ScopeTree::new("global");
        let root = tree.root();
        tree.bind(root, "a", RawValue::Number(1.0), true);
        let child = tree.add_scope(root, "a very long frame title", ScopeKind::Function);
        tree.bind(child, "n", RawValue::Number(3.0), true);

        let graph = graph_for(tree);
        assert_eq!(graph.levels[1].rect.y, graph.levels[0].rect.bottom());

        let root_frame = &graph.frames[0];
        let a = graph.binding(root_frame.bindings[0]);
        assert_eq!(
            a.rect.y,
            root_frame.rect.y + config.name_height + config.padding_y
        );
        assert_eq!(root_frame.rect.bottom(), a.rect.bottom() + config.padding_y);

        // Long titles are clipped, they do not widen the frame
        let titled = &graph.frames[1];
        assert_eq!(titled.rect.width, config.min_frame_width);
    }

    #[test]
    fn function_label_is_capped() {
        let kind = ValueKind::Function {
            name: None,
            params: vec!["alpha".into(), "beta".into(), "gamma".into(), "delta".into()],
            body: String::new(),
            env: ScopeId(0),
        };
        let text = value_text(&kind, 10);
        assert_eq!(text.chars().count(), 10);
        assert!(text.ends_with('…'));
    }
}
