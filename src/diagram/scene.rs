//! Drawable output
//!
//! A [`Scene`] is a flat list of keyed nodes in cell coordinates. Keys are stable across
//! draws of the same snapshot, and stack item keys are stable across steps, which is
//! what lets the animator match an element in one scene with its counterpart in the next.

use super::arrow::{route, Ends};
use super::geometry::{Point, Rect};
use super::layout::{is_inline, truncate, value_text};
use super::model::{Anchor, ArrowKind, ArrowSpec, BindingId, FrameId, ValueId, ValueKind};
use super::stacks::{StackLayout, StackSide};
use super::DiagramSnapshot;
use crate::config::{DisplayMode, LayoutConfig};
use crate::engine::errors::DiagramError;
use crate::theme::Theme;
use ratatui::style::{Color, Modifier, Style};
use tracing::warn;

/// Identity of a drawn element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKey {
    Frame(FrameId),
    FrameTitle(FrameId),
    Binding(BindingId),
    Value(ValueId),
    Arrow(usize),
    /// Control item by position from the bottom of the stack
    ControlItem(usize),
    /// Stash item by position from the bottom of the stack
    StashItem(usize),
    ShowMore,
    Header(StackSide),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Bordered rectangle
    Box { rect: Rect },
    /// Single line of text, clipped to `max_width` cells
    Text {
        at: Point,
        text: String,
        max_width: i32,
    },
    /// Row of array cells
    Row {
        rect: Rect,
        cells: usize,
        cell_width: i32,
        pair: bool,
    },
    /// Orthogonal polyline; the head is drawn at the last point
    Arrow { points: Vec<Point> },
}

impl Shape {
    /// Area the shape covers
    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Box { rect } | Shape::Row { rect, .. } => *rect,
            Shape::Text { at, text, max_width } => Rect::new(
                at.x,
                at.y,
                (text.chars().count() as i32).min(*max_width),
                1,
            ),
            Shape::Arrow { points } => {
                let mut iter = points.iter();
                let Some(first) = iter.next() else {
                    return Rect::default();
                };
                iter.fold(Rect::new(first.x, first.y, 1, 1), |acc, p| {
                    acc.union(&Rect::new(p.x, p.y, 1, 1))
                })
            }
        }
    }

    /// Same shape moved so its bounds start at `to`
    pub fn moved_to(&self, to: Point) -> Shape {
        let from = self.bounds();
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        match self {
            Shape::Box { rect } => Shape::Box {
                rect: rect.translate(dx, dy),
            },
            Shape::Text { at, text, max_width } => Shape::Text {
                at: Point::new(at.x + dx, at.y + dy),
                text: text.clone(),
                max_width: *max_width,
            },
            Shape::Row {
                rect,
                cells,
                cell_width,
                pair,
            } => Shape::Row {
                rect: rect.translate(dx, dy),
                cells: *cells,
                cell_width: *cell_width,
                pair: *pair,
            },
            Shape::Arrow { points } => Shape::Arrow {
                points: points
                    .iter()
                    .map(|p| Point::new(p.x + dx, p.y + dy))
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub key: ElementKey,
    pub shape: Shape,
    pub style: Style,
}

/// Drawable output of one draw
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: i32,
    pub height: i32,
    pub background: Color,
    pub nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn node(&self, key: ElementKey) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn bounds(&self, key: ElementKey) -> Option<Rect> {
        self.node(key).map(|n| n.shape.bounds())
    }

    /// Text of a text node
    pub fn text(&self, key: ElementKey) -> Option<&str> {
        match &self.node(key)?.shape {
            Shape::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn count(&self, key: ElementKey) -> usize {
        self.nodes.iter().filter(|n| n.key == key).count()
    }
}

/// Turn a snapshot plus its per-draw stack layout into a scene
pub fn compose(
    snapshot: &DiagramSnapshot,
    stacks: Option<&StackLayout>,
    mode: DisplayMode,
    config: &LayoutConfig,
) -> Scene {
    let theme = Theme::for_palette(mode.palette);
    let graph = &snapshot.graph;
    let mut nodes = Vec::new();

    for frame in &graph.frames {
        nodes.push(SceneNode {
            key: ElementKey::Frame(frame.id),
            shape: Shape::Box { rect: frame.rect },
            style: Style::default().fg(theme.frame_border),
        });
        nodes.push(SceneNode {
            key: ElementKey::FrameTitle(frame.id),
            shape: Shape::Text {
                at: Point::new(frame.rect.x, frame.rect.y - config.name_height),
                text: frame.name.clone(),
                max_width: frame.rect.width,
            },
            style: Style::default()
                .fg(theme.frame_title)
                .add_modifier(Modifier::BOLD),
        });
    }

    for binding in &graph.bindings {
        let color = if binding.constant {
            theme.constant_name
        } else {
            theme.binding_name
        };
        let mut style = Style::default().fg(color);
        if binding.dummy {
            style = style.add_modifier(Modifier::DIM);
        }
        nodes.push(SceneNode {
            key: ElementKey::Binding(binding.id),
            shape: Shape::Text {
                at: Point::new(binding.rect.x, binding.rect.y),
                text: binding.label(),
                max_width: binding.label_width(),
            },
            style,
        });
    }

    // Each value body exactly once, at its main reference
    for value in graph.values.iter().filter(|v| v.positioned) {
        let (shape, color) = match &value.kind {
            ValueKind::Array { slots, pair } => (
                Shape::Row {
                    rect: value.rect,
                    cells: slots.len(),
                    cell_width: config.slot_width,
                    pair: *pair,
                },
                theme.array_border,
            ),
            kind => {
                let color = match kind {
                    ValueKind::Function { .. } => theme.function,
                    ValueKind::GlobalFunction { .. } => theme.global_function,
                    ValueKind::Primitive { opaque: true, .. } => theme.error,
                    ValueKind::Unassigned => theme.comment,
                    _ => theme.primitive,
                };
                let text = value_text(kind, config.function_max_width);
                let max_width = if is_inline(kind) {
                    value.rect.width.max(1)
                } else {
                    config.function_max_width
                };
                (
                    Shape::Text {
                        at: Point::new(value.rect.x, value.rect.y),
                        text,
                        max_width,
                    },
                    color,
                )
            }
        };
        nodes.push(SceneNode {
            key: ElementKey::Value(value.id),
            shape,
            style: Style::default().fg(color),
        });
    }

    let mut arrows: Vec<ArrowSpec> = snapshot.arrows.clone();

    if let Some(stacks) = stacks {
        for (side, header, title) in [
            (StackSide::Control, stacks.control_header, "Control"),
            (StackSide::Stash, stacks.stash_header, "Stash"),
        ] {
            nodes.push(SceneNode {
                key: ElementKey::Header(side),
                shape: Shape::Text {
                    at: Point::new(header.x, header.y),
                    text: title.to_string(),
                    max_width: header.width,
                },
                style: Style::default()
                    .fg(theme.stack_header)
                    .add_modifier(Modifier::BOLD),
            });
        }

        for item in stacks.control.iter().chain(&stacks.stash) {
            let (key, source) = match item.side {
                StackSide::Control => (
                    ElementKey::ControlItem(item.index),
                    Anchor::ControlItem(item.index),
                ),
                StackSide::Stash => (
                    ElementKey::StashItem(item.index),
                    Anchor::StashItem(item.index),
                ),
            };
            nodes.push(SceneNode {
                key,
                shape: Shape::Text {
                    at: Point::new(item.rect.x, item.rect.y),
                    text: truncate(&item.label, item.rect.width),
                    max_width: item.rect.width,
                },
                style: Style::default().fg(theme.stack_label),
            });
            if let Some(target) = item.target {
                let kind = match target {
                    Anchor::Frame(_) => ArrowKind::StackItemToFrame,
                    _ => ArrowKind::StackItemToValue,
                };
                arrows.push(ArrowSpec {
                    kind,
                    source,
                    target,
                });
            }
        }

        if let Some(rect) = stacks.show_more {
            nodes.push(SceneNode {
                key: ElementKey::ShowMore,
                shape: Shape::Text {
                    at: Point::new(rect.x, rect.y),
                    text: format!("▾ show {} more", stacks.hidden),
                    max_width: rect.width,
                },
                style: Style::default()
                    .fg(theme.primary)
                    .add_modifier(Modifier::UNDERLINED),
            });
        }
    }

    for (index, spec) in arrows.iter().enumerate() {
        let source = snapshot.anchor_rect(spec.source, stacks, config);
        let target = snapshot.anchor_rect(spec.target, stacks, config);
        let (Some(source), Some(target)) = (source, target) else {
            warn!(
                "{}",
                DiagramError::UnresolvedReference {
                    arrow: format!("{:?} -> {:?}", spec.source, spec.target)
                }
            );
            continue;
        };
        let ends = Ends {
            source,
            target,
            clearance: config.arrow_clearance,
            head: config.arrow_head,
        };
        nodes.push(SceneNode {
            key: ElementKey::Arrow(index),
            shape: Shape::Arrow {
                points: route(spec.kind, &ends),
            },
            style: Style::default().fg(theme.arrow),
        });
    }

    let extent = nodes
        .iter()
        .map(|n| n.shape.bounds())
        .fold(Rect::default(), |acc, r| acc.union(&r));

    Scene {
        width: extent.right().max(0) + 1,
        height: extent.bottom().max(0) + 1,
        background: theme.bg,
        nodes,
    }
}
