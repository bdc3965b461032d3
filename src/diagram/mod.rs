//! Diagram construction
//!
//! A [`DiagramSnapshot`] is built once per ingested machine step:
//!
//! - [`memo`] resolves bindings into deduplicated [`model::Value`]s and elects main references
//! - [`layout`] assigns levels and positions frames, bindings and values
//! - [`stacks`] labels the control and stash entries
//! - [`arrow`] routes arrows between anchors
//! - [`scene`] composes everything into a drawable [`scene::Scene`] per display mode
//!
//! The snapshot is never mutated after `build`; the next step replaces it wholesale.

pub mod arrow;
pub mod geometry;
pub mod layout;
pub mod memo;
pub mod model;
pub mod scene;
pub mod stacks;

pub use geometry::{Point, Rect};
pub use layout::FrameGraph;
pub use model::{Anchor, ArrowKind, ArrowSpec, Reference, ValueId, ValueKind};
pub use scene::{ElementKey, Scene, SceneNode, Shape};
pub use stacks::{ControlItem, InstrTag, StackItem, StackLayout, StackSide, StashItem};

use crate::config::{DisplayMode, LayoutConfig};
use crate::snapshot::IngestedState;
use tracing::debug;

/// Everything derived from one machine step
#[derive(Debug, Clone)]
pub struct DiagramSnapshot {
    pub graph: FrameGraph,
    /// Arrows inside the frame grid; stack arrows are added per draw
    pub arrows: Vec<ArrowSpec>,
    /// Control items, bottom of stack first, unplaced
    pub control: Vec<ControlItem>,
    /// Stash items, bottom of stack first, unplaced
    pub stash: Vec<StashItem>,
    pub language_level: u8,
}

impl DiagramSnapshot {
    pub fn build(ingested: &IngestedState, config: &LayoutConfig) -> Self {
        let graph = FrameGraph::build(
            &ingested.env,
            &ingested.heap,
            ingested.language_level,
            config,
        );
        let arrows = graph.arrows();
        let (control, stash) = stacks::render_stacks(
            &ingested.control,
            &ingested.stash,
            &graph,
            &ingested.heap,
            config,
        );

        debug!(
            frames = graph.frames.len(),
            bindings = graph.bindings.len(),
            values = graph.values.len(),
            arrows = arrows.len(),
            "built diagram snapshot"
        );

        DiagramSnapshot {
            graph,
            arrows,
            control,
            stash,
            language_level: ingested.language_level,
        }
    }

    pub fn is_control_empty(&self) -> bool {
        self.control.is_empty()
    }

    /// Place the stack columns for a display mode; `None` when stacks are hidden
    pub fn place_stacks(
        &self,
        mode: DisplayMode,
        truncation_limit: usize,
        container_width: i32,
        config: &LayoutConfig,
    ) -> Option<StackLayout> {
        if !mode.stacks_visible {
            return None;
        }
        let limit = mode.truncated.then_some(truncation_limit);
        Some(stacks::place_stacks(
            &self.control,
            &self.stash,
            limit,
            self.graph.extent().right(),
            container_width,
            config,
        ))
    }

    /// Compose the scene for a display mode
    pub fn render(
        &self,
        mode: DisplayMode,
        truncation_limit: usize,
        container_width: i32,
        config: &LayoutConfig,
    ) -> (Scene, Option<StackLayout>) {
        let stacks = self.place_stacks(mode, truncation_limit, container_width, config);
        let scene = scene::compose(self, stacks.as_ref(), mode, config);
        (scene, stacks)
    }

    /// Current rectangle of an arrow endpoint, `None` if it was never positioned
    pub fn anchor_rect(
        &self,
        anchor: Anchor,
        stacks: Option<&StackLayout>,
        config: &LayoutConfig,
    ) -> Option<Rect> {
        match anchor {
            Anchor::Binding(id) => {
                let binding = self.graph.bindings.get(id.index())?;
                Some(Rect::new(
                    binding.rect.x,
                    binding.rect.y,
                    binding.label_width(),
                    1,
                ))
            }
            Anchor::Slot(id, index) => {
                let value = self.graph.values.get(id);
                value
                    .positioned
                    .then(|| layout::slot_rect(value.rect, index, config))
            }
            Anchor::Frame(id) => self
                .graph
                .frames
                .get(id.index())
                .map(|f| f.outer_rect(config.name_height)),
            Anchor::Value(id) => {
                let value = self.graph.values.get(id);
                value.positioned.then_some(value.rect)
            }
            Anchor::ControlItem(index) => stacks?
                .control
                .iter()
                .find(|item| item.index == index)
                .map(|item| item.rect),
            Anchor::StashItem(index) => stacks?
                .stash
                .iter()
                .find(|item| item.index == index)
                .map(|item| item.rect),
        }
    }
}
