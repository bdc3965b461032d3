//! The diagram engine
//!
//! An [`Engine`] owns everything derived from the most recent machine step: the
//! [`DiagramSnapshot`], the per-mode [`RenderCache`], the [`Animator`] and the hover
//! state. Engines share nothing, so any number of them can coexist.
//!
//! # State machine
//!
//! ```text
//!                 ingest                 set_display_mode / resize
//! Uninitialized ─────────▶ Ready ◀──────────────────────────────▶ Stale
//!       ▲                   │  ▲            draw                    │
//!       └──── clear ────────┘  └────────────────────────────────────┘
//! ```
//!
//! `ingest` always rebuilds from scratch and cancels any animation in flight. `draw`
//! only composes the output for modes that are not cached yet.

pub mod cache;
pub mod errors;

pub use cache::{CachedDraw, RenderCache};
pub use errors::{DiagramError, Result};

use crate::animation::{
    classify_step, synthesize, AnimatedNode, AnimationRun, Animator, InstructionClass,
    StepPair, TweenTarget,
};
use crate::config::{DisplayMode, EngineConfig};
use crate::diagram::{DiagramSnapshot, ElementKey, Point, Scene, StackLayout, StackSide};
use crate::machine::{MachineState, SourceSpan};
use crate::snapshot::{ingest_state, IngestOptions};
use std::rc::Rc;
use tracing::debug;

/// Lifecycle of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing ingested yet, or cleared
    Uninitialized,
    /// The current mode's output is up to date
    Ready,
    /// A display mode or the container changed since the last draw
    Stale,
}

type DisplayCallback = Box<dyn FnMut(&Scene)>;
type HighlightCallback = Box<dyn FnMut(&[SourceSpan])>;

pub struct Engine {
    config: EngineConfig,
    state: EngineState,
    mode: DisplayMode,
    container: (i32, i32),
    current: Option<Rc<DiagramSnapshot>>,
    cache: RenderCache,
    last_draw: Option<CachedDraw>,
    animator: Animator,
    on_display: Option<DisplayCallback>,
    on_highlight: Option<HighlightCallback>,
    hovered: Option<(StackSide, usize)>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("container", &self.container)
            .field("cached_modes", &self.cache.len())
            .field("animating", &self.animator.is_running())
            .finish()
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            animator: Animator::new(config.tween),
            config,
            state: EngineState::Uninitialized,
            mode: DisplayMode::default(),
            container: (0, 0),
            current: None,
            cache: RenderCache::new(),
            last_draw: None,
            on_display: None,
            on_highlight: None,
            hovered: None,
        }
    }

    /// Register the callback that receives every drawn scene; required before `ingest`
    pub fn on_display(&mut self, callback: impl FnMut(&Scene) + 'static) {
        self.on_display = Some(Box::new(callback));
    }

    /// Register the callback for hover-driven source highlighting
    pub fn on_source_highlight(&mut self, callback: impl FnMut(&[SourceSpan]) + 'static) {
        self.on_highlight = Some(Box::new(callback));
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Option<&DiagramSnapshot> {
        self.current.as_deref()
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Replace the diagram with a new machine step
    ///
    /// Cancels the running animation first. Returns the animation of the transition from
    /// the previous step, if there is one to play.
    pub fn ingest(
        &mut self,
        state: &MachineState,
        language_level: u8,
    ) -> Result<Option<AnimationRun>> {
        if self.on_display.is_none() {
            return Err(DiagramError::NotInitialized {
                reason: "no display callback registered",
                state: self.state,
            });
        }

        // A new step always starts from its static render
        self.animator.cancel();
        self.animator.poses().clear();

        let options = IngestOptions {
            prune_globals: self.config.prune_globals,
        };
        let ingested = ingest_state(state, language_level, options);
        let snapshot = Rc::new(DiagramSnapshot::build(&ingested, &self.config.layout));

        let previous = self.current.replace(snapshot);
        let previous_scene = match (&previous, &self.last_draw) {
            (Some(_), Some(drawn)) => Some(drawn.scene.clone()),
            (Some(prev), None) => Some(Rc::new(self.compose(prev, self.mode).0)),
            _ => None,
        };

        self.cache.clear();
        self.last_draw = None;
        self.hovered = None;
        self.state = EngineState::Ready;
        debug!(language_level, "ingested machine step");

        if !self.config.animate {
            return Ok(None);
        }
        let (Some(prev), Some(prev_scene)) = (previous, previous_scene) else {
            return Ok(None);
        };
        let class = classify_step(&prev);
        if class == InstructionClass::None {
            return Ok(None);
        }

        let (Some(next), Some(next_draw)) = (self.current.clone(), self.render(self.mode)) else {
            return Ok(None);
        };
        let pair = StepPair {
            prev: &prev,
            prev_scene: &prev_scene,
            next: &next,
            next_scene: &next_draw.scene,
        };
        let tweens = synthesize(class, &pair, &self.config.tween);
        Ok(Some(self.animator.start(class, tweens)))
    }

    /// Draw with the current display mode
    pub fn draw(&mut self) -> Result<Rc<Scene>> {
        self.draw_with(self.mode)
    }

    /// Draw with an explicit display mode; repeated calls hit the cache
    pub fn draw_with(&mut self, mode: DisplayMode) -> Result<Rc<Scene>> {
        if self.on_display.is_none() {
            return Err(DiagramError::NotInitialized {
                reason: "no display callback registered",
                state: self.state,
            });
        }
        let Some(drawn) = self.render(mode) else {
            return Err(DiagramError::NotInitialized {
                reason: "nothing ingested",
                state: self.state,
            });
        };
        let scene = drawn.scene.clone();
        self.last_draw = Some(drawn);
        self.state = EngineState::Ready;

        if let Some(callback) = self.on_display.as_mut() {
            callback(&scene);
        }
        Ok(scene)
    }

    /// Switch palette, truncation or stack visibility
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.mark_stale();
    }

    /// Change the container size; every cached output depends on it
    pub fn resize(&mut self, width: i32, height: i32) {
        if (width, height) == self.container {
            return;
        }
        self.container = (width, height);
        self.cache.clear();
        self.mark_stale();
    }

    /// Drop the current diagram and return to `Uninitialized`; callbacks stay registered
    pub fn clear(&mut self) {
        self.animator.cancel();
        self.animator.poses().clear();
        self.current = None;
        self.cache.clear();
        self.last_draw = None;
        self.hovered = None;
        self.state = EngineState::Uninitialized;
    }

    /// Activate the "show more" affordance: toggle truncation and redraw
    pub fn activate_show_more(&mut self) -> Result<Rc<Scene>> {
        let mode = DisplayMode {
            truncated: !self.mode.truncated,
            ..self.mode
        };
        self.set_display_mode(mode);
        self.draw()
    }

    /// Report the pointer position over the last drawn scene
    ///
    /// Entering a stack item that carries a source span emits that span; leaving it
    /// emits an empty list.
    pub fn hover(&mut self, point: Point) {
        let hit = self
            .last_draw
            .as_ref()
            .and_then(|d| d.stacks.as_ref())
            .and_then(|s| s.hit(point.x, point.y))
            .and_then(|item| item.source.map(|span| ((item.side, item.index), span)));

        let now = hit.map(|(id, _)| id);
        if now == self.hovered {
            return;
        }

        if self.hovered.take().is_some() {
            self.highlight(&[]);
        }
        if let Some((id, span)) = hit {
            self.hovered = Some(id);
            self.highlight(&[span]);
        }
    }

    pub fn is_control_empty(&self) -> bool {
        self.current
            .as_ref()
            .map_or(true, |snapshot| snapshot.is_control_empty())
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_running()
    }

    /// Cancel the running animation, leaving poses where they are
    pub fn cancel_animation(&mut self) {
        self.animator.cancel();
    }

    /// Stop the running animation and jump to the static render of the current step
    pub fn skip_animation(&mut self) {
        self.animator.cancel();
        self.animator.poses().clear();
    }

    /// Scene element of the stack item under the pointer
    pub fn hovered_key(&self) -> Option<ElementKey> {
        self.hovered.map(|(side, index)| match side {
            StackSide::Control => ElementKey::ControlItem(index),
            StackSide::Stash => ElementKey::StashItem(index),
        })
    }

    /// Animated elements to paint over the static scene
    pub fn animation_overlay(&self) -> Vec<(TweenTarget, AnimatedNode)> {
        self.animator.poses().snapshot()
    }

    fn highlight(&mut self, spans: &[SourceSpan]) {
        if let Some(callback) = self.on_highlight.as_mut() {
            callback(spans);
        }
    }

    fn mark_stale(&mut self) {
        if self.state == EngineState::Ready {
            self.state = EngineState::Stale;
        }
    }

    fn render(&mut self, mode: DisplayMode) -> Option<CachedDraw> {
        let snapshot = self.current.clone()?;
        let limit = self.config.truncation_limit;
        let width = self.container.0;
        let layout = self.config.layout;
        Some(self.cache.get_or_compose(mode, || {
            let (scene, stacks) = snapshot.render(mode, limit, width, &layout);
            CachedDraw {
                scene: Rc::new(scene),
                stacks,
            }
        }))
    }

    fn compose(
        &self,
        snapshot: &DiagramSnapshot,
        mode: DisplayMode,
    ) -> (Scene, Option<StackLayout>) {
        snapshot.render(
            mode,
            self.config.truncation_limit,
            self.container.0,
            &self.config.layout,
        )
    }
}
