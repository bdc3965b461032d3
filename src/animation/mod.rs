//! Step animation
//!
//! After every ingest the previous step's top control entry is classified
//! ([`classify::classify_step`]) and turned into an ordered set of tweens
//! ([`classify::synthesize`]). The [`Animator`] runs a set as one abortable fan-out:
//! all tweens are joined with `join_all` and the join is wrapped in
//! [`futures::future::Abortable`], so the whole set is cancelled through a single
//! [`AbortHandle`].
//!
//! Tweens are timer-driven (`tokio::time`) and hold an `Rc` to the shared
//! [`PoseTable`], so an [`AnimationRun`] must be awaited on the thread that created it
//! (directly, or on a `tokio::task::LocalSet`).

pub mod classify;
pub mod tween;

pub use classify::{classify_step, synthesize, InstructionClass, StepPair};
pub use tween::{AnimatedNode, Pose, PoseTable, Tween, TweenTarget};

use crate::config::TweenConfig;
use futures::future::{join_all, AbortHandle, Abortable};
use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;
use tracing::debug;

/// How a tween set ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOutcome {
    Completed,
    Cancelled,
}

/// A running tween set; resolves once every tween resolved or the set was cancelled
pub struct AnimationRun {
    class: InstructionClass,
    tweens: usize,
    inner: Pin<Box<dyn Future<Output = AnimationOutcome>>>,
}

impl AnimationRun {
    pub fn class(&self) -> InstructionClass {
        self.class
    }

    /// Number of tweens in the set
    pub fn len(&self) -> usize {
        self.tweens
    }

    pub fn is_empty(&self) -> bool {
        self.tweens == 0
    }
}

impl std::fmt::Debug for AnimationRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationRun")
            .field("class", &self.class)
            .field("tweens", &self.tweens)
            .finish()
    }
}

impl Future for AnimationRun {
    type Output = AnimationOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().inner.as_mut().poll(cx)
    }
}

/// Owns the pose table and the abort handle of the set in flight
#[derive(Debug)]
pub struct Animator {
    config: TweenConfig,
    poses: PoseTable,
    handle: Option<AbortHandle>,
    running: Rc<Cell<bool>>,
}

impl Animator {
    pub fn new(config: TweenConfig) -> Self {
        Animator {
            config,
            poses: PoseTable::new(),
            handle: None,
            running: Rc::new(Cell::new(false)),
        }
    }

    pub fn config(&self) -> &TweenConfig {
        &self.config
    }

    pub fn poses(&self) -> &PoseTable {
        &self.poses
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Start a tween set, cancelling the one in flight first
    pub fn start(&mut self, class: InstructionClass, tweens: Vec<Tween>) -> AnimationRun {
        self.cancel();
        self.poses.clear();

        let count = tweens.len();
        let frame = Duration::from_millis(self.config.frame_ms.max(1));
        let set = join_all(
            tweens
                .into_iter()
                .map(|t| tween::run_tween(t, frame, self.poses.clone())),
        );

        let (handle, registration) = AbortHandle::new_pair();
        let abortable = Abortable::new(set, registration);
        self.handle = Some(handle);
        // Fresh flag per set; a cancelled set resolving later only clears its own
        self.running = Rc::new(Cell::new(true));

        let poses = self.poses.clone();
        let running = self.running.clone();
        let inner = async move {
            let outcome = match abortable.await {
                Ok(_) => {
                    // Final state is the static render of the new step
                    poses.clear();
                    AnimationOutcome::Completed
                }
                Err(_) => AnimationOutcome::Cancelled,
            };
            running.set(false);
            debug!(?class, ?outcome, "animation finished");
            outcome
        };

        debug!(?class, tweens = count, "animation started");
        AnimationRun {
            class,
            tweens: count,
            inner: Box::pin(inner),
        }
    }

    /// Cancel the set in flight; poses stay at their last interpolated values
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.running.set(false);
    }
}
