// Single tweens and the shared pose table they write into

use crate::config::Easing;
use crate::diagram::{ElementKey, Rect, SceneNode};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{trace, warn};

/// Where and how visible an element is at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rect: Rect,
    pub opacity: f32,
}

impl Pose {
    pub const fn new(rect: Rect, opacity: f32) -> Self {
        Pose { rect, opacity }
    }

    pub const fn shown(rect: Rect) -> Self {
        Pose::new(rect, 1.0)
    }

    pub const fn hidden() -> Self {
        Pose::new(Rect::new(0, 0, 0, 0), 0.0)
    }

    /// Interpolate towards `to`; cells are rounded to the nearest integer
    pub fn lerp(&self, to: &Pose, t: f32) -> Pose {
        let mix = |a: i32, b: i32| a + ((b - a) as f32 * t).round() as i32;
        Pose {
            rect: Rect::new(
                mix(self.rect.x, to.rect.x),
                mix(self.rect.y, to.rect.y),
                mix(self.rect.width, to.rect.width),
                mix(self.rect.height, to.rect.height),
            ),
            opacity: self.opacity + (to.opacity - self.opacity) * t,
        }
    }
}

/// Element a tween drives
///
/// A ghost is a copy of an element from the previous scene that is animated on top of
/// the new one, so it never collides with a live element under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TweenTarget {
    pub key: ElementKey,
    pub ghost: bool,
}

impl TweenTarget {
    pub const fn live(key: ElementKey) -> Self {
        TweenTarget { key, ghost: false }
    }

    pub const fn ghost(key: ElementKey) -> Self {
        TweenTarget { key, ghost: true }
    }
}

/// One interpolation of position and opacity
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    pub target: TweenTarget,
    /// Node being animated; `None` when it was never drawn
    pub node: Option<SceneNode>,
    /// `None` makes the tween resolve immediately
    pub from: Option<Pose>,
    pub to: Pose,
    pub duration: Duration,
    pub easing: Easing,
}

/// A node together with its current animated pose
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedNode {
    pub node: SceneNode,
    pub pose: Pose,
}

/// Animated poses, shared between running tweens and the painter
#[derive(Debug, Clone, Default)]
pub struct PoseTable {
    poses: Rc<RefCell<FxHashMap<TweenTarget, AnimatedNode>>>,
}

impl PoseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, target: TweenTarget, node: AnimatedNode) {
        self.poses.borrow_mut().insert(target, node);
    }

    pub fn get(&self, target: TweenTarget) -> Option<AnimatedNode> {
        self.poses.borrow().get(&target).cloned()
    }

    pub fn clear(&self) {
        self.poses.borrow_mut().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.poses.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.poses.borrow().len()
    }

    /// Copy of every pose, live elements before ghosts
    pub fn snapshot(&self) -> Vec<(TweenTarget, AnimatedNode)> {
        let mut all: Vec<_> = self
            .poses
            .borrow()
            .iter()
            .map(|(t, n)| (*t, n.clone()))
            .collect();
        all.sort_by_key(|(t, _)| t.ghost);
        all
    }
}

/// Drive one tween to completion, writing each frame into `poses`
///
/// Dropping the future stops it where it is; the last written pose stays in the table.
pub async fn run_tween(tween: Tween, frame: Duration, poses: PoseTable) {
    let (Some(from), Some(node)) = (tween.from, tween.node) else {
        warn!(target_key = ?tween.target.key, "tween source was never drawn, skipping");
        return;
    };

    let frames = (tween.duration.as_millis() / frame.as_millis().max(1)).max(1) as u32;
    let mut ticker = tokio::time::interval(frame);
    for i in 0..=frames {
        ticker.tick().await;
        let t = tween.easing.apply(i as f32 / frames as f32);
        let pose = from.lerp(&tween.to, t);
        trace!(key = ?tween.target.key, t, "tween tick");
        poses.set(
            tween.target,
            AnimatedNode {
                node: node.clone(),
                pose,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_hits_both_ends() {
        let a = Pose::new(Rect::new(0, 10, 4, 1), 1.0);
        let b = Pose::new(Rect::new(20, 0, 4, 1), 0.0);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid.rect, Rect::new(10, 5, 4, 1));
        assert!((mid.opacity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn ghosts_sort_after_live_poses() {
        let table = PoseTable::new();
        let node = AnimatedNode {
            node: SceneNode {
                key: ElementKey::ShowMore,
                shape: crate::diagram::Shape::Box {
                    rect: Rect::default(),
                },
                style: Default::default(),
            },
            pose: Pose::hidden(),
        };
        table.set(TweenTarget::ghost(ElementKey::ShowMore), node.clone());
        table.set(TweenTarget::live(ElementKey::ShowMore), node);
        let order: Vec<bool> = table.snapshot().iter().map(|(t, _)| t.ghost).collect();
        assert_eq!(order, [false, true]);
    }
}
