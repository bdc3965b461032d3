// Step classification and tween synthesis

use super::tween::{Pose, Tween, TweenTarget};
use crate::config::TweenConfig;
use crate::diagram::{DiagramSnapshot, ElementKey, InstrTag, Scene};
use std::time::Duration;

/// What the instruction consumed between two steps looks like on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionClass {
    Literal,
    Block,
    UnaryOp,
    BinaryOp,
    Pop,
    None,
}

/// Classify the instruction on top of the previous step's control stack
pub fn classify_step(previous: &DiagramSnapshot) -> InstructionClass {
    match previous.control.last().and_then(|item| item.instr) {
        Some(InstrTag::Literal) => InstructionClass::Literal,
        Some(InstrTag::Block | InstrTag::Sequence) => InstructionClass::Block,
        Some(InstrTag::UnaryOp) => InstructionClass::UnaryOp,
        Some(InstrTag::BinaryOp) => InstructionClass::BinaryOp,
        Some(InstrTag::Pop) => InstructionClass::Pop,
        _ => InstructionClass::None,
    }
}

/// Both renders of a step transition
pub struct StepPair<'a> {
    pub prev: &'a DiagramSnapshot,
    pub prev_scene: &'a Scene,
    pub next: &'a DiagramSnapshot,
    pub next_scene: &'a Scene,
}

struct Builder<'a> {
    pair: &'a StepPair<'a>,
    duration: Duration,
    config: TweenConfig,
    tweens: Vec<Tween>,
}

impl Builder<'_> {
    fn push(&mut self, target: TweenTarget, node_scene: &Scene, from: Option<Pose>, to: Option<Pose>) {
        let node = node_scene.node(target.key).cloned();
        let (from, to) = match (node.is_some(), from, to) {
            (true, Some(from), Some(to)) => (Some(from), to),
            // Missing endpoints turn the tween into a no-op
            (_, _, to) => (None, to.unwrap_or(Pose::hidden())),
        };
        self.tweens.push(Tween {
            target,
            node,
            from,
            to,
            duration: self.duration,
            easing: self.config.easing,
        });
    }

    /// A live element of the new scene travelling from where `from_key` was drawn
    fn travel(&mut self, key: ElementKey, from_key: ElementKey) {
        let from = self.pair.prev_scene.bounds(from_key).map(Pose::shown);
        let to = self.pair.next_scene.bounds(key).map(Pose::shown);
        self.push(TweenTarget::live(key), self.pair.next_scene, from, to);
    }

    /// A live element of the new scene fading in where it is
    fn fade_in(&mut self, key: ElementKey) {
        let rect = self.pair.next_scene.bounds(key);
        let from = rect.map(|r| Pose::new(r, 0.0));
        let to = rect.map(Pose::shown);
        self.push(TweenTarget::live(key), self.pair.next_scene, from, to);
    }

    /// A copy of an old element fading out, shifted by `(dx, dy)` on the way
    fn fade_out(&mut self, key: ElementKey, dx: i32, dy: i32) {
        let rect = self.pair.prev_scene.bounds(key);
        let from = rect.map(Pose::shown);
        let to = rect.map(|r| Pose::new(r.translate(dx, dy), 0.0));
        self.push(TweenTarget::ghost(key), self.pair.prev_scene, from, to);
    }

    /// A copy of an old element moving onto another old element while fading out
    fn converge(&mut self, key: ElementKey, onto: ElementKey) {
        let rect = self.pair.prev_scene.bounds(key);
        let from = rect.map(Pose::shown);
        let to = match (rect, self.pair.prev_scene.bounds(onto)) {
            (Some(r), Some(o)) => Some(Pose::new(r.translate(o.x - r.x, o.y - r.y), 0.0)),
            _ => None,
        };
        self.push(TweenTarget::ghost(key), self.pair.prev_scene, from, to);
    }
}

/// Ordered tween set animating one step; empty for [`InstructionClass::None`]
pub fn synthesize(class: InstructionClass, pair: &StepPair, config: &TweenConfig) -> Vec<Tween> {
    let mut b = Builder {
        pair,
        duration: Duration::from_millis(config.duration_ms),
        config: *config,
        tweens: Vec::new(),
    };

    let prev_control = pair.prev.control.len();
    let prev_stash = pair.prev.stash.len();
    let next_control = pair.next.control.len();
    let next_stash = pair.next.stash.len();
    let Some(instr) = prev_control.checked_sub(1).map(ElementKey::ControlItem) else {
        return Vec::new();
    };

    match class {
        InstructionClass::None => return Vec::new(),
        InstructionClass::Literal => {
            if let Some(top) = next_stash.checked_sub(1) {
                b.travel(ElementKey::StashItem(top), instr);
            }
            b.fade_out(instr, 0, 0);
        }
        InstructionClass::Block => {
            b.fade_out(instr, 0, 0);
            for index in prev_control - 1..next_control {
                b.fade_in(ElementKey::ControlItem(index));
            }
        }
        InstructionClass::UnaryOp | InstructionClass::BinaryOp => {
            let operands = if class == InstructionClass::UnaryOp { 1 } else { 2 };
            for offset in 1..=operands.min(prev_stash) {
                b.converge(ElementKey::StashItem(prev_stash - offset), instr);
            }
            b.fade_out(instr, 0, 0);
            if let Some(top) = next_stash.checked_sub(1) {
                b.fade_in(ElementKey::StashItem(top));
            }
        }
        InstructionClass::Pop => {
            if let Some(top) = prev_stash.checked_sub(1) {
                b.fade_out(ElementKey::StashItem(top), 0, -1);
            }
            b.fade_out(instr, 0, 0);
        }
    }

    b.tweens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisplayMode, LayoutConfig};
    use crate::machine::{ControlEntry, MachineState, RawValue, ScopeTree, StashEntry};
    use crate::snapshot::{ingest_state, IngestOptions};

    fn step(control: &[&str], stash: &[f64]) -> (DiagramSnapshot, Scene) {
        let mut state = MachineState::new(ScopeTree::new("global"));
        state.control = control.iter().map(|tag| ControlEntry::new(tag)).collect();
        state.stash = stash
            .iter()
            .map(|n| StashEntry::new(RawValue::Number(*n)))
            .collect();
        let config = LayoutConfig::default();
        let ingested = ingest_state(&state, 3, IngestOptions::default());
        let snapshot = DiagramSnapshot::build(&ingested, &config);
        let (scene, _) = snapshot.render(DisplayMode::default(), 10, 80, &config);
        (snapshot, scene)
    }

    #[test]
    fn top_of_control_decides_the_class() {
        assert_eq!(classify_step(&step(&["Literal", "Pop"], &[]).0), InstructionClass::Pop);
        assert_eq!(classify_step(&step(&["Pop", "Sequence"], &[]).0), InstructionClass::Block);
        assert_eq!(classify_step(&step(&["Pop", "Assign"], &[]).0), InstructionClass::None);
        assert_eq!(classify_step(&step(&["Frobnicate"], &[]).0), InstructionClass::None);
        assert_eq!(classify_step(&step(&[], &[1.0]).0), InstructionClass::None);
    }

    #[test]
    fn pop_fades_the_old_stash_top_upwards() {
        let (prev, prev_scene) = step(&["Pop"], &[1.0, 2.0]);
        let (next, next_scene) = step(&[], &[1.0]);
        let pair = StepPair {
            prev: &prev,
            prev_scene: &prev_scene,
            next: &next,
            next_scene: &next_scene,
        };
        let tweens = synthesize(InstructionClass::Pop, &pair, &TweenConfig::default());

        assert_eq!(tweens.len(), 2);
        let popped = &tweens[0];
        assert_eq!(popped.target, TweenTarget::ghost(ElementKey::StashItem(1)));
        let from = popped.from.expect("stash top was drawn");
        assert_eq!(popped.to.rect.y, from.rect.y - 1);
        assert_eq!(popped.to.opacity, 0.0);
        assert_eq!(tweens[1].target, TweenTarget::ghost(ElementKey::ControlItem(0)));
    }

    #[test]
    fn binary_op_converges_both_operands() {
        let (prev, prev_scene) = step(&["BinaryOp"], &[1.0, 2.0]);
        let (next, next_scene) = step(&[], &[3.0]);
        let pair = StepPair {
            prev: &prev,
            prev_scene: &prev_scene,
            next: &next,
            next_scene: &next_scene,
        };
        let tweens = synthesize(InstructionClass::BinaryOp, &pair, &TweenConfig::default());

        let targets: Vec<_> = tweens.iter().map(|t| t.target).collect();
        assert_eq!(
            targets,
            [
                TweenTarget::ghost(ElementKey::StashItem(1)),
                TweenTarget::ghost(ElementKey::StashItem(0)),
                TweenTarget::ghost(ElementKey::ControlItem(0)),
                TweenTarget::live(ElementKey::StashItem(0)),
            ]
        );
        let instr = prev_scene.bounds(ElementKey::ControlItem(0)).unwrap();
        assert_eq!((tweens[0].to.rect.x, tweens[0].to.rect.y), (instr.x, instr.y));
    }

    #[test]
    fn stash_item_missing_from_old_scene_does_not_move() {
        let (prev, prev_scene) = step(&["Literal"], &[]);
        let (next, next_scene) = step(&[], &[7.0]);
        let hidden = DisplayMode {
            stacks_visible: false,
            ..DisplayMode::default()
        };
        let (prev_hidden, _) = prev.render(hidden, 10, 80, &LayoutConfig::default());
        let pair = StepPair {
            prev: &prev,
            prev_scene: &prev_hidden,
            next: &next,
            next_scene: &next_scene,
        };
        let tweens = synthesize(InstructionClass::Literal, &pair, &TweenConfig::default());
        assert_eq!(tweens[0].target, TweenTarget::live(ElementKey::StashItem(0)));
        assert!(tweens[0].from.is_none());
        assert!(prev_scene.node(ElementKey::ControlItem(0)).is_some());
    }
}
