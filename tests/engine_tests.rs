// Integration tests for the engine lifecycle: caching, state machine, hover, animations

use envdiagram::animation::{AnimationOutcome, InstructionClass};
use envdiagram::config::{DisplayMode, EngineConfig, Palette};
use envdiagram::diagram::{DiagramSnapshot, ElementKey, Point, Scene, SceneNode, Shape};
use envdiagram::engine::{DiagramError, Engine, EngineState};
use envdiagram::machine::{
    ControlEntry, MachineState, RawValue, ScopeKind, ScopeTree, SourceSpan, StashEntry,
};
use envdiagram::snapshot::{ingest_state, IngestOptions};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

fn step(control: &[&str], stash: &[f64]) -> MachineState {
    let mut tree = ScopeTree::new("global");
    let program = tree.add_scope(tree.root(), "program", ScopeKind::Program);
    let block = tree.add_scope(program, "main", ScopeKind::Block);
    tree.bind(block, "x", RawValue::Number(1.0), true);
    let mut state = MachineState::new(tree);
    state.control = control.iter().map(|tag| ControlEntry::new(tag)).collect();
    state.stash = stash
        .iter()
        .map(|n| StashEntry::new(RawValue::Number(*n)))
        .collect();
    state
}

fn engine() -> Engine {
    let mut engine = Engine::new(EngineConfig::default());
    engine.on_display(|_| {});
    engine
}

/// First point of every arrow in the scene
fn arrow_starts(scene: &Scene) -> Vec<Point> {
    scene
        .nodes
        .iter()
        .filter_map(|n| match &n.shape {
            Shape::Arrow { points } => points.first().copied(),
            _ => None,
        })
        .collect()
}

fn stash_nodes(nodes: &[SceneNode]) -> Vec<SceneNode> {
    nodes
        .iter()
        .filter(|n| matches!(n.key, ElementKey::StashItem(_)))
        .cloned()
        .collect()
}

#[test]
fn draw_twice_hits_the_cache() {
    let mut engine = engine();
    engine.ingest(&step(&["Pop"], &[1.0]), 3).unwrap();

    let first = engine.draw().unwrap();
    let second = engine.draw().unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
    assert_eq!(engine.cache().misses(), 1);
    assert_eq!(engine.cache().hits(), 1);
}

#[test]
fn display_callback_is_required() {
    let mut engine = Engine::new(EngineConfig::default());
    let err = engine.ingest(&step(&[], &[]), 3).unwrap_err();
    assert!(matches!(
        err,
        DiagramError::NotInitialized {
            state: EngineState::Uninitialized,
            ..
        }
    ));
    assert!(engine.draw().is_err());
}

#[test]
fn draw_before_ingest_is_rejected() {
    let mut engine = engine();
    assert!(matches!(
        engine.draw(),
        Err(DiagramError::NotInitialized { .. })
    ));
}

#[test]
fn display_callback_receives_each_draw() {
    let drawn = Rc::new(RefCell::new(0));
    let counter = drawn.clone();
    let mut engine = Engine::new(EngineConfig::default());
    engine.on_display(move |_| *counter.borrow_mut() += 1);
    engine.ingest(&step(&[], &[]), 3).unwrap();
    engine.draw().unwrap();
    engine.draw().unwrap();
    assert_eq!(*drawn.borrow(), 2);
}

#[test]
fn state_machine_transitions() {
    let mut engine = engine();
    assert_eq!(engine.state(), EngineState::Uninitialized);

    engine.ingest(&step(&["Pop"], &[]), 3).unwrap();
    assert_eq!(engine.state(), EngineState::Ready);

    // Same mode again is not a change
    engine.set_display_mode(DisplayMode::default());
    assert_eq!(engine.state(), EngineState::Ready);

    engine.set_display_mode(DisplayMode {
        palette: Palette::Light,
        ..DisplayMode::default()
    });
    assert_eq!(engine.state(), EngineState::Stale);
    engine.draw().unwrap();
    assert_eq!(engine.state(), EngineState::Ready);

    engine.resize(120, 40);
    assert_eq!(engine.state(), EngineState::Stale);
    assert!(engine.cache().is_empty());
    engine.draw().unwrap();
    assert_eq!(engine.state(), EngineState::Ready);

    engine.clear();
    assert_eq!(engine.state(), EngineState::Uninitialized);
    assert!(engine.draw().is_err());
    assert!(engine.is_control_empty());
}

#[test]
fn modes_are_cached_separately() {
    let mut engine = engine();
    engine.ingest(&step(&["Pop"], &[1.0]), 3).unwrap();
    let dark = engine.draw().unwrap();
    let light = engine
        .draw_with(DisplayMode {
            palette: Palette::Light,
            ..DisplayMode::default()
        })
        .unwrap();
    assert_ne!(dark.background, light.background);
    assert_eq!(engine.cache().len(), 2);

    let again = engine.draw().unwrap();
    assert!(Rc::ptr_eq(&dark, &again));
}

#[test]
fn show_more_toggles_truncation() {
    let mut engine = engine();
    let tags: Vec<&str> = std::iter::repeat("Pop").take(15).collect();
    engine.ingest(&step(&tags, &[]), 3).unwrap();
    engine.set_display_mode(DisplayMode {
        truncated: true,
        ..DisplayMode::default()
    });
    let truncated = engine.draw().unwrap();
    assert_eq!(truncated.count(ElementKey::ShowMore), 1);

    let full = engine.activate_show_more().unwrap();
    assert!(!engine.mode().truncated);
    assert_eq!(full.count(ElementKey::ShowMore), 0);
    assert!(full.node(ElementKey::ControlItem(0)).is_some());
}

#[test]
fn stack_arrows_follow_the_columns_on_resize() {
    let mut tree = ScopeTree::new("global");
    let program = tree.add_scope(tree.root(), "program", ScopeKind::Program);
    let block = tree.add_scope(program, "block", ScopeKind::Block);
    let xs = RawValue::array(vec![RawValue::Number(1.0), RawValue::Number(2.0)], None);
    tree.bind(block, "xs", xs.clone(), true);
    let mut state = MachineState::new(tree);
    state.control.push(ControlEntry::new("Pop").with_value(xs));

    let mut engine = engine();
    engine.ingest(&state, 3).unwrap();
    let narrow = engine.draw().unwrap();
    let before = narrow.bounds(ElementKey::ControlItem(0)).unwrap();
    let old_start = Point::new(before.x - 1, before.mid_y());
    assert!(arrow_starts(&narrow).contains(&old_start));

    engine.resize(200, 40);
    let wide = engine.draw().unwrap();
    let after = wide.bounds(ElementKey::ControlItem(0)).unwrap();
    assert!(after.x > before.x);

    let starts = arrow_starts(&wide);
    assert!(starts.contains(&Point::new(after.x - 1, after.mid_y())));
    assert!(!starts.contains(&old_start));
}

#[test]
fn hover_emits_spans_on_enter_and_leave() {
    let spans: Rc<RefCell<Vec<Vec<SourceSpan>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = spans.clone();
    let mut engine = engine();
    engine.on_source_highlight(move |ranges| sink.borrow_mut().push(ranges.to_vec()));

    let mut state = step(&[], &[]);
    state
        .control
        .push(ControlEntry::new("Pop").with_source(SourceSpan::new(3, 4)));
    engine.ingest(&state, 3).unwrap();
    let scene = engine.draw().unwrap();

    let item = scene
        .bounds(ElementKey::ControlItem(0))
        .expect("control item drawn");
    let inside = Point::new(item.x, item.y);

    engine.hover(inside);
    engine.hover(inside);
    assert_eq!(engine.hovered_key(), Some(ElementKey::ControlItem(0)));
    engine.hover(Point::new(-5, -5));

    assert_eq!(
        *spans.borrow(),
        vec![vec![SourceSpan::new(3, 4)], Vec::new()]
    );
    assert_eq!(engine.hovered_key(), None);
}

#[test]
fn instructions_without_source_do_not_highlight() {
    let spans = Rc::new(RefCell::new(0));
    let sink = spans.clone();
    let mut engine = engine();
    engine.on_source_highlight(move |_| *sink.borrow_mut() += 1);

    engine.ingest(&step(&["Pop"], &[]), 3).unwrap();
    let scene = engine.draw().unwrap();
    let item = scene.bounds(ElementKey::ControlItem(0)).unwrap();
    engine.hover(Point::new(item.x, item.y));
    assert_eq!(*spans.borrow(), 0);
}

#[test]
fn first_ingest_has_nothing_to_animate() {
    let mut engine = engine();
    assert!(engine.ingest(&step(&["Pop"], &[1.0]), 3).unwrap().is_none());
    assert!(!engine.is_animating());
}

#[test]
fn disabled_animations_never_start() {
    let mut engine = Engine::new(EngineConfig {
        animate: false,
        ..EngineConfig::default()
    });
    engine.on_display(|_| {});
    engine.ingest(&step(&["Pop"], &[1.0, 2.0]), 3).unwrap();
    engine.draw().unwrap();
    assert!(engine.ingest(&step(&[], &[1.0]), 3).unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn pop_step_animates_then_settles() {
    let mut engine = engine();
    engine.ingest(&step(&["Pop"], &[1.0, 2.0]), 3).unwrap();
    engine.draw().unwrap();

    let next = step(&[], &[1.0]);
    let run = engine
        .ingest(&next, 3)
        .unwrap()
        .expect("a pop step animates");
    assert_eq!(run.class(), InstructionClass::Pop);
    assert!(!run.is_empty());
    assert!(engine.is_animating());

    assert_eq!(run.await, AnimationOutcome::Completed);
    assert!(!engine.is_animating());
    assert!(engine.animation_overlay().is_empty());

    // The settled scene shows exactly what a fresh render of the new step shows
    let scene = engine.draw().unwrap();
    let config = EngineConfig::default();
    let ingested = ingest_state(&next, 3, IngestOptions::default());
    let fresh = DiagramSnapshot::build(&ingested, &config.layout);
    let (expected, _) = fresh.render(
        DisplayMode::default(),
        config.truncation_limit,
        0,
        &config.layout,
    );
    assert_eq!(stash_nodes(&scene.nodes), stash_nodes(&expected.nodes));
    assert_eq!(stash_nodes(&scene.nodes).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn new_ingest_cancels_running_animation() {
    let mut engine = engine();
    engine.ingest(&step(&["Pop"], &[1.0, 2.0]), 3).unwrap();
    engine.draw().unwrap();
    let mut run = engine
        .ingest(&step(&["Pop"], &[1.0]), 3)
        .unwrap()
        .expect("a pop step animates");

    tokio::select! {
        _ = &mut run => panic!("animation should still be running"),
        _ = tokio::time::sleep(Duration::from_millis(50)) => {}
    }
    assert!(!engine.animation_overlay().is_empty());

    let follow_up = engine.ingest(&step(&[], &[]), 3).unwrap();
    assert_eq!(run.await, AnimationOutcome::Cancelled);
    let follow_up = follow_up.expect("the second pop animates too");
    assert_eq!(follow_up.class(), InstructionClass::Pop);
    assert_eq!(follow_up.await, AnimationOutcome::Completed);
    assert!(engine.animation_overlay().is_empty());
}
