// End-to-end: JSON trace → engine → painted terminal buffer

use envdiagram::diagram::{ElementKey, ValueKind};
use envdiagram::engine::Engine;
use envdiagram::snapshot::StepHistory;
use envdiagram::trace::{Trace, TraceError};
use envdiagram::ui::canvas::Canvas;
use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

const TRACE: &str = r#"{
  "language_level": 2,
  "config": { "truncation_limit": 4, "animate": false },
  "steps": [
    {
      "heap": {
        "1": { "kind": "array", "elements": [1, { "ref": 1 }] },
        "2": { "kind": "builtin", "name": "display" }
      },
      "scopes": [
        { "id": 0, "name": "global", "kind": "global",
          "bindings": [{ "name": "display", "value": { "ref": 2 }, "constant": true }] },
        { "id": 5, "name": "program", "kind": "program", "parent": 0 },
        { "id": 6, "name": "main", "kind": "block", "parent": 5,
          "bindings": [
            { "name": "p", "value": { "ref": 1 }, "constant": true },
            { "name": "later", "value": { "special": "unassigned" } }
          ] }
      ],
      "control": [{ "tag": "Pop", "source": { "start_line": 2, "end_line": 2 } }],
      "stash": [{ "value": 42 }]
    },
    {
      "scopes": [
        { "id": 0, "name": "global", "kind": "global" },
        { "id": 5, "name": "program", "kind": "program", "parent": 0,
          "bindings": [{ "name": "p", "value": "done", "constant": true }] }
      ]
    }
  ]
}"#;

fn buffer_text(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut text = String::new();
    for y in 0..area.height {
        for x in 0..area.width {
            text.push_str(buffer.cell((x, y)).map_or(" ", |c| c.symbol()));
        }
        text.push('\n');
    }
    text
}

#[test]
fn trace_loads_with_its_config() {
    let trace = Trace::from_json(TRACE).unwrap();
    assert_eq!(trace.language_level, 2);
    assert_eq!(trace.config.truncation_limit, 4);
    assert!(!trace.config.animate);
    assert_eq!(trace.machine_states().unwrap().len(), 2);
}

#[test]
fn trace_steps_fit_in_history() {
    let trace = Trace::from_json(TRACE).unwrap();
    let mut history = StepHistory::new(1024 * 1024);
    for state in trace.machine_states().unwrap() {
        history.push(state).unwrap();
    }
    assert_eq!(history.len(), 2);
    assert!(history.memory_usage() > 0);
}

#[test]
fn traced_pair_cycle_is_drawn() {
    let trace = Trace::from_json(TRACE).unwrap();
    let states = trace.machine_states().unwrap();
    let mut engine = Engine::new(trace.config);
    engine.on_display(|_| {});
    assert!(engine.ingest(&states[0], trace.language_level).unwrap().is_none());
    let scene = engine.draw().unwrap();

    let snapshot = engine.snapshot().unwrap();
    let p = snapshot
        .graph
        .bindings
        .iter()
        .find(|b| b.name == "p")
        .map(|b| b.value)
        .unwrap();
    assert!(matches!(
        snapshot.graph.values.get(p).kind,
        ValueKind::Array { pair: true, .. }
    ));
    // The unused library binding is gone
    assert!(snapshot.graph.bindings.iter().all(|b| b.name != "display"));
    assert_eq!(scene.count(ElementKey::Value(p)), 1);
    assert_eq!(scene.text(ElementKey::StashItem(0)), Some("42"));
}

#[test]
fn canvas_paints_frames_and_stacks() {
    let trace = Trace::from_json(TRACE).unwrap();
    let states = trace.machine_states().unwrap();
    let mut engine = Engine::new(trace.config);
    engine.on_display(|_| {});
    engine.resize(80, 20);
    engine.ingest(&states[0], trace.language_level).unwrap();
    let scene = engine.draw().unwrap();

    let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
    terminal
        .draw(|frame| frame.render_widget(Canvas::new(&scene), frame.area()))
        .unwrap();
    let text = buffer_text(terminal.backend().buffer());

    assert!(text.contains("main"));
    assert!(text.contains("later"));
    assert!(text.contains("unassigned"));
    assert!(text.contains("Control"));
    assert!(text.contains("Stash"));
    assert!(text.contains("42"));
    assert!(text.contains('┌'));
}

#[test]
fn finished_program_reports_empty_control() {
    let trace = Trace::from_json(TRACE).unwrap();
    let states = trace.machine_states().unwrap();
    let mut engine = Engine::new(trace.config);
    engine.on_display(|_| {});

    engine.ingest(&states[0], 2).unwrap();
    assert!(!engine.is_control_empty());
    engine.ingest(&states[1], 2).unwrap();
    assert!(engine.is_control_empty());
}

#[test]
fn malformed_trace_is_an_error() {
    assert!(matches!(
        Trace::from_json("{ \"steps\": 3 }"),
        Err(TraceError::Json(_))
    ));
}
