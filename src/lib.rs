//! # Introduction
//!
//! envdiagram draws environment diagrams of a running program, one machine step at a
//! time: frames with their bindings, the heap values they reference (arrays, pairs,
//! closures, library functions), and the control and stash stacks of the evaluator.
//! Steps are browsed forward and backward in a terminal UI built with
//! [ratatui](https://docs.rs/ratatui), with short animations between steps.
//!
//! ## Pipeline
//!
//! ```text
//! Trace → MachineState → IngestedState → DiagramSnapshot → Scene → TUI
//! ```
//!
//! 1. [`trace`]: loads a recorded JSON trace into [`machine::MachineState`]s.
//! 2. [`machine`]: the raw evaluator state: scope tree, values, control and stash.
//! 3. [`snapshot`]: copies the state into an owned heap, collapses the prelude frame
//!    and prunes unreferenced globals.
//! 4. [`diagram`]: builds frames, bindings and deduplicated values, elects main
//!    references, lays everything out and routes arrows into a [`diagram::Scene`].
//! 5. [`engine`]: the per-step lifecycle: ingest, cached draws per display mode,
//!    hover highlighting.
//! 6. [`animation`]: tweens between consecutive steps.
//! 7. [`ui`]: the terminal front end; not part of the stable library API.
//!
//! Scene colors come from [`theme`], picked by the [`config::Palette`] of the display mode.

pub mod animation;
pub mod config;
pub mod diagram;
pub mod engine;
pub mod machine;
pub mod snapshot;
pub mod theme;
pub mod trace;
pub mod ui;
