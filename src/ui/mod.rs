//! Terminal user interface built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! - **[`app`]**: application state, keyboard and mouse event loop, step playback
//! - **[`canvas`]**: paints a [`Scene`](crate::diagram::Scene) and its animation overlay
//! - **[`status`]**: the status bar
//!
//! The entry point is [`App`]: construct it with a [`StepHistory`] and an [`Engine`]
//! and call [`App::run`] to start the event loop.
//!
//! [`StepHistory`]: crate::snapshot::StepHistory
//! [`Engine`]: crate::engine::Engine
//! [`App::run`]: app::App::run

pub mod app;
pub mod canvas;
pub mod status;

pub use app::App;
