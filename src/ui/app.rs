//! Main TUI application state and logic

use crate::animation::AnimationRun;
use crate::config::DisplayMode;
use crate::diagram::Point;
use crate::engine::Engine;
use crate::machine::SourceSpan;
use crate::snapshot::StepHistory;
use crate::ui::canvas::Canvas;
use crate::ui::status::{render_status_bar, StatusInfo};
use crate::theme::Theme;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind,
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders},
    Frame, Terminal,
};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::warn;

/// The main application state
pub struct App {
    /// Recorded machine steps
    pub history: StepHistory,

    /// Diagram engine for the current step
    pub engine: Engine,

    pub language_level: u8,

    /// Index of the step currently shown
    pub position: usize,

    /// Scroll offset of the diagram, in scene cells
    pub scroll: Point,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Play step transitions as animations
    pub animate: bool,

    /// Last time a step was taken in play mode
    pub last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    pub last_space_press: Instant,

    /// Source lines of the hovered stack item
    highlighted: Rc<RefCell<Vec<SourceSpan>>>,

    animation: Option<AnimationRun>,
    canvas_area: Rect,
}

impl App {
    /// Create a new app over a recorded history and show its first step
    pub fn new(history: StepHistory, mut engine: Engine, language_level: u8) -> Self {
        let highlighted = Rc::new(RefCell::new(Vec::new()));
        let sink = highlighted.clone();
        engine.on_source_highlight(move |spans| *sink.borrow_mut() = spans.to_vec());
        engine.on_display(|_| {});
        let animate = engine.config().animate;

        let mut app = App {
            history,
            engine,
            language_level,
            position: 0,
            scroll: Point::default(),
            should_quit: false,
            status_message: String::from("Ready!"),
            is_playing: false,
            animate,
            last_play_time: Instant::now(),
            last_space_press: Instant::now()
                .checked_sub(Duration::from_secs(1))
                .unwrap_or(Instant::now()),
            highlighted,
            animation: None,
            canvas_area: Rect::default(),
        };
        app.show(0);
        app
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        // Tweens are timer-driven and single-threaded
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let local = tokio::task::LocalSet::new();
        let frame = Duration::from_millis(self.engine.config().tween.frame_ms.max(1));

        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            // Advance the running animation by one frame
            if let Some(run) = self.animation.as_mut() {
                let finished = local.block_on(&runtime, async {
                    tokio::select! {
                        outcome = run => Some(outcome),
                        _ = tokio::time::sleep(frame) => None,
                    }
                });
                if finished.is_some() {
                    self.animation = None;
                }
            }

            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_secs(1) {
                if self.position + 1 < self.history.len() {
                    self.show(self.position + 1);
                    self.status_message = "Playing...".to_string();
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            let timeout = if self.animation.is_some() {
                Duration::ZERO
            } else {
                Duration::from_millis(50)
            };
            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_key_event(key)
                    }
                    Event::Mouse(mouse) => self.handle_mouse_event(mouse),
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let theme = Theme::for_palette(self.engine.mode().palette);
        let title = match self.highlighted.borrow().first() {
            Some(span) if span.start_line == span.end_line => {
                format!(" Environment │ line {} ", span.start_line)
            }
            Some(span) => format!(" Environment │ lines {}-{} ", span.start_line, span.end_line),
            None => " Environment ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.comment))
            .title(title)
            .title_style(Style::default().fg(theme.primary))
            .style(Style::default().bg(theme.bg));
        let inner = block.inner(chunks[0]);
        frame.render_widget(block, chunks[0]);
        self.canvas_area = inner;

        self.engine.resize(inner.width as i32, inner.height as i32);
        match self.engine.draw() {
            Ok(scene) => {
                self.scroll.x = self
                    .scroll
                    .x
                    .clamp(0, (scene.width - inner.width as i32).max(0));
                self.scroll.y = self
                    .scroll
                    .y
                    .clamp(0, (scene.height - inner.height as i32).max(0));
                let overlay = self.engine.animation_overlay();
                let canvas = Canvas::new(&scene)
                    .overlay(&overlay)
                    .offset(self.scroll)
                    .highlight(self.engine.hovered_key(), theme.highlight_bg);
                frame.render_widget(canvas, inner);
            }
            Err(err) => {
                self.status_message = err.to_string();
            }
        }

        let info = StatusInfo {
            message: &self.status_message,
            current_step: self.position,
            total_steps: self.history.len(),
            is_playing: self.is_playing,
            is_done: self.engine.is_control_empty(),
            animate: self.animate,
        };
        render_status_bar(frame, chunks[1], info, theme);
    }

    /// Handle keyboard events
    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c as usize - '0' as usize;
                let target = (self.position + n).min(self.history.len().saturating_sub(1));
                let stepped = target - self.position;
                self.show(target);
                self.status_message = format!("Stepped forward {} step(s)", stepped);
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.step_backward();
            }
            KeyCode::Right => {
                self.is_playing = false;
                self.step_forward();
            }
            KeyCode::Up | KeyCode::Char('k') => self.scroll.y = (self.scroll.y - 1).max(0),
            KeyCode::Down | KeyCode::Char('j') => self.scroll.y += 1,
            KeyCode::Char('h') => self.scroll.x = (self.scroll.x - 2).max(0),
            KeyCode::Char('l') => self.scroll.x += 2,
            KeyCode::Char(' ') => {
                // Toggle auto-play mode (with 200ms debounce to prevent key repeat spam)
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        self.last_play_time = Instant::now()
                            .checked_sub(Duration::from_secs(1))
                            .unwrap_or(Instant::now());
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::Char('t') => {
                let mode = self.engine.mode();
                self.switch_mode(DisplayMode {
                    truncated: !mode.truncated,
                    ..mode
                });
            }
            KeyCode::Char('s') => {
                let mode = self.engine.mode();
                self.switch_mode(DisplayMode {
                    stacks_visible: !mode.stacks_visible,
                    ..mode
                });
            }
            KeyCode::Char('p') => {
                let mode = self.engine.mode();
                self.switch_mode(DisplayMode {
                    palette: mode.palette.toggle(),
                    ..mode
                });
            }
            KeyCode::Char('m') => {
                if let Err(err) = self.engine.activate_show_more() {
                    self.status_message = err.to_string();
                }
            }
            KeyCode::Char('a') => {
                self.animate = !self.animate;
                if !self.animate {
                    self.finish_animation();
                }
                self.status_message =
                    format!("Animations {}", if self.animate { "on" } else { "off" });
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.show(self.history.len().saturating_sub(1));
                self.status_message = "Jumped to end".to_string();
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                self.show(0);
                self.status_message = "Jumped to start".to_string();
            }
            _ => {}
        }
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Moved {
            return;
        }
        let area = self.canvas_area;
        let inside = mouse.column >= area.x
            && mouse.column < area.x + area.width
            && mouse.row >= area.y
            && mouse.row < area.y + area.height;
        // Outside the canvas counts as hovering nothing
        let point = if inside {
            Point::new(
                (mouse.column - area.x) as i32 + self.scroll.x,
                (mouse.row - area.y) as i32 + self.scroll.y,
            )
        } else {
            Point::new(-1, -1)
        };
        self.engine.hover(point);
    }

    fn switch_mode(&mut self, mode: DisplayMode) {
        self.engine.set_display_mode(mode);
        self.status_message = format!(
            "{:?} palette, {}, stacks {}",
            mode.palette,
            if mode.truncated { "truncated" } else { "full" },
            if mode.stacks_visible { "shown" } else { "hidden" }
        );
    }

    /// Step forward in execution
    fn step_forward(&mut self) {
        if self.position + 1 >= self.history.len() {
            self.status_message = "Cannot step forward: already at the last step".to_string();
            return;
        }
        self.show(self.position + 1);
        self.status_message = "Stepped forward".to_string();
    }

    /// Step backward in execution
    fn step_backward(&mut self) {
        if self.position == 0 {
            self.status_message = "Cannot step backward: already at the first step".to_string();
            return;
        }
        self.show(self.position - 1);
        // Transitions only animate forward
        self.finish_animation();
        self.status_message = "Stepped backward".to_string();
    }

    fn finish_animation(&mut self) {
        self.engine.skip_animation();
        self.animation = None;
    }

    /// Ingest the step at `index` and keep its animation, if any
    fn show(&mut self, index: usize) {
        let Some(state) = self.history.get(index) else {
            return;
        };
        self.highlighted.borrow_mut().clear();
        match self.engine.ingest(state, self.language_level) {
            Ok(run) => {
                self.position = index;
                self.animation = run.filter(|_| self.animate);
                if self.animation.is_none() {
                    self.engine.skip_animation();
                }
            }
            Err(err) => {
                warn!(%err, step = index, "failed to ingest step");
                self.status_message = format!("Error: {}", err);
            }
        }
    }
}
