// envdiagram: step-by-step environment diagrams in the terminal

use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

use envdiagram::engine::Engine;
use envdiagram::snapshot::StepHistory;
use envdiagram::trace::Trace;
use envdiagram::ui::App;

/// Where logs go while the TUI owns the terminal: `$ENVDIAGRAM_LOG`, else the temp dir
fn log_path(configured: Option<OsString>) -> PathBuf {
    match configured {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => std::env::temp_dir().join("envdiagram.log"),
    }
}

fn log_writer(path: &Path) -> BoxMakeWriter {
    match File::create(path) {
        Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
        // Writing to the screen would corrupt the alternate screen
        Err(_) => BoxMakeWriter::new(io::sink),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_file = log_path(std::env::var_os("ENVDIAGRAM_LOG"));
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(log_writer(&log_file))
        .with_ansi(false)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("envdiagram");

    if args.len() < 2 {
        eprintln!("Error: No trace file provided");
        eprintln!();
        eprintln!("Usage: {} <trace.json>", program_name);
        eprintln!();
        eprintln!("A trace is a JSON document with one entry per machine step:");
        eprintln!("  {{ \"language_level\": 2, \"steps\": [ {{ \"scopes\": [...], \"heap\": {{...}}, \"control\": [...], \"stash\": [...] }} ] }}");
        std::process::exit(1);
    }

    let trace_file = &args[1];
    if !Path::new(trace_file).exists() {
        eprintln!("Error: File '{}' not found", trace_file);
        eprintln!("Usage: {} <trace.json>", program_name);
        std::process::exit(1);
    }

    eprintln!("Loading {}...", trace_file);
    let trace = match Trace::load(trace_file) {
        Ok(trace) => trace,
        Err(e) => {
            eprintln!("Trace error: {}", e);
            std::process::exit(1);
        }
    };

    let states = match trace.machine_states() {
        Ok(states) => states,
        Err(e) => {
            eprintln!("Trace error: {}", e);
            std::process::exit(1);
        }
    };
    if states.is_empty() {
        eprintln!("Error: trace contains no steps");
        std::process::exit(1);
    }

    // Step history with a memory limit (1 GB)
    let mut history = StepHistory::new(1024 * 1024 * 1024);
    for state in states {
        if let Err(e) = history.push(state) {
            eprintln!("Warning: {}; keeping the first {} steps", e, history.len());
            break;
        }
    }
    eprintln!(
        "Loaded {} steps (language level {}).",
        history.len(),
        trace.language_level
    );
    eprintln!("Logging to {}", log_file.display());

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let engine = Engine::new(trace.config);
    let mut app = App::new(history, engine, trace.language_level);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
