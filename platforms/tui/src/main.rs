mod app;

use action::Action;
use app::App;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use std::{error::Error, fs, io};
use tracing_subscriber::EnvFilter;
use turing_sim::{ControllerConfig, PresetLoader};

/// A Turing machine simulator with a Terminal User Interface.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
  turing-sim-tui presets/palindrome.tm
  cat machine.tm | turing-sim-tui
  RUST_LOG=debug turing-sim-tui --log-file run.log")]
struct Cli {
    /// Path to a preset file (.tm or .json).
    /// If not provided, the built-in presets are loaded.
    /// Preset text can also be piped via stdin.
    preset_file: Option<PathBuf>,

    /// Milliseconds between automatic steps.
    #[arg(long, env = "TURING_SIM_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Pause automatically after this many steps.
    #[arg(long, env = "TURING_SIM_MAX_STEPS")]
    max_steps: Option<u64>,

    /// JSON file with controller settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write tracing output to this file. Nothing is logged otherwise.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Represents the state of the application loop.
#[derive(PartialEq)]
enum AppState {
    Running,
    ShouldQuit,
}

/// A wrapper around the terminal to ensure it's restored on drop.
struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl Tui {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        // Errors are ignored: there is nothing left to report them to.
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Everything that can fail is done before entering the alternate screen,
    // so errors reach stderr intact.
    let app = match init_logging(&cli).and_then(|()| load_app(&cli)) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut tui = Tui::new()?;
    run_app(&mut tui.terminal, app)?;

    Ok(())
}

fn init_logging(cli: &Cli) -> Result<(), String> {
    let Some(path) = &cli.log_file else {
        return Ok(());
    };

    let file = fs::File::create(path)
        .map_err(|e| format!("Failed to create log file '{}': {}", path.display(), e))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}

fn load_config(cli: &Cli) -> Result<ControllerConfig, String> {
    let mut config = match &cli.config {
        Some(path) => ControllerConfig::load(path).map_err(|e| e.to_string())?,
        None => ControllerConfig::default(),
    };
    if let Some(interval_ms) = cli.interval_ms {
        config.interval_ms = interval_ms;
    }
    if cli.max_steps.is_some() {
        config.max_steps = cli.max_steps;
    }
    Ok(config)
}

/// Builds the app from a preset file, then stdin, and finally the built-in presets.
fn load_app(cli: &Cli) -> Result<App, String> {
    let config = load_config(cli)?;

    if let Some(path) = &cli.preset_file {
        PresetLoader::load_preset(path)
            .map(|preset| App::new_from_preset(preset, config))
            .map_err(|e| format!("Failed to load preset '{}': {}", path.display(), e))
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        PresetLoader::load_preset_from_string(&buffer)
            .map(|preset| App::new_from_preset(preset, config))
            .map_err(|e| format!("Failed to load preset: {}", e))
    } else {
        App::new_default(config).map_err(|e| e.to_string())
    }
}

/// Runs the main application loop.
///
/// The loop sleeps until either a key arrives or the next scheduled step is due.
fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;

        if event::poll(app.poll_timeout(Instant::now()))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && handle_key_event(&mut app, key) == AppState::ShouldQuit
                {
                    return Ok(());
                }
            }
        }

        app.tick(Instant::now());
    }
}

/// Handles key events and updates the application state.
fn handle_key_event(app: &mut App, key: KeyEvent) -> AppState {
    if let Some(action) = app.keymap.get(&key) {
        match action {
            Action::Quit => return AppState::ShouldQuit,
            Action::Reset => app.reset_machine(),
            Action::Step => app.step_machine(),
            Action::ToggleRun => app.toggle_run(Instant::now()),
            Action::ToggleHelp => app.toggle_help(),
            Action::PreviousPreset => app.previous_preset(),
            Action::NextPreset => app.next_preset(),
            Action::SpeedUp => app.speed_up(),
            Action::SlowDown => app.slow_down(),
        }
    }
    AppState::Running
}
