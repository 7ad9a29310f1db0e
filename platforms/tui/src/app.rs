use action::Action;
use keymap::{Config, KeyMapConfig};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Padding, Paragraph, Wrap},
    Frame,
};
use std::time::{Duration, Instant};
use turing_sim::{
    ControllerConfig, MachineError, Preset, PresetManager, RunController, Status, StepOutcome,
};

const BLOCK_PADDING: Padding = Padding::new(1, 1, 0, 0);
/// How long to wait for input when no step is scheduled.
const IDLE_POLL: Duration = Duration::from_millis(250);
const MIN_INTERVAL: Duration = Duration::from_millis(10);
const MAX_INTERVAL: Duration = Duration::from_millis(5000);
/// Width of one rendered tape cell, e.g. ` 1 `.
const CELL_WIDTH: u16 = 3;

pub struct App {
    controller: RunController,
    current_preset_index: usize,
    message: String,
    show_help: bool,
    pub(crate) keymap: Config<Action>,
    // Set when the preset came from a file or stdin, which disables preset switching
    preset_loaded_from_source: bool,
}

impl App {
    pub fn new_default(config: ControllerConfig) -> Result<Self, MachineError> {
        let preset = PresetManager::get_by_index(0)?;

        Ok(Self {
            controller: RunController::new(preset, config),
            keymap: Action::keymap_config(),
            current_preset_index: 0,
            message: "Press 'h' for help.".to_string(),
            show_help: false,
            preset_loaded_from_source: false,
        })
    }

    pub fn new_from_preset(preset: Preset, config: ControllerConfig) -> Self {
        Self {
            controller: RunController::new(preset, config),
            keymap: Action::keymap_config(),
            current_preset_index: 0,
            message: "Preset loaded from source. Press 'h' for help.".to_string(),
            show_help: false,
            preset_loaded_from_source: true,
        }
    }

    /// How long the event loop may block before the next scheduled step.
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        match self.controller.next_tick() {
            Some(due) => due.saturating_duration_since(now),
            None => IDLE_POLL,
        }
    }

    /// Fires the scheduled step, if one is due.
    pub fn tick(&mut self, now: Instant) {
        if let Some(outcome) = self.controller.tick(now) {
            self.report(outcome);
        }
    }

    pub fn render(&mut self, f: &mut Frame) {
        let inner_area = f.area().inner(Margin::new(1, 0));

        // Preset info, middle (rules + machine), status
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(inner_area);

        self.render_preset_info(f, main_chunks[0]);

        let middle_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Length(1),
                Constraint::Percentage(60),
            ])
            .split(main_chunks[1]);

        self.render_rules(f, middle_chunks[0]);

        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Machine state
                Constraint::Length(5), // Tape
                Constraint::Min(0),    // Log or help
            ])
            .split(middle_chunks[2]);

        self.render_machine_state(f, right_chunks[0]);
        self.render_tape(f, right_chunks[1]);

        if self.show_help {
            self.render_help(f, right_chunks[2]);
        } else {
            self.render_log(f, right_chunks[2]);
        }

        self.render_status(f, main_chunks[2]);
    }

    fn render_preset_info(&self, f: &mut Frame, area: Rect) {
        let preset = self.controller.preset();
        let label = Style::default().fg(Color::Yellow);

        let title = if self.preset_loaded_from_source {
            format!("{} (Custom)", preset.name)
        } else {
            format!(
                "{} ({}/{})",
                preset.name,
                self.current_preset_index + 1,
                PresetManager::count()
            )
        };

        let text = vec![
            Line::from(vec![Span::styled("Preset: ", label), Span::raw(title)]),
            Line::from(vec![
                Span::styled("Description: ", label),
                Span::raw(preset.description.as_str()),
            ]),
            Line::from(vec![
                Span::styled("Initial Tape: ", label),
                Span::raw(format!("\"{}\"", preset.initial_tape)),
                Span::styled(" | Initial State: ", label),
                Span::raw(preset.initial_state.as_str()),
            ]),
            Line::from(vec![
                Span::styled("States: ", label),
                Span::raw(preset.states().len().to_string()),
                Span::styled(" | Rules: ", label),
                Span::raw(preset.rules.len().to_string()),
            ]),
        ];

        let paragraph = Paragraph::new(text)
            .block(block("Turing Machine Simulator").title_alignment(Alignment::Center))
            .wrap(Wrap { trim: true });

        f.render_widget(paragraph, area);
    }

    fn render_rules(&self, f: &mut Frame, area: Rect) {
        let next = self.controller.next_rule();

        let lines: Vec<Line> = self
            .controller
            .rules()
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                let text = format!("{:>3}  {}", i + 1, rule);
                if Some(i) == next && !self.controller.machine().is_halted() {
                    Line::from(Span::styled(
                        format!("{text}  ◀"),
                        Style::default()
                            .bg(Color::Yellow)
                            .fg(Color::Black)
                            .add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(text)
                }
            })
            .collect();

        // Keep the highlighted rule on screen
        let visible = area.height.saturating_sub(2) as usize;
        let scroll = match next {
            Some(i) if visible > 0 && i >= visible => (i + 1 - visible) as u16,
            _ => 0,
        };

        f.render_widget(section("Rules", lines).scroll((scroll, 0)), area);
    }

    fn render_machine_state(&self, f: &mut Frame, area: Rect) {
        let machine = self.controller.machine();
        let label = Style::default().fg(Color::Yellow);
        let status_color = status_color(machine.status());

        let text = vec![
            Line::from(vec![
                Span::styled("Current State: ", label),
                Span::styled(
                    machine.state(),
                    Style::default()
                        .fg(status_color)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(" | Steps: ", label),
                Span::raw(machine.step_count().to_string()),
                Span::styled(" | Status: ", label),
                Span::styled(
                    machine.status().to_string(),
                    Style::default().fg(status_color),
                ),
            ]),
            Line::from(vec![
                Span::styled("Head: ", Style::default().fg(Color::Cyan)),
                Span::raw(machine.head().to_string()),
                Span::styled(" | Symbol: ", Style::default().fg(Color::Cyan)),
                Span::raw(format!("'{}'", machine.symbol())),
                Span::styled(" | Result: ", Style::default().fg(Color::Cyan)),
                Span::raw(
                    self.controller
                        .outcome()
                        .map_or_else(|| "-".to_string(), |o| o.to_string()),
                ),
            ]),
        ];

        f.render_widget(section("Machine State", text), area);
    }

    fn render_tape(&self, f: &mut Frame, area: Rect) {
        let machine = self.controller.machine();
        let head = machine.head();

        // Borders and padding take four columns
        let cells = (area.width.saturating_sub(4) / CELL_WIDTH).max(1) as i64;
        let from = head - cells / 2;
        let to = from + cells - 1;

        let tape_spans: Vec<Span> = machine
            .tape()
            .window(from, to)
            .chars()
            .zip(from..)
            .map(|(symbol, pos)| {
                if pos == head {
                    Span::styled(
                        format!(" {symbol} "),
                        Style::default()
                            .bg(Color::Yellow)
                            .fg(Color::Black)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw(format!(" {symbol} "))
                }
            })
            .collect();

        let text = vec![
            Line::from(tape_spans),
            Line::from(Span::styled(
                format!("Cells {from}..{to}, written: \"{}\"", machine.tape()),
                Style::default().fg(Color::Cyan),
            )),
        ];

        f.render_widget(section("Tape", text), area);
    }

    fn render_log(&self, f: &mut Frame, area: Rect) {
        let log = self.controller.log();
        let visible = area.height.saturating_sub(2) as usize;

        let mut lines: Vec<Line> = log
            .iter()
            .rev()
            .take(visible)
            .map(|entry| {
                Line::from(vec![
                    Span::styled(
                        format!("#{:<5}", entry.step),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::raw(format!(
                        " {:<10} @{:<4} {}",
                        entry.state, entry.head, entry.tape_snippet
                    )),
                ])
            })
            .collect();
        lines.reverse();

        let title = if log.evicted() > 0 {
            format!("Execution Log ({} earlier entries dropped)", log.evicted())
        } else {
            "Execution Log".to_string()
        };

        f.render_widget(section(&title, lines), area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let help_text = vec![
            Line::from("Controls:"),
            Line::from("  Space - Step forward"),
            Line::from("  p - Run / pause"),
            Line::from("  r - Reset machine"),
            Line::from(if self.preset_loaded_from_source {
                "  ← → - Preset switching disabled (loaded from file/stdin)"
            } else {
                "  ← → - Switch presets"
            }),
            Line::from("  f / s - Faster / slower"),
            Line::from("  h - Toggle this help"),
            Line::from("  q - Quit"),
            Line::from(""),
            Line::from("The highlighted rule fires on the next step."),
            Line::from("The machine halts when no rule matches the state and symbol."),
            Line::from("'_' is the blank symbol."),
        ];

        f.render_widget(section("Help", help_text), area);
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let speed = format!("{} ms/step", self.controller.interval().as_millis());
        let outer = block("Status");
        let inner = outer.inner(area);
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Fill(1), Constraint::Length(speed.len() as u16)])
            .split(inner);

        let status = self.controller.status();
        let line = Line::from(vec![
            Span::styled(
                status.to_string(),
                Style::default().fg(status_color(status)),
            ),
            Span::raw(format!(" | {}", self.message)),
        ]);

        let speed = Text::from(
            Line::from(Span::styled(speed, Style::default().fg(Color::Yellow))).right_aligned(),
        );

        f.render_widget(outer, area);
        f.render_widget(line, chunks[0]);
        f.render_widget(speed, chunks[1]);
    }

    pub fn step_machine(&mut self) {
        match self.controller.step() {
            Ok(outcome) => self.report(outcome),
            Err(e) => self.message = e.to_string(),
        }
    }

    pub fn toggle_run(&mut self, now: Instant) {
        self.message = match self.controller.toggle(now) {
            Ok(()) if self.controller.status() == Status::Running => "Running".to_string(),
            Ok(()) => "Paused".to_string(),
            Err(MachineError::InvalidControl {
                status: Status::Halted,
                ..
            }) => "Machine is halted. Press 'r' to reset.".to_string(),
            Err(e) => e.to_string(),
        };
    }

    pub fn reset_machine(&mut self) {
        self.controller.reset();
        self.message = "Machine reset".to_string();
    }

    pub fn speed_up(&mut self) {
        let interval = (self.controller.interval() / 2).max(MIN_INTERVAL);
        self.set_interval(interval);
    }

    pub fn slow_down(&mut self) {
        let interval = (self.controller.interval() * 2).min(MAX_INTERVAL);
        self.set_interval(interval);
    }

    fn set_interval(&mut self, interval: Duration) {
        self.controller.set_interval(interval);
        self.message = format!("Interval set to {} ms", interval.as_millis());
    }

    fn report(&mut self, outcome: StepOutcome) {
        self.message = match outcome {
            StepOutcome::Applied(rule) => format!(
                "Step {} applied rule {}",
                self.controller.machine().step_count(),
                rule + 1
            ),
            StepOutcome::Halted => match self.controller.outcome() {
                Some(result) => format!("Machine halted: {result}. Press 'r' to reset."),
                None => "Machine halted. Press 'r' to reset.".to_string(),
            },
        };

        // The step limit pauses without halting
        let steps = self.controller.machine().step_count();
        if self.controller.status() == Status::Paused
            && self.controller.config().step_limit().is_some_and(|limit| steps >= limit)
        {
            self.message = format!("Paused at the {steps}-step limit");
        }
    }

    pub fn next_preset(&mut self) {
        if self.preset_loaded_from_source {
            self.message = "Cannot switch presets when loaded from file/stdin.".to_string();
            return;
        }
        let count = PresetManager::count();
        if count == 0 {
            return;
        }
        self.current_preset_index = (self.current_preset_index + 1) % count;
        self.load_current_preset();
    }

    pub fn previous_preset(&mut self) {
        if self.preset_loaded_from_source {
            self.message = "Cannot switch presets when loaded from file/stdin.".to_string();
            return;
        }
        let count = PresetManager::count();
        if count == 0 {
            return;
        }
        self.current_preset_index = if self.current_preset_index == 0 {
            count - 1
        } else {
            self.current_preset_index - 1
        };
        self.load_current_preset();
    }

    fn load_current_preset(&mut self) {
        match PresetManager::get_by_index(self.current_preset_index) {
            Ok(preset) => {
                self.message = format!("Loaded preset: {}", preset.name);
                self.controller.load(preset);
            }
            Err(e) => self.message = e.to_string(),
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    #[cfg(test)]
    fn controller(&self) -> &RunController {
        &self.controller
    }
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Idle => Color::Blue,
        Status::Running => Color::Green,
        Status::Paused => Color::Magenta,
        Status::Halted => Color::Red,
    }
}

fn section<'a>(title: &str, content: Vec<Line<'a>>) -> Paragraph<'a> {
    Paragraph::new(content).block(block(title))
}

fn block<'a>(title: &str) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(format!(" {title} "))
        .padding(BLOCK_PADDING)
}
