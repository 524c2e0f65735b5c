//! Terminal front end: command list, received text and sample plot.
//!
//! The text pane follows the session live. The plot only changes when the harness
//! reports a due refresh (one per send) or when the user asks for one with `r`.

use std::io::{self, Stdout};
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::block::{Position, Title};
use ratatui::widgets::*;

use ld_harness::{Command, Harness, HarnessError, Presenter, SampleStats, Snapshot};

const PLACEHOLDER: &str = "... <no text yet> ...";
const IDLE_TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Send(Command),
    Refresh,
    Quit,
    None,
}

pub struct App {
    selected: usize,
    // Latest session state, redrawn on every tick.
    live: Snapshot,
    // State as of the last refresh; drives the plot.
    view: Option<Snapshot>,
    status: String,
    remote: SocketAddr,
    plot_range: RangeInclusive<f64>,
}

impl App {
    pub fn new(remote: SocketAddr, plot_range: RangeInclusive<f64>) -> Self {
        Self {
            selected: 0,
            live: Snapshot::default(),
            view: None,
            status: String::from("ready"),
            remote,
            plot_range,
        }
    }

    pub fn selected(&self) -> Command {
        Command::ALL[self.selected]
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Action {
        let n = Command::ALL.len();
        match code {
            KeyCode::Up => {
                self.selected = (self.selected + n - 1) % n;
                Action::None
            }
            KeyCode::Down => {
                self.selected = (self.selected + 1) % n;
                Action::None
            }
            KeyCode::Char(' ') => Action::Send(self.selected()),
            // Enter is the history shortcut, not "send selected".
            KeyCode::Enter | KeyCode::Char('h') => Action::Send(Command::SHORTCUT),
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            _ => Action::None,
        }
    }

    /// Tracks the session as it is now, without touching the plot.
    pub fn observe(&mut self, snapshot: &Snapshot) {
        if self.live != *snapshot {
            self.live = snapshot.clone();
        }
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }
}

impl Presenter for App {
    fn refresh(&mut self, snapshot: &Snapshot) {
        self.view = Some(snapshot.clone());
    }
}

/// Takes over the terminal until the user quits.
pub fn run(harness: &Harness, plot_range: RangeInclusive<f64>) -> Result<(), HarnessError> {
    enable_raw_mode().map_err(HarnessError::Terminal)?;
    io::stdout()
        .execute(EnterAlternateScreen)
        .map_err(HarnessError::Terminal)?;

    let result = Terminal::new(CrosstermBackend::new(io::stdout()))
        .map_err(HarnessError::Terminal)
        .and_then(|mut terminal| {
            let mut app = App::new(harness.remote(), plot_range);
            event_loop(&mut terminal, harness, &mut app)
        });

    // Always give the terminal back, even if the loop failed.
    let _ = disable_raw_mode();
    let _ = io::stdout().execute(LeaveAlternateScreen);
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    harness: &Harness,
    app: &mut App,
) -> Result<(), HarnessError> {
    loop {
        harness.poll_refresh(app);
        app.observe(&harness.snapshot());
        terminal
            .draw(|f| draw(f, app))
            .map_err(HarnessError::Terminal)?;

        let timeout = harness
            .time_until_refresh()
            .map_or(IDLE_TICK, |t| t.min(IDLE_TICK));
        if !event::poll(timeout).map_err(HarnessError::Terminal)? {
            continue;
        }
        let Event::Key(key) = event::read().map_err(HarnessError::Terminal)? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.handle_key(key.code) {
            Action::Send(command) => match harness.send(command) {
                Ok(()) => app.set_status(format!("sent '{}'", command.label())),
                Err(e) => app.set_status(format!("[ERROR] {}", e)),
            },
            Action::Refresh => app.refresh(&harness.snapshot()),
            Action::Quit => return Ok(()),
            Action::None => {}
        }
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(1)])
        .split(f.size());
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(14),
            Constraint::Percentage(45),
            Constraint::Min(20),
        ])
        .split(rows[0]);

    draw_commands(f, cols[0], app);
    draw_text(f, cols[1], app);
    draw_chart(f, cols[2], app);
    draw_status(f, rows[1], app);
}

fn draw_commands(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = Command::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == app.selected {
                Line::from(Span::styled(
                    format!("> {}", c.label()),
                    Style::default().fg(Color::Yellow).bold(),
                ))
            } else {
                Line::from(format!("  {}", c.label()))
            }
        })
        .collect();
    let block = Block::default().borders(Borders::ALL).title(" Tx Text ");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_text(f: &mut Frame, area: Rect, app: &App) {
    let live = &app.live;
    let text = if live.last_command.is_none() && live.text.is_empty() {
        PLACEHOLDER
    } else {
        live.text.as_str()
    };
    let title = match live.last_command {
        Some(c) => format!(" Rx Text ({}) ", c.label()),
        None => " Rx Text ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    f.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

fn draw_chart(f: &mut Frame, area: Rect, app: &App) {
    // Before the first refresh the plot shows a single zero.
    let samples: &[f64] = match &app.view {
        Some(snap) if !snap.samples.is_empty() => &snap.samples,
        Some(_) => &[],
        None => &[0.0],
    };
    // nan and inf keep their index but are not drawn.
    let points: Vec<(f64, f64)> = samples
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| (i as f64, v))
        .collect();

    let stats = SampleStats::of(samples);
    let title = format!(" History Voltage Samples (n={}) ", samples.len());
    let summary = match stats {
        Some(s) => format!(" min {:.3}  max {:.3}  avg {:.3} ", s.min, s.max, s.mean),
        None => String::new(),
    };

    let last_index = samples.len().saturating_sub(1);
    let x_max = (last_index as f64).max(1.0);
    let (y_min, y_max) = (*app.plot_range.start(), *app.plot_range.end());

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title(
                    Title::from(Span::styled(summary, Style::default().fg(Color::DarkGray)))
                        .position(Position::Bottom),
                ),
        )
        .x_axis(
            Axis::default()
                .title("Samples".dark_gray())
                .bounds([0.0, x_max])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{last_index}")),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Voltage".dark_gray())
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{y_min:.1}")),
                    Span::raw(format!("{y_max:.1}")),
                ]),
        );
    f.render_widget(chart, area);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let received = app.live.received;
    let line = Line::from(vec![
        Span::styled(format!(" {} ", app.remote), Style::default().bold()),
        Span::raw(format!(" rx={}  {}  ", received, app.status)),
        Span::styled(
            "[↑↓] select  [space] send  [enter/h] history  [r] refresh  [q] quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}
