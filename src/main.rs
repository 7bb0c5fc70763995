use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use vpfs_dashboard::classify::{FareCard, TeamRow, Tone, participation_label};
use vpfs_dashboard::config::{DashboardConfig, SourceKind};
use vpfs_dashboard::fake_feed::FakeSource;
use vpfs_dashboard::model::{AdminCommand, now_ms};
use vpfs_dashboard::poller::{UPDATE_QUEUE_DEPTH, spawn_admin_worker, spawn_poller};
use vpfs_dashboard::render::{Container, Marker, NodeContent, Slot};
use vpfs_dashboard::state::{AppState, PromptKind, Update, apply_update, parse_prompt};
use vpfs_dashboard::vpfs_api::{HttpSource, VpfsSource};

struct App {
    state: AppState,
    should_quit: bool,
    help_overlay: bool,
    source_label: String,
    cmd_tx: mpsc::Sender<AdminCommand>,
}

impl App {
    fn new(config: &DashboardConfig, cmd_tx: mpsc::Sender<AdminCommand>) -> Self {
        let source_label = match config.source {
            SourceKind::Http => config.server.clone(),
            SourceKind::Fake => "simulated".to_string(),
        };
        Self {
            state: AppState::with_privileged_mode(&config.privileged_mode),
            should_quit: false,
            help_overlay: false,
            source_label,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        // A pending notification blocks everything until acknowledged.
        if self.state.notification().is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.state.dismiss_notification();
            }
            return;
        }

        if self.state.prompt.is_some() {
            self.on_prompt_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next_team(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev_team(),
            KeyCode::Char('?') => self.help_overlay = !self.help_overlay,
            KeyCode::Esc => self.help_overlay = false,
            KeyCode::Char('a') => self.state.open_prompt(PromptKind::AddTeam),
            KeyCode::Char('r') => {
                self.state.open_prompt(PromptKind::RemoveTeam);
                let selected = self.state.selected_team_number();
                if let (Some(prompt), Some(team)) = (self.state.prompt.as_mut(), selected) {
                    prompt.input = team.to_string();
                }
            }
            KeyCode::Char('c') => self.state.open_prompt(PromptKind::ConfigMatch),
            KeyCode::Char('s') if self.state.privileged_visible => {
                self.send_command(AdminCommand::StartMatch)
            }
            _ => {}
        }
    }

    fn on_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.state.prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.state.prompt = None,
            KeyCode::Backspace => {
                prompt.input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == ' ' => prompt.input.push(c),
            KeyCode::Enter => {
                let kind = prompt.kind;
                match parse_prompt(kind, &prompt.input) {
                    Ok(cmd) => {
                        self.state.prompt = None;
                        self.send_command(cmd);
                    }
                    Err(err) => self.state.push_log(format!("[WARN] {}: {err}", kind.title())),
                }
            }
            _ => {}
        }
    }

    fn send_command(&mut self, cmd: AdminCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Admin worker unavailable");
        } else {
            self.state.push_log(format!("[INFO] {} sent", cmd.label()));
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = DashboardConfig::from_env();
    let source: Arc<dyn VpfsSource> = match config.source {
        SourceKind::Http => Arc::new(HttpSource::new(&config.server, config.auth.clone())),
        SourceKind::Fake => Arc::new(FakeSource::new()),
    };

    let (tx, rx) = mpsc::sync_channel(UPDATE_QUEUE_DEPTH);
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let poller = spawn_poller(Arc::clone(&source), config.intervals, tx.clone())
        .map_err(|err| io::Error::other(format!("{err:#}")))?;
    spawn_admin_worker(source, cmd_rx, tx)
        .map_err(|err| io::Error::other(format!("{err:#}")))?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(&config, cmd_tx);
    let res = run_app(&mut terminal, &mut app, rx);
    poller.stop();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Update>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(update) = rx.try_recv() {
            apply_update(&mut app.state, update, now_ms());
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    let fare_panes = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[0]);

    render_fares(frame, fare_panes[0], &app.state, Container::ActiveFares, "Active Fares");
    render_fares(frame, fare_panes[1], &app.state, Container::PastFares, "Past Fares");
    render_teams(frame, columns[1], &app.state);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[3]);

    if app.help_overlay {
        render_help_overlay(frame, frame.size());
    }
    if let Some(prompt) = &app.state.prompt {
        render_prompt(frame, prompt.kind.title(), &prompt.input);
    }
    if let Some(msg) = app.state.notification() {
        render_notification(frame, msg);
    }
}

fn header_text(app: &App) -> String {
    let state = &app.state;
    let match_label = state
        .match_status
        .as_ref()
        .map(|s| format!("Match {}", s.match_index))
        .unwrap_or_else(|| "Match -".to_string());
    let operator = if state.privileged_visible { "OPERATOR" } else { "VIEW" };
    let participation = state
        .match_status
        .as_ref()
        .and_then(participation_label)
        .map(|label| format!(" | {label}"))
        .unwrap_or_default();
    let line1 = format!(
        " VPFS DASHBOARD | {match_label} | {}{participation} | {operator}",
        state.status_line
    );
    let line2 = format!(" Source: {}", app.source_label);
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    if state.privileged_visible {
        "j/k/↑/↓ Select team | a Add | r Remove | c Config | s Start | ? Help | q Quit".to_string()
    } else {
        "j/k/↑/↓ Select team | ? Help | q Quit".to_string()
    }
}

fn render_fares(frame: &mut Frame, area: Rect, state: &AppState, container: Container, title: &str) {
    let mut lines = Vec::new();
    for slot in state.tree.children(container) {
        match slot {
            Slot::Node(id) => {
                if let Some(NodeContent::Fare(card)) = state.tree.node(*id).map(|n| &n.content) {
                    lines.push(fare_line(card));
                }
            }
            Slot::Marker(Marker::Divider) => lines.push(Line::styled(
                "──── unclaimed ────",
                Style::default().fg(Color::DarkGray),
            )),
            Slot::Marker(Marker::Header) => {}
        }
    }
    if lines.is_empty() {
        lines.push(Line::styled("No fares yet", Style::default().fg(Color::DarkGray)));
    }
    let list = Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(list, area);
}

fn fare_line(card: &FareCard) -> Line<'static> {
    let mut spans = vec![
        Span::raw(format!("#{:<4}", card.id)),
        Span::raw(format!("{:>9} ", card.pay)),
        Span::raw(format!("{:>4} ", card.reputation)),
    ];
    if let Some(modifier) = card.modifier {
        spans.push(Span::styled(
            format!("[{modifier}] "),
            Style::default().fg(Color::Magenta),
        ));
    }
    if let Some(claim) = &card.claim {
        spans.push(Span::styled(format!("{claim} "), Style::default().fg(Color::Cyan)));
    }
    if let Some(countdown) = &card.countdown {
        let style = if countdown == "Expired" {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Green)
        };
        spans.push(Span::styled(format!("{countdown} "), style));
    }
    for badge in &card.badges {
        spans.push(Span::styled(
            format!("<{badge}> "),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::styled(card.route.clone(), Style::default().fg(Color::DarkGray)));
    Line::from(spans)
}

fn render_teams(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut lines = Vec::new();
    for slot in state.tree.children(Container::Teams) {
        match slot {
            Slot::Marker(Marker::Header) => lines.push(Line::styled(
                format!(
                    "{:<6}{:>10}{:>6}  {:<6}{:<16}{:>9}{:>15}",
                    "Team", "Money", "Rep", "Fare", "Position", "Pos", "Status"
                ),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Slot::Node(id) => {
                if let Some(NodeContent::Team(row)) = state.tree.node(*id).map(|n| &n.content) {
                    lines.push(team_line(row, state.selected_team == Some(*id)));
                }
            }
            Slot::Marker(Marker::Divider) => {}
        }
    }
    let list = Paragraph::new(lines).block(Block::default().title("Teams").borders(Borders::ALL));
    frame.render_widget(list, area);
}

fn team_line(row: &TeamRow, selected: bool) -> Line<'static> {
    let base = if selected {
        Style::default().fg(Color::White).bg(Color::DarkGray)
    } else {
        Style::default()
    };
    let tone = |tone: Tone| match tone {
        Tone::Normal => base,
        Tone::Warning => base.fg(Color::Yellow),
    };
    Line::from(vec![
        Span::styled(
            format!(
                "{:<6}{:>10}{:>6}  {:<6}{:<16}",
                row.number, row.money, row.reputation, row.current_fare, row.position
            ),
            base,
        ),
        Span::styled(format!("{:>9}", row.position_age.label), tone(row.position_age.tone)),
        Span::styled(format!("{:>15}", row.status_age.label), tone(row.status_age.tone)),
    ])
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    let start = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_prompt(frame: &mut Frame, title: &str, input: &str) {
    let area = centered_rect(40, 20, frame.size());
    frame.render_widget(Clear, area);
    let body = format!("> {input}_\n\nEnter submit | Esc cancel");
    let prompt = Paragraph::new(body).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(prompt, area);
}

fn render_notification(frame: &mut Frame, msg: &str) {
    let area = centered_rect(50, 25, frame.size());
    frame.render_widget(Clear, area);
    let body = format!("{msg}\n\nEnter to dismiss");
    let popup = Paragraph::new(body)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title("Error")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
    frame.render_widget(popup, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "VPFS Dashboard - Help",
        "",
        "Global:",
        "  j/k or ↑/↓   Select team",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Operator (lab mode only):",
        "  a            Add team",
        "  r            Remove selected team",
        "  c            Configure match",
        "  s            Start match",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
