use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gamelog_core::{
    models::Snapshot, ChartSeries, DashboardState, DataFetcher, LoadStatus, PollEvent,
    SeriesPoint, VersionPoller,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, TableState, Wrap},
    Frame, Terminal,
};
use tokio::{
    spawn,
    sync::{mpsc, Notify},
};
use tracing::{debug, error, info};

use crate::widgets::{self, Theme};

const TICK_RATE: Duration = Duration::from_millis(250);

enum AppEvent {
    Input(Event),
    Tick,
    Loaded(Result<(), String>),
}

/// Terminal dashboard over the shared fetcher state.
pub struct DashboardApp {
    fetcher: DataFetcher,
    poller: Option<VersionPoller>,
    poll_rx: Option<mpsc::Receiver<PollEvent>>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    series: Option<(Arc<Snapshot>, ChartSeries)>,
    table: TableState,
    status: String,
    should_quit: bool,
    theme: Theme,
}

impl DashboardApp {
    pub fn new(
        fetcher: DataFetcher,
        poller: VersionPoller,
        poll_rx: mpsc::Receiver<PollEvent>,
    ) -> Self {
        Self {
            fetcher,
            poller: Some(poller),
            poll_rx: Some(poll_rx),
            event_tx: None,
            series: None,
            table: TableState::default(),
            status: "Starting".to_string(),
            should_quit: false,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        let refresh = Arc::new(Notify::new());
        let poller = self
            .poller
            .take()
            .map(|poller| poller.start(refresh_trigger(refresh.clone())));

        self.start_load("Loading data");
        let outcome = self
            .event_loop(&mut terminal, &mut event_rx, &refresh)
            .await;

        if let Some(poller) = poller {
            poller.stop().await;
        }
        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        outcome
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        event_rx: &mut mpsc::Receiver<AppEvent>,
        refresh: &Notify,
    ) -> Result<()> {
        let mut poll_rx = self.poll_rx.take();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }

            if let Some(rx) = poll_rx.as_mut() {
                let mut poll_closed = false;
                tokio::select! {
                    maybe_event = event_rx.recv() => {
                        if !self.process_app_event(maybe_event) {
                            break;
                        }
                    }
                    _ = refresh.notified() => self.start_load("Backend data changed"),
                    maybe_poll = rx.recv() => {
                        match maybe_poll {
                            Some(event) => self.handle_poll_event(event),
                            None => poll_closed = true,
                        }
                    }
                }
                if poll_closed {
                    poll_rx = None;
                }
            } else {
                tokio::select! {
                    maybe_event = event_rx.recv() => {
                        if !self.process_app_event(maybe_event) {
                            break;
                        }
                    }
                    _ = refresh.notified() => self.start_load("Backend data changed"),
                }
            }
        }

        Ok(())
    }

    fn start_load(&mut self, reason: &str) {
        info!(reason, "Refreshing dashboard data");
        let fetcher = self.fetcher.clone();
        let sender = self.event_tx.clone();
        spawn(async move {
            let result = fetcher
                .load()
                .await
                .map(|_| ())
                .map_err(|err| err.to_string());
            if let Some(sender) = sender {
                let _ = sender.send(AppEvent::Loaded(result)).await;
            }
        });
    }

    fn handle_poll_event(&mut self, event: PollEvent) {
        match event {
            PollEvent::Changed { current, .. } => {
                debug!(%current, "Version change observed");
            }
            PollEvent::Failed(err) => {
                self.status = format!("Version check failed: {err}");
            }
        }
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                self.handle_key(key);
                true
            }
            Some(AppEvent::Input(_)) | Some(AppEvent::Tick) => true,
            Some(AppEvent::Loaded(result)) => {
                match result {
                    Ok(()) => self.status = loaded_status(&self.fetcher.state()),
                    Err(err) => {
                        error!(error = %err, "Load failed");
                        self.status = format!("Load failed: {err}");
                    }
                }
                true
            }
            None => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let total = self
            .fetcher
            .state()
            .snapshot
            .map(|snapshot| snapshot.games.len())
            .unwrap_or(0);
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Char('r') => self.start_load("Manual reload"),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, total),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, total),
            KeyCode::PageDown => self.move_cursor(10, total),
            KeyCode::PageUp => self.move_cursor(-10, total),
            KeyCode::Home | KeyCode::Char('g') => self.move_cursor(isize::MIN, total),
            KeyCode::End | KeyCode::Char('G') => self.move_cursor(isize::MAX, total),
            _ => {}
        }
    }

    fn move_cursor(&mut self, delta: isize, total: usize) {
        if total == 0 {
            self.table.select(None);
            return;
        }
        let current = self.table.selected().unwrap_or(0) as isize;
        let next = current.saturating_add(delta).clamp(0, total as isize - 1);
        self.table.select(Some(next as usize));
    }

    fn chart_series(&mut self, snapshot: Option<&Arc<Snapshot>>) -> ChartSeries {
        match (snapshot, &self.series) {
            (Some(snapshot), Some((cached, series))) if Arc::ptr_eq(snapshot, cached) => {
                series.clone()
            }
            (Some(snapshot), _) => {
                let series = ChartSeries::derive(Some(&snapshot.stats));
                self.series = Some((snapshot.clone(), series.clone()));
                series
            }
            (None, _) => ChartSeries::derive(None),
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let state = self.fetcher.state();
        let series = self.chart_series(state.snapshot.as_ref());

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Min(8),
                Constraint::Length(1),
            ])
            .split(frame.size());

        self.render_header(frame, layout[0], &state);
        if state.snapshot.is_some() {
            self.render_count_row(frame, layout[1], &series);
            self.render_metascore_row(frame, layout[2], &series);
        } else {
            let message = if state.loading {
                "Loading data…"
            } else {
                "No data yet"
            };
            frame.render_widget(
                widgets::empty_panel("Charts", message, &self.theme),
                layout[1].union(layout[2]),
            );
        }
        self.render_tables(frame, layout[3], &state.snapshot, &series);
        self.render_help(frame, layout[4]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, state: &DashboardState) {
        let (label, color) = match (state.loading, state.status()) {
            (true, _) => ("Loading…", self.theme.warning),
            (false, LoadStatus::Ready) => ("Live", self.theme.success),
            (false, LoadStatus::Unreachable) => ("Offline", self.theme.danger),
            (false, LoadStatus::NotLoaded) => ("Waiting", self.theme.muted),
        };
        let refreshed = state
            .snapshot
            .as_ref()
            .map(|snapshot| {
                format!(
                    "last refresh {}",
                    snapshot.fetched_at.with_timezone(&Local).format("%H:%M:%S")
                )
            })
            .unwrap_or_else(|| "never refreshed".to_string());

        let mut lines = vec![Line::from(vec![
            Span::styled(
                format!("[{label}] "),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{refreshed} • {}", self.status)),
        ])];
        if let Some(error) = &state.error {
            lines.push(Line::from(Span::styled(
                format!("⚠ {error} (press r to retry)"),
                Style::default()
                    .fg(self.theme.danger)
                    .add_modifier(Modifier::BOLD),
            )));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Game Logger Dashboard");
        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_count_row(&self, frame: &mut Frame, area: Rect, series: &ChartSeries) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(35),
                Constraint::Percentage(25),
                Constraint::Percentage(40),
            ])
            .split(area);

        self.render_counts(frame, columns[0], "Platforms", &series.platforms);
        self.render_counts(frame, columns[1], "Completions by Year", &series.years);
        self.render_counts(frame, columns[2], "Completions by Month", &series.months);
    }

    fn render_metascore_row(&self, frame: &mut Frame, area: Rect, series: &ChartSeries) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ])
            .split(area);

        self.render_counts(frame, columns[0], "Categories", &series.categories);
        self.render_averages(
            frame,
            columns[1],
            "Avg Metascore by Platform",
            &series.avg_metascore_by_platform,
            self.theme.accent,
        );
        self.render_averages(
            frame,
            columns[2],
            "% Must-Play (≥90)",
            &series.must_play_by_platform,
            self.theme.success,
        );
        self.render_counts(
            frame,
            columns[3],
            "Metascore Distribution",
            &series.metascore_histogram,
        );
    }

    fn render_counts(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        series: &[SeriesPoint],
    ) {
        if series.is_empty() {
            frame.render_widget(widgets::empty_panel(title, "No data", &self.theme), area);
        } else {
            frame.render_widget(widgets::count_chart(title, series, &self.theme), area);
        }
    }

    fn render_averages(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        series: &[SeriesPoint<f64>],
        color: Color,
    ) {
        if series.is_empty() {
            frame.render_widget(widgets::empty_panel(title, "No data", &self.theme), area);
        } else {
            frame.render_widget(widgets::average_chart(title, series, color), area);
        }
    }

    fn render_tables(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        snapshot: &Option<Arc<Snapshot>>,
        series: &ChartSeries,
    ) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(area);

        frame.render_widget(
            widgets::developer_table(&series.top_developers, &self.theme),
            columns[0],
        );

        let games = snapshot
            .as_ref()
            .map(|snapshot| snapshot.games.as_slice())
            .unwrap_or(&[]);
        if self.table.selected().map_or(false, |idx| idx >= games.len()) {
            self.table.select(games.len().checked_sub(1));
        }
        frame.render_stateful_widget(
            widgets::games_table(games, &self.theme),
            columns[1],
            &mut self.table,
        );
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let help = Paragraph::new(Line::from(Span::styled(
            "q quit • r reload • j/k scroll • edits to the log refresh automatically",
            Style::default().fg(self.theme.muted),
        )));
        frame.render_widget(help, area);
    }
}

/// Poller callback that wakes the event loop. Repeated changes before the
/// loop wakes collapse into one reload and are never lost.
fn refresh_trigger(refresh: Arc<Notify>) -> impl FnMut() + Send + 'static {
    move || refresh.notify_one()
}

/// Status line after a load, describing the snapshot actually on screen.
fn loaded_status(state: &DashboardState) -> String {
    match &state.snapshot {
        Some(snapshot) => format!(
            "Showing {} games fetched at {}",
            snapshot.games.len(),
            snapshot.fetched_at.with_timezone(&Local).format("%H:%M:%S")
        ),
        None => "No data yet".to_string(),
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}
