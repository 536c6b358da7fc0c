//! App — component-based terminal event loop.
//!
//! Architecture:
//! - `App` owns the search box, one `ResultsPane` per channel and `AppState`
//!   (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from the terminal
//!   reader and the broadcast forwarder.
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action, forwarding
//!   search intents to the core through the `SearchHandle`.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Frame, Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use finder_proto::state::SearchStore;

use crate::core::SearchHandle;
use crate::BroadcastMessage;
use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{help_overlay, results_pane::ResultsPane},
    widgets::{
        search_input::{SearchAction, SearchInput},
        status_bar::{self, InputMode},
    },
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    /// Some channel changed; re-read the store.
    ChannelsUpdated,
    Log(String),
}

/// Results panes per row.
const PANE_COLUMNS: usize = 2;

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    state: AppState,
    search: SearchInput,
    panes: Vec<ResultsPane>,
    focus: ComponentId,
    handle: SearchHandle,
    store: SearchStore,
    should_quit: bool,
}

impl App {
    pub async fn new(handle: SearchHandle, store: SearchStore) -> Self {
        let state = AppState {
            channels: store.all().await,
            ..Default::default()
        };
        let panes = (0..state.channels.len()).map(ResultsPane::new).collect();
        Self {
            state,
            search: SearchInput::default(),
            panes,
            focus: ComponentId::SearchBox,
            handle,
            store,
            should_quit: false,
        }
    }

    pub async fn run(
        mut self,
        mut broadcast_rx: broadcast::Receiver<BroadcastMessage>,
    ) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);
        self.state.push_log("finder started".to_string());

        // ── Background task: keyboard events ─────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (SearchCore → AppMessage) ─────
        let bc_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(msg) => {
                        let app_msg = match msg {
                            BroadcastMessage::ChannelUpdated(_) => AppMessage::ChannelsUpdated,
                            BroadcastMessage::Log(s) => AppMessage::Log(s),
                        };
                        if bc_tx.send(app_msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} messages", n);
                        // a refresh covers whatever was skipped
                        if bc_tx.send(AppMessage::ChannelsUpdated).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // Spinner animation while anything is loading
        let mut spinner_tick = tokio::time::interval(Duration::from_millis(100));
        spinner_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 256;
                    let mut refresh = false;
                    let mut next = Some(msg);
                    let mut drained = 0usize;
                    while let Some(msg) = next.take() {
                        match msg {
                            AppMessage::Event(ev) => self.handle_event(ev).await,
                            AppMessage::ChannelsUpdated => refresh = true,
                            AppMessage::Log(line) => self.state.push_log(line),
                        }
                        drained += 1;
                        if drained < MAX_DRAIN {
                            next = rx.try_recv().ok();
                        }
                    }
                    // Many updates collapse into one store read
                    if refresh {
                        self.refresh_channels().await;
                    }
                    needs_redraw = true;
                }

                _ = spinner_tick.tick() => {
                    if self.state.any_loading() {
                        self.state.spinner_frame = self.state.spinner_frame.wrapping_add(1);
                        needs_redraw = true;
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        info!("finder exiting");
        Ok(())
    }

    async fn refresh_channels(&mut self) {
        self.state.channels = self.store.all().await;
        for pane in &mut self.panes {
            pane.on_state_changed(&self.state);
        }
    }

    async fn handle_event(&mut self, ev: Event) {
        if let Event::Key(key) = ev {
            for action in self.handle_key(key) {
                self.dispatch(action).await;
            }
        }
    }

    // ── Keys ──────────────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return vec![Action::Quit];
        }
        if self.state.show_help {
            return match key.code {
                KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Esc => vec![Action::ToggleHelp],
                _ => vec![],
            };
        }
        match key.code {
            KeyCode::Tab => return vec![Action::FocusNext],
            KeyCode::BackTab => return vec![Action::FocusPrev],
            _ => {}
        }

        match self.focus {
            ComponentId::SearchBox => match self.search.handle_key(key) {
                SearchAction::Changed(value) => vec![Action::QueryChanged(value)],
                SearchAction::Confirmed if !self.panes.is_empty() => {
                    vec![Action::FocusPane(ComponentId::Results(0))]
                }
                SearchAction::Confirmed | SearchAction::None => vec![],
            },
            ComponentId::Results(idx) => match key.code {
                KeyCode::Char('q') => vec![Action::Quit],
                KeyCode::Char('?') => vec![Action::ToggleHelp],
                KeyCode::Char('/') | KeyCode::Esc => {
                    vec![Action::FocusPane(ComponentId::SearchBox)]
                }
                KeyCode::Char(c @ '1'..='9') => {
                    let target = c as usize - '1' as usize;
                    if target < self.panes.len() {
                        vec![Action::FocusPane(ComponentId::Results(target))]
                    } else {
                        vec![]
                    }
                }
                _ => match self.panes.get_mut(idx) {
                    Some(pane) => pane.handle_key(key, &self.state),
                    None => vec![],
                },
            },
        }
    }

    fn focus_order(&self) -> Vec<ComponentId> {
        std::iter::once(ComponentId::SearchBox)
            .chain((0..self.panes.len()).map(ComponentId::Results))
            .collect()
    }

    fn cycle_focus(&mut self, forward: bool) {
        let order = self.focus_order();
        let pos = order.iter().position(|id| *id == self.focus).unwrap_or(0);
        let next = if forward {
            (pos + 1) % order.len()
        } else {
            (pos + order.len() - 1) % order.len()
        };
        self.focus = order[next];
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        match action {
            Action::QueryChanged(query) => {
                if let Err(e) = self.handle.on_query_changed(&query).await {
                    warn!("query not delivered: {}", e);
                }
            }
            Action::NextPage(channel) => {
                if let Err(e) = self.handle.next_page(&channel).await {
                    warn!("{}: next page not delivered: {}", channel, e);
                }
            }
            Action::PrevPage(channel) => {
                if let Err(e) = self.handle.prev_page(&channel).await {
                    warn!("{}: previous page not delivered: {}", channel, e);
                }
            }
            Action::FocusNext => self.cycle_focus(true),
            Action::FocusPrev => self.cycle_focus(false),
            Action::FocusPane(id) => self.focus = id,
            Action::ToggleHelp => self.state.show_help = !self.state.show_help,
            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => self.state.push_log(format!("copied: {}", text)),
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.state.push_log(format!("clipboard error: {}", e));
                    }
                }
            }
            Action::Quit => {
                self.should_quit = true;
                if let Err(e) = self.handle.shutdown().await {
                    debug!("core already stopped: {}", e);
                }
            }
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // search box
                Constraint::Length(1), // separator
                Constraint::Min(3),    // results
                Constraint::Length(1), // log bar
                Constraint::Length(1), // keys bar
            ])
            .split(frame.area());

        let spinner = self.state.any_loading().then(|| self.state.spinner());
        self.search
            .draw(frame, rows[0], self.focus == ComponentId::SearchBox, spinner);
        status_bar::draw_separator(frame, rows[1]);

        let areas = pane_grid(rows[2], self.panes.len());
        for (pane, area) in self.panes.iter_mut().zip(areas) {
            let focused = self.focus == pane.id();
            pane.draw(frame, area, focused, &self.state);
        }

        status_bar::draw_log_bar(frame, rows[3], self.state.last_log(), self.state.any_loading());
        let mode = match self.focus {
            ComponentId::SearchBox => InputMode::Search,
            ComponentId::Results(_) => InputMode::Browse,
        };
        status_bar::draw_keys_bar(frame, rows[4], mode);

        if self.state.show_help {
            help_overlay::draw(frame, frame.area());
        }
    }
}

/// Split `area` into a grid of `count` panes, `PANE_COLUMNS` per row.
fn pane_grid(area: Rect, count: usize) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let row_count = count.div_ceil(PANE_COLUMNS);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, row_count as u32); row_count])
        .split(area);

    let mut out = Vec::with_capacity(count);
    for (r, row) in rows.iter().enumerate() {
        let in_row = (count - r * PANE_COLUMNS).min(PANE_COLUMNS);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, in_row as u32); in_row])
            .split(*row);
        out.extend(cols.iter().copied());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SearchCore;
    use crate::dispatch::tests::ManualSource;
    use crate::sources::SearchSource;
    use finder_proto::config::{ChannelConfig, SearchConfig};
    use finder_proto::protocol::ChannelKind;
    use std::sync::Arc;

    async fn app() -> App {
        let (broadcast_tx, _) = broadcast::channel(16);
        let (event_tx, _event_rx) = mpsc::channel(16);
        let channels = ["programs", "news", "jobs"]
            .iter()
            .map(|name| {
                let source: Arc<dyn SearchSource> = Arc::new(ManualSource::default());
                (ChannelConfig::new(name, ChannelKind::Programs, "http://x"), source)
            })
            .collect();
        let (core, handle) =
            SearchCore::new(&SearchConfig::default(), channels, broadcast_tx, event_tx);
        App::new(handle, core.store()).await
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_typing_in_search_box_emits_query() {
        let mut app = app().await;
        assert_eq!(
            app.handle_key(key(KeyCode::Char('q'))),
            vec![Action::QueryChanged("q".into())]
        );
    }

    #[tokio::test]
    async fn test_focus_cycles_through_panes() {
        let mut app = app().await;
        assert_eq!(app.panes.len(), 3);
        for expected in [
            ComponentId::Results(0),
            ComponentId::Results(1),
            ComponentId::Results(2),
            ComponentId::SearchBox,
        ] {
            app.cycle_focus(true);
            assert_eq!(app.focus, expected);
        }
        app.cycle_focus(false);
        assert_eq!(app.focus, ComponentId::Results(2));
    }

    #[tokio::test]
    async fn test_results_keys() {
        let mut app = app().await;
        app.focus = ComponentId::Results(0);
        assert_eq!(
            app.handle_key(key(KeyCode::Char('2'))),
            vec![Action::FocusPane(ComponentId::Results(1))]
        );
        assert!(app.handle_key(key(KeyCode::Char('9'))).is_empty());
        assert_eq!(
            app.handle_key(key(KeyCode::Char('n'))),
            vec![Action::NextPage("programs".into())]
        );
        assert_eq!(app.handle_key(key(KeyCode::Char('q'))), vec![Action::Quit]);
    }

    #[test]
    fn test_pane_grid_layout() {
        let areas = pane_grid(Rect::new(0, 0, 100, 40), 3);
        assert_eq!(areas.len(), 3);
        assert_eq!(areas[0].width, 50);
        assert_eq!(areas[2].width, 100);
        assert!(pane_grid(Rect::new(0, 0, 10, 10), 0).is_empty());
    }
}
