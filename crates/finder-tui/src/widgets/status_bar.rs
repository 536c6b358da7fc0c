//! Status bar — last log line plus a keybindings footer.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_ACCENT, C_APPLIED, C_LOADING, C_MUTED, C_SECONDARY, C_SEPARATOR};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    /// Keys go to the search box.
    Search,
    /// Keys go to a results pane.
    Browse,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Search => "SEARCH",
            Self::Browse => "BROWSE",
        }
    }
}

/// Draw the log bar: activity dot and the last log line.
pub fn draw_log_bar(frame: &mut Frame, area: Rect, last_log: Option<&str>, busy: bool) {
    let dot = if busy {
        Span::styled("●", Style::default().fg(C_LOADING))
    } else {
        Span::styled("●", Style::default().fg(C_APPLIED))
    };
    let log_span = Span::styled(last_log.unwrap_or(""), Style::default().fg(C_SECONDARY));

    let line = Line::from(vec![dot, Span::raw(" "), log_span]);
    frame.render_widget(Paragraph::new(line), area);
}

pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode) {
    let keys = match mode {
        InputMode::Search => " type to search  Enter/Tab results  Esc clear  Ctrl-C quit",
        InputMode::Browse => {
            " ↑↓/jk select  n/p page  y copy url  Tab/1-9 panes  / search  ? help  q quit"
        }
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
