//! Help overlay — centered popup with the key reference.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::theme::{C_MUTED, C_PANEL_BORDER, C_PRIMARY, C_SECONDARY};

pub fn draw(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 19, area);

    let lines = vec![
        Line::from(Span::styled(
            " keyboard shortcuts",
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        section(" search box"),
        help_row("type", "search every channel (debounced)"),
        help_row("esc", "clear the query"),
        help_row("enter / tab", "jump to the first results pane"),
        Line::from(""),
        section(" results panes"),
        help_row("↑ / ↓  or  j / k", "move selection"),
        help_row("g / G", "first / last result"),
        help_row("n / p  or  → / ←", "next / previous page"),
        help_row("y / enter", "copy the selected url"),
        help_row("tab / shift-tab", "next / previous pane"),
        help_row("1-9", "focus pane"),
        help_row("/", "back to the search box"),
        help_row("q / ctrl-c", "quit"),
        Line::from(""),
        Line::from(Span::styled(" press ? or esc to close", Style::default().fg(C_MUTED))),
    ];

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(C_PANEL_BORDER))
                .style(Style::default().bg(Color::Rgb(18, 18, 26))),
        ),
        popup,
    );
}

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        title,
        Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD),
    ))
}

fn help_row<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw(" "),
        Span::styled(
            format!("{:<18}", key),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(desc, Style::default().fg(C_SECONDARY)),
    ])
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}
