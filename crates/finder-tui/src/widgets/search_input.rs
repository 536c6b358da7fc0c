//! SearchInput — wraps tui-input for the always-visible search box.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_INPUT_BG, C_INPUT_FG, C_MUTED};

#[derive(Debug, PartialEq)]
pub enum SearchAction {
    Changed(String),
    /// Enter: move on to the results.
    Confirmed,
    None,
}

pub struct SearchInput {
    input: Input,
    placeholder: String,
}

impl SearchInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            placeholder: placeholder.into(),
        }
    }

    #[cfg(test)]
    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Handle a key event.  Only edits that change the value report `Changed`,
    /// so cursor movement never reaches the search pipeline.
    ///
    /// Esc clears the box; on an empty box it does nothing.
    pub fn handle_key(&mut self, key: KeyEvent) -> SearchAction {
        match key.code {
            KeyCode::Esc => {
                if self.input.value().is_empty() {
                    SearchAction::None
                } else {
                    self.input = Input::default();
                    SearchAction::Changed(String::new())
                }
            }
            KeyCode::Enter => SearchAction::Confirmed,
            _ => {
                let before = self.input.value().to_string();
                self.input.handle_event(&Event::Key(key));
                if self.input.value() == before {
                    SearchAction::None
                } else {
                    SearchAction::Changed(self.input.value().to_string())
                }
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, focused: bool, spinner: Option<&str>) {
        let prefix = match spinner {
            Some(frame) => format!("{} ", frame),
            None => "> ".to_string(),
        };
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(prefix.chars().count() as u16 + 1) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(
                format!("{}{}", prefix, self.placeholder),
                Style::default().fg(C_MUTED),
            )
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(format!("{}{}", prefix, visible), Style::default().fg(C_INPUT_FG))
        };

        let paragraph =
            Paragraph::new(Line::from(vec![display])).style(Style::default().bg(C_INPUT_BG));
        frame.render_widget(paragraph, area);

        if focused {
            let offset = prefix.chars().count() + self.input.visual_cursor().saturating_sub(scroll);
            let cursor_x = area.x + offset as u16;
            let max_x = area.x + area.width.saturating_sub(1);
            frame.set_cursor_position((cursor_x.min(max_x), area.y));
        }
    }
}

impl Default for SearchInput {
    fn default() -> Self {
        Self::new("search programs, news, events…")
    }
}
