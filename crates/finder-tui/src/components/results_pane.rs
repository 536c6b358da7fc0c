//! ResultsPane component — one channel's current page of results.
//!
//! Owns only selection state; everything it shows comes from the channel's
//! `ChannelSnapshot` in `AppState`.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use finder_proto::protocol::{ChannelSnapshot, ChannelStatus, SearchPayload};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{
        style_default, style_muted, style_secondary, style_selected, style_selected_focused,
        C_APPLIED, C_DATE, C_ERROR, C_LOADING, C_URL,
    },
    widgets::pane_chrome::{pane_chrome, Badge},
};

/// Rows per result: title, then summary.
const ROWS_PER_ITEM: usize = 2;

pub struct ResultsPane {
    index: usize,
    selected: usize,
    /// `last_applied` of the page the selection belongs to.
    page_seq: u64,
}

impl ResultsPane {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            selected: 0,
            page_seq: 0,
        }
    }

    fn snapshot<'a>(&self, state: &'a AppState) -> Option<&'a ChannelSnapshot> {
        state.channels.get(self.index)
    }

    fn item_count(&self, state: &AppState) -> usize {
        self.snapshot(state)
            .and_then(|s| s.result.as_ref())
            .map_or(0, |p| p.items.len())
    }

    #[cfg(test)]
    pub fn selected(&self) -> usize {
        self.selected
    }
}

impl Component for ResultsPane {
    fn id(&self) -> ComponentId {
        ComponentId::Results(self.index)
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let Some(snap) = self.snapshot(state) else {
            return vec![];
        };
        let count = self.item_count(state);

        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < count {
                    self.selected += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => self.selected = count.saturating_sub(1),
            KeyCode::Char('n') | KeyCode::Right => {
                return vec![Action::NextPage(snap.name.clone())];
            }
            KeyCode::Char('p') | KeyCode::Left => {
                return vec![Action::PrevPage(snap.name.clone())];
            }
            KeyCode::Char('y') | KeyCode::Enter => {
                let url = snap
                    .result
                    .as_ref()
                    .and_then(|p| p.items.get(self.selected))
                    .and_then(|item| item.url.clone());
                if let Some(url) = url {
                    return vec![Action::CopyToClipboard(url)];
                }
            }
            _ => {}
        }
        vec![]
    }

    fn on_state_changed(&mut self, state: &AppState) {
        let Some(snap) = self.snapshot(state) else {
            return;
        };
        // New page: start at the top
        if snap.last_applied != self.page_seq {
            self.page_seq = snap.last_applied;
            self.selected = 0;
        }
        self.selected = self.selected.min(self.item_count(state).saturating_sub(1));
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let Some(snap) = self.snapshot(state) else {
            return;
        };
        let title = snap.kind.map_or(snap.name.as_str(), |k| k.label());
        let number_key = char::from_digit((self.index + 1) as u32, 10);
        let block = pane_chrome(
            title,
            number_key,
            focused,
            badge(snap, state.spinner()),
            snap.result.as_ref().and_then(paging_hint),
        );
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let width = inner.width as usize;
        let height = inner.height as usize;
        let lines = match (&snap.result, snap.status) {
            (None, ChannelStatus::Errored) => vec![Line::from(Span::styled(
                truncate_text(snap.error_message.as_deref().unwrap_or("request failed"), width),
                Style::default().fg(C_ERROR),
            ))],
            (None, ChannelStatus::Loading) => {
                vec![Line::from(Span::styled("searching…", style_muted()))]
            }
            (None, _) => vec![Line::from(Span::styled("", style_muted()))],
            (Some(page), _) if page.items.is_empty() => vec![Line::from(Span::styled(
                truncate_text(
                    &format!("no matches for “{}”", snap.query.as_deref().unwrap_or("")),
                    width,
                ),
                style_muted(),
            ))],
            (Some(page), _) => item_lines(page, self.selected, focused, width, height),
        };
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

fn badge(snap: &ChannelSnapshot, spinner: &'static str) -> Option<Badge> {
    match snap.status {
        ChannelStatus::Loading => Some(Badge {
            text: spinner.to_string(),
            color: C_LOADING,
        }),
        ChannelStatus::Errored => Some(Badge {
            text: ChannelStatus::Errored.badge_label().unwrap_or("ERR").to_string(),
            color: C_ERROR,
        }),
        ChannelStatus::Applied => snap.result.as_ref().map(|p| Badge {
            text: range_label(p),
            color: C_APPLIED,
        }),
        ChannelStatus::Idle => None,
    }
}

/// "11-20 of 42", or "11-20" when the source reports no total.
fn range_label(page: &SearchPayload) -> String {
    if page.items.is_empty() {
        return "0".to_string();
    }
    let first = page.offset as u64 + 1;
    let last = page.offset as u64 + page.items.len() as u64;
    match page.total {
        Some(total) => format!("{}-{} of {}", first, last, total),
        None => format!("{}-{}", first, last),
    }
}

fn paging_hint(page: &SearchPayload) -> Option<String> {
    match (page.prev_offset().is_some(), page.next_offset().is_some()) {
        (true, true) => Some(" ‹p n› ".to_string()),
        (true, false) => Some(" ‹p ".to_string()),
        (false, true) => Some(" n› ".to_string()),
        (false, false) => None,
    }
}

fn item_lines(
    page: &SearchPayload,
    selected: usize,
    focused: bool,
    width: usize,
    height: usize,
) -> Vec<Line<'static>> {
    // Keep the selection on screen
    let visible = (height / ROWS_PER_ITEM).max(1);
    let first = selected.saturating_sub(visible - 1);

    let mut lines = Vec::new();
    for (idx, item) in page.items.iter().enumerate().skip(first).take(visible) {
        let title_style = match (idx == selected, focused) {
            (true, true) => style_selected_focused(),
            (true, false) => style_selected(),
            _ => style_default(),
        };
        let date = item
            .published
            .map(|d| format!("  {}", d.format("%Y-%m-%d")))
            .unwrap_or_default();
        let title_width = width.saturating_sub(date.width());
        lines.push(Line::from(vec![
            Span::styled(truncate_text(&item.title, title_width), title_style),
            Span::styled(date, Style::default().fg(C_DATE)),
        ]));

        let detail = match (&item.summary, &item.url) {
            (Some(summary), _) => Span::styled(truncate_text(summary, width), style_secondary()),
            (None, Some(url)) => {
                Span::styled(truncate_text(url, width), Style::default().fg(C_URL))
            }
            (None, None) => Span::raw(""),
        };
        lines.push(Line::from(detail));
    }
    lines
}

/// Cut `text` to `max_width` terminal columns, ending in "..." when cut.
pub(crate) fn truncate_text(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }

    let mut result = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let char_width = ch.width().unwrap_or(0);
        if width + char_width + 3 > max_width {
            break;
        }
        result.push(ch);
        width += char_width;
    }
    result + "..."
}

#[cfg(test)]
mod tests {
    use super::*;
    use finder_proto::protocol::SearchItem;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn state_with(items: &[(&str, Option<&str>)], last_applied: u64) -> AppState {
        let page = SearchPayload {
            items: items
                .iter()
                .map(|(title, url)| SearchItem {
                    title: title.to_string(),
                    url: url.map(str::to_string),
                    ..Default::default()
                })
                .collect(),
            total: Some(42),
            offset: 10,
            limit: 10,
        };
        AppState {
            channels: vec![ChannelSnapshot {
                name: "programs".into(),
                status: ChannelStatus::Applied,
                query: Some("bio".into()),
                result: Some(page),
                last_issued: last_applied,
                last_applied,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_truncate_text_respects_wide_chars() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdefghij", 8), "abcde...");
        // each CJK char is two columns wide
        assert_eq!(truncate_text("日本語のテキスト", 9), "日本語...");
    }

    #[test]
    fn test_range_label() {
        let state = state_with(&[("a", None), ("b", None)], 1);
        let page = state.channels[0].result.as_ref().unwrap();
        assert_eq!(range_label(page), "11-12 of 42");
    }

    #[test]
    fn test_selection_and_copy() {
        let state = state_with(&[("Biology", None), ("Biochem", Some("https://x/biochem"))], 1);
        let mut pane = ResultsPane::new(0);
        pane.on_state_changed(&state);

        assert!(pane.handle_key(key('y'), &state).is_empty());
        pane.handle_key(key('j'), &state);
        pane.handle_key(key('j'), &state);
        assert_eq!(pane.selected(), 1);
        assert_eq!(
            pane.handle_key(key('y'), &state),
            vec![Action::CopyToClipboard("https://x/biochem".into())]
        );
        assert_eq!(pane.handle_key(key('n'), &state), vec![Action::NextPage("programs".into())]);
    }

    #[test]
    fn test_new_page_resets_selection() {
        let mut pane = ResultsPane::new(0);
        let state = state_with(&[("a", None), ("b", None), ("c", None)], 1);
        pane.on_state_changed(&state);
        pane.handle_key(key('G'), &state);
        assert_eq!(pane.selected(), 2);

        pane.on_state_changed(&state_with(&[("d", None), ("e", None), ("f", None)], 2));
        assert_eq!(pane.selected(), 0);
    }
}
