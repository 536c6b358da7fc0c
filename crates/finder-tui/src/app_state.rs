//! AppState — shared read-only data passed to all components during render/event.
//!
//! Components read this but never mutate it.  The App event loop is the only
//! writer; it refreshes `channels` from the `SearchStore` whenever the core
//! broadcasts an update.

use std::collections::VecDeque;

use finder_proto::protocol::ChannelSnapshot;

const MAX_LOGS: usize = 200;

/// Braille spinner frames, advanced by the UI tick.
pub const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Default)]
pub struct AppState {
    /// One snapshot per channel, in pane order.
    pub channels: Vec<ChannelSnapshot>,
    pub spinner_frame: usize,
    pub logs: VecDeque<String>,
    pub show_help: bool,
}

impl AppState {
    pub fn spinner(&self) -> &'static str {
        SPINNER[self.spinner_frame % SPINNER.len()]
    }

    pub fn any_loading(&self) -> bool {
        self.channels.iter().any(|c| c.loading)
    }

    pub fn push_log(&mut self, line: String) {
        if self.logs.len() == MAX_LOGS {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    pub fn last_log(&self) -> Option<&str> {
        self.logs.back().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_ring_is_bounded() {
        let mut state = AppState::default();
        for i in 0..(MAX_LOGS + 5) {
            state.push_log(format!("line {}", i));
        }
        assert_eq!(state.logs.len(), MAX_LOGS);
        assert_eq!(state.logs.front().map(String::as_str), Some("line 5"));
        assert_eq!(state.last_log(), Some(format!("line {}", MAX_LOGS + 4).as_str()));
    }

    #[test]
    fn test_any_loading() {
        let mut state = AppState::default();
        assert!(!state.any_loading());
        state.channels.push(ChannelSnapshot {
            name: "news".into(),
            loading: true,
            ..Default::default()
        });
        assert!(state.any_loading());
    }
}
