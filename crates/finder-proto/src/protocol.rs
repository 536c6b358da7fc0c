use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// API family behind a channel.  Decides request parameters and how the
/// response envelope is unwrapped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Programs,
    News,
    Events,
    Images,
    Jobs,
    Quotes,
}

impl ChannelKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Programs => "programs",
            Self::News => "news",
            Self::Events => "events",
            Self::Images => "images",
            Self::Jobs => "jobs",
            Self::Quotes => "quotes",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One raw input observation (a keystroke or a field mutation).
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub text: String,
    pub at: Instant,
}

impl QueryEvent {
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            at: Instant::now(),
        }
    }
}

/// An outstanding request for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightRequest {
    pub channel: String,
    /// Strictly increasing per channel, starting at 1.
    pub seq: u64,
    pub query: String,
    pub offset: u32,
}

/// A normalized result row.  Every source maps its own payload into this.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchItem {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub published: Option<DateTime<FixedOffset>>,
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchPayload {
    pub items: Vec<SearchItem>,
    /// Total hit count when the API reports pagination metadata.
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
}

impl SearchPayload {
    /// Offset of the following page, if there is one.
    pub fn next_offset(&self) -> Option<u32> {
        if self.limit == 0 {
            return None;
        }
        let next = self.offset.saturating_add(self.limit);
        match self.total {
            Some(total) if u64::from(next) >= total => None,
            // Without a total, a short page means we reached the end.
            None if (self.items.len() as u32) < self.limit => None,
            _ => Some(next),
        }
    }

    /// Offset of the preceding page, if we are not on the first one.
    pub fn prev_offset(&self) -> Option<u32> {
        if self.offset == 0 {
            return None;
        }
        Some(self.offset.saturating_sub(self.limit.max(1)))
    }
}

/// Transport-level failure of a request function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("request timed out")]
    Timeout,
}

/// Visible lifecycle of a channel.  `Superseded` never shows up here: a
/// channel whose response was discarded keeps reporting `Loading` until the
/// winning response lands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    #[default]
    Idle,
    Loading,
    Applied,
    Errored,
}

impl ChannelStatus {
    /// Short label for badges / status bar.
    pub fn badge_label(self) -> Option<&'static str> {
        match self {
            Self::Idle => None,
            Self::Loading => Some("…"),
            Self::Applied => None,
            Self::Errored => Some("ERR"),
        }
    }
}

/// Read-only view of one channel, published after every state change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChannelSnapshot {
    pub name: String,
    pub kind: Option<ChannelKind>,
    pub status: ChannelStatus,
    pub loading: bool,
    pub error: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub result: Option<SearchPayload>,
    pub last_issued: u64,
    pub last_applied: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(offset: u32, limit: u32, items: usize, total: Option<u64>) -> SearchPayload {
        SearchPayload {
            items: vec![SearchItem::default(); items],
            total,
            offset,
            limit,
        }
    }

    #[test]
    fn test_next_offset_respects_total() {
        assert_eq!(page(0, 10, 10, Some(25)).next_offset(), Some(10));
        assert_eq!(page(20, 10, 5, Some(25)).next_offset(), None);
        assert_eq!(page(10, 10, 10, Some(20)).next_offset(), None);
    }

    #[test]
    fn test_next_offset_without_total_uses_page_fill() {
        assert_eq!(page(0, 10, 10, None).next_offset(), Some(10));
        assert_eq!(page(10, 10, 3, None).next_offset(), None);
    }

    #[test]
    fn test_prev_offset_clamps_at_zero() {
        assert_eq!(page(0, 10, 10, None).prev_offset(), None);
        assert_eq!(page(10, 10, 10, None).prev_offset(), Some(0));
        assert_eq!(page(5, 10, 10, None).prev_offset(), Some(0));
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ChannelKind::Programs).unwrap();
        assert_eq!(json, "\"programs\"");
        let kind: ChannelKind = serde_json::from_str("\"news\"").unwrap();
        assert_eq!(kind, ChannelKind::News);
    }
}
