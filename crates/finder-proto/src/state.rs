//! Per-channel search state and the latest-wins resolution rule.
//!
//! `ChannelState` is owned exclusively by the search core; readers only ever
//! see `ChannelSnapshot`s published into a `SearchStore`.

use crate::protocol::{
    ChannelKind, ChannelSnapshot, ChannelStatus, FetchError, InFlightRequest, SearchPayload,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// What happened to a response handed to [`ChannelState::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Response belonged to the newest request and replaced the result list.
    Applied,
    /// Newest request failed; error flag set, result list untouched.
    Errored,
    /// A newer request was issued (or the channel was cleared) first.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct ChannelState {
    name: String,
    kind: Option<ChannelKind>,
    last_issued: u64,
    last_applied: u64,
    /// Requests with `seq <= invalidated_through` were cancelled by a clear.
    invalidated_through: u64,
    loading: bool,
    status: ChannelStatus,
    query: Option<String>,
    offset: u32,
    result: Option<SearchPayload>,
    /// Query that produced `result`; differs from `query` after a failed search.
    result_query: Option<String>,
    error: Option<FetchError>,
}

impl ChannelState {
    pub fn new(name: impl Into<String>, kind: Option<ChannelKind>) -> Self {
        Self {
            name: name.into(),
            kind,
            last_issued: 0,
            last_applied: 0,
            invalidated_through: 0,
            loading: false,
            status: ChannelStatus::Idle,
            query: None,
            offset: 0,
            result: None,
            result_query: None,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> bool {
        self.error.is_some()
    }

    pub fn result(&self) -> Option<&SearchPayload> {
        self.result.as_ref()
    }

    /// The result list, but only while it still belongs to the current query.
    pub fn current_page(&self) -> Option<&SearchPayload> {
        match (&self.result_query, &self.query) {
            (Some(shown), Some(current)) if shown == current => self.result.as_ref(),
            _ => None,
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn last_issued(&self) -> u64 {
        self.last_issued
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    /// Register a new request.  Supersedes everything issued before it.
    pub fn begin(&mut self, query: &str, offset: u32) -> InFlightRequest {
        self.last_issued += 1;
        self.loading = true;
        self.status = ChannelStatus::Loading;
        self.query = Some(query.to_string());
        self.offset = offset;
        InFlightRequest {
            channel: self.name.clone(),
            seq: self.last_issued,
            query: query.to_string(),
            offset,
        }
    }

    /// True when a response for `seq` would still be applied.
    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.last_issued && seq > self.invalidated_through && seq > self.last_applied
    }

    /// Feed a response.  Only the newest outstanding request can change state.
    pub fn resolve(
        &mut self,
        seq: u64,
        outcome: Result<SearchPayload, FetchError>,
    ) -> Resolution {
        if !self.is_current(seq) {
            debug!(
                "{}: dropping stale response seq={} (issued={}, applied={})",
                self.name, seq, self.last_issued, self.last_applied
            );
            return Resolution::Superseded;
        }

        self.loading = false;
        self.last_applied = seq;
        match outcome {
            Ok(payload) => {
                self.result = Some(payload);
                self.result_query = self.query.clone();
                self.error = None;
                self.status = ChannelStatus::Applied;
                Resolution::Applied
            }
            Err(e) => {
                self.error = Some(e);
                self.status = ChannelStatus::Errored;
                Resolution::Errored
            }
        }
    }

    /// Back to the "no query" state.  Anything still in flight is invalidated.
    pub fn clear(&mut self) {
        self.invalidated_through = self.last_issued;
        self.loading = false;
        self.status = ChannelStatus::Idle;
        self.query = None;
        self.offset = 0;
        self.result = None;
        self.result_query = None;
        self.error = None;
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            name: self.name.clone(),
            kind: self.kind,
            status: self.status,
            loading: self.loading,
            error: self.error.is_some(),
            error_message: self.error.as_ref().map(|e| e.to_string()),
            query: self.query.clone(),
            offset: self.offset,
            result: self.result.clone(),
            last_issued: self.last_issued,
            last_applied: self.last_applied,
        }
    }
}

/// Shared, read-mostly view of every channel.  The search core writes,
/// everyone else reads.
#[derive(Clone)]
pub struct SearchStore {
    channels: Arc<RwLock<Vec<ChannelSnapshot>>>,
}

impl SearchStore {
    /// Channels keep the order given here (which is also the pane order).
    pub fn new(initial: Vec<ChannelSnapshot>) -> Self {
        Self {
            channels: Arc::new(RwLock::new(initial)),
        }
    }

    pub async fn publish(&self, snapshot: ChannelSnapshot) {
        let mut channels = self.channels.write().await;
        match channels.iter_mut().find(|c| c.name == snapshot.name) {
            Some(slot) => *slot = snapshot,
            None => channels.push(snapshot),
        }
    }

    pub async fn get(&self, name: &str) -> Option<ChannelSnapshot> {
        self.channels
            .read()
            .await
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    pub async fn all(&self) -> Vec<ChannelSnapshot> {
        self.channels.read().await.clone()
    }

    pub async fn names(&self) -> Vec<String> {
        self.channels
            .read()
            .await
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }
}
