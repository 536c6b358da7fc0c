/// SearchCore — single-owner event loop for every channel's search state.
///
/// Debouncers, request tasks, the TUI and the HTTP API never touch channel
/// state directly: they send `SearchEvent` messages to this loop.  SearchCore
/// owns each channel's `ChannelState` and `Dispatcher` exclusively.
///
/// After every event that changes a channel, the new snapshot is written to
/// the `SearchStore` and a `BroadcastMessage::ChannelUpdated` goes out on the
/// broadcast channel so readers know to re-fetch.
use std::sync::Arc;

use anyhow::anyhow;
use finder_proto::config::{ChannelConfig, Config, SearchConfig};
use finder_proto::protocol::{FetchError, QueryEvent, SearchPayload};
use finder_proto::state::{ChannelState, Resolution, SearchStore};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::debounce;
use crate::dispatch::{Dispatched, Dispatcher};
use crate::gate::{GateDecision, QueryGate};
use crate::sources::{HttpSource, SearchSource};
use crate::BroadcastMessage;

// ── SearchEvent ───────────────────────────────────────────────────────────────

/// All inputs into the SearchCore loop.
#[derive(Debug)]
pub enum SearchEvent {
    /// A channel's debouncer settled on a query.
    QuerySettled { channel: String, query: String },
    /// Re-run the channel's current query at `offset`.
    RequestPage { channel: String, offset: u32 },
    NextPage { channel: String },
    PrevPage { channel: String },
    /// A request task finished.
    Response {
        channel: String,
        seq: u64,
        query: String,
        offset: u32,
        outcome: Result<SearchPayload, FetchError>,
    },
    Shutdown,
}

// ── SearchHandle ──────────────────────────────────────────────────────────────

/// Cloneable front door used by the TUI and the HTTP API.
#[derive(Clone)]
pub struct SearchHandle {
    events: mpsc::Sender<SearchEvent>,
    /// Debouncer inputs, one per channel.
    inputs: Arc<Vec<mpsc::Sender<QueryEvent>>>,
}

impl SearchHandle {
    /// Feed the raw search box value to every channel's debouncer.
    pub async fn on_query_changed(&self, query: &str) -> anyhow::Result<()> {
        for input in self.inputs.iter() {
            input
                .send(QueryEvent::now(query))
                .await
                .map_err(|_| anyhow!("debouncer has stopped"))?;
        }
        Ok(())
    }

    pub async fn request_page(&self, channel: &str, offset: u32) -> anyhow::Result<()> {
        self.send(SearchEvent::RequestPage {
            channel: channel.to_string(),
            offset,
        })
        .await
    }

    pub async fn next_page(&self, channel: &str) -> anyhow::Result<()> {
        self.send(SearchEvent::NextPage {
            channel: channel.to_string(),
        })
        .await
    }

    pub async fn prev_page(&self, channel: &str) -> anyhow::Result<()> {
        self.send(SearchEvent::PrevPage {
            channel: channel.to_string(),
        })
        .await
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.send(SearchEvent::Shutdown).await
    }

    async fn send(&self, event: SearchEvent) -> anyhow::Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| anyhow!("search core has stopped"))
    }
}

// ── SearchCore ────────────────────────────────────────────────────────────────

struct Channel {
    gate: QueryGate,
    state: ChannelState,
    dispatcher: Dispatcher,
    debouncer: JoinHandle<()>,
}

pub struct SearchCore {
    channels: Vec<Channel>,
    store: SearchStore,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
}

impl SearchCore {
    /// Wire one channel per `(config, source)` pair.  Must run inside a tokio
    /// runtime: each channel gets its debouncer task here.
    pub fn new(
        search: &SearchConfig,
        channels: Vec<(ChannelConfig, Arc<dyn SearchSource>)>,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
        event_tx: mpsc::Sender<SearchEvent>,
    ) -> (Self, SearchHandle) {
        let mut wired = Vec::with_capacity(channels.len());
        let mut inputs = Vec::with_capacity(channels.len());

        for (config, source) in channels {
            let (input_tx, input_rx) = mpsc::channel::<QueryEvent>(64);
            let name = config.name.clone();
            let debouncer = debounce::spawn(
                config.debounce(search),
                input_rx,
                event_tx.clone(),
                move |query| SearchEvent::QuerySettled {
                    channel: name.clone(),
                    query,
                },
            );
            info!(
                "SearchCore: channel {} ({}) min_len={} debounce={:?} cache={}",
                config.name,
                config.kind,
                config.min_query_len(search),
                config.debounce(search),
                config.cache_capacity
            );
            wired.push(Channel {
                gate: QueryGate::new(config.min_query_len(search)),
                state: ChannelState::new(config.name.clone(), Some(config.kind)),
                dispatcher: Dispatcher::new(
                    source,
                    config.cache_capacity,
                    search.abort_superseded,
                    event_tx.clone(),
                ),
                debouncer,
            });
            inputs.push(input_tx);
        }

        let store = SearchStore::new(wired.iter().map(|c| c.state.snapshot()).collect());
        let handle = SearchHandle {
            events: event_tx,
            inputs: Arc::new(inputs),
        };
        (
            Self {
                channels: wired,
                store,
                broadcast_tx,
            },
            handle,
        )
    }

    /// Build HTTP-backed channels for every enabled channel in `config`.
    pub fn from_config(
        config: &Config,
        client: reqwest::Client,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
        event_tx: mpsc::Sender<SearchEvent>,
    ) -> (Self, SearchHandle) {
        let channels = config
            .enabled_channels()
            .map(|c| {
                let source: Arc<dyn SearchSource> = Arc::new(HttpSource::new(client.clone(), c));
                (c.clone(), source)
            })
            .collect();
        Self::new(&config.search, channels, broadcast_tx, event_tx)
    }

    /// Borrow the store (for the TUI and the HTTP server).
    pub fn store(&self) -> SearchStore {
        self.store.clone()
    }

    /// Run the core event loop.  Returns on `Shutdown` or once every sender
    /// is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<SearchEvent>) -> anyhow::Result<()> {
        info!("SearchCore: starting event loop");

        loop {
            match event_rx.recv().await {
                None => {
                    info!("SearchCore: event channel closed, shutting down");
                    break;
                }
                Some(SearchEvent::Shutdown) => {
                    info!("SearchCore: shutdown requested");
                    break;
                }
                Some(SearchEvent::QuerySettled { channel, query }) => {
                    self.on_query_settled(&channel, &query).await;
                }
                Some(SearchEvent::RequestPage { channel, offset }) => {
                    self.on_request_page(&channel, offset).await;
                }
                Some(SearchEvent::NextPage { channel }) => {
                    match self.page_step(&channel, SearchPayload::next_offset) {
                        Some(offset) => self.on_request_page(&channel, offset).await,
                        None => debug!("{}: no next page", channel),
                    }
                }
                Some(SearchEvent::PrevPage { channel }) => {
                    match self.page_step(&channel, SearchPayload::prev_offset) {
                        Some(offset) => self.on_request_page(&channel, offset).await,
                        None => debug!("{}: no previous page", channel),
                    }
                }
                Some(SearchEvent::Response {
                    channel,
                    seq,
                    query,
                    offset,
                    outcome,
                }) => {
                    self.on_response(&channel, seq, &query, offset, outcome).await;
                }
            }
        }

        for ch in &mut self.channels {
            ch.dispatcher.cancel();
            ch.debouncer.abort();
        }
        Ok(())
    }

    fn channel(&self, name: &str) -> Option<usize> {
        let idx = self.channels.iter().position(|c| c.state.name() == name);
        if idx.is_none() {
            warn!("SearchCore: unknown channel {:?}", name);
        }
        idx
    }

    /// Offset one page away from the page on screen.  Only a page of the
    /// current query counts: after a failed search the list still showing
    /// belongs to an older query and says nothing about this one.
    fn page_step(&self, channel: &str, step: fn(&SearchPayload) -> Option<u32>) -> Option<u32> {
        let idx = self.channel(channel)?;
        let state = &self.channels[idx].state;
        match state.current_page() {
            Some(page) => step(page),
            None => {
                debug!(
                    "{}: no page of {:?} to move from",
                    channel,
                    state.query().unwrap_or("")
                );
                None
            }
        }
    }

    async fn on_query_settled(&mut self, channel: &str, query: &str) {
        let Some(idx) = self.channel(channel) else {
            return;
        };

        match self.channels[idx].gate.check(query) {
            GateDecision::Reject => {
                let ch = &mut self.channels[idx];
                let showing = ch.state.query().is_some() || ch.state.loading();
                if showing {
                    debug!(
                        "{}: query {:?} under {} chars, clearing",
                        channel,
                        query,
                        ch.gate.min_len()
                    );
                    ch.dispatcher.cancel();
                    ch.state.clear();
                    self.publish(idx).await;
                }
            }
            GateDecision::Accept(query) => {
                let state = &self.channels[idx].state;
                // Only whitespace changed: the page on screen is already right
                let unchanged = state.query() == Some(query.as_str())
                    && state.offset() == 0
                    && !state.error();
                if unchanged {
                    debug!("{}: {:?} unchanged after trim", channel, query);
                    return;
                }
                self.submit(idx, query, 0).await;
            }
        }
    }

    async fn on_request_page(&mut self, channel: &str, offset: u32) {
        let Some(idx) = self.channel(channel) else {
            return;
        };
        let current = self.channels[idx].state.query().map(str::to_string);
        let Some(query) = current else {
            warn!("{}: page {} requested without an active query", channel, offset);
            return;
        };
        match self.channels[idx].gate.check(&query) {
            GateDecision::Accept(query) => self.submit(idx, query, offset).await,
            GateDecision::Reject => {
                debug!("{}: stored query {:?} no longer passes", channel, query)
            }
        }
    }

    async fn submit(&mut self, idx: usize, query: String, offset: u32) {
        let ch = &mut self.channels[idx];
        let req = ch.state.begin(&query, offset);
        let seq = req.seq;
        let dispatched = ch.dispatcher.dispatch(req);
        self.publish(idx).await;

        if let Dispatched::Cached(payload) = dispatched {
            let name = self.channels[idx].state.name().to_string();
            self.on_response(&name, seq, &query, offset, Ok(payload)).await;
        }
    }

    async fn on_response(
        &mut self,
        channel: &str,
        seq: u64,
        query: &str,
        offset: u32,
        outcome: Result<SearchPayload, FetchError>,
    ) {
        let Some(idx) = self.channel(channel) else {
            return;
        };
        let ch = &mut self.channels[idx];
        if let Ok(payload) = &outcome {
            ch.dispatcher.remember(query, offset, payload);
        }

        let failure = outcome.as_ref().err().map(|e| e.to_string());
        match ch.state.resolve(seq, outcome) {
            Resolution::Applied => {
                let count = ch.state.result().map_or(0, |p| p.items.len());
                info!("{}: seq={} {:?}@{} → {} items", channel, seq, query, offset, count);
            }
            Resolution::Errored => {
                let msg = failure.unwrap_or_default();
                warn!("{}: seq={} {:?} failed: {}", channel, seq, query, msg);
                let _ = self
                    .broadcast_tx
                    .send(BroadcastMessage::Log(format!("{}: {}", channel, msg)));
            }
            Resolution::Superseded => return,
        }
        self.publish(idx).await;
    }

    async fn publish(&self, idx: usize) {
        let state = &self.channels[idx].state;
        self.store.publish(state.snapshot()).await;
        let _ = self
            .broadcast_tx
            .send(BroadcastMessage::ChannelUpdated(state.name().to_string()));
    }
}
