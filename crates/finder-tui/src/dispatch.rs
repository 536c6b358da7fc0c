//! Request dispatcher — one per channel.
//!
//! Turns an `InFlightRequest` into exactly one call on the channel's
//! `SearchSource`, running on its own task and reporting back to the core as
//! a sequence-tagged `SearchEvent::Response`.  Cache hits skip the network and
//! are handed back to the caller, who resolves them like any other response.

use std::sync::Arc;

use finder_proto::protocol::{InFlightRequest, SearchPayload};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

use crate::cache::QueryCache;
use crate::core::SearchEvent;
use crate::sources::SearchSource;

#[derive(Debug, PartialEq)]
pub enum Dispatched {
    /// Request is running; its response will arrive on the event channel.
    Spawned,
    /// Served from the cache, no network involved.
    Cached(SearchPayload),
}

pub struct Dispatcher {
    source: Arc<dyn SearchSource>,
    cache: QueryCache,
    abort_superseded: bool,
    in_flight: Option<AbortHandle>,
    events: mpsc::Sender<SearchEvent>,
}

impl Dispatcher {
    pub fn new(
        source: Arc<dyn SearchSource>,
        cache_capacity: usize,
        abort_superseded: bool,
        events: mpsc::Sender<SearchEvent>,
    ) -> Self {
        Self {
            source,
            cache: QueryCache::new(cache_capacity),
            abort_superseded,
            in_flight: None,
            events,
        }
    }

    pub fn dispatch(&mut self, req: InFlightRequest) -> Dispatched {
        if self.abort_superseded {
            self.cancel();
        }

        if let Some(payload) = self.cache.get(&req.query, req.offset) {
            debug!(
                "{}: seq={} {:?}@{} served from cache",
                req.channel, req.seq, req.query, req.offset
            );
            return Dispatched::Cached(payload);
        }

        debug!(
            "{}: seq={} requesting {:?}@{}",
            req.channel, req.seq, req.query, req.offset
        );
        let fut = self.source.search(&req.query, req.offset);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let outcome = fut.await;
            let _ = events
                .send(SearchEvent::Response {
                    channel: req.channel,
                    seq: req.seq,
                    query: req.query,
                    offset: req.offset,
                    outcome,
                })
                .await;
        });
        self.in_flight = Some(handle.abort_handle());
        Dispatched::Spawned
    }

    /// Abort the outstanding task, if any.  Its response simply never arrives.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                trace!("aborting superseded request task");
                handle.abort();
            }
        }
    }

    /// Keep a successful page for later identical requests.
    pub fn remember(&mut self, query: &str, offset: u32, payload: &SearchPayload) {
        if self.cache.is_enabled() {
            self.cache.put(query, offset, payload.clone());
            trace!("cached {:?}@{} ({} entries)", query, offset, self.cache.len());
        }
    }
}
