//! Bounded per-channel cache of successful pages keyed by `(query, offset)`.

use std::num::NonZeroUsize;

use finder_proto::protocol::SearchPayload;
use lru::LruCache;

pub struct QueryCache {
    /// `None` when the channel runs without a cache.
    inner: Option<LruCache<(String, u32), SearchPayload>>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn get(&mut self, query: &str, offset: u32) -> Option<SearchPayload> {
        self.inner
            .as_mut()?
            .get(&(query.to_string(), offset))
            .cloned()
    }

    pub fn put(&mut self, query: &str, offset: u32, payload: SearchPayload) {
        if let Some(cache) = self.inner.as_mut() {
            cache.put((query.to_string(), offset), payload);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |c| c.len())
    }
}
