//! Query gate — decides whether a debounced query is worth a request.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Trimmed query, ready to dispatch.
    Accept(String),
    /// Empty or too short: the channel goes back to "no query".
    Reject,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryGate {
    min_len: usize,
}

impl QueryGate {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Length is counted in chars of the trimmed query, so "  ab " is 2.
    pub fn check(&self, query: &str) -> GateDecision {
        let trimmed = query.trim();
        if trimmed.is_empty() || trimmed.chars().count() < self.min_len {
            GateDecision::Reject
        } else {
            GateDecision::Accept(trimmed.to_string())
        }
    }
}
