#![allow(dead_code)]

use finder_proto::protocol::{SearchItem, SearchPayload};

/// Single-page payload whose item titles are `titles`.
pub fn page_of(titles: &[&str]) -> SearchPayload {
    SearchPayload {
        items: titles
            .iter()
            .map(|t| SearchItem {
                title: t.to_string(),
                ..Default::default()
            })
            .collect(),
        total: Some(titles.len() as u64),
        offset: 0,
        limit: 10,
    }
}

pub fn titles(payload: &SearchPayload) -> Vec<&str> {
    payload.items.iter().map(|i| i.title.as_str()).collect()
}
