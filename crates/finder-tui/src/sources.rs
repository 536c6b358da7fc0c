//! Request functions behind each channel.
//!
//! A `SearchSource` is the opaque "(query, offset) → page" capability the
//! dispatcher calls.  `HttpSource` is the reqwest-backed implementation; it
//! knows which query parameters each API family wants and normalizes the
//! untyped JSON it gets back into `SearchPayload` right at the boundary.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use finder_proto::config::{ChannelConfig, SearchConfig};
use finder_proto::protocol::{ChannelKind, FetchError, SearchItem, SearchPayload};
use futures_util::future::{BoxFuture, FutureExt};
use scraper::Html;
use serde_json::Value;
use tracing::debug;

/// Total-count header sent by the WordPress REST API.
const WP_TOTAL_HEADER: &str = "x-wp-total";

pub trait SearchSource: Send + Sync {
    fn search(&self, query: &str, offset: u32)
        -> BoxFuture<'static, Result<SearchPayload, FetchError>>;
}

/// Shared HTTP client for every channel.
pub fn build_client(search: &SearchConfig) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(search.request_timeout())
        .user_agent(search.user_agent.clone())
        .build()?;
    Ok(client)
}

pub struct HttpSource {
    client: reqwest::Client,
    kind: ChannelKind,
    url: String,
    page_size: u32,
}

impl HttpSource {
    pub fn new(client: reqwest::Client, channel: &ChannelConfig) -> Self {
        Self {
            client,
            kind: channel.kind,
            url: channel.url.clone(),
            page_size: channel.page_size,
        }
    }

    fn params(&self, query: &str, offset: u32) -> Vec<(&'static str, String)> {
        let (search_key, limit_key) = match self.kind {
            ChannelKind::News => ("search", "per_page"),
            ChannelKind::Events => ("q", "limit"),
            ChannelKind::Programs
            | ChannelKind::Images
            | ChannelKind::Jobs
            | ChannelKind::Quotes => ("search", "limit"),
        };
        vec![
            (search_key, query.to_string()),
            ("offset", offset.to_string()),
            (limit_key, self.page_size.to_string()),
        ]
    }
}

impl SearchSource for HttpSource {
    fn search(
        &self,
        query: &str,
        offset: u32,
    ) -> BoxFuture<'static, Result<SearchPayload, FetchError>> {
        let request = self.client.get(&self.url).query(&self.params(query, offset));
        let kind = self.kind;
        let url = self.url.clone();
        let limit = self.page_size;

        async move {
            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url,
                });
            }

            let header_total = response
                .headers()
                .get(WP_TOTAL_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());

            let body: Value = response
                .json()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))?;
            let payload = normalize(kind, body, header_total, offset, limit)?;
            debug!(
                "{}: {} items (total {:?}) from {}",
                kind,
                payload.items.len(),
                payload.total,
                url
            );
            Ok(payload)
        }
        .boxed()
    }
}

fn transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(e.to_string())
    }
}

/// Map a raw response body onto a page.
///
/// Accepts a bare array (total from `header_total`) or an object carrying the
/// rows under `results` / `events` / `data` (total from `count`).
pub fn normalize(
    kind: ChannelKind,
    body: Value,
    header_total: Option<u64>,
    offset: u32,
    limit: u32,
) -> Result<SearchPayload, FetchError> {
    let (rows, total) = match body {
        Value::Array(rows) => (rows, header_total),
        Value::Object(mut map) => {
            let total = map.get("count").and_then(Value::as_u64).or(header_total);
            let rows = ["results", "events", "data"]
                .iter()
                .find_map(|key| match map.remove(*key) {
                    Some(Value::Array(rows)) => Some(rows),
                    _ => None,
                })
                .ok_or_else(|| FetchError::Decode("no result list in response".to_string()))?;
            (rows, total)
        }
        other => {
            return Err(FetchError::Decode(format!(
                "unexpected {} response",
                json_type(&other)
            )))
        }
    };

    let items = rows.iter().filter_map(|row| normalize_item(kind, row)).collect();
    Ok(SearchPayload {
        items,
        total,
        offset,
        limit,
    })
}

fn normalize_item(kind: ChannelKind, row: &Value) -> Option<SearchItem> {
    if !row.is_object() {
        return None;
    }

    let (title_keys, summary_keys): (&[&str], &[&str]) = match kind {
        ChannelKind::Programs => (&["name", "title"], &["description", "level", "career"]),
        ChannelKind::News => (&["title.rendered", "title"], &["excerpt.rendered", "excerpt"]),
        ChannelKind::Events => (&["title", "name"], &["description", "location"]),
        ChannelKind::Images => (&["caption", "filename", "title"], &["location", "copyright"]),
        ChannelKind::Jobs => (&["name", "title"], &["description"]),
        ChannelKind::Quotes => (&["source", "titles"], &["quote_text"]),
    };

    let title = pick_text(row, title_keys).unwrap_or_else(|| "(untitled)".to_string());
    let summary = pick_text(row, summary_keys);
    let url = pick_text(
        row,
        &["url", "link", "profile_url", "download_url", "thumbnail_url", "image"],
    );
    let published = ["date", "starts", "photo_taken", "created"]
        .iter()
        .filter_map(|k| lookup(row, k).and_then(Value::as_str))
        .find_map(parse_timestamp);
    let id = match row.get("id") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    };

    Some(SearchItem {
        id,
        title,
        url,
        summary,
        published,
    })
}

/// Dotted path lookup: `"title.rendered"` → `row["title"]["rendered"]`.
fn lookup<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |v, key| v.get(key))
}

/// First non-empty string under any of `keys`, with HTML reduced to text.
fn pick_text(row: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| lookup(row, k).and_then(Value::as_str))
        .map(html_to_text)
        .find(|s| !s.is_empty())
}

/// WordPress "rendered" fields carry markup and entities.
pub fn html_to_text(s: &str) -> String {
    if !s.contains('<') && !s.contains('&') {
        return s.trim().to_string();
    }
    let fragment = Html::parse_fragment(s);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .ok()
        .or_else(|| {
            // WordPress `date` is local time without an offset
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::get, Json, Router};
    use chrono::Datelike;
    use serde_json::json;
    use tokio::net::TcpListener;

    #[test]
    fn test_paginated_envelope() {
        let body = json!({
            "count": 42,
            "next": "http://x/?offset=10",
            "results": [
                {"id": 7, "name": "Biology BS", "url": "https://x/biology", "description": "Life."},
                {"id": 8, "name": "Biomedical Sciences BS"}
            ]
        });
        let page = normalize(ChannelKind::Programs, body, None, 0, 10).unwrap();
        assert_eq!(page.total, Some(42));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id.as_deref(), Some("7"));
        assert_eq!(page.items[0].title, "Biology BS");
        assert_eq!(page.items[0].url.as_deref(), Some("https://x/biology"));
        assert_eq!(page.items[0].summary.as_deref(), Some("Life."));
        assert_eq!(page.next_offset(), Some(10));
    }

    #[test]
    fn test_wordpress_array_uses_header_total() {
        let body = json!([{
            "id": 1,
            "date": "2024-01-29T09:30:00",
            "link": "https://news/post",
            "title": {"rendered": "Knights &amp; <em>Pegasus</em>"},
            "excerpt": {"rendered": "<p>Campus  news.</p>\n"}
        }]);
        let page = normalize(ChannelKind::News, body, Some(17), 10, 10).unwrap();
        assert_eq!(page.total, Some(17));
        assert_eq!(page.offset, 10);
        let item = &page.items[0];
        assert_eq!(item.title, "Knights & Pegasus");
        assert_eq!(item.summary.as_deref(), Some("Campus news."));
        assert_eq!(item.url.as_deref(), Some("https://news/post"));
        assert_eq!(item.published.unwrap().year(), 2024);
    }

    #[test]
    fn test_events_rfc2822_and_missing_title() {
        let body = json!({"events": [
            {"starts": "Thu, 11 Jan 2024 10:00:00 -0500", "location": "Arena"},
            "not an object"
        ]});
        let page = normalize(ChannelKind::Events, body, None, 0, 10).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "(untitled)");
        assert_eq!(page.items[0].summary.as_deref(), Some("Arena"));
        assert!(page.items[0].published.is_some());
        assert_eq!(page.total, None);
    }

    #[test]
    fn test_quotes_map_source_and_text() {
        let body = json!({"count": 1, "results": [
            {
                "id": 3,
                "source": "Jane Knight",
                "titles": "Alumna",
                "quote_text": "Go Knights",
                "image": "https://img/q.jpg"
            }
        ]});
        let page = normalize(ChannelKind::Quotes, body, None, 0, 10).unwrap();
        assert_eq!(page.items[0].title, "Jane Knight");
        assert_eq!(page.items[0].summary.as_deref(), Some("Go Knights"));
        assert_eq!(page.items[0].url.as_deref(), Some("https://img/q.jpg"));
    }

    #[test]
    fn test_unexpected_shapes_are_decode_errors() {
        assert!(matches!(
            normalize(ChannelKind::Images, json!({"detail": "nope"}), None, 0, 10),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            normalize(ChannelKind::Images, json!("text"), None, 0, 10),
            Err(FetchError::Decode(_))
        ));
    }

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn source(kind: ChannelKind, url: String) -> HttpSource {
        let client = build_client(&SearchConfig::default()).unwrap();
        HttpSource::new(client, &ChannelConfig::new("test", kind, &url))
    }

    #[tokio::test]
    async fn test_http_source_sends_search_params() {
        let router = Router::new().route(
            "/programs",
            get(
                |axum::extract::Query(q): axum::extract::Query<
                    std::collections::HashMap<String, String>,
                >| async move {
                    Json(json!({
                        "count": 1,
                        "results": [{
                            "name": format!("{}@{}/{}", q["search"], q["offset"], q["limit"])
                        }]
                    }))
                },
            ),
        );
        let base = serve(router).await;
        let src = source(ChannelKind::Programs, format!("{}/programs", base));

        let page = src.search("art history", 20).await.unwrap();
        assert_eq!(page.items[0].title, "art history@20/10");
        assert_eq!(page.offset, 20);
    }

    #[tokio::test]
    async fn test_http_source_reads_wp_total_header() {
        let router = Router::new().route(
            "/posts",
            get(|| async {
                let mut headers = HeaderMap::new();
                headers.insert(WP_TOTAL_HEADER, "31".parse().unwrap());
                (headers, Json(json!([{"title": {"rendered": "Hello"}}])))
            }),
        );
        let base = serve(router).await;
        let src = source(ChannelKind::News, format!("{}/posts", base));

        let page = src.search("hello", 0).await.unwrap();
        assert_eq!(page.total, Some(31));
        assert_eq!(page.items[0].title, "Hello");
    }

    #[tokio::test]
    async fn test_http_source_non_success_is_status_error() {
        let router = Router::new().route(
            "/images",
            get(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let base = serve(router).await;
        let url = format!("{}/images", base);
        let src = source(ChannelKind::Images, url.clone());

        let err = src.search("tower", 0).await.unwrap_err();
        assert_eq!(err, FetchError::Status { status: 503, url });
    }
}
