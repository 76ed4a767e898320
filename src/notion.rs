//! Blocking Notion API client.
//!
//! Implements [`PageSource`] against the Notion REST API:
//!
//! ```text
//! POST /v1/databases/{id}/query        → page objects   (paginated)
//! GET  /v1/blocks/{id}/children        → block objects  (paginated, per page
//!                                                         and per nested block)
//! ```
//!
//! Pagination follows `has_more` / `next_cursor`. Blocks with
//! `has_children` get their children fetched recursively and attached under
//! a `children` key, so the result has the same shape as an `export` dump
//! and goes through the same accessor layer ([`crate::remote`]).
//!
//! ## Retries
//!
//! Rate limiting (429), server errors (5xx), and connect/timeout failures are
//! retried up to `notion.max_retries` times. The delay is the `Retry-After`
//! header when present, otherwise `retry_base_ms` doubled per attempt. Any
//! other failure is returned immediately and aborts the run before the
//! filesystem is touched.

use crate::config::NotionConfig;
use crate::remote::{PageSource, PropertyNames, RemoteError, pages_from_dump};
use crate::types::RemotePage;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Block types whose children are separate pages, not body content.
const OPAQUE_CHILD_TYPES: &[&str] = &["child_page", "child_database"];

pub struct NotionClient {
    http: Client,
    base_url: String,
    token: String,
    config: NotionConfig,
}

impl NotionClient {
    pub fn new(token: impl Into<String>, config: NotionConfig) -> Result<Self, RemoteError> {
        if config.database_id.trim().is_empty() {
            return Err(RemoteError::MissingSetting(
                "notion.database_id (or NOTION_DATABASE_ID)".into(),
            ));
        }
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            config,
        })
    }

    /// Point the client at another API root (a proxy or a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch every page with its full block tree as a JSON dump:
    /// `{"pages": [<page object + "blocks">...]}`.
    pub fn fetch_dump(&self) -> Result<Value, RemoteError> {
        let pages = self.query_database()?;
        info!(count = pages.len(), "fetched database pages");
        let mut entries = Vec::with_capacity(pages.len());
        for mut page in pages {
            let id = crate::remote::page_id(&page)?;
            let blocks = self.block_tree(&id)?;
            page["blocks"] = Value::Array(blocks);
            entries.push(page);
        }
        Ok(json!({ "pages": entries }))
    }

    /// All page objects of the database, in API order, duplicates dropped.
    fn query_database(&self) -> Result<Vec<Value>, RemoteError> {
        let url = format!(
            "{}/databases/{}/query",
            self.base_url, self.config.database_id
        );
        let pages = paginate(|cursor| {
            let mut body = json!({ "page_size": self.config.page_size });
            if let Some(c) = cursor {
                body["start_cursor"] = Value::String(c.to_string());
            }
            self.send(|| self.http.post(&url).json(&body))
        })?;
        dedupe_by_id(pages)
    }

    /// Children of a block (or page), recursively expanded.
    fn block_tree(&self, block_id: &str) -> Result<Vec<Value>, RemoteError> {
        expand_children(block_id, &mut |id: &str| self.block_children(id))
    }

    fn block_children(&self, block_id: &str) -> Result<Vec<Value>, RemoteError> {
        let url = format!("{}/blocks/{}/children", self.base_url, block_id);
        let page_size = self.config.page_size.to_string();
        paginate(|cursor| {
            let mut query = vec![("page_size", page_size.clone())];
            if let Some(c) = cursor {
                query.push(("start_cursor", c.to_string()));
            }
            self.send(|| self.http.get(&url).query(&query))
        })
    }

    /// Send a request with auth headers, retrying transient failures.
    ///
    /// `build` is called once per attempt since a blocking request builder
    /// is consumed by `send`.
    fn send<F>(&self, build: F) -> Result<Value, RemoteError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempts = 0;
        let attempt = || -> Result<Attempt, RemoteError> {
            attempts += 1;
            let request = build()
                .bearer_auth(&self.token)
                .header("Notion-Version", &self.config.api_version);

            let response = match request.send() {
                Ok(r) => r,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    return Ok(Attempt::Transient {
                        retry_after: None,
                        error: e.into(),
                    });
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            if status.is_success() {
                return Ok(Attempt::Done(response.json()?));
            }
            let retry_after = parse_retry_after(response.headers());
            let error = if status == StatusCode::TOO_MANY_REQUESTS {
                RemoteError::RateLimited { attempts }
            } else {
                RemoteError::Api {
                    status: status.as_u16(),
                    message: response.text().unwrap_or_default(),
                }
            };
            if is_retryable(status) {
                Ok(Attempt::Transient { retry_after, error })
            } else {
                Err(error)
            }
        };
        with_retries(
            self.config.max_retries,
            self.config.retry_base_ms,
            attempt,
            std::thread::sleep,
        )
    }
}

impl PageSource for NotionClient {
    fn fetch_pages(&self) -> Result<Vec<RemotePage>, RemoteError> {
        let dump = self.fetch_dump()?;
        pages_from_dump(&dump, &PropertyNames::from_config(&self.config))
    }
}

/// One page of a paginated list response.
struct Batch {
    results: Vec<Value>,
    next_cursor: Option<String>,
}

impl Batch {
    fn from_response(mut response: Value) -> Result<Self, RemoteError> {
        let results = match response.get_mut("results").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(RemoteError::Malformed(
                    "list response without a results array".into(),
                ));
            }
        };
        let has_more = response
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let next_cursor = response
            .get("next_cursor")
            .and_then(Value::as_str)
            .filter(|_| has_more)
            .map(str::to_string);
        Ok(Self {
            results,
            next_cursor,
        })
    }
}

/// Outcome of one request attempt that did not fail permanently.
enum Attempt {
    Done(Value),
    /// Worth retrying. `retry_after` is the server's hint in seconds.
    Transient {
        retry_after: Option<u64>,
        error: RemoteError,
    },
}

/// Run `attempt` until it succeeds, fails permanently, or has been retried
/// `max_retries` times. The last transient error is returned when retries
/// run out.
fn with_retries<A, S>(
    max_retries: u32,
    base_ms: u64,
    mut attempt: A,
    mut sleep: S,
) -> Result<Value, RemoteError>
where
    A: FnMut() -> Result<Attempt, RemoteError>,
    S: FnMut(Duration),
{
    let max_attempts = max_retries.saturating_add(1);
    let mut n = 0;
    loop {
        n += 1;
        match attempt()? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Transient { error, .. } if n >= max_attempts => return Err(error),
            Attempt::Transient { retry_after, error } => {
                let delay = retry_delay(n, retry_after, base_ms);
                warn!(%error, attempt = n, ?delay, "Notion request failed, retrying");
                sleep(delay);
            }
        }
    }
}

/// Drain a paginated list endpoint. `fetch` is called with the cursor of the
/// batch to request (`None` for the first one).
fn paginate<F>(mut fetch: F) -> Result<Vec<Value>, RemoteError>
where
    F: FnMut(Option<&str>) -> Result<Value, RemoteError>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let batch = Batch::from_response(fetch(cursor.as_deref())?)?;
        debug!(
            results = batch.results.len(),
            has_more = batch.next_cursor.is_some(),
            "list batch"
        );
        items.extend(batch.results);
        match batch.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(items)
}

/// Keep the first occurrence of each page id. A page edited while the query
/// is being paged through can show up in two batches.
fn dedupe_by_id(pages: Vec<Value>) -> Result<Vec<Value>, RemoteError> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(pages.len());
    for page in pages {
        if seen.insert(crate::remote::page_id(&page)?) {
            unique.push(page);
        }
    }
    Ok(unique)
}

/// Fetch the children of `parent_id` and, recursively, of every block that
/// has its own, attaching them under `children`.
fn expand_children<F>(parent_id: &str, children_of: &mut F) -> Result<Vec<Value>, RemoteError>
where
    F: FnMut(&str) -> Result<Vec<Value>, RemoteError>,
{
    let mut blocks = children_of(parent_id)?;
    for block in &mut blocks {
        if !wants_children(block) {
            continue;
        }
        let Some(child_id) = block.get("id").and_then(Value::as_str).map(str::to_string)
        else {
            continue;
        };
        block["children"] = Value::Array(expand_children(&child_id, children_of)?);
    }
    Ok(blocks)
}

fn wants_children(block: &Value) -> bool {
    let has_children = block
        .get("has_children")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let kind = block.get("type").and_then(Value::as_str).unwrap_or_default();
    has_children && !OPAQUE_CHILD_TYPES.contains(&kind)
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// `Retry-After` in whole seconds, if present and numeric.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Delay before retry number `attempt` (1-based).
fn retry_delay(attempt: u32, retry_after_secs: Option<u64>, base_ms: u64) -> Duration {
    match retry_after_secs {
        Some(secs) => Duration::from_secs(secs),
        None => {
            let exp = attempt.saturating_sub(1).min(16);
            Duration::from_millis(base_ms.saturating_mul(1u64 << exp))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::collections::VecDeque;

    fn ids(items: &[Value]) -> Vec<&str> {
        items.iter().filter_map(|v| v["id"].as_str()).collect()
    }

    /// Plays back one outcome per attempt.
    fn scripted(
        outcomes: Vec<Result<Attempt, RemoteError>>,
    ) -> impl FnMut() -> Result<Attempt, RemoteError> {
        let mut outcomes = VecDeque::from(outcomes);
        move || outcomes.pop_front().expect("more attempts than scripted")
    }

    fn rate_limited(retry_after: Option<u64>) -> Result<Attempt, RemoteError> {
        Ok(Attempt::Transient {
            retry_after,
            error: RemoteError::RateLimited { attempts: 1 },
        })
    }

    fn server_error() -> Result<Attempt, RemoteError> {
        Ok(Attempt::Transient {
            retry_after: None,
            error: RemoteError::Api {
                status: 502,
                message: "bad gateway".into(),
            },
        })
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    #[test]
    fn paginate_follows_cursor_across_batches() {
        let mut cursors = Vec::new();
        let items = paginate(|cursor| {
            cursors.push(cursor.map(str::to_string));
            Ok(match cursor {
                None => json!({
                    "results": [{ "id": "a" }, { "id": "b" }],
                    "has_more": true,
                    "next_cursor": "c1"
                }),
                Some("c1") => json!({
                    "results": [{ "id": "c" }],
                    "has_more": true,
                    "next_cursor": "c2"
                }),
                Some(_) => json!({
                    "results": [{ "id": "d" }],
                    "has_more": false,
                    "next_cursor": null
                }),
            })
        })
        .unwrap();

        assert_eq!(ids(&items), vec!["a", "b", "c", "d"]);
        assert_eq!(
            cursors,
            vec![None, Some("c1".to_string()), Some("c2".to_string())]
        );
    }

    #[test]
    fn paginate_stops_on_first_failed_batch() {
        let mut calls = 0;
        let result = paginate(|cursor| {
            calls += 1;
            match cursor {
                None => Ok(json!({ "results": [{ "id": "a" }], "has_more": true, "next_cursor": "c1" })),
                Some(_) => Err(RemoteError::Api {
                    status: 401,
                    message: "unauthorized".into(),
                }),
            }
        });
        assert!(matches!(result, Err(RemoteError::Api { status: 401, .. })));
        assert_eq!(calls, 2);
    }

    #[test]
    fn duplicate_pages_across_batches_are_dropped() {
        let pages = paginate(|cursor| {
            Ok(match cursor {
                None => json!({
                    "results": [{ "id": "p1" }, { "id": "p2" }],
                    "has_more": true,
                    "next_cursor": "c1"
                }),
                Some(_) => json!({
                    "results": [{ "id": "p2" }, { "id": "p3" }],
                    "has_more": false
                }),
            })
        })
        .and_then(dedupe_by_id)
        .unwrap();
        assert_eq!(ids(&pages), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn page_without_id_fails_dedupe() {
        let result = dedupe_by_id(vec![json!({ "id": "p1" }), json!({ "object": "page" })]);
        assert!(matches!(result, Err(RemoteError::Malformed(_))));
    }

    // =========================================================================
    // Nested blocks
    // =========================================================================

    #[test]
    fn nested_children_are_attached_recursively() {
        let mut fetched = Vec::new();
        let tree = expand_children("page", &mut |id: &str| {
            fetched.push(id.to_string());
            Ok(match id {
                "page" => vec![
                    json!({ "id": "b1", "type": "bulleted_list_item", "has_children": true,
                            "bulleted_list_item": { "rich_text": [] } }),
                    json!({ "id": "b2", "type": "child_page", "has_children": true }),
                    json!({ "id": "b3", "type": "paragraph", "has_children": false }),
                ],
                "b1" => vec![json!({ "id": "b1-1", "type": "bulleted_list_item", "has_children": true,
                                     "bulleted_list_item": { "rich_text": [] } })],
                "b1-1" => vec![json!({ "id": "b1-1-1", "type": "paragraph", "has_children": false })],
                other => panic!("unexpected children fetch for {other}"),
            })
        })
        .unwrap();

        assert_eq!(fetched, vec!["page", "b1", "b1-1"]);
        assert_eq!(ids(&tree), vec!["b1", "b2", "b3"]);
        assert_eq!(tree[0]["children"][0]["children"][0]["id"], "b1-1-1");
        assert!(tree[1].get("children").is_none());
        assert!(tree[2].get("children").is_none());

        let block = crate::remote::block_from_json(&tree[0]);
        assert_eq!(block.children.len(), 1);
        assert_eq!(block.children[0].children.len(), 1);
    }

    #[test]
    fn failed_children_fetch_fails_the_tree() {
        let result = expand_children("page", &mut |id: &str| match id {
            "page" => Ok(vec![json!({ "id": "b1", "type": "toggle", "has_children": true })]),
            _ => Err(RemoteError::Malformed("boom".into())),
        });
        assert!(matches!(result, Err(RemoteError::Malformed(_))));
    }

    // =========================================================================
    // Retries
    // =========================================================================

    #[test]
    fn transient_failures_are_retried_until_success() {
        let mut slept = Vec::new();
        let value = with_retries(
            3,
            10,
            scripted(vec![
                rate_limited(None),
                server_error(),
                rate_limited(Some(2)),
                Ok(Attempt::Done(json!({ "ok": true }))),
            ]),
            |d| slept.push(d),
        )
        .unwrap();

        assert_eq!(value, json!({ "ok": true }));
        assert_eq!(
            slept,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_secs(2),
            ]
        );
    }

    #[test]
    fn retries_run_out_with_last_error() {
        let mut slept = Vec::new();
        let result = with_retries(
            2,
            10,
            scripted(vec![server_error(), server_error(), rate_limited(None)]),
            |d| slept.push(d),
        );
        assert!(matches!(result, Err(RemoteError::RateLimited { .. })));
        assert_eq!(slept.len(), 2);
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let mut slept = Vec::new();
        let result = with_retries(
            3,
            10,
            scripted(vec![Err(RemoteError::Api {
                status: 401,
                message: "unauthorized".into(),
            })]),
            |d| slept.push(d),
        );
        assert!(matches!(result, Err(RemoteError::Api { status: 401, .. })));
        assert!(slept.is_empty());
    }

    #[test]
    fn zero_retries_means_one_attempt() {
        let result = with_retries(0, 10, scripted(vec![server_error()]), |_| {
            panic!("must not sleep")
        });
        assert!(matches!(result, Err(RemoteError::Api { status: 502, .. })));
    }

    #[test]
    fn client_requires_database_id() {
        let result = NotionClient::new("secret", NotionConfig::default());
        assert!(matches!(result, Err(RemoteError::MissingSetting(_))));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = NotionConfig {
            database_id: "db".into(),
            ..Default::default()
        };
        let client = NotionClient::new("secret", config)
            .unwrap()
            .with_base_url("http://localhost:9999/v1/");
        assert_eq!(client.base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn retry_after_header_wins() {
        assert_eq!(retry_delay(3, Some(7), 500), Duration::from_secs(7));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(retry_delay(1, None, 500), Duration::from_millis(500));
        assert_eq!(retry_delay(2, None, 500), Duration::from_millis(1000));
        assert_eq!(retry_delay(3, None, 500), Duration::from_millis(2000));
    }

    #[test]
    fn backoff_does_not_overflow() {
        assert!(retry_delay(200, None, u64::MAX) >= Duration::from_millis(u64::MAX / 2));
    }

    #[test]
    fn parse_retry_after_numeric() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(12));
    }

    #[test]
    fn parse_retry_after_missing_or_date() {
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }

    #[test]
    fn batch_reads_cursor_only_when_has_more() {
        let batch = Batch::from_response(json!({
            "results": [{ "id": "a" }],
            "has_more": true,
            "next_cursor": "c1"
        }))
        .unwrap();
        assert_eq!(batch.results.len(), 1);
        assert_eq!(batch.next_cursor.as_deref(), Some("c1"));

        let last = Batch::from_response(json!({
            "results": [],
            "has_more": false,
            "next_cursor": "stale"
        }))
        .unwrap();
        assert_eq!(last.next_cursor, None);
    }

    #[test]
    fn batch_without_results_is_malformed() {
        let result = Batch::from_response(json!({ "object": "error" }));
        assert!(matches!(result, Err(RemoteError::Malformed(_))));
    }

    #[test]
    fn children_fetched_for_nested_blocks_only() {
        assert!(wants_children(
            &json!({ "type": "bulleted_list_item", "has_children": true })
        ));
        assert!(!wants_children(
            &json!({ "type": "bulleted_list_item", "has_children": false })
        ));
        assert!(!wants_children(
            &json!({ "type": "child_page", "has_children": true })
        ));
    }
}
