//! Scripted in-memory API used by the integration tests
#![allow(dead_code)]

use assessment_exporter::fetcher::{FetcherError, FetcherResult, PageResponse, PageTransport};
use assessment_exporter::ApiConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Canned answer for one request
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with a JSON body and extra headers
    Json(Value, Vec<(&'static str, String)>),
    /// Bare status with headers and an empty body
    Status(u16, Vec<(&'static str, String)>),
    /// 200 with a body that is not valid JSON
    Garbage,
    /// No response at all
    NetworkError,
}

/// One request seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub path: String,
    pub page: u32,
    pub limit: usize,
}

/// Fake API keyed by (path, page); unscripted pages answer `[]`
#[derive(Default)]
pub struct FakeApi {
    replies: Mutex<HashMap<(String, u32), VecDeque<Reply>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `path` page `page`
    pub fn reply(&self, path: &str, page: u32, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry((path.to_string(), page))
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue a plain JSON page
    pub fn page(&self, path: &str, page: u32, body: Value) -> &Self {
        self.reply(path, page, Reply::Json(body, Vec::new()))
    }

    /// All requests, in order
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Requests made for `path`
    pub fn requests_for(&self, path: &str) -> Vec<u32> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .map(|r| r.page)
            .collect()
    }
}

fn header_map(pairs: &[(&'static str, String)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        headers.insert(
            HeaderName::from_static(*name),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    headers
}

#[async_trait]
impl PageTransport for FakeApi {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> FetcherResult<PageResponse> {
        let lookup = |key: &str| {
            query
                .iter()
                .find(|(k, _)| *k == key)
                .and_then(|(_, v)| v.parse::<u64>().ok())
        };
        let page = lookup("page").unwrap_or(1) as u32;
        let limit = lookup("limit").unwrap_or(0) as usize;

        self.seen.lock().unwrap().push(SeenRequest {
            path: path.to_string(),
            page,
            limit,
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&(path.to_string(), page))
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Reply::Json(json!([]), Vec::new()));

        match reply {
            Reply::Json(body, headers) => Ok(PageResponse {
                status: StatusCode::OK,
                headers: header_map(&headers),
                body: body.to_string(),
            }),
            Reply::Status(code, headers) => Ok(PageResponse {
                status: StatusCode::from_u16(code).unwrap(),
                headers: header_map(&headers),
                body: String::new(),
            }),
            Reply::Garbage => Ok(PageResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: "<html>maintenance</html>".to_string(),
            }),
            Reply::NetworkError => Err(FetcherError::NetworkError(format!(
                "connection reset while fetching {path}"
            ))),
        }
    }

    fn base_url(&self) -> &str {
        "http://fake.invalid/api/v2"
    }
}

/// Configuration pointing at the fake, school 12
pub fn config(page_limit: usize) -> ApiConfig {
    ApiConfig::new("http://fake.invalid/api/v2", 12, "test-token").with_page_limit(page_limit)
}

/// `count` course objects with ids starting at `first_id`
pub fn courses(first_id: u64, count: u64) -> Value {
    Value::Array(
        (first_id..first_id + count)
            .map(|id| json!({"id": id, "name": format!("Course {id}"), "course_code": format!("C{id}")}))
            .collect(),
    )
}

/// Assignment object with grade settings
pub fn assignment(id: u64, name: &str, guess_correction: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "grades_settings": {"guess_correction": guess_correction}
    })
}

/// Exercise object
pub fn exercise(id: u64, name: &str) -> Value {
    json!({"id": id, "name": name})
}

/// Question object
pub fn question(category: &str, points: f64, guess_score: f64) -> Value {
    json!({"id": 1000, "category": category, "points": points, "guess_score": guess_score})
}
