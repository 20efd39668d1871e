use crate::stories::Story;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://hn.algolia.com/api/v1/search";

/// Errors talking to the search endpoint. All of them end up as a plain
/// fetch failure in the UI; the detail only goes to the log.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Search API returned HTTP {status}")]
    Status { status: u16 },

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Response body of the search endpoint; only the hits are used.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<Story>,
}

/// Build `<base>?query=<term>`. Returns `None` for a blank term.
pub fn request_url(base: &Url, term: &str) -> Option<Url> {
    if term.trim().is_empty() {
        return None;
    }
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("query", term);
    Some(url)
}

/// Anything that can answer a search request with a list of stories.
pub trait SearchBackend: Send + Sync + 'static {
    fn search(&self, url: Url) -> impl Future<Output = Result<Vec<Story>, ApiError>> + Send;
}

/// HTTP client for the Hacker News search API.
#[derive(Debug, Clone)]
pub struct HnClient {
    http: reqwest::Client,
}

impl HnClient {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hn-search/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

impl SearchBackend for HnClient {
    fn search(&self, url: Url) -> impl Future<Output = Result<Vec<Story>, ApiError>> + Send {
        let http = self.http.clone();
        async move {
            debug!(%url, "GET");
            let response = http.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                });
            }
            let body: SearchResponse = response.json().await?;
            debug!(hits = body.hits.len(), "search response decoded");
            Ok(body.hits)
        }
    }
}
