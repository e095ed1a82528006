//! In-memory transport for testing.

use super::{MediaTransport, PreviewRequest, PreviewResponse, RemoteError, Result, SearchQuery, SearchResponse};
use async_trait::async_trait;
use mosaic_store::RemoteFile;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

/// Scripted [`MediaTransport`].
///
/// Search responses are served in the order they were queued; once the queue
/// runs dry every search returns no records. Previews are looked up by file
/// path and fail with a 404 when none was registered. Every request is
/// recorded so tests can assert on what was asked for.
#[derive(Debug, Default)]
pub struct MockTransport {
    account: String,
    searches: Mutex<VecDeque<std::result::Result<SearchResponse, RemoteError>>>,
    previews: Mutex<HashMap<String, std::result::Result<PreviewResponse, RemoteError>>>,
    search_log: Mutex<Vec<SearchQuery>>,
    preview_log: Mutex<Vec<PreviewRequest>>,
    search_delay: Option<Duration>,
}

impl MockTransport {
    pub fn new(account: impl Into<String>) -> Self {
        Self { account: account.into(), ..Self::default() }
    }

    /// Every search sleeps this long before answering.
    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = Some(delay);
        self
    }

    /// Queue a successful search for this transport's account.
    pub async fn push_files(&self, files: Vec<RemoteFile>) {
        let response = SearchResponse { account: self.account.clone(), files };
        self.searches.lock().await.push_back(Ok(response));
    }

    pub async fn push_response(&self, response: SearchResponse) {
        self.searches.lock().await.push_back(Ok(response));
    }

    pub async fn push_error(&self, error: RemoteError) {
        self.searches.lock().await.push_back(Err(error));
    }

    pub async fn set_preview(&self, path: impl Into<String>, response: std::result::Result<PreviewResponse, RemoteError>) {
        self.previews.lock().await.insert(path.into(), response);
    }

    pub async fn searches(&self) -> Vec<SearchQuery> {
        self.search_log.lock().await.clone()
    }

    pub async fn preview_requests(&self) -> Vec<PreviewRequest> {
        self.preview_log.lock().await.clone()
    }
}

#[async_trait]
impl MediaTransport for MockTransport {
    async fn search_media(&self, query: &SearchQuery) -> Result<SearchResponse> {
        self.search_log.lock().await.push(query.clone());
        if let Some(delay) = self.search_delay {
            tokio::time::sleep(delay).await;
        }
        match self.searches.lock().await.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(exn::Exn::from(error)),
            None => Ok(SearchResponse { account: self.account.clone(), files: Vec::new() }),
        }
    }

    async fn download_preview(&self, request: &PreviewRequest) -> Result<PreviewResponse> {
        self.preview_log.lock().await.push(request.clone());
        match self.previews.lock().await.get(&request.path) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(error)) => Err(exn::Exn::from(error.clone())),
            None => Err(exn::Exn::from(RemoteError::new(404, format!("no preview for {}", request.path)))),
        }
    }
}
