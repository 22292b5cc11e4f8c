//! HTTP access to threads and feed backlogs.

use kakiko_server::{
    domain::{Counter, ThreadId},
    infrastructure::dto::{codec::split_frames, http::ThreadDto},
};
use reqwest::StatusCode;

use crate::error::ClientError;

/// Fetches thread snapshots and missed frames from the server's HTTP API
#[derive(Debug, Clone)]
pub struct BacklogClient {
    http: reqwest::Client,
    base: String,
}

impl BacklogClient {
    /// `base` is the server root, e.g. `http://127.0.0.1:8080`
    pub fn new(base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
        }
    }

    /// Thread with its posts and the feed counter it was read at
    pub async fn fetch_thread(&self, thread: ThreadId) -> Result<ThreadDto, ClientError> {
        let url = format!("{}/api/threads/{}", self.base, thread);
        let thread = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(thread)
    }

    /// Frames of the thread feed in `[start, end)`. An empty range yields none.
    pub async fn fetch(
        &self,
        thread: ThreadId,
        start: Counter,
        end: Counter,
    ) -> Result<Vec<String>, ClientError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/backlog/{}/{}/{}", self.base, thread, start, end);
        let response = self.http.get(url).send().await?.error_for_status()?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let body = response.text().await?;
        let frames: Vec<String> = split_frames(&body).into_iter().map(str::to_string).collect();
        tracing::debug!("Pulled {} frames of thread {} [{}, {})", frames.len(), thread, start, end);
        Ok(frames)
    }
}
