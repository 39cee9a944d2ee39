//! HTTP client for the similarity search endpoint.
//!
//! Thin reqwest wrapper: POST the JSON request, treat any non-2xx status as a
//! failure, parse the body in `parse_response`.

use std::time::Duration;

use super::{SearchError, SearchRequest, SearchResponse, SimilaritySearch};
use crate::config::SearchConfig;

pub struct HttpSearchClient {
    http: reqwest::Client,
    url: String,
}

impl HttpSearchClient {
    /// # Errors
    ///
    /// `HttpClientBuild` if reqwest cannot build the client.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| SearchError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, url: config.url.clone() })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl SimilaritySearch for HttpSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(SearchError::Http { status: status.as_u16(), body: text });
        }

        parse_response(&text)
    }
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn parse_response(json: &str) -> Result<SearchResponse, SearchError> {
    serde_json::from_str(json).map_err(|e| SearchError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
