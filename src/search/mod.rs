//! Similarity search: wire types, errors, and the client seam.
//!
//! DESIGN
//! ======
//! `SimilaritySearch` is the only thing the pipeline knows about the remote
//! service. `HttpSearchClient` implements it over reqwest; tests swap in a
//! mock. Response parsing is a pure function so it can be tested without a
//! network.

pub mod client;

use canvas::store::PersistenceError;
use serde::{Deserialize, Serialize};

pub use client::HttpSearchClient;

/// Prompt sent when an item has no description.
pub const DEFAULT_SEARCH_TEXT: &str = "similar pose";

// =============================================================================
// ERROR
// =============================================================================

/// Why a similarity search did not insert its results.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// This item already has a search in flight.
    #[error("a search is already running for this item")]
    AlreadySearching,

    /// The source item does not exist.
    #[error("source item not found")]
    ItemNotFound,

    /// The request never got a response (connect, timeout, body read).
    #[error("search request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("search service error: status {status}")]
    Http { status: u16, body: String },

    /// The response body was not the expected JSON.
    #[error("search response parse failed: {0}")]
    Parse(String),

    /// The service reported failure or returned no results.
    #[error("no results found or search error: {0}")]
    Application(String),

    /// A result image was not valid base64.
    #[error("result image decode failed: {0}")]
    Decode(String),

    /// Inserting results into the store failed; partial inserts were removed.
    #[error("storing results failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::error::ErrorCode for SearchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadySearching => "E_SEARCH_IN_FLIGHT",
            Self::ItemNotFound => "E_ITEM_NOT_FOUND",
            Self::Transport(_) | Self::Http { .. } => "E_SEARCH_TRANSPORT",
            Self::Parse(_) => "E_SEARCH_PARSE",
            Self::Application(_) => "E_SEARCH_APPLICATION",
            Self::Decode(_) => "E_SEARCH_DECODE",
            Self::Persistence(_) => "E_PERSISTENCE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Request body for the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Source image, standard base64 without a data-URL prefix.
    pub sketch: String,
    pub text: String,
    pub k: u32,
    /// Pose/text balance in `[0, 1]`.
    pub lambda: f64,
    pub filter_portraits: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result image as base64 (a `data:` URL prefix is tolerated).
    pub image: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// TRAIT
// =============================================================================

/// The remote similarity-search service.
#[async_trait::async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Run one search. A response with `success = false` is returned as `Ok`;
    /// only transport and protocol failures are errors.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;
}
