//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` owns the process-wide pieces: configuration, the item store,
//! and the search service that writes into it. Each open board gets its own
//! `canvas::engine::Engine` over the same store, so search results and
//! engine edits land in one place and every board view sees them through the
//! store's subscriptions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use canvas::doc::BoardId;
use canvas::engine::Engine;
use canvas::store::{ItemStore, LocalStore};

use crate::config::{AppConfig, ConfigError};
use crate::search::{HttpSearchClient, SearchError, SimilaritySearch};
use crate::services::persistence::{self, SnapshotError};
use crate::services::search::SearchService;

// =============================================================================
// ERRORS
// =============================================================================

/// Startup failed before the app could serve any board.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl crate::error::ErrorCode for StartupError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Snapshot(e) => e.error_code(),
            Self::Search(e) => e.error_code(),
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state. Clone is cheap; every field is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<LocalStore>,
    pub search: Arc<SearchService>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, store: Arc<LocalStore>, client: Arc<dyn SimilaritySearch>) -> Self {
        let search = SearchService::new(store.clone(), client, config.search.clone());
        Self { config: Arc::new(config), store, search: Arc::new(search) }
    }

    /// Build the state from `config`: load the snapshot (when a path is set),
    /// build the HTTP search client, and start the persistence task. The
    /// returned handle is `None` when persistence is disabled.
    ///
    /// # Errors
    ///
    /// `Snapshot` if an existing snapshot cannot be read, `Search` if the
    /// HTTP client cannot be built.
    pub fn start(config: AppConfig) -> Result<(Self, Option<JoinHandle<()>>), StartupError> {
        let store = match &config.store.path {
            Some(path) => persistence::load_snapshot(path, config.store.quota_bytes)?,
            None => config.store.quota_bytes.map_or_else(LocalStore::new, LocalStore::with_quota),
        };
        let store = Arc::new(store);
        let client = Arc::new(HttpSearchClient::new(&config.search)?);

        let persistence = config.store.path.clone().map(|path: PathBuf| {
            let every = Duration::from_millis(config.store.flush_interval_ms.max(1));
            persistence::spawn_persistence_task(store.clone(), path, every)
        });
        info!(
            search_url = %config.search.url,
            persistence = persistence.is_some(),
            boards = store.boards().len(),
            "app state ready"
        );
        Ok((Self::new(config, store, client), persistence))
    }

    /// Load configuration from the environment and start.
    ///
    /// # Errors
    ///
    /// Any [`StartupError`].
    pub fn from_env() -> Result<(Self, Option<JoinHandle<()>>), StartupError> {
        Self::start(AppConfig::from_env()?)
    }

    /// A fresh engine for `board_id` over the shared store, or `None` if the
    /// board does not exist.
    #[must_use]
    pub fn open_board(&self, board_id: BoardId) -> Option<Engine> {
        self.store.board(board_id)?;
        Some(Engine::new(self.store.clone(), board_id))
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
