//! Similarity search pipeline: source item in, result items on the canvas.
//!
//! DESIGN
//! ======
//! A search reads the source item, sends its image to the search service,
//! and places each returned image to the right of the source in relevance
//! order. The network call is the only suspension point. Everything the
//! pipeline writes is re-read from the store after it: the source position,
//! and the board's top stack order before every insert.
//!
//! At most one search per item is in flight. The in-flight mark is held by a
//! guard, so it clears on success, failure, and cancellation alike. A source
//! deleted while its search was in flight is not an error: the results are
//! dropped and the call reports `Discarded`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{info, warn};

use canvas::consts::DEFAULT_ITEM_SIZE;
use canvas::doc::{DEFAULT_RESULT_COUNT, Item, ItemId};
use canvas::ordering;
use canvas::store::ItemStore;

use crate::config::SearchConfig;
use crate::search::{DEFAULT_SEARCH_TEXT, SearchError, SearchHit, SearchRequest, SimilaritySearch};

/// What a finished search did to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Results were inserted; ids in relevance order.
    Inserted(Vec<ItemId>),
    /// The source item vanished while the request was in flight.
    Discarded,
}

pub struct SearchService {
    store: Arc<dyn ItemStore>,
    client: Arc<dyn SimilaritySearch>,
    config: SearchConfig,
    in_flight: Mutex<HashSet<ItemId>>,
}

/// Clears an item's in-flight mark on drop.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<ItemId>>,
    id: ItemId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl SearchService {
    #[must_use]
    pub fn new(store: Arc<dyn ItemStore>, client: Arc<dyn SimilaritySearch>, config: SearchConfig) -> Self {
        Self { store, client, config, in_flight: Mutex::new(HashSet::new()) }
    }

    /// Whether `id` has a search in flight.
    #[must_use]
    pub fn is_searching(&self, id: ItemId) -> bool {
        self.lock().contains(&id)
    }

    /// Every item with a search in flight.
    #[must_use]
    pub fn searching(&self) -> Vec<ItemId> {
        self.lock().iter().copied().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<ItemId>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, id: ItemId) -> Result<InFlight<'_>, SearchError> {
        if !self.lock().insert(id) {
            return Err(SearchError::AlreadySearching);
        }
        Ok(InFlight { set: &self.in_flight, id })
    }

    /// Search for images similar to `item_id` and place them beside it.
    ///
    /// # Errors
    ///
    /// - `AlreadySearching` if this item already has a search in flight
    /// - `ItemNotFound` if the source does not exist when the search starts
    /// - `Transport`/`Http`/`Parse` for network and protocol failures
    /// - `Application` when the service reports failure or returns nothing
    /// - `Decode` when a result image is not valid base64
    /// - `Persistence` when inserting results fails (partial inserts are removed)
    pub async fn find_similar(&self, item_id: ItemId) -> Result<SearchOutcome, SearchError> {
        let _in_flight = self.begin(item_id).inspect_err(|_| {
            warn!(%item_id, "search already in flight; request rejected");
        })?;

        let source = self.store.item(item_id).ok_or(SearchError::ItemNotFound)?;
        let request = build_request(&source, self.config.filter_portraits);
        info!(%item_id, k = request.k, lambda = request.lambda, "similarity search started");

        let response = self.client.search(&request).await.inspect_err(|e| {
            warn!(%item_id, error = %e, "similarity search failed");
        })?;

        if !response.success {
            let reason = response.error.unwrap_or_else(|| "search reported failure".into());
            warn!(%item_id, %reason, "similarity search returned an error");
            return Err(SearchError::Application(reason));
        }
        if response.results.is_empty() {
            warn!(%item_id, "similarity search returned no results");
            return Err(SearchError::Application("no results".into()));
        }

        let images = decode_results(&response.results)?;

        let Some(source) = self.store.item(item_id) else {
            info!(%item_id, results = images.len(), "source removed during search; results discarded");
            return Ok(SearchOutcome::Discarded);
        };

        let inserted = self.insert_results(&source, images)?;
        info!(%item_id, inserted = inserted.len(), "similarity search results placed");
        Ok(SearchOutcome::Inserted(inserted))
    }

    /// Insert results left to right beside `source`, each above everything on
    /// the board at the moment it is inserted. On failure the results already
    /// inserted are removed.
    fn insert_results(&self, source: &Item, images: Vec<Vec<u8>>) -> Result<Vec<ItemId>, SearchError> {
        let mut inserted = Vec::with_capacity(images.len());
        for (i, image) in images.into_iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let x = source.x + (i + 1) as f64 * self.config.result_spacing;
            let siblings = self.store.query(source.board_id);
            let item = Item::image(source.board_id, image, format!("Result {}", i + 1))
                .with_rect(x, source.y, DEFAULT_ITEM_SIZE, DEFAULT_ITEM_SIZE)
                .with_stack_order(ordering::next_stack_order(&siblings));
            let id = item.id;

            if let Err(e) = self.store.insert(item) {
                warn!(source = %source.id, error = %e, rolled_back = inserted.len(), "result insert failed");
                for id in &inserted {
                    if let Err(e) = self.store.delete(*id) {
                        warn!(%id, error = %e, "could not remove partial result");
                    }
                }
                return Err(e.into());
            }
            inserted.push(id);
        }
        Ok(inserted)
    }
}

/// Request for `item`: its image as base64, the description (or the default
/// prompt when blank), `k` (4 when zero), and `lambda` clamped to `[0, 1]`.
#[must_use]
pub fn build_request(item: &Item, filter_portraits: bool) -> SearchRequest {
    let text = item
        .search
        .description_text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_SEARCH_TEXT)
        .to_string();
    let k = match item.search.result_count {
        0 => DEFAULT_RESULT_COUNT,
        k => k,
    };
    SearchRequest {
        sketch: STANDARD.encode(&item.image),
        text,
        k,
        lambda: item.search.similarity_balance.clamp(0.0, 1.0),
        filter_portraits,
    }
}

/// Decode every result image, failing on the first bad one.
fn decode_results(hits: &[SearchHit]) -> Result<Vec<Vec<u8>>, SearchError> {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let payload = hit
                .image
                .split_once(";base64,")
                .map_or(hit.image.as_str(), |(_, data)| data);
            STANDARD
                .decode(payload.trim())
                .map_err(|e| SearchError::Decode(format!("result {}: {e}", i + 1)))
        })
        .collect()
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
