//! Item store: the keyed, observable collection every writer goes through.
//!
//! DESIGN
//! ======
//! `ItemStore` is the contract the engine, layer list, and search pipeline
//! depend on: keyed single-record CRUD plus a push-based subscription that
//! delivers a board's items sorted by `stack_order`. There are no cross-record
//! transactions; callers that touch several records issue one self-consistent
//! batch of single-record updates.
//!
//! `LocalStore` is the in-process implementation. State sits behind a mutex;
//! listeners are cloned out and invoked after the lock is released, so a
//! listener may read the store (or write to it) without deadlocking. Ties in
//! `stack_order` are broken by insertion sequence.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::doc::{Board, BoardId, Item, ItemId, PartialBoard, PartialItem};

// =============================================================================
// ERRORS
// =============================================================================

/// A store operation failed. The attempted mutation was not applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PersistenceError {
    #[error("board not found: {0}")]
    BoardNotFound(BoardId),
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),
    #[error("duplicate id: {0}")]
    DuplicateId(uuid::Uuid),
    #[error("invalid value for field `{0}`")]
    InvalidField(&'static str),
    #[error("storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },
}

// =============================================================================
// CONTRACT
// =============================================================================

/// Callback receiving a board's items in ascending stack order.
pub type Listener = Arc<dyn Fn(&[Item]) + Send + Sync>;

/// Handle returned by [`ItemStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Keyed persistent collection of boards and items.
pub trait ItemStore: Send + Sync {
    fn board(&self, id: BoardId) -> Option<Board>;

    fn boards(&self) -> Vec<Board>;

    /// # Errors
    ///
    /// `DuplicateId` if a board with the same id exists.
    fn insert_board(&self, board: Board) -> Result<(), PersistenceError>;

    /// # Errors
    ///
    /// `BoardNotFound` if the board does not exist.
    fn update_board(&self, id: BoardId, fields: &PartialBoard) -> Result<Board, PersistenceError>;

    /// Delete a board and every item on it.
    ///
    /// # Errors
    ///
    /// `BoardNotFound` if the board does not exist.
    fn delete_board(&self, id: BoardId) -> Result<Board, PersistenceError>;

    fn item(&self, id: ItemId) -> Option<Item>;

    /// Items on `board_id`, ascending by `stack_order`, ties by insertion order.
    fn query(&self, board_id: BoardId) -> Vec<Item>;

    /// # Errors
    ///
    /// `BoardNotFound`, `DuplicateId`, `InvalidField`, or `QuotaExceeded`.
    fn insert(&self, item: Item) -> Result<(), PersistenceError>;

    /// # Errors
    ///
    /// `ItemNotFound` or `InvalidField`.
    fn update(&self, id: ItemId, fields: &PartialItem) -> Result<Item, PersistenceError>;

    /// # Errors
    ///
    /// `ItemNotFound` if the item does not exist.
    fn delete(&self, id: ItemId) -> Result<Item, PersistenceError>;

    /// Register a listener for `board_id`. It is called once immediately with
    /// the current snapshot and again after every committed mutation on that board.
    fn subscribe(&self, board_id: BoardId, listener: Listener) -> SubscriptionId;

    /// Returns `false` if the subscription was already gone.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

// =============================================================================
// LOCAL STORE
// =============================================================================

struct Record {
    item: Item,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    boards: HashMap<BoardId, Board>,
    items: HashMap<ItemId, Record>,
    next_seq: u64,
    used_bytes: usize,
}

impl Inner {
    fn sorted(&self, board_id: BoardId) -> Vec<Item> {
        let mut records: Vec<&Record> = self
            .items
            .values()
            .filter(|r| r.item.board_id == board_id)
            .collect();
        records.sort_by(|a, b| {
            a.item
                .stack_order
                .cmp(&b.item.stack_order)
                .then_with(|| a.seq.cmp(&b.seq))
        });
        records.into_iter().map(|r| r.item.clone()).collect()
    }
}

struct Subscriber {
    id: SubscriptionId,
    board_id: BoardId,
    listener: Listener,
}

/// In-process [`ItemStore`] with synchronous change notification.
pub struct LocalStore {
    inner: Mutex<Inner>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_subscription: AtomicU64,
    revision: AtomicU64,
    quota_bytes: Option<usize>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("revision", &self.revision())
            .field("used_bytes", &self.used_bytes())
            .field("quota_bytes", &self.quota_bytes)
            .finish_non_exhaustive()
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore {
    /// Create an empty store with no quota.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            revision: AtomicU64::new(0),
            quota_bytes: None,
        }
    }

    /// Create an empty store that refuses inserts once image payloads exceed `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self { quota_bytes: Some(bytes), ..Self::new() }
    }

    /// Rebuild a store from exported records. Items are inserted in the given
    /// order, which becomes their tie-break order.
    ///
    /// # Errors
    ///
    /// Fails on the first record the store would reject (orphaned item, duplicate id, ...).
    pub fn from_records(
        boards: Vec<Board>,
        items: Vec<Item>,
        quota_bytes: Option<usize>,
    ) -> Result<Self, PersistenceError> {
        let store = Self { quota_bytes, ..Self::new() };
        for board in boards {
            store.insert_board(board)?;
        }
        for item in items {
            store.insert(item)?;
        }
        store.revision.store(0, Ordering::SeqCst);
        Ok(store)
    }

    /// Every board and item. Items come grouped by board in query order.
    #[must_use]
    pub fn export(&self) -> (Vec<Board>, Vec<Item>) {
        let inner = self.lock();
        let mut boards: Vec<Board> = inner.boards.values().cloned().collect();
        boards.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let items = boards.iter().flat_map(|b| inner.sorted(b.id)).collect();
        (boards, items)
    }

    /// Counter bumped on every committed mutation. Used for dirty tracking.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Bytes of image payload currently stored.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.lock().used_bytes
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners_for(&self, board_id: BoardId) -> Vec<Listener> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.board_id == board_id)
            .map(|s| Arc::clone(&s.listener))
            .collect()
    }

    /// Bump the revision and push the board's fresh snapshot to its listeners.
    fn commit(&self, board_id: BoardId) {
        self.revision.fetch_add(1, Ordering::SeqCst);
        let listeners = self.listeners_for(board_id);
        if listeners.is_empty() {
            return;
        }
        let snapshot = self.lock().sorted(board_id);
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

impl ItemStore for LocalStore {
    fn board(&self, id: BoardId) -> Option<Board> {
        self.lock().boards.get(&id).cloned()
    }

    fn boards(&self) -> Vec<Board> {
        self.export().0
    }

    fn insert_board(&self, board: Board) -> Result<(), PersistenceError> {
        let board_id = board.id;
        {
            let mut inner = self.lock();
            if inner.boards.contains_key(&board_id) {
                return Err(PersistenceError::DuplicateId(board_id));
            }
            inner.boards.insert(board_id, board);
        }
        self.commit(board_id);
        Ok(())
    }

    fn update_board(&self, id: BoardId, fields: &PartialBoard) -> Result<Board, PersistenceError> {
        let updated = {
            let mut inner = self.lock();
            let board = inner
                .boards
                .get_mut(&id)
                .ok_or(PersistenceError::BoardNotFound(id))?;
            fields.apply_to(board);
            board.clone()
        };
        self.commit(id);
        Ok(updated)
    }

    fn delete_board(&self, id: BoardId) -> Result<Board, PersistenceError> {
        let removed = {
            let mut inner = self.lock();
            let board = inner
                .boards
                .remove(&id)
                .ok_or(PersistenceError::BoardNotFound(id))?;
            let mut freed = 0;
            inner.items.retain(|_, r| {
                let keep = r.item.board_id != id;
                if !keep {
                    freed += r.item.image.len();
                }
                keep
            });
            inner.used_bytes = inner.used_bytes.saturating_sub(freed);
            board
        };
        debug!(board_id = %id, "board deleted with its items");
        self.commit(id);
        Ok(removed)
    }

    fn item(&self, id: ItemId) -> Option<Item> {
        self.lock().items.get(&id).map(|r| r.item.clone())
    }

    fn query(&self, board_id: BoardId) -> Vec<Item> {
        self.lock().sorted(board_id)
    }

    fn insert(&self, item: Item) -> Result<(), PersistenceError> {
        if !item.has_finite_geometry() {
            return Err(PersistenceError::InvalidField("geometry"));
        }
        if !(0.0..=1.0).contains(&item.search.similarity_balance) {
            return Err(PersistenceError::InvalidField("similarity_balance"));
        }
        let board_id = item.board_id;
        {
            let mut inner = self.lock();
            if !inner.boards.contains_key(&board_id) {
                return Err(PersistenceError::BoardNotFound(board_id));
            }
            if inner.items.contains_key(&item.id) {
                return Err(PersistenceError::DuplicateId(item.id));
            }
            let needed = item.image.len();
            if let Some(limit) = self.quota_bytes {
                let available = limit.saturating_sub(inner.used_bytes);
                if needed > available {
                    return Err(PersistenceError::QuotaExceeded { needed, available });
                }
            }
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.used_bytes += needed;
            inner.items.insert(item.id, Record { item, seq });
        }
        self.commit(board_id);
        Ok(())
    }

    fn update(&self, id: ItemId, fields: &PartialItem) -> Result<Item, PersistenceError> {
        fields.validate().map_err(PersistenceError::InvalidField)?;
        let updated = {
            let mut inner = self.lock();
            let record = inner
                .items
                .get_mut(&id)
                .ok_or(PersistenceError::ItemNotFound(id))?;
            fields.apply_to(&mut record.item);
            record.item.clone()
        };
        self.commit(updated.board_id);
        Ok(updated)
    }

    fn delete(&self, id: ItemId) -> Result<Item, PersistenceError> {
        let removed = {
            let mut inner = self.lock();
            let record = inner
                .items
                .remove(&id)
                .ok_or(PersistenceError::ItemNotFound(id))?;
            inner.used_bytes = inner.used_bytes.saturating_sub(record.item.image.len());
            record.item
        };
        self.commit(removed.board_id);
        Ok(removed)
    }

    fn subscribe(&self, board_id: BoardId, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { id, board_id, listener: Arc::clone(&listener) });
        let snapshot = self.query(board_id);
        listener(&snapshot);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }
}

// =============================================================================
// LIVE QUERY
// =============================================================================

/// A live, self-updating view of one board's items.
///
/// Holds the latest snapshot pushed by the store; unsubscribes on drop.
pub struct LiveQuery {
    store: Arc<dyn ItemStore>,
    subscription: SubscriptionId,
    latest: Arc<Mutex<Arc<[Item]>>>,
    updates: Arc<AtomicU64>,
}

impl LiveQuery {
    #[must_use]
    pub fn new(store: Arc<dyn ItemStore>, board_id: BoardId) -> Self {
        let latest: Arc<Mutex<Arc<[Item]>>> = Arc::new(Mutex::new(Arc::from(Vec::new())));
        let updates = Arc::new(AtomicU64::new(0));
        let listener: Listener = {
            let latest = Arc::clone(&latest);
            let updates = Arc::clone(&updates);
            Arc::new(move |items: &[Item]| {
                *latest.lock().unwrap_or_else(PoisonError::into_inner) = Arc::from(items.to_vec());
                updates.fetch_add(1, Ordering::SeqCst);
            })
        };
        let subscription = store.subscribe(board_id, listener);
        Self { store, subscription, latest, updates }
    }

    /// The most recent snapshot, ascending by stack order.
    #[must_use]
    pub fn snapshot(&self) -> Arc<[Item]> {
        Arc::clone(&self.latest.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of snapshots delivered so far, including the initial one.
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::SeqCst)
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}
