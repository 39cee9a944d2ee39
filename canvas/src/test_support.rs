//! Fixtures shared by the crate's unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::doc::{Board, BoardId, Item, ItemId, PartialBoard, PartialItem};
use crate::store::{ItemStore, Listener, LocalStore, PersistenceError, SubscriptionId};

/// A fresh store holding one empty board.
pub fn board_store() -> (Arc<LocalStore>, BoardId) {
    let store = Arc::new(LocalStore::new());
    let board = Board::new("Test Board", 1_700_000_000_000);
    let board_id = board.id;
    assert!(store.insert_board(board).is_ok());
    (store, board_id)
}

/// A 100×100 image item at `(x, y)`.
pub fn image_at(board_id: BoardId, name: &str, x: f64, y: f64, stack_order: i64) -> Item {
    Item::image(board_id, vec![0x89, 0x50, 0x4e, 0x47], name)
        .with_rect(x, y, 100.0, 100.0)
        .with_stack_order(stack_order)
}

/// Insert items with the given stack orders, stacked diagonally. Returns their ids
/// in argument order.
pub fn seed(store: &dyn ItemStore, board_id: BoardId, orders: &[i64]) -> Vec<ItemId> {
    orders
        .iter()
        .enumerate()
        .map(|(i, &z)| {
            #[allow(clippy::cast_precision_loss)]
            let offset = i as f64 * 10.0;
            let item = image_at(board_id, &format!("Item {i}"), offset, offset, z);
            let id = item.id;
            assert!(store.insert(item).is_ok(), "seed insert");
            id
        })
        .collect()
}

/// Store wrapper whose `fail_on`-th item update (1-based) fails.
pub struct FlakyStore {
    pub inner: LocalStore,
    fail_on: usize,
    updates: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: LocalStore, fail_on: usize) -> Self {
        Self { inner, fail_on, updates: AtomicUsize::new(0) }
    }
}

impl ItemStore for FlakyStore {
    fn board(&self, id: BoardId) -> Option<Board> {
        self.inner.board(id)
    }
    fn boards(&self) -> Vec<Board> {
        self.inner.boards()
    }
    fn insert_board(&self, board: Board) -> Result<(), PersistenceError> {
        self.inner.insert_board(board)
    }
    fn update_board(&self, id: BoardId, fields: &PartialBoard) -> Result<Board, PersistenceError> {
        self.inner.update_board(id, fields)
    }
    fn delete_board(&self, id: BoardId) -> Result<Board, PersistenceError> {
        self.inner.delete_board(id)
    }
    fn item(&self, id: ItemId) -> Option<Item> {
        self.inner.item(id)
    }
    fn query(&self, board_id: BoardId) -> Vec<Item> {
        self.inner.query(board_id)
    }
    fn insert(&self, item: Item) -> Result<(), PersistenceError> {
        self.inner.insert(item)
    }
    fn update(&self, id: ItemId, fields: &PartialItem) -> Result<Item, PersistenceError> {
        let n = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(PersistenceError::QuotaExceeded { needed: 1, available: 0 });
        }
        self.inner.update(id, fields)
    }
    fn delete(&self, id: ItemId) -> Result<Item, PersistenceError> {
        self.inner.delete(id)
    }
    fn subscribe(&self, board_id: BoardId, listener: Listener) -> SubscriptionId {
        self.inner.subscribe(board_id, listener)
    }
    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }
}
