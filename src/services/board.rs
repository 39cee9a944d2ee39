//! Board service: create, rename, list, and delete boards.
//!
//! DESIGN
//! ======
//! Boards live in the same `ItemStore` as their items. Deleting a board
//! cascades to its items inside the store, so this layer only adds naming
//! rules, timestamps, and logging on top of the store contract.

use time::OffsetDateTime;
use tracing::info;

use canvas::doc::{Board, BoardId, DEFAULT_BOARD_NAME, PartialBoard};
use canvas::store::{ItemStore, PersistenceError};

/// Current time in Unix milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

// =============================================================================
// CRUD
// =============================================================================

/// Create an empty board named "Untitled Board".
///
/// # Errors
///
/// Returns the store error if the board cannot be inserted.
pub fn create_board(store: &dyn ItemStore) -> Result<Board, PersistenceError> {
    let board = Board::new(DEFAULT_BOARD_NAME, now_millis());
    store.insert_board(board.clone())?;
    info!(board_id = %board.id, "board created");
    Ok(board)
}

/// Rename a board. The name is trimmed; a blank name leaves the board alone
/// and returns `Ok(None)`.
///
/// # Errors
///
/// `BoardNotFound` if the board does not exist.
pub fn rename_board(
    store: &dyn ItemStore,
    board_id: BoardId,
    name: &str,
) -> Result<Option<Board>, PersistenceError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    let fields = PartialBoard { name: Some(name.to_string()), ..PartialBoard::default() };
    let board = store.update_board(board_id, &fields)?;
    info!(%board_id, name, "board renamed");
    Ok(Some(board))
}

/// Replace the board's thumbnail reference.
///
/// # Errors
///
/// `BoardNotFound` if the board does not exist.
pub fn set_thumbnail(
    store: &dyn ItemStore,
    board_id: BoardId,
    thumbnail: impl Into<String>,
) -> Result<Board, PersistenceError> {
    let fields = PartialBoard { thumbnail: Some(thumbnail.into()), ..PartialBoard::default() };
    store.update_board(board_id, &fields)
}

/// Every board, newest first.
#[must_use]
pub fn list_boards(store: &dyn ItemStore) -> Vec<Board> {
    let mut boards = store.boards();
    boards.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    boards
}

/// Delete a board and every item on it.
///
/// # Errors
///
/// `BoardNotFound` if the board does not exist.
pub fn delete_board(store: &dyn ItemStore, board_id: BoardId) -> Result<Board, PersistenceError> {
    let removed_items = store.query(board_id).len();
    let board = store.delete_board(board_id)?;
    info!(%board_id, removed_items, "board deleted");
    Ok(board)
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
