//! Stable error codes for the UI.

use canvas::store::PersistenceError;

/// Maps an error to a stable code the UI can switch on.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    /// Whether repeating the same operation may succeed.
    fn retryable(&self) -> bool {
        false
    }
}

impl ErrorCode for PersistenceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BoardNotFound(_) => "E_BOARD_NOT_FOUND",
            Self::ItemNotFound(_) => "E_ITEM_NOT_FOUND",
            Self::DuplicateId(_) => "E_DUPLICATE_ID",
            Self::InvalidField(_) => "E_INVALID_FIELD",
            Self::QuotaExceeded { .. } => "E_QUOTA_EXCEEDED",
        }
    }
}
