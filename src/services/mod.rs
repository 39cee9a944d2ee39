pub mod board;
pub mod persistence;
pub mod search;
