//! Tutor storage crate - local SQLite replay cache.
//!
//! Keeps immutable chapter-generation snapshots and the list of analyzed
//! documents so history can be replayed without recomputing anything on the
//! backend.

pub mod db;
pub mod migrations;
pub mod repository;
pub mod store;

pub use db::Database;
pub use repository::{DocumentRepository, HistoryRepository};
pub use store::SqliteHistoryStore;
