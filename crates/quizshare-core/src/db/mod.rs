//! Local record store for QuizShare

mod collections;
mod connection;
mod migrations;
mod store;

pub use collections::{QuizCollections, MAX_COLLECTION_LEN};
pub use connection::Database;
pub use store::{RecordKey, RecordStore, SqliteRecordStore};
