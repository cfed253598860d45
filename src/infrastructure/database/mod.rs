pub mod connection;
pub mod memory_store;

pub use connection::DatabaseConnection;
pub use memory_store::{ConclusionSummary, SqliteMemoryStore};
