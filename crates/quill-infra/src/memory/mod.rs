//! In-memory storage - used when no database is configured, and by tests.

mod store;

pub use store::InMemoryStore;
