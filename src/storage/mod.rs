//! `ConfigStore` implementations.
//!
//! The configuration store itself is an external collaborator: its format, authentication, and caching policy are
//! implementation-defined. This module ships two concrete backends so
//! the core is runnable end to end without a real deployment's store
//! wired in: an in-memory snapshot (tests, the CLI's offline mode) and a
//! `SQLite`-backed one (a real, if minimal, persistent store). Both
//! honor the core's one requirement: read-through, no cache inside the
//! core.

pub mod memory;
pub mod schema;
pub mod sqlite;

pub use memory::InMemoryConfigStore;
pub use sqlite::SqliteConfigStore;

/// Default path for the `SQLite`-backed configuration store, relative to
/// the process's working directory.
pub const DEFAULT_DB_PATH: &str = ".pii-sentinel/config.db";
