//! SQLite backend for the Lattice prerequisite graph.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every scope handed to the engine is a
//! real SQLite transaction.

mod encode;
mod graph;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use graph::SqliteGraph;
pub use store::SqliteStore;
