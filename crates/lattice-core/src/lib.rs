//! Core types and engine for the Lattice prerequisite graph.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Backends implement [`store::GraphStore`]; callers go through
//! [`curator::Curator`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod advisory;
pub mod audit;
pub mod concept;
pub mod curator;
pub mod edge;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod merge;
pub mod prerequisite;
pub mod preview;
pub mod reference;
pub mod review;
pub mod store;
pub mod strength;
pub mod topic;
pub mod topic_merge;

pub use error::{EntityKind, Error, ErrorKind, Result};
