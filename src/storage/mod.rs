//! # Storage Module
//!
//! This module provides the byte-resource layer the container is built on:
//! concrete backends behind a copy-based trait, the temp-file-backed private
//! store a node owns, and the reference-counted shared handle a loaded tree
//! multiplexes.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │   View Engine (tree::stream)                 │
//! ├──────────────────────────────────────────────┤
//! │ SharedSource (Arc<RwLock<AnyStore>>)         │
//! │     │                                        │
//! │     ├── AnyStore::File ── FileStore          │
//! │     └── AnyStore::Mem ─── MemStore           │
//! │                                              │
//! │ OwnedStore (NamedTempFile, one per node)     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! A node's payload lives either in its own `OwnedStore` or inside a bounded
//! window of a `SharedSource`. The storage layer knows nothing about
//! windows; it deals in absolute positions only.
//!
//! ## Module Organization
//!
//! - `store`: `ByteStore` trait, `FileStore`, `MemStore`, `AnyStore`
//! - `temp`: `OwnedStore`, delete-on-drop temp-file lifecycle
//! - `shared`: `SharedSource`, the ref-counted shared handle
//!
//! ## Resource Ownership
//!
//! An `OwnedStore` belongs to exactly one node; its backing temp file is
//! unlinked when the store drops. A `SharedSource` stays open while any
//! windowed node holds a clone — subtrees are torn down as a unit, and a
//! node extracted from its tree is deep-materialized first so it never
//! outlives the handle it was windowed on.

mod shared;
mod store;
mod temp;

pub use shared::SharedSource;
pub use store::{AnyStore, ByteStore, FileStore, MemStore};
pub use temp::OwnedStore;

/// Chunk size for payload copies (materialization, save).
pub const COPY_CHUNK_SIZE: usize = 8192;
