//! # Arbor - Persistent Hierarchical Stream Container
//!
//! Arbor is a tree container in which every node is simultaneously an
//! ordered collection of child nodes and an independently readable,
//! writable, seekable byte stream holding that node's own payload. Trees
//! are serialized into a single linear binary blob and reloaded **lazily**:
//! on load no payload is copied into memory; each node becomes a bounded
//! *window* onto the single source handle and is only *materialized* into
//! private storage when a mutation cannot be satisfied through the window.
//!
//! ## Quick Start
//!
//! ```ignore
//! use arbor::{Node, SeekWhence};
//!
//! let root = Node::new()?;
//! let child = Node::new()?;
//! root.add(&child)?;
//! child.write_all(&[1, 2, 3])?;
//!
//! root.save_to_file("tree.arb")?;
//!
//! let reloaded = Node::new()?;
//! reloaded.load_from_file("tree.arb")?;   // lazy: payloads stay on disk
//! assert_eq!(reloaded.child(0)?.read_all()?, vec![1, 2, 3]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      Tree Container (tree)              │
//! │  add/insert/extract, parent/owner edges │
//! ├─────────────────────────────────────────┤
//! │      View Engine (tree::stream)         │
//! │  windowed read/write/seek/resize,       │
//! │  cursor bookmarks, materialization      │
//! ├─────────────────────────────────────────┤
//! │      Codec (codec)                      │
//! │  recursive record format, string        │
//! │  helpers, save/load file host           │
//! ├─────────────────────────────────────────┤
//! │      Storage (storage)                  │
//! │  ByteStore backends, owned temp files,  │
//! │  shared source handle                   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Lazy Windows
//!
//! A loaded node records only `[window_begin, window_begin + length)` in
//! the shared source plus a cursor bookmark. All windowed nodes of one tree
//! multiplex the source's single physical cursor, resynchronizing through
//! their bookmarks before each access. A node is promoted to private
//! temp-file-backed storage ("materialized") when a write grows past its
//! window, a seek leaves the window, or it is truncated to empty — and
//! never demoted back.
//!
//! ## Module Overview
//!
//! - [`tree`]: `Node`, child-sequence operations, windowed streams
//! - [`codec`]: `TreeCodec`, the recursive binary format, file host
//! - [`storage`]: byte-resource backends and the shared source handle
//! - [`error`]: typed error kinds carried inside `eyre` reports
//!
//! ## Concurrency Model
//!
//! Single-threaded, fully synchronous, blocking I/O. The bookmark protocol
//! tolerates sequential interleaving across nodes sharing one handle; it is
//! not a concurrency primitive. Callers needing multi-threaded access must
//! serialize all operations on a shared-handle group with an external lock.

pub mod codec;
pub mod error;
pub mod storage;
pub mod tree;

pub use codec::{NodeFactory, NodeHook, TreeCodec, CONTAINER_SIGNATURE, FORMAT_VERSION};
pub use error::{ContainerError, FormatError, InvariantViolation, StorageError};
pub use storage::{AnyStore, ByteStore, FileStore, MemStore, OwnedStore, SharedSource};
pub use tree::{Node, SeekWhence};
