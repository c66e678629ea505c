//! # Tree Container
//!
//! This module provides `Node`, the tree element of the container. Every
//! node is simultaneously an ordered collection of child nodes and an
//! independently readable/writable/seekable byte stream holding the node's
//! own payload (the stream side lives in the `stream` submodule).
//!
//! ## Ownership Model
//!
//! `Node` is a cheap `Clone` handle over `Arc<RwLock<NodeInner>>`. Children
//! are held as strong handles in order; `parent` and `owner` are `Weak`
//! back-references, so the strong topology is strictly top-down and a
//! dropped subtree tears down children-first with no cycles:
//!
//! ```text
//! root ──strong──▶ child ──strong──▶ grandchild
//!   ▲────weak─────── parent/owner ◀──────┘
//! ```
//!
//! "Destroying" a node means dropping the tree's strong handle; backing
//! resources (owned temp files, shared source handles) are released when the
//! last handle goes away.
//!
//! ## Attach Semantics
//!
//! - `add` / `insert` import the item first: a parentless node attaches
//!   directly; a node owned by another parent is auto-extracted from it
//!   (cross-tree move). Adding a node that is already a direct child
//!   returns its existing index; inserting one *moves* it to the requested
//!   index instead of duplicating it.
//! - Importing records `owner`: the attaching node's own owner, or the
//!   attaching node itself when it is a root. The value is written at
//!   attach time and never recomputed — reparenting an ancestor leaves
//!   descendants' cached owner stale, which is documented legacy behavior.
//! - Self-attachment and attaching a node beneath its own descendant are
//!   rejected (`ContainerError::WouldCycle`).
//! - `extract` detaches a child and force-materializes its entire subtree,
//!   since it can no longer depend on the former tree's shared source.
//!
//! ## Thread Safety
//!
//! The container is designed for single-threaded use. The `RwLock`s guard
//! individual accesses only; callers needing concurrent access must
//! serialize all operations on a tree (and its shared-handle group) with an
//! external lock.

mod stream;

pub use stream::SeekWhence;
pub(crate) use stream::NodeStream;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use eyre::{Result, WrapErr};
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::ContainerError;
use crate::storage::OwnedStore;

pub(crate) struct NodeInner {
    // Declared before `stream` so a subtree drops children-first.
    pub(crate) children: SmallVec<[Node; 4]>,
    pub(crate) parent: Weak<RwLock<NodeInner>>,
    pub(crate) owner: Weak<RwLock<NodeInner>>,
    pub(crate) stream: NodeStream,
    pub(crate) source_path: Option<PathBuf>,
    pub(crate) last_used_path: Option<PathBuf>,
}

/// A tree element that is also a byte stream.
///
/// Cheap to clone; all clones address the same node. Stream operations
/// (`read`, `write`, `seek`, `resize`, …) are defined in the `stream`
/// submodule.
#[derive(Clone)]
pub struct Node {
    pub(crate) inner: Arc<RwLock<NodeInner>>,
}

impl Node {
    /// Creates an unattached root node holding fresh owned storage.
    pub fn new() -> Result<Self> {
        Ok(Self {
            inner: Arc::new(RwLock::new(NodeInner {
                children: SmallVec::new(),
                parent: Weak::new(),
                owner: Weak::new(),
                stream: NodeStream::Owned(OwnedStore::new()?),
                source_path: None,
                last_used_path: None,
            })),
        })
    }

    /// True if both handles address the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn child_count(&self) -> usize {
        self.inner.read().children.len()
    }

    /// Child handle at `index`.
    pub fn child(&self, index: usize) -> Result<Node> {
        let inner = self.inner.read();
        inner
            .children
            .get(index)
            .cloned()
            .ok_or_else(|| {
                ContainerError::IndexOutOfRange {
                    index,
                    count: inner.children.len(),
                }
                .into()
            })
    }

    /// Handles to every child, in sequence order.
    pub fn children(&self) -> Vec<Node> {
        self.inner.read().children.iter().cloned().collect()
    }

    /// Index of `item` in the child sequence, if it is a direct child.
    pub fn index_of(&self, item: &Node) -> Option<usize> {
        self.inner
            .read()
            .children
            .iter()
            .position(|c| c.ptr_eq(item))
    }

    /// Immediate containing node, if attached.
    pub fn parent(&self) -> Option<Node> {
        self.inner.read().parent.upgrade().map(|inner| Node { inner })
    }

    /// Topmost ancestor recorded when this node was last attached.
    pub fn owner(&self) -> Option<Node> {
        self.inner.read().owner.upgrade().map(|inner| Node { inner })
    }

    /// Appends `item` to the child sequence and returns its index.
    ///
    /// If `item` is already a direct child, its existing index is returned
    /// and nothing changes. A node attached elsewhere is extracted from its
    /// old parent first.
    pub fn add(&self, item: &Node) -> Result<usize> {
        if let Some(existing) = self.index_of(item) {
            return Ok(existing);
        }

        self.import(item)?;

        let mut inner = self.inner.write();
        inner.children.push(item.clone());
        Ok(inner.children.len() - 1)
    }

    /// Inserts `item` at `index` (0..=child_count).
    ///
    /// If `item` is already a direct child, it is *moved* to `index` instead
    /// of duplicated; the child count does not change.
    pub fn insert(&self, index: usize, item: &Node) -> Result<()> {
        if let Some(current) = self.index_of(item) {
            let mut inner = self.inner.write();
            let count = inner.children.len();
            if index >= count {
                return Err(ContainerError::IndexOutOfRange { index, count }.into());
            }
            let node = inner.children.remove(current);
            inner.children.insert(index, node);
            return Ok(());
        }

        let count = self.child_count();
        if index > count {
            return Err(ContainerError::IndexOutOfRange { index, count }.into());
        }

        self.import(item)?;

        let mut inner = self.inner.write();
        inner.children.insert(index, item.clone());
        Ok(())
    }

    /// Detaches `item` from the child sequence and returns it.
    ///
    /// The detached subtree is force-materialized so it no longer depends on
    /// this tree's shared source; its lifetime belongs to the caller.
    pub fn extract(&self, item: &Node) -> Result<Node> {
        let index = self
            .index_of(item)
            .ok_or(ContainerError::NotAChild)?;

        {
            let mut inner = self.inner.write();
            inner.children.remove(index);
        }
        {
            let mut it = item.inner.write();
            it.parent = Weak::new();
            it.owner = Weak::new();
        }

        debug!(index, "extracting subtree from container");
        item.materialize(true)
            .wrap_err("failed to materialize extracted subtree")?;

        Ok(item.clone())
    }

    /// Detaches `item` and destroys it, tearing down its subtree and
    /// releasing owned storage.
    pub fn remove(&self, item: &Node) -> Result<()> {
        let node = self.extract(item)?;
        drop(node);
        Ok(())
    }

    /// Destroys the child at `index`.
    pub fn delete(&self, index: usize) -> Result<()> {
        let mut inner = self.inner.write();
        let count = inner.children.len();
        if index >= count {
            return Err(ContainerError::IndexOutOfRange { index, count }.into());
        }
        inner.children.remove(index);
        Ok(())
    }

    /// Moves the child at `cur` to position `new`.
    pub fn move_child(&self, cur: usize, new: usize) -> Result<()> {
        let mut inner = self.inner.write();
        let count = inner.children.len();
        if cur >= count {
            return Err(ContainerError::IndexOutOfRange { index: cur, count }.into());
        }
        if new >= count {
            return Err(ContainerError::IndexOutOfRange { index: new, count }.into());
        }
        let node = inner.children.remove(cur);
        inner.children.insert(new, node);
        Ok(())
    }

    /// Swaps the children at `a` and `b`.
    pub fn exchange(&self, a: usize, b: usize) -> Result<()> {
        let mut inner = self.inner.write();
        let count = inner.children.len();
        if a >= count {
            return Err(ContainerError::IndexOutOfRange { index: a, count }.into());
        }
        if b >= count {
            return Err(ContainerError::IndexOutOfRange { index: b, count }.into());
        }
        inner.children.swap(a, b);
        Ok(())
    }

    /// Destroys every child recursively and empties the sequence.
    pub fn clear(&self) {
        self.inner.write().children.clear();
    }

    /// Path this node was loaded from, if any.
    pub fn source_path(&self) -> Option<PathBuf> {
        self.inner.read().source_path.clone()
    }

    /// Path this node was last saved to, if any.
    pub fn last_used_path(&self) -> Option<PathBuf> {
        self.inner.read().last_used_path.clone()
    }

    pub(crate) fn set_source_path(&self, path: &Path) {
        self.inner.write().source_path = Some(path.to_path_buf());
    }

    pub(crate) fn set_last_used_path(&self, path: &Path) {
        self.inner.write().last_used_path = Some(path.to_path_buf());
    }

    /// Attaches `item` to this node: verifies the attach is structurally
    /// legal, detaches from any old parent, and records the parent/owner
    /// back-edges.
    fn import(&self, item: &Node) -> Result<()> {
        if self.ptr_eq(item) {
            return Err(ContainerError::WouldCycle.into());
        }

        // Reject attaching an ancestor beneath its own descendant.
        let mut ancestor = self.parent();
        while let Some(node) = ancestor {
            if node.ptr_eq(item) {
                return Err(ContainerError::WouldCycle.into());
            }
            ancestor = node.parent();
        }

        if let Some(old_parent) = item.parent() {
            old_parent
                .extract(item)
                .wrap_err("failed to detach node from its previous parent")?;
        }

        // owner := this.owner if this node is itself attached, else this.
        let owner = {
            let inner = self.inner.read();
            if inner.owner.strong_count() > 0 {
                inner.owner.clone()
            } else {
                Arc::downgrade(&self.inner)
            }
        };

        let mut it = item.inner.write();
        it.parent = Arc::downgrade(&self.inner);
        it.owner = owner;
        Ok(())
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Node")
            .field("children", &inner.children.len())
            .field("attached", &(inner.parent.strong_count() > 0))
            .field("stream", &inner.stream)
            .finish()
    }
}
