//! # Shared Source Handle
//!
//! This module provides `SharedSource`, the single physical handle that all
//! windowed nodes of one loaded tree read through. Every windowed node holds
//! a clone, so the handle stays open for as long as any node references it
//! and closes when the last one drops; a shared handle is never outlived by
//! the windows that read through it.
//!
//! ## Cursor Multiplexing
//!
//! The handle has exactly one physical cursor. Nodes multiplex it through
//! the bookmark/resynchronize protocol in the View Engine: each node
//! remembers the cursor position it last left, and repositions the handle
//! there before its next access whenever another node moved the cursor out
//! of its window in the meantime.
//!
//! ## Thread Safety
//!
//! The `RwLock` guards individual accesses only. The container is designed
//! for single-threaded use; callers needing concurrent access must
//! serialize all operations on a shared-handle group with an external lock.

use std::path::Path;

use eyre::Result;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::sync::Arc;

use super::store::{AnyStore, FileStore, MemStore};

/// Reference-counted handle to the byte resource a loaded tree shares.
///
/// Cheap to clone; all clones address the same store and the same physical
/// cursor.
#[derive(Debug, Clone)]
pub struct SharedSource {
    store: Arc<RwLock<AnyStore>>,
}

impl SharedSource {
    pub fn new(store: AnyStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Shared source over an in-memory buffer, cursor at position 0.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(AnyStore::Mem(MemStore::from_bytes(bytes)))
    }

    /// Shared source over a file opened read-only.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(AnyStore::File(FileStore::open(path)?)))
    }

    /// Locks the underlying store for one physical operation.
    ///
    /// Every access moves the cursor, so the guard is always exclusive.
    pub(crate) fn guard(&self) -> RwLockWriteGuard<'_, AnyStore> {
        self.store.write()
    }

    /// True if both handles address the same physical store.
    pub fn same_handle(&self, other: &SharedSource) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}
