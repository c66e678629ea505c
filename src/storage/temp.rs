//! # Owned Storage Lifecycle
//!
//! This module provides `OwnedStore`, the private backing store a node holds
//! when its payload does not live inside a shared source window: a byte
//! resource backed by a uniquely named file in the system temp directory.
//!
//! ## Lifecycle
//!
//! - A fresh node allocates an `OwnedStore` at creation time.
//! - Materialization allocates one and copies the preserved window bytes in.
//! - Loading a node from a shared source *replaces* its `OwnedStore` with a
//!   window, which drops the store and deletes the backing file.
//! - Dropping a node (tree teardown, `remove`, `delete`, `clear`) drops the
//!   store the same way.
//!
//! The backing file is therefore deleted exactly when the node stops owning
//! it, on every path, without explicit cleanup code: `NamedTempFile` unlinks
//! the path on drop.
//!
//! ## Exclusive Ownership
//!
//! An `OwnedStore` is held by exactly one node and is never shared; all
//! positions are absolute within the store (window begin = 0), which is what
//! lets the View Engine pass owned operations straight through.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use eyre::{Result, WrapErr};
use tempfile::NamedTempFile;

use super::store::ByteStore;

const TEMP_PREFIX: &str = "arbor-";
const TEMP_SUFFIX: &str = ".node";

/// Temp-file-backed private byte resource, exclusively held by one node.
#[derive(Debug)]
pub struct OwnedStore {
    file: NamedTempFile,
}

impl OwnedStore {
    /// Allocates a fresh store under a unique path in the system temp
    /// directory.
    pub fn new() -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile()
            .wrap_err("failed to allocate temp-file backing store")?;

        Ok(Self { file })
    }

    /// Path of the backing temp file. Valid until the store drops.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Read for OwnedStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.as_file_mut().read(buf)
    }
}

impl Write for OwnedStore {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.as_file_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.as_file_mut().flush()
    }
}

impl Seek for OwnedStore {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.as_file_mut().seek(pos)
    }
}

impl ByteStore for OwnedStore {
    fn len(&self) -> io::Result<u64> {
        Ok(self.file.as_file().metadata()?.len())
    }

    fn set_len(&mut self, new_len: u64) -> io::Result<()> {
        self.file.as_file().set_len(new_len)
    }
}
