//! # Byte Resource Backends
//!
//! This module provides the `ByteStore` trait, a seekable byte-resource
//! abstraction over the concrete backends arbor reads and writes through,
//! plus the type-erased `AnyStore` wrapper used wherever a single handle
//! must accept more than one backend without generics.
//!
//! ## Copy-Based Interface
//!
//! `ByteStore` extends the `std::io` traits with explicit sizing:
//!
//! ```text
//! trait ByteStore: Read + Write + Seek + Send {
//!     fn len(&self) -> io::Result<u64>;
//!     fn set_len(&mut self, new_len: u64) -> io::Result<()>;
//! }
//! ```
//!
//! All access is cursor-based and copying. The View Engine multiplexes one
//! physical cursor across many windowed nodes, so the backends themselves
//! stay oblivious to windows; they only ever see absolute positions.
//!
//! ## Backends
//!
//! | Backend     | Medium            | Writable       | Used for          |
//! |-------------|-------------------|----------------|-------------------|
//! | `FileStore` | named file        | create-mode    | save/load hosts   |
//! | `MemStore`  | `Vec<u8>` cursor  | yes            | buffers, tests    |
//! | `OwnedStore`| unnamed temp file | yes            | node storage      |
//!
//! `OwnedStore` lives in the sibling `temp` module because its lifecycle
//! (delete-on-drop) is the interesting part.
//!
//! ## AnyStore
//!
//! `AnyStore` is a type-erased enum that implements `ByteStore` by
//! delegation, allowing `SharedSource` to hold any backend without
//! trait objects:
//!
//! ```text
//! pub enum AnyStore {
//!     File(FileStore),
//!     Mem(MemStore),
//! }
//! ```
//!
//! ## Error Handling
//!
//! Backend constructors return `eyre::Result` with the file path and
//! operation in context. The trait methods themselves speak `io::Result`;
//! call sites add context when they wrap them.

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};

/// Seekable, sizable byte resource.
///
/// The collaborator surface of the container: `read`, `write` and `seek`
/// come from the `std::io` traits; `len` and `set_len` complete the
/// `size`/`resize` primitives.
pub trait ByteStore: Read + Write + Seek + Send {
    /// Current length of the resource in bytes.
    fn len(&self) -> io::Result<u64>;

    /// Grows or truncates the resource to exactly `new_len` bytes.
    ///
    /// Growth zero-fills; the cursor position is left untouched either way.
    fn set_len(&mut self, new_len: u64) -> io::Result<()>;

    fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Named file backend.
///
/// Opened read-only (`open`) for lazy loading or created read-write
/// (`create`) for saving. The handle closes when the store drops, on every
/// exit path.
#[derive(Debug)]
pub struct FileStore {
    file: File,
    path: PathBuf,
}

impl FileStore {
    /// Opens an existing file read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .wrap_err_with(|| format!("failed to open container file '{}'", path.display()))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Creates (or truncates) a file for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create container file '{}'", path.display()))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for FileStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileStore {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileStore {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl ByteStore for FileStore {
    fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn set_len(&mut self, new_len: u64) -> io::Result<()> {
        self.file.set_len(new_len)
    }
}

/// In-memory backend over a `Vec<u8>` cursor.
///
/// Serves as the save target for in-memory round trips and as the shared
/// source when loading a tree from a byte buffer.
#[derive(Debug, Default)]
pub struct MemStore {
    cursor: Cursor<Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing buffer; the cursor starts at position 0.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    /// Consumes the store and returns the underlying buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.cursor.into_inner()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.cursor.get_ref()
    }
}

impl Read for MemStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for MemStore {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemStore {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl ByteStore for MemStore {
    fn len(&self) -> io::Result<u64> {
        Ok(self.cursor.get_ref().len() as u64)
    }

    fn set_len(&mut self, new_len: u64) -> io::Result<()> {
        self.cursor.get_mut().resize(new_len as usize, 0);
        Ok(())
    }
}

/// Type-erased backend wrapper.
///
/// Lets `SharedSource` hold any backend without generics, mirroring the
/// enum-dispatch pattern of the storage driver layer.
#[derive(Debug)]
pub enum AnyStore {
    File(FileStore),
    Mem(MemStore),
}

impl Read for AnyStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            AnyStore::File(s) => s.read(buf),
            AnyStore::Mem(s) => s.read(buf),
        }
    }
}

impl Write for AnyStore {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            AnyStore::File(s) => s.write(buf),
            AnyStore::Mem(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            AnyStore::File(s) => s.flush(),
            AnyStore::Mem(s) => s.flush(),
        }
    }
}

impl Seek for AnyStore {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            AnyStore::File(s) => s.seek(pos),
            AnyStore::Mem(s) => s.seek(pos),
        }
    }
}

impl ByteStore for AnyStore {
    fn len(&self) -> io::Result<u64> {
        match self {
            AnyStore::File(s) => ByteStore::len(s),
            AnyStore::Mem(s) => ByteStore::len(s),
        }
    }

    fn set_len(&mut self, new_len: u64) -> io::Result<()> {
        match self {
            AnyStore::File(s) => ByteStore::set_len(s, new_len),
            AnyStore::Mem(s) => ByteStore::set_len(s, new_len),
        }
    }
}
