//! # View Engine
//!
//! This module implements the windowed-stream semantics of the container:
//! every node's payload is a stream backed either by private owned storage
//! or by a bounded *window* onto the shared source handle the tree was
//! loaded from.
//!
//! ## Window Semantics
//!
//! A windowed node addresses the half-open range `[begin, begin+length)` of
//! the shared store. The node's externally reported size is `length`;
//! reads and writes never observe bytes outside the window. In-window
//! writes go straight into the shared store (windows of distinct nodes
//! never overlap, so only this node's range is affected).
//!
//! ## Cursor Bookmarks
//!
//! The shared store has one physical cursor, multiplexed across every
//! windowed node of the tree. Each node remembers the cursor position it
//! last left (`bookmark`). Before any physical operation, the node
//! *resynchronizes*: if the cursor lies outside `[begin, begin+length]`,
//! another node moved it, and it is repositioned to the bookmark. This
//! tolerates sequential interleaving across nodes within one thread of
//! control; it is not a concurrency primitive.
//!
//! ## Materialization
//!
//! When a mutation cannot be satisfied through the window, the node is
//! promoted to owned storage — one-directionally, never reversed:
//!
//! | Trigger                          | Bytes preserved        |
//! |----------------------------------|------------------------|
//! | write past the window boundary   | current position       |
//! | seek past the window end         | current size           |
//! | resize to zero                   | none                   |
//! | resize beyond the current size   | current size           |
//! | explicit `materialize` / extract | current size           |
//!
//! Promotion copies the preserved bytes from the window start into a fresh
//! temp-file-backed store in fixed-size chunks and swaps the node's stream
//! over; the shared store is left untouched.
//!
//! ## Seek Convention
//!
//! Windowed end-relative seeks compute `begin + length - offset`, i.e. the
//! offset is *subtracted* from the window end. Owned streams pass seeks
//! through to the underlying resource with ordinary `std::io` semantics
//! (`End` adds). The asymmetry is deliberate and preserved; `Node` exposes
//! its own `SeekWhence` enum rather than implementing `std::io::Seek` with
//! a surprising `End`.

use std::io::{Read, Seek, SeekFrom, Write};

use eyre::{Result, WrapErr};
use tracing::debug;

use super::{Node, NodeInner};
use crate::error::{InvariantViolation, StorageError};
use crate::storage::{AnyStore, ByteStore, OwnedStore, SharedSource, COPY_CHUNK_SIZE};

/// Seek origin for node streams.
///
/// `End` is interpreted differently by the two storage states: a windowed
/// stream resolves `End(o)` to `size - o` (the offset counts backward
/// without a sign flip), while an owned stream passes `End(o)` through with
/// `std::io` semantics (`size + o`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    /// Absolute offset from the stream start.
    Start(u64),
    /// Signed displacement from the current position.
    Current(i64),
    /// Offset relative to the stream end (see type docs for the sign).
    End(i64),
}

impl SeekWhence {
    fn into_io(self) -> SeekFrom {
        match self {
            SeekWhence::Start(offset) => SeekFrom::Start(offset),
            SeekWhence::Current(delta) => SeekFrom::Current(delta),
            SeekWhence::End(offset) => SeekFrom::End(offset),
        }
    }
}

/// Storage state of a node's payload stream.
#[derive(Debug)]
pub(crate) enum NodeStream {
    /// Private temp-file-backed storage, exclusively held by the node.
    Owned(OwnedStore),
    /// Bounded window onto a store shared with other nodes from the same
    /// source.
    Window(WindowState),
}

#[derive(Debug)]
pub(crate) struct WindowState {
    pub(crate) source: SharedSource,
    /// Absolute offset of the window start in the shared store.
    pub(crate) begin: u64,
    /// Window length; equals the node's externally reported size.
    pub(crate) length: u64,
    /// This node's last known physical cursor position.
    pub(crate) bookmark: u64,
}

/// Repositions the shared cursor to the node's bookmark if another node
/// moved it out of the window. Returns the physical cursor position.
fn resynchronize(store: &mut AnyStore, window: &WindowState) -> Result<u64> {
    let cursor = store
        .stream_position()
        .wrap_err("failed to query shared store position")?;

    if cursor < window.begin || cursor > window.begin + window.length {
        store
            .seek(SeekFrom::Start(window.bookmark))
            .wrap_err("failed to resynchronize shared store cursor")?;
        return Ok(window.bookmark);
    }

    Ok(cursor)
}

/// Copies exactly `count` bytes from the current position of `src` into
/// `dst`, in fixed-size chunks.
fn copy_exact(src: &mut AnyStore, dst: &mut OwnedStore, count: u64) -> Result<()> {
    let mut buf = [0u8; COPY_CHUNK_SIZE];
    let mut remaining = count;

    while remaining > 0 {
        let chunk = remaining.min(COPY_CHUNK_SIZE as u64) as usize;
        src.read_exact(&mut buf[..chunk])
            .wrap_err("failed to read window bytes during materialization")?;
        dst.write_all(&buf[..chunk])
            .wrap_err("failed to copy window bytes into owned storage")?;
        remaining -= chunk as u64;
    }

    Ok(())
}

impl NodeInner {
    /// Current payload size: owned store length, or the window length.
    pub(crate) fn stream_size(&self) -> Result<u64> {
        match &self.stream {
            NodeStream::Owned(store) => store.len().wrap_err("failed to query owned store size"),
            NodeStream::Window(window) => Ok(window.length),
        }
    }

    /// Promotes a windowed stream to owned storage, copying `preserve`
    /// bytes from the window start. No-op for an already-owned stream.
    ///
    /// The owned cursor lands at `preserve`.
    pub(crate) fn promote(&mut self, preserve: u64) -> Result<()> {
        let window = match &self.stream {
            NodeStream::Window(window) => window,
            NodeStream::Owned(_) => return Ok(()),
        };

        debug!(
            begin = window.begin,
            length = window.length,
            preserve,
            "materializing windowed node into owned storage"
        );

        let mut owned = OwnedStore::new()?;
        if preserve > 0 {
            let mut src = window.source.guard();
            src.seek(SeekFrom::Start(window.begin))
                .wrap_err("failed to seek to window start for materialization")?;
            copy_exact(&mut src, &mut owned, preserve)?;
        }

        self.stream = NodeStream::Owned(owned);
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        match &mut self.stream {
            NodeStream::Owned(store) => {
                store.read(buf).wrap_err("read from owned store failed")
            }
            NodeStream::Window(window) => {
                let mut src = window.source.guard();
                let cursor = resynchronize(&mut src, window)?;

                // A read never crosses the window boundary.
                let position = cursor - window.begin;
                let available = window.length - position;
                let count = (buf.len() as u64).min(available) as usize;

                if count > 0 {
                    src.read_exact(&mut buf[..count])
                        .wrap_err("windowed read from shared store failed")?;
                }
                window.bookmark = cursor + count as u64;
                Ok(count)
            }
        }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        let position = match &mut self.stream {
            NodeStream::Owned(store) => {
                store
                    .write_all(data)
                    .wrap_err("write to owned store failed")?;
                return Ok(data.len());
            }
            NodeStream::Window(window) => {
                let mut src = window.source.guard();
                let cursor = resynchronize(&mut src, window)?;
                let position = cursor - window.begin;

                if position + data.len() as u64 <= window.length {
                    src.write_all(data)
                        .wrap_err("windowed in-place write failed")?;
                    window.bookmark = cursor + data.len() as u64;
                    return Ok(data.len());
                }
                position
            }
        };

        // The write extends past the window boundary: promote first,
        // preserving the bytes up to the current position, then write
        // through the owned path.
        self.promote(position)?;
        match &mut self.stream {
            NodeStream::Owned(store) => {
                store
                    .write_all(data)
                    .wrap_err("write after materialization failed")?;
                Ok(data.len())
            }
            NodeStream::Window(_) => {
                Err(InvariantViolation("node still windowed after materialization").into())
            }
        }
    }

    fn seek_stream(&mut self, whence: SeekWhence) -> Result<u64> {
        let (logical_target, preserve) = match &mut self.stream {
            NodeStream::Owned(store) => {
                return store
                    .seek(whence.into_io())
                    .wrap_err("seek on owned store failed");
            }
            NodeStream::Window(window) => {
                let target = {
                    let mut src = window.source.guard();
                    let cursor = resynchronize(&mut src, window)?;

                    let target = match whence {
                        SeekWhence::Start(offset) => window.begin as i64 + offset as i64,
                        SeekWhence::Current(delta) => cursor as i64 + delta,
                        // End-relative targets subtract the offset from the
                        // window end.
                        SeekWhence::End(offset) => (window.begin + window.length) as i64 - offset,
                    };

                    if target < window.begin as i64 {
                        return Err(StorageError::SeekBeforeStart { target }.into());
                    }

                    let target = target as u64;
                    if target <= window.begin + window.length {
                        src.seek(SeekFrom::Start(target))
                            .wrap_err("windowed seek on shared store failed")?;
                        window.bookmark = target;
                        return Ok(target - window.begin);
                    }
                    target
                };

                (target - window.begin, window.length)
            }
        };

        // The target lies past the window end: promote up to the current
        // size, then seek the owned store to the window-relative target.
        self.promote(preserve)?;
        match &mut self.stream {
            NodeStream::Owned(store) => store
                .seek(SeekFrom::Start(logical_target))
                .wrap_err("seek after materialization failed"),
            NodeStream::Window(_) => {
                Err(InvariantViolation("node still windowed after materialization").into())
            }
        }
    }

    fn resize_stream(&mut self, new_size: u64) -> Result<()> {
        let preserve = match &mut self.stream {
            NodeStream::Owned(store) => {
                return store
                    .set_len(new_size)
                    .wrap_err("resize of owned store failed");
            }
            NodeStream::Window(window) => {
                if new_size > 0 && new_size <= window.length {
                    // Shrink within the window: no materialization; the
                    // cursor moves to the new end.
                    window.length = new_size;
                    let end = window.begin + new_size;
                    let mut src = window.source.guard();
                    src.seek(SeekFrom::Start(end))
                        .wrap_err("failed to move cursor to new window end")?;
                    window.bookmark = end;
                    return Ok(());
                }

                // Truncation to empty drops all content. Growth promotes
                // preserving the current size but does not extend the store
                // to `new_size`; growth comes from subsequent writes.
                if new_size == 0 {
                    0
                } else {
                    window.length
                }
            }
        };

        self.promote(preserve)
    }
}

impl Node {
    /// Reads up to `buf.len()` bytes from the payload stream into `buf`.
    ///
    /// Windowed reads are clamped to the window; a return of 0 means the
    /// window (or owned store) end was reached.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.inner.write().read_bytes(buf)
    }

    /// Writes `data` to the payload stream, growing it as needed.
    ///
    /// A windowed write that extends past the window boundary materializes
    /// the node first (preserving the bytes up to the current position) and
    /// then writes through the owned path.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.inner.write().write_bytes(data)
    }

    /// Writes the whole of `data`.
    pub fn write_all(&self, data: &[u8]) -> Result<()> {
        self.write(data).map(|_| ())
    }

    /// Repositions the payload stream and returns the new logical position.
    pub fn seek(&self, whence: SeekWhence) -> Result<u64> {
        self.inner.write().seek_stream(whence)
    }

    /// Resizes the payload stream to `new_size` bytes.
    ///
    /// For a windowed node, truncation to zero materializes with nothing
    /// preserved; shrinking narrows the window in place; growing beyond the
    /// current size materializes but leaves the size unchanged until bytes
    /// are actually written.
    pub fn resize(&self, new_size: u64) -> Result<()> {
        self.inner.write().resize_stream(new_size)
    }

    /// Current payload size in bytes.
    pub fn size(&self) -> Result<u64> {
        self.inner.read().stream_size()
    }

    /// Current logical position in the payload stream.
    pub fn position(&self) -> Result<u64> {
        let mut inner = self.inner.write();
        match &mut inner.stream {
            NodeStream::Owned(store) => store
                .stream_position()
                .wrap_err("failed to query owned store position"),
            NodeStream::Window(window) => Ok(window.bookmark - window.begin),
        }
    }

    /// Reads the entire payload from the start.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let size = self.size()? as usize;
        self.seek(SeekWhence::Start(0))?;

        let mut out = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            let n = self.read(&mut out[filled..])?;
            if n == 0 {
                return Err(StorageError::UnexpectedEof {
                    expected: size as u64,
                    actual: filled as u64,
                }
                .into());
            }
            filled += n;
        }
        Ok(out)
    }

    /// Promotes this node to owned storage, preserving its current payload.
    ///
    /// A no-op for an already-owned node. With `deep`, every descendant is
    /// materialized as well (recursion visits children even when a node was
    /// already owned), detaching the whole subtree from any shared source.
    pub fn materialize(&self, deep: bool) -> Result<()> {
        {
            let mut inner = self.inner.write();
            let size = inner.stream_size()?;
            inner.promote(size)?;
        }

        if deep {
            for child in self.children() {
                child.materialize(true)?;
            }
        }
        Ok(())
    }

    /// Replaces this node's stream with a window onto `source`.
    ///
    /// Any previously owned storage is dropped (deleting its backing temp
    /// file); the bookmark starts at the window begin.
    pub(crate) fn adopt_window(&self, source: SharedSource, begin: u64, length: u64) {
        let mut inner = self.inner.write();
        inner.stream = NodeStream::Window(WindowState {
            source,
            begin,
            length,
            bookmark: begin,
        });
    }
}
