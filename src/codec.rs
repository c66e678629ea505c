//! # Container Codec
//!
//! This module implements the recursive binary format trees are saved to
//! and lazily loaded from, the length-prefixed string helpers layered on
//! the node stream interface, and the thin file host
//! (`save_to_file`/`load_from_file`).
//!
//! ## Record Format
//!
//! One record per node, no padding, all integers little-endian, encoded
//! depth-first in child-sequence order:
//!
//! ```text
//! Offset  Size  Description
//! 0       8     data_length: i64 — byte length of this node's payload
//! 8       n     payload bytes (n = data_length)
//! 8+n     4     child_count: i32
//! 8+n+4   ...   child records, recursively, in child-sequence order
//! ```
//!
//! No signature or version is emitted or verified; `CONTAINER_SIGNATURE`
//! and `FORMAT_VERSION` are defined for a future header mode and the
//! matching `FormatError` variants stay reserved.
//!
//! ## Lazy Loading
//!
//! Load never copies a payload: it reads `data_length`, records the
//! window begin and initial cursor bookmark at the handle's position,
//! skips the payload, and adopts the handle as this node's window. Only
//! child counts and lengths are consumed eagerly. After the children are
//! loaded (and the after-load hook has run, possibly reading payload bytes
//! through the fresh window), the shared handle is repositioned to the end
//! of this node's record — past its own length/payload/count fields for a
//! leaf, past the last child's record otherwise — which is where
//! sequential reading of a following sibling resumes. The reposition is
//! safe even though nested loads moved the cursor arbitrarily, because
//! every node resynchronizes via its own bookmark before any physical
//! access.
//!
//! ## TreeCodec
//!
//! `TreeCodec` bundles the configurable pieces: the node-construction
//! function used to create each child during load, and optional per-node
//! `before_save` / `after_load` hooks.
//!
//! ```ignore
//! let codec = TreeCodec::new()
//!     .with_factory(Arc::new(Node::new))
//!     .on_after_load(Arc::new(|node| {
//!         let _header = node.read_string()?;
//!         Ok(())
//!     }));
//! codec.save_to_file(&root, "tree.arb")?;
//! ```
//!
//! ## File Host
//!
//! `save_to_file` creates the output for writing and releases the handle
//! on every exit path; a failed save does not delete the partial output.
//! `load_from_file` opens the source read-only; the handle lives inside
//! the tree's `SharedSource` for as long as any windowed node references
//! it, so in-window writes against a file-loaded tree surface the OS
//! error while in-memory sources accept them.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use eyre::{bail, Result, WrapErr};
use tracing::{debug, trace};

use crate::error::{FormatError, StorageError};
use crate::storage::{ByteStore, FileStore, SharedSource, COPY_CHUNK_SIZE};
use crate::tree::{Node, SeekWhence};

/// 5-byte container signature. Defined for a future header mode; the
/// current save/load path neither emits nor verifies it.
pub const CONTAINER_SIGNATURE: &[u8; 5] = b"ARBOR";

/// 2-byte container format version. Defined but not emitted, like the
/// signature.
pub const FORMAT_VERSION: u16 = 0x0100;

const DATA_LENGTH_SIZE: u64 = 8;
const CHILD_COUNT_SIZE: u64 = 4;

/// Creates a child node of the configured element type during load.
pub type NodeFactory = Arc<dyn Fn() -> Result<Node> + Send + Sync>;

/// Per-node hook invoked during save/load.
pub type NodeHook = Arc<dyn Fn(&Node) -> Result<()> + Send + Sync>;

/// Save/load driver: node factory plus optional per-node hooks.
#[derive(Clone)]
pub struct TreeCodec {
    factory: NodeFactory,
    before_save: Option<NodeHook>,
    after_load: Option<NodeHook>,
}

impl Default for TreeCodec {
    fn default() -> Self {
        Self {
            factory: Arc::new(Node::new),
            before_save: None,
            after_load: None,
        }
    }
}

impl TreeCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the node-construction function used for children created
    /// during load.
    pub fn with_factory(mut self, factory: NodeFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Hook invoked on every node just before its record is written.
    pub fn on_before_save(mut self, hook: NodeHook) -> Self {
        self.before_save = Some(hook);
        self
    }

    /// Hook invoked on every node right after its children are loaded.
    pub fn on_after_load(mut self, hook: NodeHook) -> Self {
        self.after_load = Some(hook);
        self
    }

    /// Serializes `node` and its subtree into `dst` at the current
    /// position.
    pub fn save<S: ByteStore>(&self, node: &Node, dst: &mut S) -> Result<()> {
        node.seek(SeekWhence::Start(0))?;
        if let Some(hook) = &self.before_save {
            hook(node)?;
            node.seek(SeekWhence::Start(0))?;
        }

        let size = node.size()?;
        dst.write_all(&(size as i64).to_le_bytes())
            .wrap_err("failed to write payload length")?;

        // Copy the full payload through the node's own stream, so windowed
        // payloads stream straight from their source.
        let mut buf = [0u8; COPY_CHUNK_SIZE];
        let mut remaining = size;
        while remaining > 0 {
            let want = remaining.min(COPY_CHUNK_SIZE as u64) as usize;
            let n = node.read(&mut buf[..want])?;
            if n == 0 {
                return Err(StorageError::UnexpectedEof {
                    expected: size,
                    actual: size - remaining,
                }
                .into());
            }
            dst.write_all(&buf[..n])
                .wrap_err("failed to write payload bytes")?;
            remaining -= n as u64;
        }

        let children = node.children();
        if children.len() > i32::MAX as usize {
            bail!("child count {} exceeds format limit", children.len());
        }
        dst.write_all(&(children.len() as i32).to_le_bytes())
            .wrap_err("failed to write child count")?;

        trace!(size, children = children.len(), "saved node record");
        for child in &children {
            self.save(child, dst)?;
        }
        Ok(())
    }

    /// Loads `node` and its subtree from `source` at the current position.
    ///
    /// Existing children are destroyed; the node's payload becomes a lazy
    /// window onto `source`.
    pub fn load(&self, node: &Node, source: &SharedSource) -> Result<()> {
        node.clear();

        let (begin, length) = {
            let mut src = source.guard();

            let mut raw = [0u8; DATA_LENGTH_SIZE as usize];
            src.read_exact(&mut raw)
                .wrap_err("failed to read payload length")?;
            let length = i64::from_le_bytes(raw);
            if length < 0 {
                return Err(FormatError::NegativePayloadLength(length).into());
            }

            let begin = src
                .stream_position()
                .wrap_err("failed to query record position")?;
            src.seek(SeekFrom::Start(begin + length as u64))
                .wrap_err("failed to skip payload")?;

            (begin, length as u64)
        };

        // The payload stays in the source; this node now reads through a
        // bounded window with its bookmark at the window begin.
        node.adopt_window(source.clone(), begin, length);

        let child_count = {
            let mut src = source.guard();
            let mut raw = [0u8; CHILD_COUNT_SIZE as usize];
            src.read_exact(&mut raw)
                .wrap_err("failed to read child count")?;
            let count = i32::from_le_bytes(raw);
            if count < 0 {
                return Err(FormatError::NegativeChildCount(count).into());
            }
            count as usize
        };

        debug!(begin, length, child_count, "loading node record");
        for _ in 0..child_count {
            let child = (self.factory)()?;
            node.add(&child)?;
            self.load(&child, source)?;
        }

        // End of this node's record: past its own length/payload/count
        // fields for a leaf, past the last child's record otherwise.
        // Captured before the hook runs and restored afterwards, since the
        // hook may read the payload and move the shared cursor; a following
        // sibling is read sequentially from here by the caller.
        let end_of_record = if child_count == 0 {
            begin + length + CHILD_COUNT_SIZE
        } else {
            source
                .guard()
                .stream_position()
                .wrap_err("failed to query end-of-record position")?
        };

        if let Some(hook) = &self.after_load {
            hook(node)?;
        }

        source
            .guard()
            .seek(SeekFrom::Start(end_of_record))
            .wrap_err("failed to reposition past record")?;
        Ok(())
    }

    /// Saves `node` to a file, creating or truncating it.
    ///
    /// The handle is released on every exit path; a failed save leaves any
    /// partially written file in place for the caller.
    pub fn save_to_file<P: AsRef<Path>>(&self, node: &Node, path: P) -> Result<()> {
        let path = path.as_ref();
        {
            let mut store = FileStore::create(path)?;
            self.save(node, &mut store)
                .wrap_err_with(|| format!("failed to save container to '{}'", path.display()))?;
        }
        node.set_last_used_path(path);
        Ok(())
    }

    /// Loads `node` from a file opened read-only.
    ///
    /// The handle stays open inside the tree's shared source for as long as
    /// any windowed node references it.
    pub fn load_from_file<P: AsRef<Path>>(&self, node: &Node, path: P) -> Result<()> {
        let path = path.as_ref();
        let source = SharedSource::open_file(path)?;
        self.load(node, &source)
            .wrap_err_with(|| format!("failed to load container from '{}'", path.display()))?;
        node.set_source_path(path);
        Ok(())
    }
}

/// Reads exactly `buf.len()` payload bytes through the node stream.
fn read_exact_node(node: &Node, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = node.read(&mut buf[filled..])?;
        if n == 0 {
            return Err(StorageError::UnexpectedEof {
                expected: buf.len() as u64,
                actual: filled as u64,
            }
            .into());
        }
        filled += n;
    }
    Ok(())
}

impl Node {
    /// Writes a length-prefixed string (4-byte length + raw bytes) at the
    /// current stream position.
    ///
    /// Strings consume payload bytes sequentially like any other write;
    /// they are not separate metadata.
    pub fn write_string(&self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() > u32::MAX as usize {
            bail!("string length {} exceeds format limit", bytes.len());
        }
        self.write(&(bytes.len() as u32).to_le_bytes())?;
        self.write(bytes)?;
        Ok(())
    }

    /// Reads a length-prefixed string from the current stream position.
    pub fn read_string(&self) -> Result<String> {
        let mut raw = [0u8; 4];
        read_exact_node(self, &mut raw)?;
        let length = u32::from_le_bytes(raw) as usize;

        let mut bytes = vec![0u8; length];
        read_exact_node(self, &mut bytes)?;
        Ok(String::from_utf8(bytes).map_err(FormatError::InvalidUtf8)?)
    }

    /// Saves this node and its subtree to `path` with a default codec.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        TreeCodec::default().save_to_file(self, path)
    }

    /// Loads this node and its subtree from `path` with a default codec.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        TreeCodec::default().load_from_file(self, path)
    }
}
