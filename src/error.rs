//! # Error Taxonomy
//!
//! This module defines the typed error kinds surfaced by arbor. All fallible
//! operations in the crate return `eyre::Result`; the enums here are created
//! at the failure site and carried inside the `eyre::Report`, so callers that
//! need to branch on the kind can use `Report::downcast_ref`.
//!
//! ## Categories
//!
//! | Kind                 | Meaning                                          |
//! |----------------------|--------------------------------------------------|
//! | `StorageError`       | Window-layer seek/read violations                |
//! | `FormatError`        | Malformed bytes in the persisted record format   |
//! | `ContainerError`     | Index out of range, item not found, bad attach   |
//! | `InvariantViolation` | Storage state the View Engine contract rules out |
//!
//! Plain I/O failures (open/create/read/write/seek on the underlying byte
//! resource) are `std::io::Error` values wrapped with `wrap_err_with`
//! context; they carry the file path and the operation being performed.
//!
//! ## Propagation
//!
//! All failures surface immediately to the caller. There is no retry and no
//! partial-failure recovery; a failed save leaves any partially written
//! output file in place for the caller to deal with.

use thiserror::Error;

/// Window-layer storage violations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A windowed seek resolved to a physical target before the window start.
    #[error("seek target {target} lies before the stream start")]
    SeekBeforeStart { target: i64 },

    /// The stream ended before the requested number of bytes was available.
    #[error("unexpected end of stream: needed {expected} bytes, got {actual}")]
    UnexpectedEof { expected: u64, actual: u64 },
}

/// Malformed bytes in the persisted record format.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The 8-byte payload length field decoded to a negative value.
    #[error("negative payload length {0} in container record")]
    NegativePayloadLength(i64),

    /// The 4-byte child count field decoded to a negative value.
    #[error("negative child count {0} in container record")]
    NegativeChildCount(i32),

    /// A length-prefixed string holds bytes that are not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Reserved: the 5-byte signature did not match `CONTAINER_SIGNATURE`.
    ///
    /// The current save/load path emits and checks no header; this variant
    /// exists for a future header-verification mode.
    #[error("container signature mismatch")]
    BadSignature,

    /// Reserved: the 2-byte version field named an unsupported revision.
    #[error("unsupported container format version {0:#06x}")]
    UnsupportedVersion(u16),
}

/// Structural errors from the tree container.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// An index fell outside the child sequence.
    #[error("child index {index} out of range (count={count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// The named node is not a child of this node.
    #[error("node is not a child of this container")]
    NotAChild,

    /// Attaching the node would create a cycle (self-attach or attaching an
    /// ancestor beneath its own descendant).
    #[error("attaching node would create a cycle in the tree")]
    WouldCycle,
}

/// Storage reached a state the View Engine contract rules out.
///
/// Unreachable if the contract is upheld; reported as an error rather than a
/// panic so library callers keep control.
#[derive(Debug, Error)]
#[error("view engine invariant violated: {0}")]
pub struct InvariantViolation(pub &'static str);
