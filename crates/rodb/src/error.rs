use std::fmt;
use std::io;

use thiserror::Error;

use crate::format::NodeType;

/// Errors that can occur while loading or navigating a container.
///
/// Load-time errors ([`Error::Io`], [`Error::Truncated`], [`Error::Integrity`])
/// are only ever returned by the `Container` constructors. Navigation errors
/// are local to the call that produced them and repeat deterministically.
#[derive(Debug, Error)]
pub enum Error {
    /// The file could not be opened or read.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The buffer is too short to hold the container header.
    #[error("integrity check failed: {len} bytes is too small for a container header")]
    Truncated { len: usize },

    /// The container header carries the wrong signature or version.
    #[error("integrity check failed: signature {signature:#010x}, version {version}")]
    Integrity { signature: u32, version: u32 },

    /// Bytes inside the buffer do not form a valid node.
    #[error("corrupt data at offset {offset}: {kind}")]
    Corruption { offset: usize, kind: CorruptionKind },

    /// A coercion or navigation was attempted against the wrong node type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: NodeType,
    },

    /// An array index is negative or not below the array size.
    #[error("index {index} is out of bounds (size {len})")]
    IndexOutOfRange { index: i64, len: usize },

    /// A map lookup did not find the key.
    #[error("key not found: {0:?}")]
    KeyNotFound(String),
}

impl Error {
    /// Returns `true` for the header integrity failures.
    #[must_use]
    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::Truncated { .. } | Error::Integrity { .. })
    }

    /// Returns `true` if the error describes malformed node data.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption { .. })
    }

    pub(crate) fn corrupt(offset: usize, kind: CorruptionKind) -> Self {
        Error::Corruption { offset, kind }
    }
}

/// What exactly was wrong with a corrupt node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorruptionKind {
    /// The type tag is not one of the six known codes.
    UnknownTag(u32),
    /// A read needed more bytes than the buffer holds.
    OutOfBounds { needed: usize, available: usize },
    /// An array element offset points backwards.
    NegativeOffset(i32),
    /// A string runs to the end of the buffer without a NUL byte.
    UnterminatedString,
    /// A string is not valid UTF-8.
    InvalidUtf8,
    /// A map's keys or values sub-value is not an array.
    NotAnArray(NodeType),
    /// A map key is not a string.
    NonStringKey(NodeType),
    /// Map keys are not in strictly ascending byte order.
    UnsortedKeys { index: usize },
    /// A map's keys or values array disagrees with the map's pair count.
    CountMismatch { expected: usize, found: usize },
    /// Nesting exceeds the traversal depth limit.
    TooDeep(usize),
}

impl fmt::Display for CorruptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorruptionKind::UnknownTag(tag) => write!(f, "unknown type tag {:#010x}", tag),
            CorruptionKind::OutOfBounds { needed, available } => {
                write!(f, "needs {} bytes but only {} remain", needed, available)
            }
            CorruptionKind::NegativeOffset(off) => write!(f, "negative element offset {}", off),
            CorruptionKind::UnterminatedString => f.write_str("string has no NUL terminator"),
            CorruptionKind::InvalidUtf8 => f.write_str("string is not valid UTF-8"),
            CorruptionKind::NotAnArray(t) => {
                write!(f, "map section is a {} instead of an array", t)
            }
            CorruptionKind::NonStringKey(t) => write!(f, "map key is a {} instead of a string", t),
            CorruptionKind::UnsortedKeys { index } => {
                write!(f, "map key {} is not greater than its predecessor", index)
            }
            CorruptionKind::CountMismatch { expected, found } => {
                write!(f, "map declares {} pairs but holds {}", expected, found)
            }
            CorruptionKind::TooDeep(limit) => write!(f, "nesting deeper than {} levels", limit),
        }
    }
}

/// A convenience `Result` type alias using the crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Assertion-style adapter for callers that cannot propagate errors.
///
/// Failure conditions are exactly those of the `Result`-returning API; the
/// difference is that a failure logs the error and aborts the process.
///
/// ```rust,no_run
/// use rodb::{Container, OrAbort};
///
/// let db = Container::load("example.rodb").or_abort();
/// let width = db.get("width").and_then(|n| n.as_int()).or_abort();
/// ```
pub trait OrAbort<T> {
    fn or_abort(self) -> T;
}

impl<T> OrAbort<T> for Result<T> {
    #[track_caller]
    fn or_abort(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                let at = std::panic::Location::caller();
                tracing::error!(
                    error = %e,
                    file = at.file(),
                    line = at.line(),
                    "rodb assertion failed"
                );
                eprintln!("rodb: {} (at {}:{})", e, at.file(), at.line());
                std::process::abort()
            }
        }
    }
}
