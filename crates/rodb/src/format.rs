//! RODB binary format constants and bounds-checked word readers.
//!
//! ## Container header (8 bytes)
//!
//! ```text
//! [signature: u32 LE][version: u32 LE]
//! ```
//!
//! ## Node header (8 bytes)
//!
//! ```text
//! [type_tag: u32 LE][reserved: u32 LE]
//! ```
//!
//! Type tags are a single ASCII letter stored as a little-endian `u32`, so a
//! hex dump of a node starts with e.g. `61 00 00 00` for an array.

use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

use crate::error::{CorruptionKind, Error, Result};

/// Magic number identifying RODB files (the bytes `rodb` in file order).
pub const SIGNATURE: u32 = 0x6264_6f72;

/// The only supported format version.
pub const VERSION: u32 = 1;

/// Size of the container header: 4 (`signature`) + 4 (`version`).
pub const CONTAINER_HEADER_BYTES: usize = 4 + 4;

/// Size of every node header: 4 (`type_tag`) + 4 (`reserved`).
pub const NODE_HEADER_BYTES: usize = 4 + 4;

/// Size of one count, length or offset word.
pub(crate) const WORD_BYTES: usize = 4;

/// The six kinds of value a node can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NodeType {
    Bool = b'b' as u32,
    Int = b'i' as u32,
    Float = b'f' as u32,
    String = b's' as u32,
    Array = b'a' as u32,
    Map = b'm' as u32,
}

impl NodeType {
    /// Decodes a raw type tag, returning `None` for unknown codes.
    #[must_use]
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            t if t == NodeType::Bool as u32 => Some(NodeType::Bool),
            t if t == NodeType::Int as u32 => Some(NodeType::Int),
            t if t == NodeType::Float as u32 => Some(NodeType::Float),
            t if t == NodeType::String as u32 => Some(NodeType::String),
            t if t == NodeType::Array as u32 => Some(NodeType::Array),
            t if t == NodeType::Map as u32 => Some(NodeType::Map),
            _ => None,
        }
    }

    /// The raw tag as written to disk.
    #[must_use]
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// The single-letter code of this type (`'b'`, `'i'`, ...).
    #[must_use]
    pub fn letter(self) -> char {
        char::from(self as u32 as u8)
    }

    /// Human readable name, used in error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Bool => "bool",
            NodeType::Int => "int",
            NodeType::Float => "float",
            NodeType::String => "string",
            NodeType::Array => "array",
            NodeType::Map => "map",
        }
    }

    #[must_use]
    pub fn is_scalar(self) -> bool {
        !self.is_compound()
    }

    #[must_use]
    pub fn is_compound(self) -> bool {
        matches!(self, NodeType::Array | NodeType::Map)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns `buf[pos..pos + len]`, or an out-of-bounds corruption error.
pub(crate) fn slice(buf: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    pos.checked_add(len)
        .and_then(|end| buf.get(pos..end))
        .ok_or(Error::Corruption {
            offset: pos,
            kind: CorruptionKind::OutOfBounds {
                needed: len,
                available: buf.len().saturating_sub(pos),
            },
        })
}

/// Reads a little-endian `u32` at `pos`.
pub(crate) fn read_u32(buf: &[u8], pos: usize) -> Result<u32> {
    Ok(LittleEndian::read_u32(slice(buf, pos, WORD_BYTES)?))
}

/// Reads a little-endian `i32` at `pos`.
pub(crate) fn read_i32(buf: &[u8], pos: usize) -> Result<i32> {
    Ok(LittleEndian::read_i32(slice(buf, pos, WORD_BYTES)?))
}

/// Reads a little-endian `f32` at `pos`.
pub(crate) fn read_f32(buf: &[u8], pos: usize) -> Result<f32> {
    Ok(LittleEndian::read_f32(slice(buf, pos, WORD_BYTES)?))
}

/// Parsed container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ContainerHeader {
    pub signature: u32,
    pub version: u32,
}

impl ContainerHeader {
    /// Reads the header from the start of `buf` and checks it against
    /// [`SIGNATURE`] and [`VERSION`].
    pub fn read_checked(buf: &[u8]) -> Result<Self> {
        if buf.len() < CONTAINER_HEADER_BYTES {
            return Err(Error::Truncated { len: buf.len() });
        }
        let header = Self {
            signature: LittleEndian::read_u32(&buf[0..4]),
            version: LittleEndian::read_u32(&buf[4..8]),
        };
        if header.signature != SIGNATURE || header.version != VERSION {
            return Err(Error::Integrity {
                signature: header.signature,
                version: header.version,
            });
        }
        Ok(header)
    }
}

/// Recursion limit for whole-tree walks (verification, equality, dumping).
pub const MAX_DEPTH: usize = 512;
