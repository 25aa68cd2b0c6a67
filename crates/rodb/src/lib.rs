//! # RODB - Read-Only Database
//!
//! A zero-copy binary encoding for a dynamically-typed value tree (bools,
//! integers, floats, strings, arrays and maps). A file is loaded into memory
//! once and then queried **in place**: no parsing pass, no intermediate tree.
//!
//! A [`Container`] owns the loaded bytes and validates the file header. Every
//! value inside it is reached through a [`Node`], a small `Copy` cursor that
//! borrows the container's buffer and interprets bytes on demand.
//!
//! ## File layout (v1)
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ CONTAINER HEADER (8 bytes)                                     │
//! │                                                               │
//! │ signature (u32 LE) "rodb" | version (u32 LE) = 1              │
//! ├───────────────────────────────────────────────────────────────┤
//! │ ROOT NODE                                                      │
//! │                                                               │
//! │ type_tag (u32 LE) | reserved (u32 LE) | payload ...           │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payload by tag:
//!
//! | Tag | Kind   | Payload                                                   |
//! |-----|--------|-----------------------------------------------------------|
//! | `b` | bool   | `i32` (0 / nonzero)                                       |
//! | `i` | int    | `i32`                                                     |
//! | `f` | float  | `f32`                                                     |
//! | `s` | string | NUL-terminated bytes                                      |
//! | `a` | array  | `count: u32` \| `offsets: [i32; count]` \| element nodes  |
//! | `m` | map    | `count: u32` \| `keys_len: u32` \| keys array \| values array |
//!
//! Array offsets are relative to the first byte after the offset table. Map
//! keys are strings stored in strictly ascending byte order, so lookups are a
//! binary search.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rodb::Container;
//!
//! let db = Container::load("example.rodb").unwrap();
//! let layers = db.get("layers").unwrap();
//! for layer in layers.elements().unwrap() {
//!     let layer = layer.unwrap();
//!     println!("{}", layer.get("name").unwrap().as_str().unwrap());
//! }
//! ```
//!
//! Files are produced with [`Writer`]:
//!
//! ```rust
//! use rodb::{Container, Value, Writer};
//!
//! let bytes = Writer::encode(&Value::map([("b", 2), ("a", 1)])).unwrap();
//! let db = Container::from_bytes(bytes).unwrap();
//! assert_eq!(db.root().keys().unwrap().index(0).unwrap(), "a");
//! assert_eq!(db.get("b").unwrap(), 2);
//! ```

mod container;
mod error;
mod format;
mod node;

pub mod dump;
pub mod verify;
pub mod writer;

pub use container::{Container, LoadOptions};
pub use error::{CorruptionKind, Error, OrAbort, Result};
pub use format::{
    NodeType, CONTAINER_HEADER_BYTES, MAX_DEPTH, NODE_HEADER_BYTES, SIGNATURE, VERSION,
};
pub use node::{Elements, Entries, Locator, Node};
pub use writer::{Value, Writer};

#[cfg(test)]
mod tests;
