//! Encoding value trees into RODB bytes.
//!
//! This is the producing side of the format: it takes an owned [`Value`]
//! tree and lays it out exactly as [`Container`](crate::Container) expects
//! to read it. Map entries are sorted by key here, which is what makes
//! binary-search lookups on the reading side valid.

use anyhow::{bail, ensure, Context, Result};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::collections::HashSet;
use std::fs::{rename, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::format::{NodeType, MAX_DEPTH, NODE_HEADER_BYTES, SIGNATURE, VERSION, WORD_BYTES};

/// An owned, dynamically-typed value tree to be encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Str(String),
    Array(Vec<Value>),
    /// Entries in any order; they are sorted by key when encoded.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Builds a map from `(key, value)` pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Builds an array from anything convertible to values.
    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    fn node_type(&self) -> NodeType {
        match self {
            Value::Bool(_) => NodeType::Bool,
            Value::Int(_) => NodeType::Int,
            Value::Float(_) => NodeType::Float,
            Value::Str(_) => NodeType::String,
            Value::Array(_) => NodeType::Array,
            Value::Map(_) => NodeType::Map,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

/// Encodes value trees and writes RODB files.
///
/// Stateless, like the reader side: every method is an associated function.
pub struct Writer {}

impl Writer {
    /// Encodes a complete file: container header followed by `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not an array or map, or if any part of
    /// the tree cannot be represented (see [`encode_node`](Writer::encode_node)).
    pub fn encode(root: &Value) -> Result<Vec<u8>> {
        ensure!(
            matches!(root, Value::Array(_) | Value::Map(_)),
            "root value must be an array or a map, got {}",
            root.node_type()
        );
        let node = Self::encode_node(root)?;
        let mut out = Vec::with_capacity(8 + node.len());
        out.write_u32::<LittleEndian>(SIGNATURE)?;
        out.write_u32::<LittleEndian>(VERSION)?;
        out.extend_from_slice(&node);
        Ok(out)
    }

    /// Encodes a single node (header + payload) without a container header.
    ///
    /// # Errors
    ///
    /// Returns an error for strings containing a NUL byte, maps with
    /// duplicate keys, trees nested deeper than [`MAX_DEPTH`], and nodes too
    /// large for 32-bit counts or offsets.
    pub fn encode_node(value: &Value) -> Result<Vec<u8>> {
        check_depth(value)?;
        let mut out = Vec::new();
        write_value(&mut out, value)?;
        Ok(out)
    }

    /// Encodes `root` and writes it to `path`.
    ///
    /// # Crash Safety
    ///
    /// Writes to `path.rodb.tmp`, calls `sync_all()`, then atomically renames
    /// over `path`. A crash mid-write leaves at most the temp file behind; a
    /// failed write or rename removes it.
    pub fn write_to_path(path: &Path, root: &Value) -> Result<()> {
        let bytes = Self::encode(root)?;

        let tmp_path = path.with_extension("rodb.tmp");
        let written = write_synced(&tmp_path, &bytes).and_then(|()| {
            rename(&tmp_path, path)
                .with_context(|| format!("renaming {} to {}", tmp_path.display(), path.display()))
        });
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }

        // Make the rename itself durable.
        if let Some(parent) = path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        debug!(path = %path.display(), bytes = bytes.len(), "wrote rodb file");
        Ok(())
    }
}

fn write_synced(tmp_path: &Path, bytes: &[u8]) -> Result<()> {
    let raw_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;
    let mut file = BufWriter::new(raw_file);
    file.write_all(bytes)?;
    file.flush()?;
    file.into_inner()?.sync_all()?;
    Ok(())
}

/// Rejects trees the reader would refuse to load: the root sits at depth 0,
/// array elements and map values one level below their parent.
fn check_depth(root: &Value) -> Result<()> {
    let mut stack = vec![(root, 0usize)];
    while let Some((value, depth)) = stack.pop() {
        ensure!(
            depth <= MAX_DEPTH,
            "value nesting exceeds the maximum depth of {}",
            MAX_DEPTH
        );
        match value {
            Value::Array(items) => stack.extend(items.iter().map(|v| (v, depth + 1))),
            Value::Map(entries) => stack.extend(entries.iter().map(|(_, v)| (v, depth + 1))),
            _ => {}
        }
    }
    Ok(())
}

/// Appends one node. The header's length word is patched once the payload
/// is in place.
fn write_node<F>(out: &mut Vec<u8>, node_type: NodeType, payload: F) -> Result<()>
where
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    let start = out.len();
    out.write_u32::<LittleEndian>(node_type.tag())?;
    out.write_u32::<LittleEndian>(0)?;
    payload(out)?;
    let len = word(out.len() - start - NODE_HEADER_BYTES, "payload")?;
    LittleEndian::write_u32(&mut out[start + WORD_BYTES..], len);
    Ok(())
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Bool(b) => write_node(out, NodeType::Bool, |out| {
            Ok(out.write_i32::<LittleEndian>(i32::from(*b))?)
        }),
        Value::Int(i) => write_node(out, NodeType::Int, |out| {
            Ok(out.write_i32::<LittleEndian>(*i)?)
        }),
        Value::Float(f) => write_node(out, NodeType::Float, |out| {
            Ok(out.write_f32::<LittleEndian>(*f)?)
        }),
        Value::Str(s) => write_string(out, s),
        Value::Array(items) => write_array(out, &items[..], write_value),
        Value::Map(entries) => write_map(out, entries),
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) -> Result<()> {
    ensure!(!s.as_bytes().contains(&0), "string {:?} contains a NUL byte", s);
    write_node(out, NodeType::String, |out| {
        out.extend_from_slice(s.as_bytes());
        out.push(0);
        Ok(())
    })
}

/// Writes an array node: count, offset table, then each item in order.
fn write_array<T>(
    out: &mut Vec<u8>,
    items: &[T],
    write_item: fn(&mut Vec<u8>, &T) -> Result<()>,
) -> Result<()> {
    write_node(out, NodeType::Array, |out| {
        out.write_u32::<LittleEndian>(word(items.len(), "array length")?)?;
        let table = out.len();
        out.resize(table + items.len() * WORD_BYTES, 0);
        let base = out.len();
        for (i, item) in items.iter().enumerate() {
            let offset =
                i32::try_from(out.len() - base).context("array element offset exceeds i32")?;
            LittleEndian::write_i32(&mut out[table + i * WORD_BYTES..], offset);
            write_item(out, item)?;
        }
        Ok(())
    })
}

/// Writes a map node with its keys sorted byte-wise. Values are encoded
/// straight from the borrowed entries.
fn write_map(out: &mut Vec<u8>, entries: &[(String, Value)]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for (key, _) in entries {
        if !seen.insert(key.as_str()) {
            bail!("duplicate map key {:?}", key);
        }
    }
    let mut sorted: Vec<&(String, Value)> = entries.iter().collect();
    sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    write_node(out, NodeType::Map, |out| {
        out.write_u32::<LittleEndian>(word(entries.len(), "map length")?)?;
        let keys_len_at = out.len();
        out.write_u32::<LittleEndian>(0)?;
        let keys_start = out.len();
        write_array(out, &sorted[..], |out, entry| write_string(out, &entry.0))?;
        let keys_len = word(out.len() - keys_start, "map keys section")?;
        LittleEndian::write_u32(&mut out[keys_len_at..], keys_len);
        write_array(out, &sorted[..], |out, entry| write_value(out, &entry.1))
    })
}

fn word(n: usize, what: &str) -> Result<u32> {
    u32::try_from(n).with_context(|| format!("{} of {} bytes/items exceeds u32", what, n))
}
