//! Human-readable rendering of a value tree.
//!
//! The output is YAML-like text: scalars inline, arrays as `- item` lines and
//! maps as `"key": value` lines, each nesting level indented by four more
//! spaces. Array elements come out in index order and map entries in stored
//! (ascending key) order.
//!
//! ```text
//! $ RODB_PATH=points.rodb cargo run -p cli
//! > DUMP
//!
//! "name": "layer0"
//! "points":
//!     -
//!         "x": 1
//!         "y": 2
//! ```

use std::io::{self, Write};

use crate::error::{CorruptionKind, Error};
use crate::format::{NodeType, MAX_DEPTH};
use crate::node::Node;

const INDENT: usize = 4;

/// Writes `node` and everything below it to `w`.
///
/// Corrupt nodes met during the walk are reported as
/// [`io::ErrorKind::InvalidData`].
pub fn write_yaml<W: Write>(w: &mut W, node: Node<'_>) -> io::Result<()> {
    write_node(w, node, 0)
}

/// Renders `node` to a `String`.
pub fn to_yaml_string(node: Node<'_>) -> io::Result<String> {
    let mut out = Vec::new();
    write_yaml(&mut out, node)?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn invalid(e: Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

fn write_node<W: Write>(w: &mut W, node: Node<'_>, indent: usize) -> io::Result<()> {
    if indent / INDENT > MAX_DEPTH {
        return Err(invalid(Error::Corruption {
            offset: node.position(),
            kind: CorruptionKind::TooDeep(MAX_DEPTH),
        }));
    }

    match node.node_type() {
        NodeType::Bool => {
            let v = node.as_bool().map_err(invalid)?;
            write!(w, "{}", if v { "true" } else { "false" })
        }
        NodeType::Int => write!(w, "{}", node.as_int().map_err(invalid)?),
        NodeType::Float => {
            let v = node.as_float().map_err(invalid)?;
            w.write_all(yaml_float(v).as_bytes())
        }
        NodeType::String => write_quoted(w, node.as_bytes().map_err(invalid)?),
        NodeType::Array => {
            writeln!(w)?;
            let padding = " ".repeat(indent);
            for element in node.elements().map_err(invalid)? {
                write!(w, "{}- ", padding)?;
                write_node(w, element.map_err(invalid)?, indent + INDENT)?;
                writeln!(w)?;
            }
            Ok(())
        }
        NodeType::Map => {
            writeln!(w)?;
            let padding = " ".repeat(indent);
            for entry in node.entries().map_err(invalid)? {
                let (key, value) = entry.map_err(invalid)?;
                write!(w, "{}", padding)?;
                write_node(w, key, indent)?;
                write!(w, ": ")?;
                write_node(w, value, indent + INDENT)?;
                writeln!(w)?;
            }
            Ok(())
        }
    }
}

/// Spells a float so YAML resolves it as a float: always a fraction, a signed
/// exponent, and `.nan` / `.inf` / `-.inf` for the non-finite values.
fn yaml_float(v: f32) -> String {
    if v.is_nan() {
        return ".nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { ".inf" } else { "-.inf" }.to_string();
    }
    // Debug is the shortest round-trip form: "100.0", "1e30", "1.5e-7".
    let text = format!("{:?}", v);
    match text.split_once('e') {
        None => text,
        Some((mantissa, exponent)) => {
            let fraction = if mantissa.contains('.') { "" } else { ".0" };
            let sign = if exponent.starts_with('-') { "" } else { "+" };
            format!("{}{}e{}{}", mantissa, fraction, sign, exponent)
        }
    }
}

/// Writes a double-quoted YAML string.
fn write_quoted<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    let text = String::from_utf8_lossy(bytes);
    w.write_all(b"\"")?;
    for c in text.chars() {
        match c {
            '"' => w.write_all(b"\\\"")?,
            '\\' => w.write_all(b"\\\\")?,
            '\n' => w.write_all(b"\\n")?,
            '\r' => w.write_all(b"\\r")?,
            '\t' => w.write_all(b"\\t")?,
            c if c.is_control() => write!(w, "\\u{:04x}", c as u32)?,
            c => write!(w, "{}", c)?,
        }
    }
    w.write_all(b"\"")
}
