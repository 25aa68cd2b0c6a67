//! Command execution for the interactive shell.
//!
//! Each input line is parsed into a [`Command`] and run against a loaded
//! [`Container`]; output goes to any `Write` so the same code serves stdout
//! and tests.

use anyhow::Result;
use rodb::{Container, Node};
use std::io::Write;

/// A parsed shell command. Paths are kept as the raw `/`-separated text.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'l> {
    Info,
    Type(&'l str),
    Size(&'l str),
    Get(&'l str),
    Keys(&'l str),
    Dump(&'l str),
    Verify,
    Exit,
    Empty,
    Usage(&'static str),
    Unknown(String),
}

impl<'l> Command<'l> {
    pub fn parse(line: &'l str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Command::Empty;
        };
        let path = parts.next();
        match cmd.to_uppercase().as_str() {
            "INFO" => Command::Info,
            "TYPE" => path.map_or(Command::Usage("TYPE path"), Command::Type),
            "SIZE" => path.map_or(Command::Usage("SIZE path"), Command::Size),
            "GET" => path.map_or(Command::Usage("GET path"), Command::Get),
            "KEYS" => Command::Keys(path.unwrap_or("")),
            "DUMP" => Command::Dump(path.unwrap_or("")),
            "VERIFY" => Command::Verify,
            "EXIT" | "QUIT" => Command::Exit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Walks a `/`-separated path from `root`.
///
/// Inside an array a segment is parsed as an index; everywhere else it is a
/// map key. Empty segments are skipped, so `""` and `"/"` name the root.
pub fn resolve<'a>(root: Node<'a>, path: &str) -> rodb::Result<Node<'a>> {
    let mut node = root;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        node = match segment.parse::<i64>() {
            Ok(i) if node.is_array() => node.get(i)?,
            _ => node.get(segment)?,
        };
    }
    Ok(node)
}

/// Runs one command. Returns `false` when the shell should stop.
///
/// Lookup failures are reported on `out` as `ERR ...` lines; only write
/// failures on `out` itself are returned as errors.
pub fn execute<W: Write>(db: &Container, cmd: &Command<'_>, out: &mut W) -> Result<bool> {
    match cmd {
        Command::Info => write!(out, "{}", db)?,
        Command::Type(path) => match resolve(db.root(), path) {
            Ok(node) => writeln!(out, "{}", node.node_type())?,
            Err(e) => writeln!(out, "ERR {}", e)?,
        },
        Command::Size(path) => match resolve(db.root(), path) {
            Ok(node) => writeln!(out, "{}", node.size())?,
            Err(e) => writeln!(out, "ERR {}", e)?,
        },
        Command::Get(path) => match resolve(db.root(), path).and_then(render) {
            Ok(text) => writeln!(out, "{}", text)?,
            Err(e) => writeln!(out, "ERR {}", e)?,
        },
        Command::Keys(path) => match resolve(db.root(), path).and_then(|n| n.keys()) {
            Ok(keys) => {
                let mut count = 0;
                for key in keys.elements()? {
                    match key.and_then(|k| k.as_bytes()) {
                        Ok(k) => writeln!(out, "{}", String::from_utf8_lossy(k))?,
                        Err(e) => {
                            writeln!(out, "ERR {}", e)?;
                            return Ok(true);
                        }
                    }
                    count += 1;
                }
                writeln!(out, "({} keys)", count)?;
            }
            Err(e) => writeln!(out, "ERR {}", e)?,
        },
        Command::Dump(path) => match resolve(db.root(), path) {
            Ok(node) => match rodb::dump::to_yaml_string(node) {
                Ok(text) => writeln!(out, "{}", text)?,
                Err(e) => writeln!(out, "ERR {}", e)?,
            },
            Err(e) => writeln!(out, "ERR {}", e)?,
        },
        Command::Verify => match db.verify() {
            Ok(()) => writeln!(out, "OK")?,
            Err(e) => writeln!(out, "ERR {}", e)?,
        },
        Command::Exit => {
            writeln!(out, "bye")?;
            return Ok(false);
        }
        Command::Empty => {}
        Command::Usage(usage) => writeln!(out, "ERR usage: {}", usage)?,
        Command::Unknown(other) => writeln!(out, "unknown command: {}", other)?,
    }
    Ok(true)
}

/// Scalars print as their value (strings unquoted), compounds as a summary.
fn render(node: Node<'_>) -> rodb::Result<String> {
    use rodb::NodeType;
    Ok(match node.node_type() {
        NodeType::Bool => node.as_bool()?.to_string(),
        NodeType::Int => node.as_int()?.to_string(),
        NodeType::Float => format!("{:?}", node.as_float()?),
        NodeType::String => String::from_utf8_lossy(node.as_bytes()?).into_owned(),
        NodeType::Array => format!("(array, {} elements)", node.size()),
        NodeType::Map => format!("(map, {} entries)", node.size()),
    })
}
