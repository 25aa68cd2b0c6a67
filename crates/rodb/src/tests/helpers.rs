use crate::*;
use anyhow::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use std::path::Path;

/// Encodes `root` and loads it from memory with full verification.
pub fn load_value(root: &Value) -> Result<Container> {
    Ok(Container::from_bytes(Writer::encode(root)?)?)
}

/// Encodes `root` to `dir/name` and loads it back from disk.
pub fn write_and_load(dir: &Path, name: &str, root: &Value) -> Result<Container> {
    let path = dir.join(name);
    Writer::write_to_path(&path, root)?;
    Ok(Container::load(&path)?)
}

/// Prepends a valid container header to an encoded node.
pub fn with_header(node: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(SIGNATURE).unwrap();
    out.write_u32::<LittleEndian>(VERSION).unwrap();
    out.extend_from_slice(node);
    out
}

/// Hand-assembles a map node whose keys and values are taken verbatim, so
/// tests can build maps the writer would refuse to produce.
pub fn raw_map(count: u32, keys: &Value, values: &Value) -> Vec<u8> {
    let keys = Writer::encode_node(keys).unwrap();
    let values = Writer::encode_node(values).unwrap();
    let mut payload = Vec::new();
    payload.write_u32::<LittleEndian>(count).unwrap();
    payload.write_u32::<LittleEndian>(keys.len() as u32).unwrap();
    payload.extend_from_slice(&keys);
    payload.extend_from_slice(&values);

    let mut node = Vec::new();
    node.write_u32::<LittleEndian>(NodeType::Map.tag()).unwrap();
    node.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
    node.extend_from_slice(&payload);
    node
}

/// Hand-assembles an array node from element nodes and explicit offsets.
pub fn raw_array(offsets: &[i32], elements: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.write_u32::<LittleEndian>(offsets.len() as u32).unwrap();
    for &off in offsets {
        payload.write_i32::<LittleEndian>(off).unwrap();
    }
    for e in elements {
        payload.extend_from_slice(e);
    }

    let mut node = Vec::new();
    node.write_u32::<LittleEndian>(NodeType::Array.tag()).unwrap();
    node.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
    node.extend_from_slice(&payload);
    node
}

/// Recursively checks that a decoded node matches the value it was encoded
/// from. Map entries are expected in ascending key order.
pub fn assert_matches(node: Node<'_>, value: &Value) {
    match value {
        Value::Bool(b) => assert_eq!(node.as_bool().unwrap(), *b),
        Value::Int(i) => assert_eq!(node.as_int().unwrap(), *i),
        Value::Float(f) => assert_eq!(node.as_float().unwrap().to_bits(), f.to_bits()),
        Value::Str(s) => assert_eq!(node.as_str().unwrap(), s),
        Value::Array(items) => {
            assert!(node.is_array());
            assert_eq!(node.size(), items.len());
            for (i, item) in items.iter().enumerate() {
                assert_matches(node.index(i).unwrap(), item);
            }
        }
        Value::Map(entries) => {
            assert!(node.is_map());
            assert_eq!(node.size(), entries.len());
            let mut sorted: Vec<_> = entries.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            for (i, (key, val)) in sorted.iter().enumerate() {
                assert_eq!(node.keys().unwrap().index(i).unwrap().as_str().unwrap(), key);
                assert_matches(node.values().unwrap().index(i).unwrap(), val);
                assert_matches(node.lookup(key).unwrap(), val);
            }
        }
    }
}

/// Small deterministic generator for value trees (xorshift).
pub struct TreeGen {
    state: u64,
}

impl TreeGen {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }

    pub fn value(&mut self, depth: usize) -> Value {
        let kinds = if depth == 0 { 4 } else { 6 };
        match self.below(kinds) {
            0 => Value::Bool(self.below(2) == 1),
            1 => Value::Int(self.next() as i32),
            2 => Value::Float((self.next() % 100_000) as f32 / 8.0 - 5000.0),
            3 => Value::Str(self.word()),
            4 => {
                let n = self.below(6) as usize;
                Value::Array((0..n).map(|_| self.value(depth - 1)).collect())
            }
            _ => {
                let n = self.below(6) as usize;
                let mut entries: Vec<(String, Value)> = Vec::new();
                while entries.len() < n {
                    let key = self.word();
                    if entries.iter().all(|(k, _)| *k != key) {
                        let v = self.value(depth - 1);
                        entries.push((key, v));
                    }
                }
                Value::Map(entries)
            }
        }
    }

    pub fn root(&mut self, depth: usize) -> Value {
        loop {
            let v = self.value(depth);
            if matches!(v, Value::Array(_) | Value::Map(_)) {
                return v;
            }
        }
    }

    fn word(&mut self) -> String {
        let len = self.below(8) as usize;
        (0..len)
            .map(|_| char::from(b'a' + self.below(26) as u8))
            .collect()
    }
}
