use std::cmp::Ordering;
use std::fmt;

use crate::error::{CorruptionKind, Error, Result};
use crate::format::{
    read_f32, read_i32, read_u32, slice, NodeType, MAX_DEPTH, NODE_HEADER_BYTES, WORD_BYTES,
};

/// A non-owning view of one encoded value.
///
/// A `Node` is just a position inside a borrowed buffer plus the decoded type
/// tag. It is `Copy`, costs O(1) to create, and interprets the payload bytes
/// only when asked. The `'a` lifetime ties it to the [`Container`] that owns
/// the bytes, so a view can never outlive its data.
///
/// Construction checks that the node header and the fixed-size part of the
/// payload (scalar word, array offset table, map counts) lie inside the
/// buffer. Every position derived from an offset is checked again before it
/// is read.
///
/// [`Container`]: crate::Container
#[derive(Clone, Copy)]
pub struct Node<'a> {
    buf: &'a [u8],
    pos: usize,
    node_type: NodeType,
}

impl<'a> Node<'a> {
    /// Creates a view over the node starting at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corruption`] if the tag is unknown or the header and
    /// payload prefix do not fit in `buf`.
    pub(crate) fn at(buf: &'a [u8], pos: usize) -> Result<Self> {
        slice(buf, pos, NODE_HEADER_BYTES)?;
        let tag = read_u32(buf, pos)?;
        let node_type = NodeType::from_tag(tag)
            .ok_or_else(|| Error::corrupt(pos, CorruptionKind::UnknownTag(tag)))?;

        let payload = pos + NODE_HEADER_BYTES;
        let prefix = match node_type {
            NodeType::Bool | NodeType::Int | NodeType::Float => WORD_BYTES,
            // at least the terminator
            NodeType::String => 1,
            NodeType::Array => {
                let count = read_u32(buf, payload)? as usize;
                count
                    .checked_add(1)
                    .and_then(|words| words.checked_mul(WORD_BYTES))
                    .ok_or_else(|| {
                        Error::corrupt(
                            payload,
                            CorruptionKind::OutOfBounds {
                                needed: usize::MAX,
                                available: buf.len().saturating_sub(payload),
                            },
                        )
                    })?
            }
            NodeType::Map => 2 * WORD_BYTES,
        };
        slice(buf, payload, prefix)?;

        Ok(Self {
            buf,
            pos,
            node_type,
        })
    }

    /// Byte position of this node's header inside the container buffer.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn payload(&self) -> usize {
        self.pos + NODE_HEADER_BYTES
    }

    /// Reads the `i`-th word of the payload prefix. Construction guarantees
    /// these words are in bounds.
    fn prefix_word(&self, i: usize) -> u32 {
        let at = self.payload() + i * WORD_BYTES;
        u32::from_le_bytes([
            self.buf[at],
            self.buf[at + 1],
            self.buf[at + 2],
            self.buf[at + 3],
        ])
    }

    fn require(&self, expected: NodeType) -> Result<()> {
        if self.node_type == expected {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected: expected.name(),
                found: self.node_type,
            })
        }
    }

    // -------------------- Type inspection --------------------

    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    #[must_use]
    pub fn is_bool(&self) -> bool {
        self.node_type == NodeType::Bool
    }

    #[must_use]
    pub fn is_int(&self) -> bool {
        self.node_type == NodeType::Int
    }

    #[must_use]
    pub fn is_float(&self) -> bool {
        self.node_type == NodeType::Float
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        self.node_type == NodeType::String
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        self.node_type == NodeType::Array
    }

    #[must_use]
    pub fn is_map(&self) -> bool {
        self.node_type == NodeType::Map
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.node_type.is_scalar()
    }

    #[must_use]
    pub fn is_compound(&self) -> bool {
        self.node_type.is_compound()
    }

    /// The second node header word. It is carried for layout compatibility
    /// and never used for navigation.
    #[must_use]
    pub fn reserved(&self) -> u32 {
        let at = self.pos + WORD_BYTES;
        u32::from_le_bytes([
            self.buf[at],
            self.buf[at + 1],
            self.buf[at + 2],
            self.buf[at + 3],
        ])
    }

    // -------------------- Scalar coercions --------------------

    pub fn as_bool(&self) -> Result<bool> {
        self.require(NodeType::Bool)?;
        Ok(self.prefix_word(0) != 0)
    }

    pub fn as_int(&self) -> Result<i32> {
        self.require(NodeType::Int)?;
        read_i32(self.buf, self.payload())
    }

    pub fn as_float(&self) -> Result<f32> {
        self.require(NodeType::Float)?;
        read_f32(self.buf, self.payload())
    }

    /// Returns the string bytes, without the NUL terminator.
    ///
    /// Borrowed straight from the container buffer. Finding the terminator
    /// is a linear scan of the string.
    pub fn as_bytes(&self) -> Result<&'a [u8]> {
        self.require(NodeType::String)?;
        let rest = &self.buf[self.payload()..];
        match rest.iter().position(|&b| b == 0) {
            Some(len) => Ok(&rest[..len]),
            None => Err(Error::corrupt(
                self.payload(),
                CorruptionKind::UnterminatedString,
            )),
        }
    }

    /// Returns the string as UTF-8 text.
    pub fn as_str(&self) -> Result<&'a str> {
        let bytes = self.as_bytes()?;
        std::str::from_utf8(bytes)
            .map_err(|_| Error::corrupt(self.payload(), CorruptionKind::InvalidUtf8))
    }

    /// Returns 1 for scalars and the stored element/pair count for arrays and
    /// maps.
    #[must_use]
    pub fn size(&self) -> usize {
        if self.is_scalar() {
            1
        } else {
            self.prefix_word(0) as usize
        }
    }

    // -------------------- Arrays --------------------

    /// Returns the `i`-th element of an array.
    ///
    /// # Errors
    ///
    /// - [`Error::TypeMismatch`] if this is not an array.
    /// - [`Error::IndexOutOfRange`] if `i >= size()`.
    /// - [`Error::Corruption`] if the stored offset leads outside the buffer.
    pub fn index(&self, i: usize) -> Result<Node<'a>> {
        self.require(NodeType::Array)?;
        let len = self.size();
        if i >= len {
            return Err(Error::IndexOutOfRange {
                index: i64::try_from(i).unwrap_or(i64::MAX),
                len,
            });
        }

        let table = self.payload() + WORD_BYTES;
        let base = table + len * WORD_BYTES;
        let entry = table + i * WORD_BYTES;
        let offset = read_i32(self.buf, entry)?;
        if offset < 0 {
            return Err(Error::corrupt(entry, CorruptionKind::NegativeOffset(offset)));
        }
        let target = base.checked_add(offset as usize).ok_or_else(|| {
            Error::corrupt(
                entry,
                CorruptionKind::OutOfBounds {
                    needed: offset as usize,
                    available: self.buf.len().saturating_sub(base),
                },
            )
        })?;
        Node::at(self.buf, target)
    }

    /// Iterates over the elements of an array in index order.
    pub fn elements(&self) -> Result<Elements<'a>> {
        self.require(NodeType::Array)?;
        Ok(Elements {
            array: *self,
            next: 0,
            len: self.size(),
        })
    }

    // -------------------- Maps --------------------

    /// The map's keys, as an array of strings in ascending byte order.
    pub fn keys(&self) -> Result<Node<'a>> {
        self.require(NodeType::Map)?;
        self.section(self.payload() + 2 * WORD_BYTES)
    }

    /// The map's values, as an array aligned with [`keys`](Node::keys).
    pub fn values(&self) -> Result<Node<'a>> {
        self.require(NodeType::Map)?;
        let keys_len = self.prefix_word(1) as usize;
        let start = self.payload() + 2 * WORD_BYTES;
        let at = start.checked_add(keys_len).ok_or_else(|| {
            Error::corrupt(
                self.payload() + WORD_BYTES,
                CorruptionKind::OutOfBounds {
                    needed: keys_len,
                    available: self.buf.len().saturating_sub(start),
                },
            )
        })?;
        self.section(at)
    }

    fn section(&self, at: usize) -> Result<Node<'a>> {
        let node = Node::at(self.buf, at)?;
        if !node.is_array() {
            return Err(Error::corrupt(at, CorruptionKind::NotAnArray(node.node_type)));
        }
        Ok(node)
    }

    /// Binary search for `key` in the map's keys, returning its position.
    fn find(&self, key: &[u8]) -> Result<Option<usize>> {
        let keys = self.keys()?;
        let (mut low, mut high) = (0, keys.size());
        while low < high {
            let mid = low + (high - low) / 2;
            match key.cmp(key_at(&keys, mid)?) {
                Ordering::Less => high = mid,
                Ordering::Greater => low = mid + 1,
                Ordering::Equal => return Ok(Some(mid)),
            }
        }
        Ok(None)
    }

    /// Returns `true` if the map contains `key`. O(log N).
    pub fn has_key<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        Ok(self.find(key.as_ref())?.is_some())
    }

    /// Returns the value stored under `key`. O(log N).
    ///
    /// # Errors
    ///
    /// - [`Error::TypeMismatch`] if this is not a map.
    /// - [`Error::KeyNotFound`] if the key is absent.
    pub fn lookup<K: AsRef<[u8]>>(&self, key: K) -> Result<Node<'a>> {
        let key = key.as_ref();
        match self.find(key)? {
            Some(i) => {
                pair_half(self.values()?, i, self.size())
            }
            None => Err(Error::KeyNotFound(String::from_utf8_lossy(key).into_owned())),
        }
    }

    /// Iterates over `(key, value)` pairs in stored (ascending key) order.
    pub fn entries(&self) -> Result<Entries<'a>> {
        let keys = self.keys()?;
        let values = self.values()?;
        Ok(Entries {
            keys,
            values,
            next: 0,
            len: self.size(),
        })
    }

    // -------------------- Convenience --------------------

    /// Indexes an array by position or a map by key.
    ///
    /// ```rust,no_run
    /// # let db = rodb::Container::load("example.rodb").unwrap();
    /// let origin = db.root().get("points")?.get(0)?.get("x")?.as_int()?;
    /// # Ok::<(), rodb::Error>(())
    /// ```
    pub fn get<L: Locator>(&self, locator: L) -> Result<Node<'a>> {
        locator.locate(*self)
    }

    // -------------------- Equality --------------------

    /// Structural equality that reports corruption instead of hiding it.
    ///
    /// Nodes of different types are never equal. Maps compare their keys and
    /// values arrays positionally.
    pub fn try_eq(&self, other: &Node<'_>) -> Result<bool> {
        self.eq_at(other, 0)
    }

    fn eq_at(&self, other: &Node<'_>, depth: usize) -> Result<bool> {
        if depth > MAX_DEPTH {
            return Err(Error::corrupt(self.pos, CorruptionKind::TooDeep(MAX_DEPTH)));
        }
        if self.node_type != other.node_type {
            return Ok(false);
        }
        match self.node_type {
            NodeType::Bool | NodeType::Int => Ok(self.prefix_word(0) == other.prefix_word(0)),
            NodeType::Float => Ok(self.as_float()? == other.as_float()?),
            NodeType::String => Ok(self.as_bytes()? == other.as_bytes()?),
            NodeType::Array => {
                if self.size() != other.size() {
                    return Ok(false);
                }
                for i in 0..self.size() {
                    if !self.index(i)?.eq_at(&other.index(i)?, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            // the keys and values arrays sit at the map's own depth
            NodeType::Map => Ok(self.keys()?.eq_at(&other.keys()?, depth)?
                && self.values()?.eq_at(&other.values()?, depth)?),
        }
    }
}

/// Element `i` of a map's keys or values array. A section shorter than the
/// map's pair count is corruption, not an out-of-range index.
fn pair_half<'a>(section: Node<'a>, i: usize, pairs: usize) -> Result<Node<'a>> {
    section.index(i).map_err(|e| match e {
        Error::IndexOutOfRange { .. } => Error::corrupt(
            section.pos,
            CorruptionKind::CountMismatch {
                expected: pairs,
                found: section.size(),
            },
        ),
        other => other,
    })
}

fn key_at<'a>(keys: &Node<'a>, i: usize) -> Result<&'a [u8]> {
    let key = keys.index(i)?;
    if !key.is_string() {
        return Err(Error::corrupt(
            key.pos,
            CorruptionKind::NonStringKey(key.node_type),
        ));
    }
    key.as_bytes()
}

impl<'a, 'b> PartialEq<Node<'b>> for Node<'a> {
    fn eq(&self, other: &Node<'b>) -> bool {
        self.try_eq(other).unwrap_or(false)
    }
}

impl PartialEq<bool> for Node<'_> {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool().map_or(false, |v| v == *other)
    }
}

impl PartialEq<i32> for Node<'_> {
    fn eq(&self, other: &i32) -> bool {
        self.as_int().map_or(false, |v| v == *other)
    }
}

impl PartialEq<f32> for Node<'_> {
    fn eq(&self, other: &f32) -> bool {
        self.as_float().map_or(false, |v| v == *other)
    }
}

impl PartialEq<str> for Node<'_> {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes().map_or(false, |v| v == other.as_bytes())
    }
}

impl PartialEq<&str> for Node<'_> {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = if self.is_compound() { self.size() } else { 0 };
        write!(f, "Type: '{}'\nSize: {}", self.node_type.letter(), size)
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("type", &self.node_type)
            .field("pos", &self.pos)
            .field("size", &self.size())
            .finish()
    }
}

/// Something a [`Node`] can be indexed with: a position for arrays, a key
/// for maps.
pub trait Locator {
    fn locate<'a>(&self, node: Node<'a>) -> Result<Node<'a>>;
}

impl Locator for usize {
    fn locate<'a>(&self, node: Node<'a>) -> Result<Node<'a>> {
        node.index(*self)
    }
}

impl Locator for u32 {
    fn locate<'a>(&self, node: Node<'a>) -> Result<Node<'a>> {
        node.index(*self as usize)
    }
}

impl Locator for i64 {
    fn locate<'a>(&self, node: Node<'a>) -> Result<Node<'a>> {
        match usize::try_from(*self) {
            Ok(i) => node.index(i),
            Err(_) => {
                node.require(NodeType::Array)?;
                Err(Error::IndexOutOfRange {
                    index: *self,
                    len: node.size(),
                })
            }
        }
    }
}

impl Locator for i32 {
    fn locate<'a>(&self, node: Node<'a>) -> Result<Node<'a>> {
        i64::from(*self).locate(node)
    }
}

impl Locator for str {
    fn locate<'a>(&self, node: Node<'a>) -> Result<Node<'a>> {
        node.lookup(self)
    }
}

impl Locator for String {
    fn locate<'a>(&self, node: Node<'a>) -> Result<Node<'a>> {
        node.lookup(self)
    }
}

impl Locator for [u8] {
    fn locate<'a>(&self, node: Node<'a>) -> Result<Node<'a>> {
        node.lookup(self)
    }
}

impl<T: Locator + ?Sized> Locator for &T {
    fn locate<'a>(&self, node: Node<'a>) -> Result<Node<'a>> {
        (**self).locate(node)
    }
}

/// Iterator over array elements, see [`Node::elements`].
#[derive(Debug, Clone)]
pub struct Elements<'a> {
    array: Node<'a>,
    next: usize,
    len: usize,
}

impl<'a> Iterator for Elements<'a> {
    type Item = Result<Node<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let item = self.array.index(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Elements<'_> {}

/// Iterator over map pairs, see [`Node::entries`].
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    keys: Node<'a>,
    values: Node<'a>,
    next: usize,
    len: usize,
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<(Node<'a>, Node<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let i = self.next;
        self.next += 1;
        Some(
            pair_half(self.keys, i, self.len)
                .and_then(|k| pair_half(self.values, i, self.len).map(|v| (k, v))),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Entries<'_> {}
