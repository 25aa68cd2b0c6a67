use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

use crate::dump;
use crate::error::Result;
use crate::format::{ContainerHeader, CONTAINER_HEADER_BYTES};
use crate::node::{Locator, Node};
use crate::verify;

/// Options controlling how much checking happens at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Walk the whole tree once after the header check (bounds, tags, map key
    /// order). When `false`, loading costs only the file read and the header
    /// check, and malformed nodes surface lazily during navigation.
    pub verify: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { verify: true }
    }
}

impl LoadOptions {
    /// Header-only checking.
    #[must_use]
    pub fn unverified() -> Self {
        Self { verify: false }
    }
}

/// A loaded RODB file.
///
/// The container reads the entire file into one owned, immutable buffer and
/// validates its header. All values are reached through [`Node`] views that
/// borrow that buffer; the borrow checker keeps every view from outliving the
/// container.
///
/// A `Container` is `Send + Sync`: once loaded, any number of threads can
/// navigate it concurrently without locking.
pub struct Container {
    /// The whole file, header included.
    data: Box<[u8]>,
    header: ContainerHeader,
}

impl Container {
    /// Loads and fully verifies the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`](crate::Error::Io) if the file cannot be read.
    /// - [`Error::Truncated`](crate::Error::Truncated) or
    ///   [`Error::Integrity`](crate::Error::Integrity) if the header is
    ///   missing, or has the wrong signature or version.
    /// - [`Error::Corruption`](crate::Error::Corruption) if the root node (or,
    ///   with verification on, any node) is malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with(path, &LoadOptions::default())
    }

    /// Loads the file at `path` with explicit [`LoadOptions`].
    pub fn load_with<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        debug!(path = %path.display(), bytes = data.len(), "read rodb file");
        Self::from_bytes_with(data, options)
    }

    /// Builds a fully verified container over an in-memory buffer.
    pub fn from_bytes<B: Into<Box<[u8]>>>(bytes: B) -> Result<Self> {
        Self::from_bytes_with(bytes, &LoadOptions::default())
    }

    /// Builds a container over an in-memory buffer with explicit options.
    pub fn from_bytes_with<B: Into<Box<[u8]>>>(bytes: B, options: &LoadOptions) -> Result<Self> {
        let data = bytes.into();
        let header = ContainerHeader::read_checked(&data)?;

        // root() is infallible, so the root node is checked up front.
        let root = Node::at(&data, CONTAINER_HEADER_BYTES)?;
        if options.verify {
            verify::verify(root)?;
        }
        debug!(
            bytes = data.len(),
            root = %root.node_type(),
            verified = options.verify,
            "rodb container ready"
        );

        Ok(Self { data, header })
    }

    /// The root value, located right after the container header.
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        match Node::at(&self.data, CONTAINER_HEADER_BYTES) {
            Ok(node) => node,
            Err(e) => unreachable!("root node was validated at load: {}", e),
        }
    }

    /// Shorthand for `self.root().get(locator)`.
    pub fn get<L: Locator>(&self, locator: L) -> Result<Node<'_>> {
        self.root().get(locator)
    }

    /// Runs the structural verification pass over the whole tree.
    pub fn verify(&self) -> Result<()> {
        verify::verify(self.root())
    }

    /// Writes the whole tree as YAML-like text, see [`dump::write_yaml`].
    pub fn dump_yaml<W: Write>(&self, w: &mut W) -> io::Result<()> {
        dump::write_yaml(w, self.root())
    }

    #[must_use]
    pub fn signature(&self) -> u32 {
        self.header.signature
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Total size of the file in bytes, header included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`: a loaded container holds at least a header and a root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of everything after the container header.
    #[must_use]
    pub fn data_len(&self) -> usize {
        self.data.len() - CONTAINER_HEADER_BYTES
    }

    /// The raw file bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " Total size: {}", self.len())?;
        writeln!(f, "Header size: {}", CONTAINER_HEADER_BYTES)?;
        writeln!(f, "  Data size: {}", self.data_len())?;
        writeln!(f, "  Signature: {:#x}", self.signature())?;
        writeln!(f, "    Version: {}", self.version())
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("bytes", &self.data.len())
            .field("signature", &format_args!("{:#x}", self.header.signature))
            .field("version", &self.header.version)
            .field("root", &self.root())
            .finish()
    }
}
