//! The virtual filesystem tree: a lazily expanded hierarchy of directory
//! and symlink nodes built on top of the database port.
//!
//! A [`Node`] is not an inode; it is a lightweight description of an entry
//! that can be materialized into one. This lets a directory list its
//! children without paying for their own expansion until they are actually
//! visited.

mod fuse;
mod mount;
mod photo;
mod query;
mod rating;
mod root;
mod tag;

pub use fuse::TagFs;
pub use mount::mount;
pub use root::RootNode;

use anyhow::{bail, Result};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

/// What kind of filesystem entry a node materializes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    Symlink,
}

/// A file or directory within the virtual filesystem.
pub trait Node: Send + Sync {
    fn name(&self) -> String;

    fn kind(&self) -> NodeKind;

    /// Expand this node into its filesystem object. For directories this
    /// computes the full child mapping exactly once; the protocol layer
    /// serves all later lookups and listings from the returned object
    /// without calling back in.
    fn materialize(&self) -> Result<FsObject>;
}

impl std::fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// A directory node. Children are returned as a complete name-to-node
/// mapping so that either the whole listing is produced or an error is,
/// never something partial.
pub trait DirNode: Node {
    fn children(&self) -> Result<NodeMap>;
}

pub type NodeMap = BTreeMap<String, Box<dyn Node>>;

/// The materialized form of a node, consumed by the filesystem protocol
/// layer.
pub enum FsObject {
    Dir(DirEntries),
    Symlink(PathBuf),
}

/// A directory's child mapping, computed once at materialization and
/// immutable afterwards. Because it is fully populated before it is
/// exposed, concurrent readers need no locking.
pub struct DirEntries {
    children: NodeMap,
}

impl DirEntries {
    pub fn new(dir: &dyn DirNode) -> Result<DirEntries> {
        Ok(DirEntries {
            children: dir.children()?,
        })
    }

    pub fn get(&self, name: &str) -> Option<&dyn Node> {
        self.children.get(name).map(Box::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Node)> {
        self.children
            .iter()
            .map(|(name, node)| (name.as_str(), node.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn into_children(self) -> NodeMap {
        self.children
    }
}

/// Materialize a directory node. Concrete directory nodes all implement
/// [`Node::materialize`] with this.
fn materialize_dir(dir: &dyn DirNode) -> Result<FsObject> {
    Ok(FsObject::Dir(DirEntries::new(dir)?))
}

/// Convert a list of nodes into a name-to-node mapping.
///
/// A duplicate name is normally a hard error: for tags and queries it
/// indicates a data or configuration defect. Photo listings pass
/// `ignore_dups` because two physical copies of the same photo share a
/// derived id; the first occurrence wins and the rest are dropped with a
/// warning.
pub fn node_map(nodes: Vec<Box<dyn Node>>, ignore_dups: bool) -> Result<NodeMap> {
    let mut map = NodeMap::new();
    for node in nodes {
        match map.entry(node.name()) {
            Entry::Occupied(existing) => {
                if ignore_dups {
                    warn!(name = %existing.key(), "detected node with duplicate name");
                } else {
                    bail!("detected node with duplicate name {:?}", existing.key());
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(node);
            }
        }
    }
    Ok(map)
}
