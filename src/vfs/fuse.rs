//! Adapter between the node tree and the kernel FUSE protocol.
//!
//! The adapter owns an inode table. Every inode starts as an unexpanded
//! [`Node`]; the first lookup, listing or readlink against it materializes
//! the node, moves its children into the table under fresh inode numbers
//! and caches the name-to-inode mapping. After that, traversal of the
//! inode never touches the database again. A failed expansion caches
//! nothing, so a later traversal can retry once the backend recovers.

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry, Request,
};
use libc::c_int;
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::error;

use super::{FsObject, Node, NodeKind, RootNode};

/// Kernel cache timeout for entries and attributes. Without caching the
/// kernel asks us to resolve a path to an inode on what feels like every
/// file access, and each miss can cost a database query.
const TTL: Duration = Duration::from_secs(10 * 60);

const ROOT_INO: u64 = 1;

/// Errno returned when reading the database or processing its results
/// fails. EIO is the closest generic "backend broke" signal FUSE has.
const DB_ERROR: c_int = libc::EIO;

struct InodeSlot {
    kind: NodeKind,
    /// The unexpanded node. Taken when the slot is expanded; restored if
    /// expansion fails so the next attempt can retry.
    node: Option<Box<dyn Node>>,
    expanded: Option<Expanded>,
}

enum Expanded {
    Dir { entries: BTreeMap<String, u64> },
    Symlink(PathBuf),
}

pub struct TagFs {
    inodes: HashMap<u64, InodeSlot>,
    next_ino: u64,
}

impl TagFs {
    pub fn new(root: RootNode) -> TagFs {
        let mut inodes = HashMap::new();
        inodes.insert(
            ROOT_INO,
            InodeSlot {
                kind: NodeKind::Directory,
                node: Some(Box::new(root)),
                expanded: None,
            },
        );
        TagFs {
            inodes,
            next_ino: ROOT_INO + 1,
        }
    }

    /// Expand the node behind `ino` if it has not been expanded yet.
    fn expand(&mut self, ino: u64) -> Result<(), c_int> {
        let slot = self.inodes.get_mut(&ino).ok_or(libc::ENOENT)?;
        if slot.expanded.is_some() {
            return Ok(());
        }
        let node = slot.node.take().ok_or(DB_ERROR)?;

        let object = match node.materialize() {
            Ok(object) => object,
            Err(err) => {
                error!(ino, error = %format!("{err:#}"), "failed to materialize node");
                if let Some(slot) = self.inodes.get_mut(&ino) {
                    slot.node = Some(node);
                }
                return Err(DB_ERROR);
            }
        };

        let expanded = match object {
            FsObject::Symlink(target) => Expanded::Symlink(target),
            FsObject::Dir(dir) => {
                let mut entries = BTreeMap::new();
                for (name, child) in dir.into_children() {
                    let child_ino = self.next_ino;
                    self.next_ino += 1;
                    self.inodes.insert(
                        child_ino,
                        InodeSlot {
                            kind: child.kind(),
                            node: Some(child),
                            expanded: None,
                        },
                    );
                    entries.insert(name, child_ino);
                }
                Expanded::Dir { entries }
            }
        };

        if let Some(slot) = self.inodes.get_mut(&ino) {
            slot.expanded = Some(expanded);
        }
        Ok(())
    }

    fn dir_entries(&self, ino: u64) -> Option<&BTreeMap<String, u64>> {
        match self.inodes.get(&ino).and_then(|s| s.expanded.as_ref()) {
            Some(Expanded::Dir { entries }) => Some(entries),
            _ => None,
        }
    }

    fn attr(&self, ino: u64, kind: NodeKind, req: &Request<'_>) -> FileAttr {
        let now = SystemTime::now();
        let (file_type, perm, nlink) = match kind {
            NodeKind::Directory => (FileType::Directory, 0o555, 2),
            NodeKind::Symlink => (FileType::Symlink, 0o777, 1),
        };
        FileAttr {
            ino,
            size: 0,
            blocks: 0,
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
            kind: file_type,
            perm,
            nlink,
            uid: req.uid(),
            gid: req.gid(),
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }
}

impl Filesystem for TagFs {
    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = match name.to_str() {
            Some(name) => name,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };
        if let Err(errno) = self.expand(parent) {
            reply.error(errno);
            return;
        }
        let child_ino = match self.dir_entries(parent) {
            Some(entries) => match entries.get(name) {
                Some(ino) => *ino,
                None => {
                    reply.error(libc::ENOENT);
                    return;
                }
            },
            None => {
                reply.error(libc::ENOTDIR);
                return;
            }
        };
        match self.inodes.get(&child_ino) {
            Some(slot) => reply.entry(&TTL, &self.attr(child_ino, slot.kind, req), 0),
            None => reply.error(libc::ENOENT),
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.inodes.get(&ino) {
            Some(slot) => reply.attr(&TTL, &self.attr(ino, slot.kind, req)),
            None => reply.error(libc::ENOENT),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        if let Err(errno) = self.expand(ino) {
            reply.error(errno);
            return;
        }
        let entries = match self.dir_entries(ino) {
            Some(entries) => entries,
            None => {
                reply.error(libc::ENOTDIR);
                return;
            }
        };

        let mut listing: Vec<(u64, FileType, &str)> = Vec::with_capacity(entries.len() + 2);
        listing.push((ino, FileType::Directory, "."));
        listing.push((ino, FileType::Directory, ".."));
        for (name, &child_ino) in entries {
            let file_type = match self.inodes.get(&child_ino).map(|s| s.kind) {
                Some(NodeKind::Symlink) => FileType::Symlink,
                _ => FileType::Directory,
            };
            listing.push((child_ino, file_type, name));
        }

        for (i, (entry_ino, file_type, name)) in
            listing.into_iter().enumerate().skip(offset as usize)
        {
            // the next offset is i + 1 so a continued readdir resumes
            // after this entry
            if reply.add(entry_ino, (i + 1) as i64, file_type, name) {
                break;
            }
        }
        reply.ok();
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        if let Err(errno) = self.expand(ino) {
            reply.error(errno);
            return;
        }
        match self.inodes.get(&ino).and_then(|s| s.expanded.as_ref()) {
            Some(Expanded::Symlink(target)) => reply.data(target.as_os_str().as_bytes()),
            _ => reply.error(libc::EINVAL),
        }
    }
}
