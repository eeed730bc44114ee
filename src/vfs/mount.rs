//! Mounting the virtual filesystem.

use anyhow::{Context, Result};
use fuser::MountOption;
use std::path::Path;
use tracing::info;

use crate::db::SharedDatabase;
use crate::types::NamedQuery;

use super::{RootNode, TagFs};

/// Mount the filesystem and serve it until it is unmounted (for example
/// with `fusermount -u`). The filesystem is strictly read-only.
pub fn mount(mount_point: &Path, db: SharedDatabase, queries: Vec<NamedQuery>) -> Result<()> {
    let fs = TagFs::new(RootNode::new(db, queries));

    let options = [
        MountOption::RO,
        MountOption::FSName("tagfuse".to_string()),
    ];

    info!(mount_point = %mount_point.display(), "mounting");
    fuser::mount2(fs, mount_point, &options)
        .with_context(|| format!("failed to mount filesystem at {:?}", mount_point))
}
