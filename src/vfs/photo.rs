//! Photo leaf nodes: symlinks pointing at the real file on disk.

use anyhow::Result;
use std::path::PathBuf;

use crate::types::Photo;

use super::{node_map, FsObject, Node, NodeKind, NodeMap};

pub(crate) struct PhotoNode {
    name: String,
    path: PathBuf,
}

impl PhotoNode {
    pub(crate) fn new(photo: &Photo) -> PhotoNode {
        PhotoNode {
            name: photo.unique_stable_name(),
            path: photo.path.clone(),
        }
    }
}

impl Node for PhotoNode {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Symlink
    }

    fn materialize(&self) -> Result<FsObject> {
        Ok(FsObject::Symlink(self.path.clone()))
    }
}

/// Photos with the same derived id are physical copies of the same file,
/// so duplicates are collapsed rather than treated as an error.
pub(crate) fn photos_to_node_map(photos: &[Photo]) -> Result<NodeMap> {
    let nodes = photos
        .iter()
        .map(|p| Box::new(PhotoNode::new(p)) as Box<dyn Node>)
        .collect();
    node_map(nodes, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_node_is_a_symlink_to_the_photo() {
        let node = PhotoNode::new(&Photo {
            path: PathBuf::from("/library/a/b/photo.jpg"),
            id: "1234".to_string(),
        });
        assert_eq!(node.name(), "1234.jpg");
        assert_eq!(node.kind(), NodeKind::Symlink);
        match node.materialize().unwrap() {
            FsObject::Symlink(target) => {
                assert_eq!(target, PathBuf::from("/library/a/b/photo.jpg"))
            }
            FsObject::Dir(_) => panic!("expected a symlink"),
        }
    }

    #[test]
    fn duplicate_photo_ids_collapse_to_one_entry() {
        let original = Photo {
            path: PathBuf::from("/library/one/photo.jpg"),
            id: "abc".to_string(),
        };
        let copy = Photo {
            path: PathBuf::from("/library/two/photo.jpg"),
            id: "abc".to_string(),
        };
        let map = photos_to_node_map(&[original, copy]).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("abc.jpg"));
    }
}
