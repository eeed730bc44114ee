//! Tag directories: the navigable tag hierarchy.
//!
//! Every tag directory contains a nested `tags` directory of its child
//! tags, a `photos` directory of the photos carrying the tag, and a
//! `ratings` directory of rating buckets scoped to the tag.

use anyhow::{Context, Result};

use crate::db::SharedDatabase;
use crate::types::{Query, Selector, Tag};

use super::query::QueryNode;
use super::rating::RatingsParentNode;
use super::{materialize_dir, node_map, DirNode, FsObject, Node, NodeKind, NodeMap};

/// The top-level `tags` directory holding the whole tag hierarchy.
pub(crate) struct RootTagsNode {
    db: SharedDatabase,
}

impl RootTagsNode {
    pub(crate) fn new(db: SharedDatabase) -> RootTagsNode {
        RootTagsNode { db }
    }
}

impl Node for RootTagsNode {
    fn name(&self) -> String {
        "tags".to_string()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn materialize(&self) -> Result<FsObject> {
        materialize_dir(self)
    }
}

impl DirNode for RootTagsNode {
    fn children(&self) -> Result<NodeMap> {
        let root_tags = self.db.root_tags()?;
        tags_to_node_map(&self.db, root_tags)
    }
}

/// A directory for one tag.
pub(crate) struct TagNode {
    db: SharedDatabase,
    tag: Tag,
}

impl TagNode {
    pub(crate) fn new(db: SharedDatabase, tag: Tag) -> TagNode {
        TagNode { db, tag }
    }

    fn has_tag_selector(&self) -> Selector {
        Selector::HasTag {
            tag: self.tag.clone(),
        }
    }
}

impl Node for TagNode {
    fn name(&self) -> String {
        self.tag.name().to_string()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn materialize(&self) -> Result<FsObject> {
        materialize_dir(self)
    }
}

impl DirNode for TagNode {
    fn children(&self) -> Result<NodeMap> {
        let children: Vec<Box<dyn Node>> = vec![
            Box::new(ChildTagsNode {
                db: self.db.clone(),
                tag: self.tag.clone(),
            }),
            Box::new(QueryNode::new(
                self.db.clone(),
                "photos",
                Query {
                    selector: self.has_tag_selector(),
                },
            )),
            Box::new(RatingsParentNode::new(
                self.db.clone(),
                Some(self.has_tag_selector()),
            )),
        ];
        node_map(children, false)
    }
}

/// The nested `tags` directory of a tag's direct children.
pub(crate) struct ChildTagsNode {
    db: SharedDatabase,
    tag: Tag,
}

impl Node for ChildTagsNode {
    fn name(&self) -> String {
        "tags".to_string()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn materialize(&self) -> Result<FsObject> {
        materialize_dir(self)
    }
}

impl DirNode for ChildTagsNode {
    fn children(&self) -> Result<NodeMap> {
        let children = self.db.children_tags(&self.tag).with_context(|| {
            format!(
                "failed to get tags that are children of tag {:?}",
                self.tag.path.join("/")
            )
        })?;
        tags_to_node_map(&self.db, children)
    }
}

fn tags_to_node_map(db: &SharedDatabase, tags: Vec<Tag>) -> Result<NodeMap> {
    let nodes = tags
        .into_iter()
        .map(|tag| Box::new(TagNode::new(db.clone(), tag)) as Box<dyn Node>)
        .collect();
    node_map(nodes, false)
}
