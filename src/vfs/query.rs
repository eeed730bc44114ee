//! Query nodes: directories whose children are the photos matching a
//! query.

use anyhow::{Context, Result};

use crate::db::SharedDatabase;
use crate::types::Query;

use super::photo::photos_to_node_map;
use super::{materialize_dir, DirNode, FsObject, Node, NodeKind, NodeMap};

pub(crate) struct QueryNode {
    name: String,
    query: Query,
    db: SharedDatabase,
}

impl QueryNode {
    pub(crate) fn new(db: SharedDatabase, name: impl Into<String>, query: Query) -> QueryNode {
        QueryNode {
            name: name.into(),
            query,
            db,
        }
    }
}

impl Node for QueryNode {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn materialize(&self) -> Result<FsObject> {
        materialize_dir(self)
    }
}

impl DirNode for QueryNode {
    fn children(&self) -> Result<NodeMap> {
        let photos = self
            .db
            .photos(&self.query)
            .with_context(|| format!("failed to perform query {:?}", self.name))?;
        photos_to_node_map(&photos)
    }
}
