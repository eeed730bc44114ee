//! The root of the virtual filesystem: `tags` and `queries`.

use anyhow::Result;

use crate::db::SharedDatabase;
use crate::types::NamedQuery;

use super::query::QueryNode;
use super::tag::RootTagsNode;
use super::{materialize_dir, node_map, DirNode, FsObject, Node, NodeKind, NodeMap};

pub struct RootNode {
    db: SharedDatabase,
    queries: Vec<NamedQuery>,
}

impl RootNode {
    pub fn new(db: SharedDatabase, queries: Vec<NamedQuery>) -> RootNode {
        RootNode { db, queries }
    }
}

impl Node for RootNode {
    fn name(&self) -> String {
        String::new()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn materialize(&self) -> Result<FsObject> {
        materialize_dir(self)
    }
}

impl DirNode for RootNode {
    fn children(&self) -> Result<NodeMap> {
        let children: Vec<Box<dyn Node>> = vec![
            Box::new(RootTagsNode::new(self.db.clone())),
            Box::new(RootQueriesNode {
                db: self.db.clone(),
                queries: self.queries.clone(),
            }),
        ];
        node_map(children, false)
    }
}

/// The `queries` directory of configured named queries.
pub(crate) struct RootQueriesNode {
    db: SharedDatabase,
    queries: Vec<NamedQuery>,
}

impl Node for RootQueriesNode {
    fn name(&self) -> String {
        "queries".to_string()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn materialize(&self) -> Result<FsObject> {
        materialize_dir(self)
    }
}

impl DirNode for RootQueriesNode {
    fn children(&self) -> Result<NodeMap> {
        let nodes = self
            .queries
            .iter()
            .map(|q| {
                Box::new(QueryNode::new(self.db.clone(), q.name.clone(), q.query.clone()))
                    as Box<dyn Node>
            })
            .collect();
        // duplicate query names are a configuration defect, never collapsed
        node_map(nodes, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Query, Selector, Tag};
    use crate::vfs::testdb::MockDb;

    fn named_query(name: &str) -> NamedQuery {
        NamedQuery {
            name: name.to_string(),
            query: Query {
                selector: Selector::HasTag {
                    tag: Tag::new(["anything"]),
                },
            },
        }
    }

    #[test]
    fn root_has_tags_and_queries() {
        let node = RootNode::new(MockDb::default().shared(), Vec::new());
        let children = node.children().unwrap();
        assert_eq!(children.keys().collect::<Vec<_>>(), vec!["queries", "tags"]);
    }

    #[test]
    fn queries_directory_lists_named_queries() {
        let node = RootQueriesNode {
            db: MockDb::default().shared(),
            queries: vec![named_query("red"), named_query("vacation")],
        };
        let children = node.children().unwrap();
        assert_eq!(
            children.keys().collect::<Vec<_>>(),
            vec!["red", "vacation"]
        );
    }

    #[test]
    fn duplicate_query_names_abort_materialization() {
        let node = RootQueriesNode {
            db: MockDb::default().shared(),
            queries: vec![named_query("dup"), named_query("dup")],
        };
        let err = node.children().unwrap_err();
        assert!(err.to_string().contains("duplicate name \"dup\""));
    }
}
