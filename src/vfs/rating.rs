//! Rating directories: buckets of photos by rating comparison.
//!
//! For the ratings `[1, 2, 3]` the parent directory contains `==1`, `>=1`,
//! `==2`, `>=2` and `==3`; `>=max` is omitted because it would equal
//! `==max`. Each bucket holds a `photos` directory with the matching
//! photos.

use anyhow::Result;

use crate::db::SharedDatabase;
use crate::types::{Query, RelationalOperator, Selector, SelectorError};

use super::query::QueryNode;
use super::{materialize_dir, node_map, DirNode, FsObject, Node, NodeKind, NodeMap};

pub(crate) struct RatingsParentNode {
    db: SharedDatabase,
    /// Selector this ratings directory is scoped by, e.g. the HasTag of
    /// the tag directory it sits under. None at an unscoped location.
    base_selector: Option<Selector>,
}

impl RatingsParentNode {
    pub(crate) fn new(db: SharedDatabase, base_selector: Option<Selector>) -> RatingsParentNode {
        RatingsParentNode { db, base_selector }
    }

    fn bucket(&self, operator: RelationalOperator, rating: f64) -> RatingBucketNode {
        let has_rating = Selector::HasRating { operator, rating };
        let selector = match &self.base_selector {
            Some(base) => Selector::And {
                operands: vec![base.clone(), has_rating],
            },
            None => has_rating,
        };
        RatingBucketNode {
            db: self.db.clone(),
            name: format!("{}{}", operator.as_str(), rating as i64),
            query: Query { selector },
        }
    }
}

impl Node for RatingsParentNode {
    fn name(&self) -> String {
        "ratings".to_string()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn materialize(&self) -> Result<FsObject> {
        materialize_dir(self)
    }
}

impl DirNode for RatingsParentNode {
    fn children(&self) -> Result<NodeMap> {
        let ratings = self.db.ratings();
        let max_rating = match ratings.last() {
            Some(max) => *max,
            None => return Ok(NodeMap::new()),
        };

        let mut children: Vec<Box<dyn Node>> = Vec::with_capacity(ratings.len() * 2);
        for &rating in &ratings {
            // whole numbers only, otherwise ==2 and ==2.5 would collide as
            // bucket names
            if rating != rating.trunc() {
                return Err(SelectorError::FractionalRating(rating).into());
            }
            children.push(Box::new(self.bucket(RelationalOperator::Equal, rating)));
            if rating != max_rating {
                children.push(Box::new(
                    self.bucket(RelationalOperator::GreaterThanOrEqual, rating),
                ));
            }
        }
        node_map(children, false)
    }
}

/// One rating bucket, e.g. `>=3`. Its single child is the `photos`
/// directory with the matching photos.
pub(crate) struct RatingBucketNode {
    db: SharedDatabase,
    name: String,
    query: Query,
}

impl Node for RatingBucketNode {
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

impl DirNode for RatingBucketNode {
    fn children(&self) -> Result<NodeMap> {
        let photos = QueryNode::new(self.db.clone(), "photos", self.query.clone());
        node_map(vec![Box::new(photos)], false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tag;
    use crate::vfs::testdb::MockDb;
    use std::sync::atomic::Ordering;

    fn ratings_node(ratings: Vec<f64>, base: Option<Selector>) -> RatingsParentNode {
        let db = MockDb {
            ratings,
            ..MockDb::default()
        }
        .shared();
        RatingsParentNode::new(db, base)
    }

    #[test]
    fn buckets_for_each_rating_without_ge_max() {
        let node = ratings_node(vec![1.0, 2.0, 3.0], None);
        let children = node.children().unwrap();
        assert_eq!(
            children.keys().collect::<Vec<_>>(),
            vec!["==1", "==2", "==3", ">=1", ">=2"]
        );
    }

    #[test]
    fn empty_rating_list_means_no_children() {
        let node = ratings_node(Vec::new(), None);
        assert!(node.children().unwrap().is_empty());
    }

    #[test]
    fn fractional_rating_from_backend_is_an_error() {
        let node = ratings_node(vec![1.0, 2.5], None);
        let err = node.children().unwrap_err();
        assert!(err.to_string().contains("whole number"));
    }

    #[test]
    fn bucket_contains_a_single_photos_directory() {
        let node = ratings_node(vec![2.0], None);
        let children = node.children().unwrap();
        let bucket = children.get("==2").unwrap();
        let entries = match bucket.materialize().unwrap() {
            FsObject::Dir(entries) => entries,
            FsObject::Symlink(_) => panic!("expected a directory"),
        };
        assert_eq!(entries.len(), 1);
        assert!(entries.get("photos").is_some());
    }

    #[test]
    fn bucket_query_is_scoped_by_the_base_selector() {
        let base = Selector::HasTag {
            tag: Tag::new(["skiing"]),
        };
        let node = ratings_node(vec![4.0], Some(base.clone()));
        let bucket = node.bucket(RelationalOperator::Equal, 4.0);
        assert_eq!(
            bucket.query.selector,
            Selector::And {
                operands: vec![
                    base,
                    Selector::HasRating {
                        operator: RelationalOperator::Equal,
                        rating: 4.0
                    }
                ]
            }
        );
    }

    #[test]
    fn unscoped_bucket_queries_the_rating_alone() {
        let node = ratings_node(vec![4.0], None);
        let bucket = node.bucket(RelationalOperator::GreaterThanOrEqual, 4.0);
        assert_eq!(bucket.name, ">=4");
        assert_eq!(
            bucket.query.selector,
            Selector::HasRating {
                operator: RelationalOperator::GreaterThanOrEqual,
                rating: 4.0
            }
        );
    }

    #[test]
    fn listing_buckets_does_not_query_photos() {
        let db = MockDb {
            ratings: vec![1.0, 2.0],
            ..MockDb::default()
        }
        .shared();
        let node = RatingsParentNode::new(db.clone(), None);
        node.children().unwrap();
        assert_eq!(db.photo_calls.load(Ordering::SeqCst), 0);
    }
}
