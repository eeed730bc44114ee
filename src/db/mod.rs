//! Database port: the read-only interface the virtual filesystem queries,
//! plus a registry of backend constructors.

pub mod digikam;

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Photo, Query, Tag};

/// Interface for querying information about photos within a photo
/// database. All access is read-only.
pub trait Database: Send + Sync {
    /// Execute a query and return the matching photos.
    fn photos(&self, query: &Query) -> Result<Vec<Photo>>;

    /// Tags at the root of the tag hierarchy.
    fn root_tags(&self) -> Result<Vec<Tag>>;

    /// Direct children of the given tag.
    fn children_tags(&self, parent: &Tag) -> Result<Vec<Tag>>;

    /// Ratings used to render the ratings directories, in ascending order
    /// with no duplicates. If more than a reasonable number of ratings
    /// exist a backend should return a subset spanning the full range.
    fn ratings(&self) -> Vec<f64>;

    /// Release the underlying connection. Further queries error.
    fn close(&self) -> Result<()>;
}

impl std::fmt::Debug for dyn Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

/// Shared handle to a database, held by every directory node in the tree.
pub type SharedDatabase = Arc<dyn Database>;

pub type Constructor = Box<dyn Fn(&str) -> Result<Box<dyn Database>> + Send + Sync>;

/// Registry of database constructors keyed by type name.
///
/// The process composition layer owns one of these and resolves the
/// configured type name into a live [`Database`]; the filesystem engine
/// only ever consumes the already-resolved instance.
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, Constructor>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Registry with all built-in database types registered.
    pub fn with_builtin() -> Result<Registry> {
        let mut registry = Registry::new();
        registry.register("digikam-sqlite", |source| {
            Ok(Box::new(digikam::DigikamDb::open(source)?))
        })?;
        Ok(registry)
    }

    /// Register a constructor under a type name. Exactly one registration
    /// per type name is permitted.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(&str) -> Result<Box<dyn Database>> + Send + Sync + 'static,
    {
        if self.factories.contains_key(name) {
            bail!("duplicate database type {:?}", name);
        }
        self.factories.insert(name.to_string(), Box::new(constructor));
        Ok(())
    }

    /// Resolve a type name and open a database from the given source.
    pub fn open(&self, name: &str, source: &str) -> Result<Box<dyn Database>> {
        match self.factories.get(name) {
            Some(constructor) => constructor(source),
            None => bail!("database type {:?} is not registered", name),
        }
    }
}
