//! Core domain types: photos, tags, and the selector tree that queries
//! are built from.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while turning a [`Selector`] into a database query.
///
/// All of these are reported synchronously before any database call is
/// issued.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectorError {
    #[error("cannot resolve a tag with an empty path")]
    EmptyTagPath,

    #[error("invalid relational operator {0:?}")]
    InvalidOperator(String),

    #[error("rating must be a whole number, got {0}")]
    FractionalRating(f64),

    #[error("set operation selectors require at least two operands, got {0}")]
    TooFewOperands(usize),
}

/// A single photo returned by a photo database.
///
/// `id` is a stable unique identifier supplied by the database. For digiKam
/// this is the uniqueHash, an md5 over partial file bytes, which stays
/// stable even when the photo moves around the library. The hash is not
/// globally unique: two physical copies of the same file share an id, and
/// consumers deliberately collapse such duplicates when flattening photos
/// into one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    /// Absolute path to the photo on disk.
    pub path: PathBuf,
    /// Stable unique identifier supplied by the database.
    pub id: String,
}

impl Photo {
    /// The externally visible name for this photo: the stable id plus the
    /// original file extension. A photo without an extension is named by
    /// the id alone.
    pub fn unique_stable_name(&self) -> String {
        match self.path.extension() {
            Some(ext) => format!("{}.{}", self.id, ext.to_string_lossy()),
            None => self.id.clone(),
        }
    }
}

/// A node in a hierarchical tag taxonomy, identified by its full path of
/// segments from root to leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    pub path: Vec<String>,
}

impl Tag {
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Tag {
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    /// The display name of the tag: its last path segment, or the empty
    /// string for an empty path.
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }
}

/// Closed set of relational comparison operators usable in rating
/// selectors. Any other operator text is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationalOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl RelationalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationalOperator::Equal => "==",
            RelationalOperator::NotEqual => "!=",
            RelationalOperator::LessThan => "<",
            RelationalOperator::LessThanOrEqual => "<=",
            RelationalOperator::GreaterThan => ">",
            RelationalOperator::GreaterThanOrEqual => ">=",
        }
    }
}

impl fmt::Display for RelationalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationalOperator {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(RelationalOperator::Equal),
            "!=" => Ok(RelationalOperator::NotEqual),
            "<" => Ok(RelationalOperator::LessThan),
            "<=" => Ok(RelationalOperator::LessThanOrEqual),
            ">" => Ok(RelationalOperator::GreaterThan),
            ">=" => Ok(RelationalOperator::GreaterThanOrEqual),
            other => Err(SelectorError::InvalidOperator(other.to_string())),
        }
    }
}

/// A method of selecting photos within a photo database.
///
/// Selectors nest arbitrarily; construction is tree shaped so no cycles
/// are possible. The variant set is closed, so database backends lower a
/// selector with a plain `match` rather than visitor dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Photos directly annotated with the given tag.
    HasTag { tag: Tag },
    /// Photos whose rating relates to `rating` via `operator`. Ratings
    /// must be whole numbers; fractional values are rejected when the
    /// selector is compiled.
    HasRating {
        operator: RelationalOperator,
        rating: f64,
    },
    /// Photos matching all of the operands (at least two required).
    And { operands: Vec<Selector> },
    /// Photos matching any of the operands (at least two required).
    Or { operands: Vec<Selector> },
    /// Photos matching `starting` minus those matching `excluding`.
    Difference {
        starting: Box<Selector>,
        excluding: Box<Selector>,
    },
}

/// A query for photos within a photo database.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub selector: Selector,
}

/// A query plus a display name, used to expose canned queries as
/// directories. Names must be unique within one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedQuery {
    pub name: String,
    pub query: Query,
}
