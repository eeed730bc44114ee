//! Lowering of a [`Selector`] tree into a parameterized SQL query against
//! the digiKam schema.
//!
//! Any string that originates from the user (tag names in particular) is
//! passed to SQLite as a bound parameter, never concatenated into the
//! query text. The only spliced values are the relational operator text,
//! which comes from a closed enum, and ratings formatted as integers.

use crate::types::{Query, Selector, SelectorError, Tag};

pub(crate) const PHOTO_INFO_CTE_NAME: &str = "image_info";

/// Common table expression that denormalizes every aspect of an image we
/// might query on into a single row per photo per tag association, so the
/// compiled selectors can all be simple selections over one relation.
const PHOTO_INFO_CTE: &str = "\
WITH image_info AS (
SELECT r.specificPath AS root, a.relativePath AS path, i.name AS name, i.uniqueHash AS uniqueHash, t.id AS tagId, ii.rating AS rating
FROM Images i
LEFT JOIN ImageTags it ON it.imageid = i.id
LEFT JOIN ImageInformation ii ON ii.imageid = i.id
LEFT JOIN Tags t ON it.tagid = t.id
LEFT JOIN Albums a ON i.album = a.id
LEFT JOIN AlbumRoots r ON albumRoot = r.id
WHERE root != '' AND path != ''
)";

/// The columns needed to construct a [`crate::types::Photo`] from a row.
pub(crate) const PHOTO_PROPERTIES: &str = "root, path, name, uniqueHash";

/// A compiled selector: the query text plus the bound parameters it uses,
/// in the order they appear in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompiledSelector {
    pub query: String,
    pub parameters: Vec<String>,
}

/// Build the full photo query for `query`: the photo-info CTE, the
/// compiled selector, and a DISTINCT wrapper that collapses the duplicate
/// rows a photo with several qualifying tag associations would produce.
pub(crate) fn build_photo_query(query: &Query) -> Result<CompiledSelector, SelectorError> {
    let compiled = compile_selector(&query.selector)?;
    Ok(CompiledSelector {
        query: format!(
            "{PHOTO_INFO_CTE}\nSELECT DISTINCT * FROM (\n{}\n)",
            compiled.query
        ),
        parameters: compiled.parameters,
    })
}

pub(crate) fn compile_selector(selector: &Selector) -> Result<CompiledSelector, SelectorError> {
    match selector {
        Selector::HasTag { tag } => {
            let (tag_subquery, parameters) = tag_id_subquery(tag)?;
            Ok(CompiledSelector {
                query: format!(
                    "SELECT {PHOTO_PROPERTIES} FROM {PHOTO_INFO_CTE_NAME} WHERE tagId = {tag_subquery}"
                ),
                parameters,
            })
        }
        Selector::HasRating { operator, rating } => {
            if *rating != rating.trunc() {
                return Err(SelectorError::FractionalRating(*rating));
            }
            // operator text comes from the closed enum, rating is formatted
            // as an integer, so neither needs a bound parameter
            Ok(CompiledSelector {
                query: format!(
                    "SELECT {PHOTO_PROPERTIES} FROM {PHOTO_INFO_CTE_NAME} WHERE rating {} {}",
                    operator.as_str(),
                    *rating as i64
                ),
                parameters: Vec::new(),
            })
        }
        Selector::And { operands } => compile_set_operation("INTERSECT", operands),
        Selector::Or { operands } => compile_set_operation("UNION", operands),
        Selector::Difference {
            starting,
            excluding,
        } => {
            let starting = compile_selector(starting)?;
            let excluding = compile_selector(excluding)?;

            let mut parameters = starting.parameters;
            parameters.extend(excluding.parameters);

            Ok(CompiledSelector {
                query: wrap_set_operation(&format!(
                    "{}\nEXCEPT\n{}",
                    starting.query, excluding.query
                )),
                parameters,
            })
        }
    }
}

fn compile_set_operation(
    operator: &str,
    operands: &[Selector],
) -> Result<CompiledSelector, SelectorError> {
    if operands.len() < 2 {
        return Err(SelectorError::TooFewOperands(operands.len()));
    }

    let mut parts = Vec::with_capacity(operands.len());
    let mut parameters = Vec::new();
    for operand in operands {
        let compiled = compile_selector(operand)?;
        parts.push(compiled.query);
        parameters.extend(compiled.parameters);
    }

    Ok(CompiledSelector {
        query: wrap_set_operation(&parts.join(&format!("\n{operator}\n"))),
        parameters,
    })
}

/// Selectors nest arbitrarily, so set operations must be grouped to keep
/// the order of operations correct. SQLite does not allow parenthesizing a
/// compound SELECT directly; the workaround is to wrap it in a
/// `SELECT * FROM (...)`, which also keeps the result shape stable for
/// further nesting.
fn wrap_set_operation(selector: &str) -> String {
    format!("SELECT *\nFROM (\n{selector}\n)")
}

/// Produce a subquery that resolves the id of `tag` by walking its path
/// from the root of the hierarchy (parent id 0), one nested lookup per
/// segment. Segment names are returned as bound parameters, ordered
/// leaf-first to match their left-to-right appearance in the text.
pub(crate) fn tag_id_subquery(tag: &Tag) -> Result<(String, Vec<String>), SelectorError> {
    if tag.path.is_empty() {
        return Err(SelectorError::EmptyTagPath);
    }

    let mut query = String::from("0");
    let mut parameters = Vec::with_capacity(tag.path.len());
    for name in &tag.path {
        query = format!("(SELECT id FROM Tags WHERE name=? AND pid={query})");
        parameters.insert(0, name.clone());
    }
    Ok((query, parameters))
}
