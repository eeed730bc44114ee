//! Configuration loading and the external representation of selectors.
//!
//! The config file is JSON. Saved queries are described by a small
//! `{type, properties}` schema that is converted into the [`Selector`]
//! tree before the filesystem is mounted, so configuration mistakes are
//! reported at startup rather than on first traversal.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::types::{NamedQuery, Query, RelationalOperator, Selector, Tag};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<PathBuf>,

    #[serde(default)]
    pub db: DbConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<QueryConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse config file {:?} as JSON", path))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbConfig {
    /// Registered database type name, e.g. "digikam-sqlite".
    #[serde(rename = "type", default)]
    pub db_type: String,

    /// Source of the database. For local databases this is the path to the
    /// database file.
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    #[serde(default)]
    pub name: String,
    pub selector: SelectorConfig,
}

/// External representation of a selector: a type name plus a map of
/// properties. Property names and the type name are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorConfig {
    #[serde(rename = "type", default)]
    pub selector_type: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SelectorProperty>,
}

/// A property value in a selector config. Exactly one shape is meaningful
/// for any given property name; the conversion functions below pick the
/// shape they expect and reject anything missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strings: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<Vec<SelectorConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Box<SelectorConfig>>,
}

pub fn config_to_query(config: &QueryConfig) -> Result<NamedQuery> {
    let selector = config_to_selector(&config.selector)
        .with_context(|| format!("error parsing config {:?}", config.name))?;
    Ok(NamedQuery {
        name: config.name.clone(),
        query: Query { selector },
    })
}

pub fn configs_to_queries(configs: &[QueryConfig]) -> Result<Vec<NamedQuery>> {
    configs.iter().map(config_to_query).collect()
}

/// Validate that query names are unique. Duplicate names would collide in
/// the queries directory, which is a configuration defect, not something
/// to deduplicate silently.
pub fn validate_query_configs(configs: &[QueryConfig]) -> Result<()> {
    let mut names = HashSet::with_capacity(configs.len());
    for config in configs {
        if !names.insert(config.name.as_str()) {
            bail!(
                "query configs must have unique names, the name {:?} is used for more than one query",
                config.name
            );
        }
    }
    Ok(())
}

fn config_to_selector(config: &SelectorConfig) -> Result<Selector> {
    match config.selector_type.to_lowercase().as_str() {
        "hastag" => config_to_has_tag(config),
        "hasrating" => config_to_has_rating(config),
        "and" => Ok(Selector::And {
            operands: config_to_operands(config)?,
        }),
        "or" => Ok(Selector::Or {
            operands: config_to_operands(config)?,
        }),
        "difference" => config_to_difference(config),
        _ => bail!("invalid selector type {:?}", config.selector_type),
    }
}

fn config_to_has_tag(config: &SelectorConfig) -> Result<Selector> {
    let mut tag = Tag::default();
    for (name, property) in &config.properties {
        match name.to_lowercase().as_str() {
            "tag" => {
                tag.path = property
                    .strings
                    .clone()
                    .with_context(|| format!("property {:?} must be a list of strings", name))?;
            }
            _ => bail!("invalid property {:?}", name),
        }
    }
    Ok(Selector::HasTag { tag })
}

fn config_to_has_rating(config: &SelectorConfig) -> Result<Selector> {
    let mut operator = None;
    let mut rating = None;
    for (name, property) in &config.properties {
        match name.to_lowercase().as_str() {
            "operator" => {
                let text = property
                    .string
                    .as_deref()
                    .with_context(|| format!("property {:?} must be a string", name))?;
                operator = Some(text.parse::<RelationalOperator>()?);
            }
            "rating" => {
                rating = Some(
                    property
                        .number
                        .with_context(|| format!("property {:?} must be a number", name))?,
                );
            }
            _ => bail!("invalid property {:?}", name),
        }
    }
    Ok(Selector::HasRating {
        operator: operator.context("unspecified operator")?,
        rating: rating.context("unspecified rating")?,
    })
}

fn config_to_operands(config: &SelectorConfig) -> Result<Vec<Selector>> {
    let mut operands = Vec::new();
    for (name, property) in &config.properties {
        match name.to_lowercase().as_str() {
            "operands" => {
                let configs = property
                    .selectors
                    .as_deref()
                    .with_context(|| format!("property {:?} must be a list of selectors", name))?;
                operands = configs
                    .iter()
                    .map(config_to_selector)
                    .collect::<Result<Vec<_>>>()?;
            }
            _ => bail!("invalid property {:?}", name),
        }
    }
    Ok(operands)
}

fn config_to_difference(config: &SelectorConfig) -> Result<Selector> {
    let mut starting = None;
    let mut excluding = None;
    for (name, property) in &config.properties {
        let sub = match name.to_lowercase().as_str() {
            "starting" => &mut starting,
            "excluding" => &mut excluding,
            _ => bail!("invalid property {:?}", name),
        };
        let sub_config = property
            .selector
            .as_deref()
            .with_context(|| format!("unspecified {} selector", name.to_lowercase()))?;
        *sub = Some(config_to_selector(sub_config)?);
    }
    Ok(Selector::Difference {
        starting: Box::new(starting.context("unspecified starting selector")?),
        excluding: Box::new(excluding.context("unspecified excluding selector")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_selector(json: &str) -> Result<Selector> {
        let config: SelectorConfig = serde_json::from_str(json).unwrap();
        config_to_selector(&config)
    }

    #[test]
    fn has_tag_from_config() {
        let selector = parse_selector(
            r#"{"type": "hasTag", "properties": {"tag": {"strings": ["a", "b"]}}}"#,
        )
        .unwrap();
        assert_eq!(
            selector,
            Selector::HasTag {
                tag: Tag::new(["a", "b"])
            }
        );
    }

    #[test]
    fn has_rating_from_config() {
        let selector = parse_selector(
            r#"{"type": "hasRating", "properties": {
                "operator": {"string": ">="},
                "rating": {"number": 3}
            }}"#,
        )
        .unwrap();
        assert_eq!(
            selector,
            Selector::HasRating {
                operator: RelationalOperator::GreaterThanOrEqual,
                rating: 3.0
            }
        );
    }

    #[test]
    fn has_rating_rejects_bad_operator() {
        let err = parse_selector(
            r#"{"type": "hasRating", "properties": {
                "operator": {"string": "=>"},
                "rating": {"number": 3}
            }}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid relational operator"));
    }

    #[test]
    fn type_name_is_case_insensitive() {
        let selector =
            parse_selector(r#"{"type": "HASTAG", "properties": {"tag": {"strings": ["t"]}}}"#)
                .unwrap();
        assert_eq!(
            selector,
            Selector::HasTag {
                tag: Tag::new(["t"])
            }
        );
    }

    #[test]
    fn nested_difference_of_or() {
        let selector = parse_selector(
            r#"{"type": "difference", "properties": {
                "starting": {"selector": {"type": "or", "properties": {"operands": {"selectors": [
                    {"type": "hasTag", "properties": {"tag": {"strings": ["a"]}}},
                    {"type": "hasTag", "properties": {"tag": {"strings": ["b"]}}}
                ]}}}},
                "excluding": {"selector": {"type": "hasTag", "properties": {"tag": {"strings": ["c"]}}}}
            }}"#,
        )
        .unwrap();
        assert_eq!(
            selector,
            Selector::Difference {
                starting: Box::new(Selector::Or {
                    operands: vec![
                        Selector::HasTag {
                            tag: Tag::new(["a"])
                        },
                        Selector::HasTag {
                            tag: Tag::new(["b"])
                        },
                    ]
                }),
                excluding: Box::new(Selector::HasTag {
                    tag: Tag::new(["c"])
                }),
            }
        );
    }

    #[test]
    fn unknown_selector_type_is_an_error() {
        let err = parse_selector(r#"{"type": "nope", "properties": {}}"#).unwrap_err();
        assert!(err.to_string().contains("invalid selector type"));
    }

    #[test]
    fn unknown_property_is_an_error() {
        let err = parse_selector(
            r#"{"type": "hasTag", "properties": {"tags": {"strings": ["a"]}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid property"));
    }

    #[test]
    fn difference_requires_both_sides() {
        let err = parse_selector(
            r#"{"type": "difference", "properties": {
                "starting": {"selector": {"type": "hasTag", "properties": {"tag": {"strings": ["a"]}}}}
            }}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unspecified excluding selector"));
    }

    #[test]
    fn duplicate_query_names_rejected() {
        let config = |name: &str| QueryConfig {
            name: name.to_string(),
            selector: SelectorConfig::default(),
        };
        assert!(validate_query_configs(&[config("a"), config("b")]).is_ok());
        let err = validate_query_configs(&[config("a"), config("a")]).unwrap_err();
        assert!(err.to_string().contains("unique names"));
    }

    #[test]
    fn full_config_round_trip() {
        let json = r#"{
            "mountPoint": "/mnt/photos",
            "db": {"type": "digikam-sqlite", "source": "/data/digikam4.db"},
            "logLevel": "debug",
            "queries": [
                {"name": "favorites", "selector": {"type": "hasTag", "properties": {"tag": {"strings": ["fav"]}}}}
            ]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.mount_point, Some(PathBuf::from("/mnt/photos")));
        assert_eq!(config.db.db_type, "digikam-sqlite");
        assert_eq!(config.log_level.as_deref(), Some("debug"));

        let queries = configs_to_queries(&config.queries).unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].name, "favorites");
        assert_eq!(
            queries[0].query.selector,
            Selector::HasTag {
                tag: Tag::new(["fav"])
            }
        );
    }
}
