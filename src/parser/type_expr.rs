//! IEC type expressions: the `<type>` element tree on one side and the
//! textual `ARRAY[a..b] OF T` form stored in the model on the other.

use super::helpers::{child, children_named, elements};
use crate::error::ParseFailure;
use roxmltree::Node;
use std::fmt;

/// Placeholder for a type container with no recognizable child.
pub const UNKNOWN_TYPE: &str = "UNKNOWN";

/// Nesting cap for the textual grammar. Text nested deeper than this is kept
/// as a single opaque name.
pub const MAX_TEXT_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// Elementary or derived type, kept verbatim.
    Named(String),
    Array {
        dimensions: Vec<ArrayDimension>,
        base: Box<TypeExpr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDimension {
    pub lower: String,
    pub upper: String,
}

impl TypeExpr {
    /// Resolve the type held by a container element (`<type>`, `<baseType>`,
    /// `<returnType>`).
    pub fn from_xml(container: Node, max_depth: usize) -> Result<TypeExpr, ParseFailure> {
        resolve(container, 0, max_depth)
    }

    /// Parse the textual form. Anything that is not an array is a name.
    pub fn parse(text: &str) -> TypeExpr {
        let mut layers: Vec<Vec<ArrayDimension>> = Vec::new();
        let mut rest = text.trim();
        while layers.len() < MAX_TEXT_DEPTH {
            match split_array_prefix(rest) {
                Some((dims, base)) => {
                    layers.push(dims);
                    rest = base;
                }
                None => break,
            }
        }
        layers
            .into_iter()
            .rev()
            .fold(TypeExpr::Named(rest.to_string()), |base, dimensions| {
                TypeExpr::Array {
                    dimensions,
                    base: Box::new(base),
                }
            })
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::Array { dimensions, base } if dimensions.is_empty() => {
                write!(f, "ARRAY OF {}", base)
            }
            TypeExpr::Array { dimensions, base } => {
                f.write_str("ARRAY[")?;
                for (i, d) in dimensions.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}..{}", d.lower, d.upper)?;
                }
                write!(f, "] OF {}", base)
            }
        }
    }
}

fn resolve(container: Node, depth: usize, max_depth: usize) -> Result<TypeExpr, ParseFailure> {
    if depth >= max_depth {
        return Err(ParseFailure::TypeTooDeep { limit: max_depth });
    }
    let Some(inner) = elements(container).next() else {
        return Ok(TypeExpr::Named(UNKNOWN_TYPE.to_string()));
    };
    match inner.tag_name().name() {
        "derived" => Ok(TypeExpr::Named(
            inner
                .attribute("name")
                .filter(|n| !n.is_empty())
                .unwrap_or(UNKNOWN_TYPE)
                .to_string(),
        )),
        "array" => {
            let dimensions = children_named(inner, "dimension")
                .filter_map(|d| {
                    let lower = d.attribute("lower")?.trim();
                    let upper = d.attribute("upper")?.trim();
                    Some(ArrayDimension {
                        lower: lower.to_string(),
                        upper: upper.to_string(),
                    })
                })
                .collect();
            let base = match child(inner, "baseType") {
                Some(b) => resolve(b, depth + 1, max_depth)?,
                None => TypeExpr::Named(UNKNOWN_TYPE.to_string()),
            };
            Ok(TypeExpr::Array {
                dimensions,
                base: Box::new(base),
            })
        }
        other => Ok(TypeExpr::Named(other.to_string())),
    }
}

/// Split `ARRAY[..] OF rest` into its dimensions and `rest`.
fn split_array_prefix(s: &str) -> Option<(Vec<ArrayDimension>, &str)> {
    let keyword = s.get(..5)?;
    if !keyword.eq_ignore_ascii_case("ARRAY") {
        return None;
    }
    let after = &s[5..];
    let mut rest = after.trim_start();
    if !(rest.starts_with('[') || after.len() != rest.len()) {
        // e.g. `ARRAYTYPE`
        return None;
    }
    let mut dimensions = Vec::new();
    if let Some(bracketed) = rest.strip_prefix('[') {
        let close = bracketed.find(']')?;
        dimensions = parse_ranges(&bracketed[..close]);
        rest = bracketed[close + 1..].trim_start();
    }
    let of = rest.get(..2)?;
    if !of.eq_ignore_ascii_case("OF") {
        return None;
    }
    let after_of = &rest[2..];
    let base = after_of.trim_start();
    if base.len() == after_of.len() || base.is_empty() {
        return None;
    }
    Some((dimensions, base.trim_end()))
}

fn parse_ranges(ranges: &str) -> Vec<ArrayDimension> {
    ranges
        .split(',')
        .filter_map(|part| {
            let (lower, upper) = part.split_once("..")?;
            let (lower, upper) = (lower.trim(), upper.trim());
            if lower.is_empty() || upper.is_empty() {
                return None;
            }
            Some(ArrayDimension {
                lower: lower.to_string(),
                upper: upper.to_string(),
            })
        })
        .collect()
}
