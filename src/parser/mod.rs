//! XML → model parsers.
//!
//! Two dialects are supported, each with an `Option` entry point that never
//! fails loudly and a `try_*` twin that reports why nothing was produced:
//!
//! - [`parse_plcopen_project`] – PLCopen TC6 XML (`<project>` root)
//! - [`parse_fbt_basic_fb`] – IEC 61499 Basic FB (`<FBType>` with `<BasicFB>`)
//!
//! [`try_parse_document`] picks the dialect from the root element and parses
//! the tree once.
//!
//! Sub-modules:
//!
//! - [`helpers`] – roxmltree accessors
//! - [`type_expr`] – `ARRAY[..] OF T` type expressions
//! - [`plcopen`] – project, POU interface, data types, configurations
//! - [`body`] – ST / IL / LD / FBD / SFC bodies
//! - [`fbt`] – Basic FB interface, ECC and algorithms

pub mod body;
pub mod fbt;
pub mod helpers;
pub mod plcopen;
pub mod type_expr;

pub use type_expr::{ArrayDimension, TypeExpr};

use crate::config::ParserLimits;
use crate::error::ParseFailure;
use crate::model::{FbtBasicFb, PlcopenProject};
use roxmltree::{Document, Node};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    PlcOpen,
    Fbt,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::PlcOpen => f.write_str("PLCopen"),
            Dialect::Fbt => f.write_str("FBT"),
        }
    }
}

/// A parsed document of either dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDocument {
    PlcOpen(PlcopenProject),
    Fbt(FbtBasicFb),
}

impl ParsedDocument {
    pub fn dialect(&self) -> Dialect {
        match self {
            ParsedDocument::PlcOpen(_) => Dialect::PlcOpen,
            ParsedDocument::Fbt(_) => Dialect::Fbt,
        }
    }
}

fn root_dialect(root: Node) -> Option<Dialect> {
    if root.has_tag_name("project") {
        Some(Dialect::PlcOpen)
    } else if root.has_tag_name("FBType") {
        Some(Dialect::Fbt)
    } else {
        None
    }
}

/// Identify the dialect of a document from its root element, with default limits.
pub fn detect_dialect(text: &str) -> Option<Dialect> {
    detect_dialect_with(text, &ParserLimits::default())
}

/// Identify the dialect of a document under `limits`.
///
/// Input that the parsers would refuse (empty, oversized, too many nodes or
/// carrying a DTD) has no dialect.
pub fn detect_dialect_with(text: &str, limits: &ParserLimits) -> Option<Dialect> {
    check_input(text, limits).ok()?;
    let doc = Document::parse_with_options(text, limits.xml_options()).ok()?;
    root_dialect(doc.root_element())
}

/// Parse a document of either dialect, reading the XML tree once.
pub fn try_parse_document(
    text: &str,
    limits: &ParserLimits,
) -> Result<ParsedDocument, ParseFailure> {
    check_input(text, limits)?;
    let doc = Document::parse_with_options(text, limits.xml_options())?;
    let root = doc.root_element();
    match root_dialect(root) {
        Some(Dialect::PlcOpen) => {
            plcopen::parse_project_root(root, limits).map(ParsedDocument::PlcOpen)
        }
        Some(Dialect::Fbt) => fbt::parse_fbt_root(root).map(ParsedDocument::Fbt),
        None => Err(ParseFailure::UnknownDialect {
            found: root.tag_name().name().to_string(),
        }),
    }
}

/// Parse a PLCopen project with default limits.
///
/// Returns `None` for empty input, malformed XML or a root other than
/// `<project>`. Missing optional data is defaulted, never an error.
pub fn parse_plcopen_project(text: &str) -> Option<PlcopenProject> {
    parse_plcopen_project_with(text, &ParserLimits::default())
}

pub fn parse_plcopen_project_with(text: &str, limits: &ParserLimits) -> Option<PlcopenProject> {
    fail_soft(Dialect::PlcOpen, || try_parse_plcopen_project(text, limits))
}

pub fn try_parse_plcopen_project(
    text: &str,
    limits: &ParserLimits,
) -> Result<PlcopenProject, ParseFailure> {
    check_input(text, limits)?;
    plcopen::parse_project_document(text, limits)
}

/// Parse an IEC 61499 Basic FB with default limits.
///
/// Returns `None` for empty input, malformed XML, a root other than
/// `<FBType>`, or an `<FBType>` without `<BasicFB>`.
pub fn parse_fbt_basic_fb(text: &str) -> Option<FbtBasicFb> {
    parse_fbt_basic_fb_with(text, &ParserLimits::default())
}

pub fn parse_fbt_basic_fb_with(text: &str, limits: &ParserLimits) -> Option<FbtBasicFb> {
    fail_soft(Dialect::Fbt, || try_parse_fbt_basic_fb(text, limits))
}

pub fn try_parse_fbt_basic_fb(
    text: &str,
    limits: &ParserLimits,
) -> Result<FbtBasicFb, ParseFailure> {
    check_input(text, limits)?;
    fbt::parse_fbt_document(text, limits)
}

fn check_input(text: &str, limits: &ParserLimits) -> Result<(), ParseFailure> {
    if text.trim().is_empty() {
        return Err(ParseFailure::Empty);
    }
    if text.len() > limits.max_input_bytes {
        return Err(ParseFailure::InputTooLarge {
            size: text.len(),
            limit: limits.max_input_bytes,
        });
    }
    Ok(())
}

/// Run a parse, turning failures and panics into `None` plus a diagnostic.
fn fail_soft<T>(dialect: Dialect, parse: impl FnOnce() -> Result<T, ParseFailure>) -> Option<T> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(parse))
        .unwrap_or_else(|payload| Err(ParseFailure::Internal(panic_message(payload.as_ref()))));
    match outcome {
        Ok(model) => Some(model),
        Err(ParseFailure::Empty) => None,
        Err(err) => {
            warn!(dialect = %dialect, error = %err, "document did not parse");
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during traversal".to_string()
    }
}
