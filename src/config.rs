//! Parser limits.
//!
//! Parsing is a pure function of the input text; these bounds only make it
//! fail closed on pathological input instead of growing without limit.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_INPUT_BYTES: usize = 64 * 1024 * 1024;
pub const DEFAULT_MAX_TYPE_DEPTH: usize = 32;
pub const DEFAULT_MAX_XML_NODES: u32 = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserLimits {
    /// Inputs longer than this (in bytes) are rejected before XML parsing.
    pub max_input_bytes: usize,
    /// Maximum nesting of `<array>` / `<baseType>` in a type expression.
    pub max_type_depth: usize,
    /// Passed to roxmltree as its node limit.
    pub max_xml_nodes: u32,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_type_depth: DEFAULT_MAX_TYPE_DEPTH,
            max_xml_nodes: DEFAULT_MAX_XML_NODES,
        }
    }
}

impl ParserLimits {
    /// Load limits from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path.as_std_path())
            .with_context(|| format!("Failed to read limits file {}", path))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse limits file {}", path))
    }

    pub(crate) fn xml_options(&self) -> roxmltree::ParsingOptions {
        let mut opts = roxmltree::ParsingOptions::default();
        opts.allow_dtd = false;
        opts.nodes_limit = self.max_xml_nodes;
        opts
    }
}
