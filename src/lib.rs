//! PLCopen TC6 XML and IEC 61499 Basic FB parsing.
//!
//! This crate reads PLCopen projects and `.fbt` Basic Function Blocks into
//! plain serde-friendly models, and writes PLCopen projects back to XML.
//! The parsers are fail-soft: the public entry points return `None` rather
//! than an error when a document cannot be used.
//!
//! The binary `plcforge` parses files to JSON, regenerates PLCopen XML and
//! summarizes whole directories.

pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod parser;
pub mod scan;

pub use config::ParserLimits;
pub use error::ParseFailure;
pub use generator::serialize_plcopen_project;
pub use parser::{
    Dialect, ParsedDocument, detect_dialect, detect_dialect_with, parse_fbt_basic_fb,
    parse_fbt_basic_fb_with, parse_plcopen_project, parse_plcopen_project_with,
    try_parse_document, try_parse_fbt_basic_fb, try_parse_plcopen_project,
};
