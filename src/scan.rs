//! Directory scan: find PLCopen and `.fbt` documents under a root and
//! summarize what each one parses to.

use crate::config::ParserLimits;
use crate::parser::{ParsedDocument, try_parse_document};
use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};
use walkdir::WalkDir;

const SCANNED_EXTENSIONS: [&str; 2] = ["xml", "fbt"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum ScanSummary {
    PlcOpen {
        pous: usize,
        data_types: usize,
        configurations: usize,
    },
    Fbt {
        name: String,
        events: usize,
        vars: usize,
        states: usize,
        algorithms: usize,
    },
    Unparsed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEntry {
    pub path: Utf8PathBuf,
    pub summary: ScanSummary,
}

impl ScanEntry {
    pub fn is_parsed(&self) -> bool {
        !matches!(self.summary, ScanSummary::Unparsed { .. })
    }
}

impl fmt::Display for ScanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.summary {
            ScanSummary::PlcOpen {
                pous,
                data_types,
                configurations,
            } => write!(
                f,
                "{}\tPLCopen\tpous={} dataTypes={} configurations={}",
                self.path, pous, data_types, configurations
            ),
            ScanSummary::Fbt {
                name,
                events,
                vars,
                states,
                algorithms,
            } => write!(
                f,
                "{}\tFBT\t{} events={} vars={} states={} algorithms={}",
                self.path, name, events, vars, states, algorithms
            ),
            ScanSummary::Unparsed { reason } => {
                write!(f, "{}\tunparsed\t{}", self.path, reason)
            }
        }
    }
}

/// Walk `root` for `*.xml` / `*.fbt` files and parse them in parallel.
/// Entries come back sorted by path. Unreadable directories are skipped.
pub fn scan_directory(root: &Utf8Path, limits: &ParserLimits) -> Vec<ScanEntry> {
    let mut paths: Vec<Utf8PathBuf> = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            debug!("skipping non UTF-8 path");
            continue;
        };
        let matches = path.extension().is_some_and(|ext| {
            SCANNED_EXTENSIONS
                .iter()
                .any(|want| ext.eq_ignore_ascii_case(want))
        });
        if matches {
            paths.push(path);
        }
    }
    paths.sort();

    let entries: Vec<ScanEntry> = paths
        .par_iter()
        .map(|p| ScanEntry {
            path: p.clone(),
            summary: summarize_file(p, limits),
        })
        .collect();

    info!(
        root = %root,
        files = entries.len(),
        parsed = entries.iter().filter(|e| e.is_parsed()).count(),
        "scan finished"
    );
    entries
}

fn summarize_file(path: &Utf8Path, limits: &ParserLimits) -> ScanSummary {
    let text = match std::fs::read_to_string(path.as_std_path()) {
        Ok(t) => t,
        Err(e) => {
            return ScanSummary::Unparsed {
                reason: format!("read failed: {}", e),
            };
        }
    };
    summarize_text(&text, limits)
}

/// Summarize a document given as text. Failures carry the parser's reason.
pub fn summarize_text(text: &str, limits: &ParserLimits) -> ScanSummary {
    match try_parse_document(text, limits) {
        Ok(ParsedDocument::PlcOpen(project)) => ScanSummary::PlcOpen {
            pous: project.pous.len(),
            data_types: project.data_types.len(),
            configurations: project.configurations.len(),
        },
        Ok(ParsedDocument::Fbt(fb)) => ScanSummary::Fbt {
            events: fb.events.len(),
            vars: fb.vars.len(),
            states: fb.ecc.as_ref().map_or(0, |ecc| ecc.states.len()),
            algorithms: fb.algorithms.len(),
            name: fb.name,
        },
        Err(e) => ScanSummary::Unparsed {
            reason: e.to_string(),
        },
    }
}
