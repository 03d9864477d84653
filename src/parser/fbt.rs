//! IEC 61499 `.fbt` Basic Function Block parsing.
//!
//! Only the Basic FB execution model is supported. Composite and service FB
//! types have no `<BasicFB>` child and are rejected so the editor can fall
//! back to raw XML.

use super::helpers::*;
use crate::config::ParserLimits;
use crate::error::ParseFailure;
use crate::model::*;
use indexmap::{IndexMap, IndexSet};
use roxmltree::{Document, Node};
use tracing::debug;

pub(crate) fn parse_fbt_document(
    text: &str,
    limits: &ParserLimits,
) -> Result<FbtBasicFb, ParseFailure> {
    let doc = Document::parse_with_options(text, limits.xml_options())?;
    parse_fbt_root(doc.root_element())
}

pub(crate) fn parse_fbt_root(root: Node) -> Result<FbtBasicFb, ParseFailure> {
    if !root.has_tag_name("FBType") {
        return Err(ParseFailure::MissingRoot {
            expected: "FBType",
            found: root.tag_name().name().to_string(),
        });
    }
    let basic = child(root, "BasicFB").ok_or(ParseFailure::NotBasicFb)?;
    Ok(parse_basic_fb(root, basic))
}

fn parse_basic_fb(root: Node, basic: Node) -> FbtBasicFb {
    let version_info = child(root, "VersionInfo");
    let interface = child(root, "InterfaceList");

    // Pass 1: data variables, indexed by name so events can link back.
    let mut vars = Vec::new();
    if let Some(iface) = interface {
        vars.extend(var_declarations(iface, "InputVars", FbtDirection::Input));
        vars.extend(var_declarations(iface, "OutputVars", FbtDirection::Output));
    }
    let mut var_index: IndexMap<String, usize> = IndexMap::new();
    for (i, v) in vars.iter().enumerate() {
        var_index.entry(v.name.clone()).or_insert(i);
    }

    // Pass 2: events, filling the reverse `used_by_events` lists.
    let mut events = Vec::new();
    if let Some(iface) = interface {
        events.extend(event_declarations(iface, "EventInputs", FbtDirection::Input));
        events.extend(event_declarations(iface, "EventOutputs", FbtDirection::Output));
    }
    for event in &events {
        for var_name in &event.associated_vars {
            match var_index.get(var_name) {
                Some(&i) => {
                    let used = &mut vars[i].used_by_events;
                    if !used.contains(&event.name) {
                        used.push(event.name.clone());
                    }
                }
                None => debug!(
                    event = %event.name,
                    var = %var_name,
                    "event references unknown data variable"
                ),
            }
        }
    }

    let internal_vars = var_declarations(basic, "InternalVars", FbtDirection::Internal);
    let ecc = child(basic, "ECC")
        .map(parse_ecc)
        .filter(|ecc| !(ecc.states.is_empty() && ecc.transitions.is_empty()));
    let mut algorithms: Vec<FbtAlgorithm> = children_named(basic, "Algorithm")
        .filter_map(parse_algorithm)
        .collect();
    if let Some(ecc) = &ecc {
        annotate_algorithm_usage(&mut algorithms, &ecc.states);
    }

    debug!(
        name = root.attribute("Name").unwrap_or(""),
        events = events.len(),
        vars = vars.len(),
        algorithms = algorithms.len(),
        "parsed Basic FB"
    );

    FbtBasicFb {
        name: root.attribute("Name").unwrap_or("").to_string(),
        comment: attr(root, "Comment"),
        namespace: attr(root, "Namespace"),
        guid: attr(root, "GUID"),
        version: version_info.and_then(|v| attr(v, "Version")),
        author: version_info.and_then(|v| attr(v, "Author")),
        date: version_info.and_then(|v| attr(v, "Date")),
        events,
        vars,
        internal_vars,
        ecc,
        algorithms,
    }
}

fn var_declarations(parent: Node, section: &str, direction: FbtDirection) -> Vec<FbtVar> {
    let Some(list) = child(parent, section) else {
        return Vec::new();
    };
    children_named(list, "VarDeclaration")
        .filter_map(|v| {
            let Some(name) = attr(v, "Name") else {
                debug!(section, "skipping VarDeclaration without Name");
                return None;
            };
            Some(FbtVar {
                name,
                direction,
                var_type: attr(v, "Type"),
                array_size: attr(v, "ArraySize"),
                initial_value: attr(v, "InitialValue"),
                comment: attr(v, "Comment"),
                used_by_events: Vec::new(),
            })
        })
        .collect()
}

fn event_declarations(parent: Node, section: &str, direction: FbtDirection) -> Vec<FbtEvent> {
    let Some(list) = child(parent, section) else {
        return Vec::new();
    };
    children_named(list, "Event")
        .filter_map(|e| {
            let Some(name) = attr(e, "Name") else {
                debug!(section, "skipping Event without Name");
                return None;
            };
            Some(FbtEvent {
                name,
                direction,
                event_type: attr(e, "Type"),
                comment: attr(e, "Comment"),
                associated_vars: children_named(e, "With")
                    .filter_map(|w| attr(w, "Var"))
                    .collect(),
            })
        })
        .collect()
}

fn parse_ecc(ecc: Node) -> FbtEcc {
    let states = children_named(ecc, "ECState")
        .filter_map(|s| {
            let name = attr(s, "Name")?;
            Some(FbtEccState {
                name,
                comment: attr(s, "Comment"),
                x: attr_f64(s, "x"),
                y: attr_f64(s, "y"),
                actions: children_named(s, "ECAction")
                    .map(|a| FbtEccAction {
                        algorithm: attr(a, "Algorithm"),
                        output: attr(a, "Output"),
                    })
                    .collect(),
            })
        })
        .collect();
    let transitions = children_named(ecc, "ECTransition")
        .filter_map(|t| {
            let (Some(source), Some(destination)) = (attr(t, "Source"), attr(t, "Destination"))
            else {
                debug!("skipping ECTransition without Source/Destination");
                return None;
            };
            Some(FbtEccTransition {
                source,
                destination,
                condition: t.attribute("Condition").unwrap_or("").to_string(),
                comment: attr(t, "Comment"),
                x: attr_f64(t, "x"),
                y: attr_f64(t, "y"),
            })
        })
        .collect();
    FbtEcc {
        states,
        transitions,
    }
}

fn parse_algorithm(node: Node) -> Option<FbtAlgorithm> {
    let name = attr(node, "Name")?;
    let (language, body) = match child(node, "ST") {
        Some(st) => {
            let body = st
                .attribute("Text")
                .map(|t| t.replace("\r\n", "\n"))
                .or_else(|| normalized_text(st))
                .unwrap_or_default();
            (FbtAlgorithmLanguage::St, body)
        }
        None => (FbtAlgorithmLanguage::Unknown, String::new()),
    };
    Some(FbtAlgorithm {
        name,
        comment: attr(node, "Comment"),
        language,
        body,
        used_in_states: None,
    })
}

/// Fill `used_in_states` from the ECC actions. Left unset unless the block
/// has both algorithms and states.
fn annotate_algorithm_usage(algorithms: &mut [FbtAlgorithm], states: &[FbtEccState]) {
    if algorithms.is_empty() || states.is_empty() {
        return;
    }
    let mut usage: IndexMap<&str, IndexSet<&str>> = IndexMap::new();
    for state in states {
        for action in &state.actions {
            if let Some(alg) = action.algorithm.as_deref() {
                usage.entry(alg).or_default().insert(state.name.as_str());
            }
        }
    }
    for alg in algorithms.iter_mut() {
        let users = usage
            .get(alg.name.as_str())
            .map(|s| s.iter().map(|n| n.to_string()).collect())
            .unwrap_or_default();
        alg.used_in_states = Some(users);
    }
}
