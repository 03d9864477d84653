//! POU body parsing: ST, IL, LD, FBD and SFC.

use super::helpers::*;
use crate::model::*;
use roxmltree::Node;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const DEFAULT_STEP_NAME: &str = "UnnamedStep";
pub const DEFAULT_ACTION_NAME: &str = "UnnamedAction";

/// Collect every `<body>` of a POU. Each representation is independently
/// absent when its container tag is missing.
pub(crate) fn parse_pou_body(pou: Node) -> PlcopenPouBody {
    let mut body = PlcopenPouBody::default();
    for b in children_named(pou, "body") {
        for lang in elements(b) {
            match lang.tag_name().name() {
                "ST" => {
                    if body.st.is_none() {
                        body.st = normalized_text(lang).map(|code| PlcopenStBody { code });
                    }
                }
                "IL" => {
                    if body.il.is_none() {
                        body.il = normalized_text(lang).map(|code| PlcopenIlBody { code });
                    }
                }
                "LD" => body.ld.extend(parse_ld(lang)),
                "FBD" => body.fbd.extend(parse_fbd(lang)),
                "SFC" => {
                    if body.sfc.is_none() {
                        body.sfc = Some(parse_sfc(lang, pou));
                    }
                }
                "documentation" => {}
                other => debug!(tag = other, "ignoring unsupported body language"),
            }
        }
    }
    body
}

/// `<network>` children of an LD/FBD container, or the container itself when
/// it holds its elements directly.
fn network_nodes<'a, 'input>(container: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    let networks: Vec<_> = children_named(container, "network").collect();
    if networks.is_empty() && elements(container).next().is_some() {
        vec![container]
    } else {
        networks
    }
}

fn network_comment(net: Node) -> Option<String> {
    children_named(net, "comment").find_map(normalized_text)
}

// ────────────────────────────────────────────────────────────────────────────
// LD
// ────────────────────────────────────────────────────────────────────────────

/// Each network becomes one network holding exactly one rung.
fn parse_ld(container: Node) -> Vec<PlcopenLdNetwork> {
    network_nodes(container)
        .into_iter()
        .map(|net| {
            let elements = elements(net)
                .filter(|c| !c.has_tag_name("comment"))
                .map(parse_ld_element)
                .collect();
            PlcopenLdNetwork {
                comment: network_comment(net),
                rungs: vec![PlcopenLdRung { elements }],
            }
        })
        .collect()
}

fn parse_ld_element(node: Node) -> PlcopenLdElement {
    PlcopenLdElement {
        element_type: node.tag_name().name().to_string(),
        local_id: local_id(node),
        variable: child(node, "variable").and_then(normalized_text),
        expression: child(node, "expression").and_then(normalized_text),
        negated: attr_is_true(node, "negated"),
        position: position(node),
        ref_local_ids: incoming_refs(node),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FBD
// ────────────────────────────────────────────────────────────────────────────

fn parse_fbd(container: Node) -> Vec<PlcopenFbdNetwork> {
    network_nodes(container)
        .into_iter()
        .map(parse_fbd_network)
        .collect()
}

fn parse_fbd_network(net: Node) -> PlcopenFbdNetwork {
    let mut network = PlcopenFbdNetwork {
        comment: network_comment(net),
        ..Default::default()
    };
    for el in elements(net) {
        let tag = el.tag_name().name();
        if tag == "block" {
            let block_id = local_id(el);
            for wrapper in ["inputVariables", "inOutVariables"] {
                if let Some(w) = child(el, wrapper) {
                    for pin in children_named(w, "variable") {
                        if let Some(param) = attr(pin, "formalParameter") {
                            push_connections(&mut network.connections, pin, &param, block_id);
                        }
                    }
                }
            }
            network.blocks.push(PlcopenFbdBlock {
                type_name: attr(el, "typeName")
                    .or_else(|| attr(el, "type"))
                    .unwrap_or_default(),
                instance_name: attr(el, "instanceName"),
                local_id: block_id,
                position: position(el),
                inputs: pin_names(el, "inputVariables"),
                outputs: pin_names(el, "outputVariables"),
                in_outs: pin_names(el, "inOutVariables"),
            });
        } else if let Some(role) = FbdVariableRole::from_tag(tag) {
            let expression = child(el, "expression")
                .and_then(normalized_text)
                .unwrap_or_default();
            let var_id = local_id(el);
            if role != FbdVariableRole::In {
                push_connections(&mut network.connections, el, &expression, var_id);
            }
            network.variables.push(PlcopenFbdVariable {
                role,
                expression,
                local_id: var_id,
                negated: attr_is_true(el, "negated"),
                position: position(el),
            });
        } else if tag != "comment" {
            debug!(tag, "ignoring FBD element");
        }
    }
    network
}

fn pin_names(block: Node, wrapper: &str) -> Vec<String> {
    child(block, wrapper)
        .map(|w| {
            children_named(w, "variable")
                .filter_map(|v| attr(v, "formalParameter"))
                .collect()
        })
        .unwrap_or_default()
}

fn push_connections(
    out: &mut Vec<PlcopenFbdConnection>,
    pin: Node,
    formal_parameter: &str,
    target_local_id: Option<u32>,
) {
    for conn in incoming_connections(pin) {
        let Some(ref_local_id) = conn
            .attribute("refLocalId")
            .and_then(|s| s.trim().parse::<u32>().ok())
        else {
            continue;
        };
        out.push(PlcopenFbdConnection {
            ref_local_id,
            formal_parameter: formal_parameter.to_string(),
            target_local_id,
            source_parameter: attr(conn, "formalParameter"),
        });
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SFC
// ────────────────────────────────────────────────────────────────────────────

enum SfcNode {
    Step(usize),
    Transition(usize),
    /// Divergence/convergence; holds its own incoming refs.
    Junction(Vec<u32>),
}

#[derive(Default)]
struct SfcGraph {
    nodes: BTreeMap<u32, SfcNode>,
}

impl SfcGraph {
    /// Walk `refs` upstream through junctions, collecting the steps and
    /// transitions reached.
    fn upstream(&self, refs: &[u32]) -> (Vec<usize>, Vec<usize>) {
        let mut steps = Vec::new();
        let mut transitions = Vec::new();
        let mut visited = BTreeSet::new();
        let mut stack: Vec<u32> = refs.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            match self.nodes.get(&id) {
                Some(SfcNode::Step(i)) => steps.push(*i),
                Some(SfcNode::Transition(i)) => transitions.push(*i),
                Some(SfcNode::Junction(inputs)) => {
                    if visited.insert(id) {
                        stack.extend(inputs.iter().rev().copied());
                    }
                }
                None => debug!(ref_local_id = id, "dangling SFC connection"),
            }
        }
        (steps, transitions)
    }
}

fn parse_sfc(sfc: Node, pou: Node) -> PlcopenSfcNetwork {
    let mut network = PlcopenSfcNetwork::default();
    let mut graph = SfcGraph::default();
    let mut transition_inputs: Vec<Vec<u32>> = Vec::new();
    // Steps and jump targets in document order, with their incoming refs.
    let mut targets: Vec<(String, Vec<u32>)> = Vec::new();
    let mut action_blocks: Vec<(Vec<u32>, Vec<String>)> = Vec::new();

    for el in elements(sfc) {
        let id = local_id(el);
        match el.tag_name().name() {
            "step" => {
                let step = PlcopenSfcStep {
                    name: attr_or(el, "name", DEFAULT_STEP_NAME),
                    initial: attr_is_true(el, "initialStep"),
                    actions: Vec::new(),
                    local_id: id,
                    position: position(el),
                };
                if let Some(id) = id {
                    graph.nodes.insert(id, SfcNode::Step(network.steps.len()));
                }
                targets.push((step.name.clone(), incoming_refs(el)));
                network.steps.push(step);
            }
            "jumpStep" => {
                if let Some(target) = attr(el, "targetName") {
                    targets.push((target, incoming_refs(el)));
                }
            }
            "transition" => {
                if let Some(id) = id {
                    graph
                        .nodes
                        .insert(id, SfcNode::Transition(network.transitions.len()));
                }
                transition_inputs.push(incoming_refs(el));
                network.transitions.push(PlcopenSfcTransition {
                    from: Vec::new(),
                    to: Vec::new(),
                    condition: child(el, "condition").and_then(condition_code),
                    local_id: id,
                });
            }
            "selectionDivergence"
            | "selectionConvergence"
            | "simultaneousDivergence"
            | "simultaneousConvergence" => {
                if let Some(id) = id {
                    graph.nodes.insert(id, SfcNode::Junction(incoming_refs(el)));
                }
            }
            "actionBlock" => {
                let names = children_named(el, "action")
                    .filter_map(|a| child(a, "reference").and_then(|r| attr(r, "name")))
                    .collect();
                action_blocks.push((incoming_refs(el), names));
            }
            "action" | "comment" => {}
            other => debug!(tag = other, "ignoring SFC element"),
        }
    }

    let step_names: Vec<String> = network.steps.iter().map(|s| s.name.clone()).collect();
    for (transition, inputs) in network.transitions.iter_mut().zip(&transition_inputs) {
        let (steps, _) = graph.upstream(inputs);
        transition.from = steps.into_iter().map(|i| step_names[i].clone()).collect();
    }
    for (name, inputs) in &targets {
        let (_, transitions) = graph.upstream(inputs);
        for i in transitions {
            let to = &mut network.transitions[i].to;
            if !to.contains(name) {
                to.push(name.clone());
            }
        }
    }
    for (refs, names) in action_blocks {
        let (steps, _) = graph.upstream(&refs);
        for i in steps {
            network.steps[i].actions.extend(names.iter().cloned());
        }
    }

    network.actions = parse_sfc_actions(sfc, pou);
    network
}

fn condition_code(cond: Node) -> Option<String> {
    cond.descendants()
        .find(|n| n.is_element() && n.has_tag_name("ST"))
        .and_then(normalized_text)
}

/// Actions live in `pou/actions`; some writers nest them in the SFC instead.
fn parse_sfc_actions(sfc: Node, pou: Node) -> Vec<PlcopenSfcAction> {
    let parse_action = |a: Node| PlcopenSfcAction {
        name: attr_or(a, "name", DEFAULT_ACTION_NAME),
        body: child_path(a, &["body", "ST"]).and_then(normalized_text),
    };
    let declared: Vec<_> = children_named(pou, "actions")
        .flat_map(|list| children_named(list, "action"))
        .map(parse_action)
        .collect();
    if !declared.is_empty() {
        return declared;
    }
    children_named(sfc, "action").map(parse_action).collect()
}
