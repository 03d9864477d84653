//! Generate PLCopen TC6 XML text from a [`PlcopenProject`] model.
//!
//! The output is schema-ordered with 2-space indentation. It is not meant to
//! byte-match hand-authored files: optional attributes that are absent or
//! empty in the model are not written, and body graphs are re-wired from the
//! model's flat lists.

use crate::model::*;
use crate::parser::type_expr::TypeExpr;
use std::borrow::Cow;
use std::collections::BTreeSet;
use tracing::debug;

pub const PLCOPEN_NAMESPACE: &str = "http://www.plcopen.org/xml/tc6_0201";
const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Serialize a project. Total over any model value; cross-references such as
/// SFC step names are written as given, without validation.
pub fn serialize_plcopen_project(project: &PlcopenProject) -> String {
    let mut out = String::with_capacity(8192);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!("<project xmlns=\"{}\">\n", PLCOPEN_NAMESPACE));
    write_file_header(&mut out, project, 1);
    write_content_header(&mut out, project, 1);

    indent(&mut out, 1);
    out.push_str("<types>\n");
    write_list(&mut out, "dataTypes", &project.data_types, 2, write_data_type);
    write_list(&mut out, "pous", &project.pous, 2, write_pou);
    indent(&mut out, 1);
    out.push_str("</types>\n");

    indent(&mut out, 1);
    out.push_str("<instances>\n");
    write_list(&mut out, "configurations", &project.configurations, 2, write_configuration);
    indent(&mut out, 1);
    out.push_str("</instances>\n");

    out.push_str("</project>\n");
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Low-level writers
// ────────────────────────────────────────────────────────────────────────────

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn xml_escape(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}

/// Like [`xml_escape`] but also encodes line breaks, which attribute value
/// normalization would otherwise turn into spaces.
fn xml_escape_attr(s: &str) -> String {
    xml_escape(s).replace('\n', "&#xA;").replace('\r', "&#xD;")
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push_str(&format!(" {}=\"{}\"", name, xml_escape_attr(value)));
}

/// Write the attribute only when the value is present and non-empty.
fn push_opt_attr(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        push_attr(out, name, v);
    }
}

/// `<tag>` wrapper around a list, self-closing when the list is empty.
fn write_list<T>(
    out: &mut String,
    tag: &str,
    items: &[T],
    level: usize,
    write_item: fn(&mut String, &T, usize),
) {
    indent(out, level);
    if items.is_empty() {
        out.push_str(&format!("<{}/>\n", tag));
        return;
    }
    out.push_str(&format!("<{}>\n", tag));
    for item in items {
        write_item(out, item, level + 1);
    }
    indent(out, level);
    out.push_str(&format!("</{}>\n", tag));
}

/// `<xhtml>` text block used for ST/IL code, comments and documentation.
fn write_xhtml(out: &mut String, text: &str, level: usize) {
    indent(out, level);
    if text.is_empty() {
        out.push_str(&format!("<xhtml xmlns=\"{}\"/>\n", XHTML_NAMESPACE));
    } else {
        out.push_str(&format!(
            "<xhtml xmlns=\"{}\">{}</xhtml>\n",
            XHTML_NAMESPACE,
            xml_escape(text)
        ));
    }
}

fn write_text_block(out: &mut String, tag: &str, text: &str, level: usize) {
    indent(out, level);
    out.push_str(&format!("<{}>\n", tag));
    write_xhtml(out, text, level + 1);
    indent(out, level);
    out.push_str(&format!("</{}>\n", tag));
}

fn write_documentation(out: &mut String, comment: Option<&str>, level: usize) {
    if let Some(text) = comment.filter(|c| !c.is_empty()) {
        write_text_block(out, "documentation", text, level);
    }
}

fn write_simple_element(out: &mut String, tag: &str, text: &str, level: usize) {
    indent(out, level);
    out.push_str(&format!("<{}>{}</{}>\n", tag, xml_escape(text), tag));
}

fn write_position(out: &mut String, position: Option<&PlcopenPosition>, level: usize) {
    if let Some(p) = position {
        indent(out, level);
        out.push_str(&format!("<position x=\"{}\" y=\"{}\"/>\n", p.x, p.y));
    }
}

/// `<connectionPointIn>` holding `(refLocalId, formalParameter)` connections.
fn write_connection_point_in<'a>(
    out: &mut String,
    connections: impl IntoIterator<Item = (u32, Option<&'a str>)>,
    level: usize,
) {
    let connections: Vec<_> = connections.into_iter().collect();
    if connections.is_empty() {
        return;
    }
    indent(out, level);
    out.push_str("<connectionPointIn>\n");
    for (ref_id, param) in connections {
        indent(out, level + 1);
        out.push_str(&format!("<connection refLocalId=\"{}\"", ref_id));
        push_opt_attr(out, "formalParameter", param);
        out.push_str("/>\n");
    }
    indent(out, level);
    out.push_str("</connectionPointIn>\n");
}

// ────────────────────────────────────────────────────────────────────────────
// Headers
// ────────────────────────────────────────────────────────────────────────────

fn write_file_header(out: &mut String, project: &PlcopenProject, level: usize) {
    indent(out, level);
    out.push_str("<fileHeader");
    push_opt_attr(out, "companyName", project.company_name.as_deref());
    push_opt_attr(out, "productName", project.product_name.as_deref());
    push_opt_attr(out, "productVersion", project.product_version.as_deref());
    push_opt_attr(out, "creationDateTime", project.creation_date_time.as_deref());
    push_opt_attr(out, "copyright", project.copyright.as_deref());
    out.push_str("/>\n");
}

fn write_content_header(out: &mut String, project: &PlcopenProject, level: usize) {
    indent(out, level);
    out.push_str("<contentHeader");
    push_opt_attr(out, "name", project.name.as_deref());
    out.push_str(">\n");
    indent(out, level + 1);
    out.push_str("<coordinateInfo>\n");
    for lang in ["fbd", "ld", "sfc"] {
        indent(out, level + 2);
        out.push_str(&format!("<{}><scaling x=\"1\" y=\"1\"/></{}>\n", lang, lang));
    }
    indent(out, level + 1);
    out.push_str("</coordinateInfo>\n");
    indent(out, level);
    out.push_str("</contentHeader>\n");
}

// ────────────────────────────────────────────────────────────────────────────
// Types and variables
// ────────────────────────────────────────────────────────────────────────────

/// Structural inverse of the type resolver: arrays become nested
/// `<array>`/`<baseType>`, everything else a `<derived>` reference.
fn write_type_expr(out: &mut String, expr: &TypeExpr, level: usize) {
    indent(out, level);
    match expr {
        TypeExpr::Named(name) => {
            out.push_str("<derived");
            push_attr(out, "name", name);
            out.push_str("/>\n");
        }
        TypeExpr::Array { dimensions, base } => {
            out.push_str("<array>\n");
            for d in dimensions {
                indent(out, level + 1);
                out.push_str("<dimension");
                push_attr(out, "lower", &d.lower);
                push_attr(out, "upper", &d.upper);
                out.push_str("/>\n");
            }
            indent(out, level + 1);
            out.push_str("<baseType>\n");
            write_type_expr(out, base, level + 2);
            indent(out, level + 1);
            out.push_str("</baseType>\n");
            indent(out, level);
            out.push_str("</array>\n");
        }
    }
}

fn write_typed(out: &mut String, tag: &str, type_text: &str, level: usize) {
    indent(out, level);
    out.push_str(&format!("<{}>\n", tag));
    write_type_expr(out, &TypeExpr::parse(type_text), level + 1);
    indent(out, level);
    out.push_str(&format!("</{}>\n", tag));
}

fn write_initial_value(out: &mut String, value: Option<&str>, level: usize) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        indent(out, level);
        out.push_str("<initialValue><simpleValue");
        push_attr(out, "value", v);
        out.push_str("/></initialValue>\n");
    }
}

fn write_variable(out: &mut String, var: &PlcopenVarDeclaration, level: usize) {
    indent(out, level);
    out.push_str("<variable");
    push_attr(out, "name", &var.name);
    push_opt_attr(out, "address", var.address.as_deref());
    out.push_str(">\n");
    write_typed(out, "type", &var.var_type, level + 1);
    write_initial_value(out, var.initial_value.as_deref(), level + 1);
    write_documentation(out, var.comment.as_deref(), level + 1);
    indent(out, level);
    out.push_str("</variable>\n");
}

fn write_var_section(out: &mut String, tag: &str, vars: &[PlcopenVarDeclaration], level: usize) {
    if vars.is_empty() {
        return;
    }
    indent(out, level);
    out.push_str(&format!("<{}>\n", tag));
    for v in vars {
        write_variable(out, v, level + 1);
    }
    indent(out, level);
    out.push_str(&format!("</{}>\n", tag));
}

fn write_data_type(out: &mut String, dt: &PlcopenDataType, level: usize) {
    indent(out, level);
    out.push_str("<dataType");
    push_attr(out, "name", &dt.name);
    out.push_str(">\n");
    indent(out, level + 1);
    out.push_str("<baseType>\n");
    if dt.base_type.eq_ignore_ascii_case("STRUCT") {
        indent(out, level + 2);
        if dt.members.is_empty() {
            out.push_str("<struct/>\n");
        } else {
            out.push_str("<struct>\n");
            for m in &dt.members {
                write_variable(out, m, level + 3);
            }
            indent(out, level + 2);
            out.push_str("</struct>\n");
        }
    } else if dt.base_type.eq_ignore_ascii_case("ENUM") {
        indent(out, level + 2);
        out.push_str("<enum>\n");
        indent(out, level + 3);
        out.push_str("<values>\n");
        for v in &dt.enum_values {
            indent(out, level + 4);
            out.push_str("<value");
            push_attr(out, "name", v);
            out.push_str("/>\n");
        }
        indent(out, level + 3);
        out.push_str("</values>\n");
        indent(out, level + 2);
        out.push_str("</enum>\n");
    } else {
        write_type_expr(out, &TypeExpr::parse(&dt.base_type), level + 2);
    }
    indent(out, level + 1);
    out.push_str("</baseType>\n");
    write_initial_value(out, dt.initial_value.as_deref(), level + 1);
    write_documentation(out, dt.comment.as_deref(), level + 1);
    indent(out, level);
    out.push_str("</dataType>\n");
}

// ────────────────────────────────────────────────────────────────────────────
// POUs
// ────────────────────────────────────────────────────────────────────────────

fn write_pou(out: &mut String, pou: &PlcopenPou, level: usize) {
    indent(out, level);
    out.push_str("<pou");
    push_attr(out, "name", &pou.name);
    push_opt_attr(out, "pouType", pou.pou_type.as_attr());
    out.push_str(">\n");

    write_interface(out, &pou.interface, level + 1);
    if let Some(sfc) = &pou.body.sfc {
        if !sfc.actions.is_empty() {
            write_sfc_actions(out, &sfc.actions, level + 1);
        }
    }
    write_body(out, &pou.body, level + 1);
    write_documentation(out, pou.comment.as_deref(), level + 1);

    indent(out, level);
    out.push_str("</pou>\n");
}

fn write_interface(out: &mut String, iface: &PlcopenPouInterface, level: usize) {
    let has_vars = VarSection::ALL
        .iter()
        .any(|s| !iface.section(*s).is_empty());
    if !has_vars && iface.return_type.is_none() {
        return;
    }
    indent(out, level);
    out.push_str("<interface>\n");
    if let Some(rt) = &iface.return_type {
        write_typed(out, "returnType", rt, level + 1);
    }
    for section in VarSection::ALL {
        write_var_section(out, section.tag(), iface.section(section), level + 1);
    }
    indent(out, level);
    out.push_str("</interface>\n");
}

fn write_body(out: &mut String, body: &PlcopenPouBody, level: usize) {
    let empty = body.st.is_none()
        && body.il.is_none()
        && body.sfc.is_none()
        && body.ld.is_empty()
        && body.fbd.is_empty();
    if empty {
        return;
    }
    indent(out, level);
    out.push_str("<body>\n");
    if let Some(st) = &body.st {
        write_text_block(out, "ST", &st.code, level + 1);
    }
    if let Some(il) = &body.il {
        write_text_block(out, "IL", &il.code, level + 1);
    }
    if !body.ld.is_empty() {
        indent(out, level + 1);
        out.push_str("<LD>\n");
        for network in &body.ld {
            write_ld_network(out, network, level + 2);
        }
        indent(out, level + 1);
        out.push_str("</LD>\n");
    }
    if !body.fbd.is_empty() {
        indent(out, level + 1);
        out.push_str("<FBD>\n");
        for network in &body.fbd {
            write_fbd_network(out, network, level + 2);
        }
        indent(out, level + 1);
        out.push_str("</FBD>\n");
    }
    if let Some(sfc) = &body.sfc {
        write_sfc(out, sfc, level + 1);
    }
    indent(out, level);
    out.push_str("</body>\n");
}

fn write_network_comment(out: &mut String, comment: Option<&str>, level: usize) {
    if let Some(text) = comment.filter(|c| !c.is_empty()) {
        indent(out, level);
        out.push_str("<comment>\n");
        write_text_block(out, "content", text, level + 1);
        indent(out, level);
        out.push_str("</comment>\n");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LD
// ────────────────────────────────────────────────────────────────────────────

/// One `<network>` per rung; the network comment goes on the first.
fn write_ld_network(out: &mut String, network: &PlcopenLdNetwork, level: usize) {
    let empty = [PlcopenLdRung::default()];
    let rungs: &[PlcopenLdRung] = if network.rungs.is_empty() {
        &empty
    } else {
        &network.rungs
    };
    for (i, rung) in rungs.iter().enumerate() {
        indent(out, level);
        out.push_str("<network>\n");
        if i == 0 {
            write_network_comment(out, network.comment.as_deref(), level + 1);
        }
        for element in &rung.elements {
            write_ld_element(out, element, level + 1);
        }
        indent(out, level);
        out.push_str("</network>\n");
    }
}

/// Whether `name` can stand as an unprefixed XML element name.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn write_ld_element(out: &mut String, el: &PlcopenLdElement, level: usize) {
    if !is_xml_name(&el.element_type) {
        debug!(element_type = %el.element_type, "skipping LD element without a usable tag");
        return;
    }
    indent(out, level);
    out.push_str(&format!("<{}", el.element_type));
    if let Some(id) = el.local_id {
        out.push_str(&format!(" localId=\"{}\"", id));
    }
    if el.negated {
        out.push_str(" negated=\"true\"");
    }
    let has_children = el.position.is_some()
        || !el.ref_local_ids.is_empty()
        || el.variable.is_some()
        || el.expression.is_some();
    if !has_children {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");
    write_position(out, el.position.as_ref(), level + 1);
    write_connection_point_in(out, el.ref_local_ids.iter().map(|id| (*id, None)), level + 1);
    if let Some(v) = &el.variable {
        write_simple_element(out, "variable", v, level + 1);
    }
    if let Some(e) = &el.expression {
        write_simple_element(out, "expression", e, level + 1);
    }
    indent(out, level);
    out.push_str(&format!("</{}>\n", el.element_type));
}

// ────────────────────────────────────────────────────────────────────────────
// FBD
// ────────────────────────────────────────────────────────────────────────────

/// Where a connection is written: a block pin or a variable's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinOwner {
    Input(usize),
    InOut(usize),
    Variable(usize),
}

/// Assign every connection to exactly one element: the first block, then
/// variable, whose local id equals the connection target and which has the
/// pin. Connections without a matching element are dropped.
fn connection_owners(network: &PlcopenFbdNetwork) -> Vec<Option<PinOwner>> {
    network
        .connections
        .iter()
        .map(|c| {
            let target = c.target_local_id;
            let pin = c.formal_parameter.as_str();
            let owner = network
                .blocks
                .iter()
                .enumerate()
                .filter(|(_, b)| b.local_id == target)
                .find_map(|(i, b)| {
                    if b.inputs.iter().any(|p| p == pin) {
                        Some(PinOwner::Input(i))
                    } else if b.in_outs.iter().any(|p| p == pin) {
                        Some(PinOwner::InOut(i))
                    } else {
                        None
                    }
                })
                .or_else(|| {
                    network
                        .variables
                        .iter()
                        .position(|v| {
                            v.role != FbdVariableRole::In
                                && v.local_id == target
                                && v.expression == pin
                        })
                        .map(PinOwner::Variable)
                });
            if owner.is_none() {
                debug!(
                    target_local_id = ?target,
                    pin,
                    "dropping FBD connection with no owning element"
                );
            }
            owner
        })
        .collect()
}

/// Connections assigned to `owner` that feed the pin `param`.
fn connections_into<'a>(
    network: &'a PlcopenFbdNetwork,
    owners: &'a [Option<PinOwner>],
    owner: PinOwner,
    param: &'a str,
) -> impl Iterator<Item = (u32, Option<&'a str>)> + 'a {
    network
        .connections
        .iter()
        .zip(owners)
        .filter(move |(c, o)| **o == Some(owner) && c.formal_parameter == param)
        .map(|(c, _)| (c.ref_local_id, c.source_parameter.as_deref()))
}

fn write_fbd_network(out: &mut String, network: &PlcopenFbdNetwork, level: usize) {
    let owners = connection_owners(network);
    indent(out, level);
    out.push_str("<network>\n");
    write_network_comment(out, network.comment.as_deref(), level + 1);
    for (i, block) in network.blocks.iter().enumerate() {
        write_fbd_block(out, network, &owners, i, block, level + 1);
    }
    for (i, var) in network.variables.iter().enumerate() {
        write_fbd_variable(out, network, &owners, i, var, level + 1);
    }
    indent(out, level);
    out.push_str("</network>\n");
}

fn write_fbd_block(
    out: &mut String,
    network: &PlcopenFbdNetwork,
    owners: &[Option<PinOwner>],
    index: usize,
    block: &PlcopenFbdBlock,
    level: usize,
) {
    indent(out, level);
    out.push_str("<block");
    if let Some(id) = block.local_id {
        out.push_str(&format!(" localId=\"{}\"", id));
    }
    push_attr(out, "typeName", &block.type_name);
    push_opt_attr(out, "instanceName", block.instance_name.as_deref());
    out.push_str(">\n");
    write_position(out, block.position.as_ref(), level + 1);

    let pin_groups = [
        ("inputVariables", &block.inputs, Some(PinOwner::Input(index))),
        ("inOutVariables", &block.in_outs, Some(PinOwner::InOut(index))),
        ("outputVariables", &block.outputs, None),
    ];
    for (wrapper, pins, owner) in pin_groups {
        indent(out, level + 1);
        if pins.is_empty() {
            out.push_str(&format!("<{}/>\n", wrapper));
            continue;
        }
        out.push_str(&format!("<{}>\n", wrapper));
        for pin in pins {
            indent(out, level + 2);
            out.push_str("<variable");
            push_attr(out, "formalParameter", pin);
            out.push_str(">\n");
            if let Some(owner) = owner {
                write_connection_point_in(
                    out,
                    connections_into(network, owners, owner, pin),
                    level + 3,
                );
            } else {
                indent(out, level + 3);
                out.push_str("<connectionPointOut/>\n");
            }
            indent(out, level + 2);
            out.push_str("</variable>\n");
        }
        indent(out, level + 1);
        out.push_str(&format!("</{}>\n", wrapper));
    }

    indent(out, level);
    out.push_str("</block>\n");
}

fn write_fbd_variable(
    out: &mut String,
    network: &PlcopenFbdNetwork,
    owners: &[Option<PinOwner>],
    index: usize,
    var: &PlcopenFbdVariable,
    level: usize,
) {
    let tag = var.role.tag();
    indent(out, level);
    out.push_str(&format!("<{}", tag));
    if let Some(id) = var.local_id {
        out.push_str(&format!(" localId=\"{}\"", id));
    }
    if var.negated {
        out.push_str(" negated=\"true\"");
    }
    out.push_str(">\n");
    write_position(out, var.position.as_ref(), level + 1);
    if var.role != FbdVariableRole::In {
        write_connection_point_in(
            out,
            connections_into(network, owners, PinOwner::Variable(index), &var.expression),
            level + 1,
        );
    }
    if var.role != FbdVariableRole::Out {
        indent(out, level + 1);
        out.push_str("<connectionPointOut/>\n");
    }
    write_simple_element(out, "expression", &var.expression, level + 1);
    indent(out, level);
    out.push_str(&format!("</{}>\n", tag));
}

// ────────────────────────────────────────────────────────────────────────────
// SFC
// ────────────────────────────────────────────────────────────────────────────

/// Hands out local ids no step or transition of the model already carries.
///
/// Ids count up from one past the largest taken id; once that passes
/// `u32::MAX` the search restarts at 1 and skips taken ids.
struct IdAllocator {
    taken: BTreeSet<u32>,
    next: u64,
}

impl IdAllocator {
    fn above(sfc: &PlcopenSfcNetwork) -> Self {
        let taken: BTreeSet<u32> = sfc
            .steps
            .iter()
            .filter_map(|s| s.local_id)
            .chain(sfc.transitions.iter().filter_map(|t| t.local_id))
            .collect();
        let next = taken.last().map_or(1, |max| u64::from(*max) + 1);
        Self { taken, next }
    }

    fn next_id(&mut self) -> u32 {
        loop {
            let Ok(candidate) = u32::try_from(self.next) else {
                self.next = 1;
                continue;
            };
            self.next += 1;
            if self.taken.insert(candidate) {
                return candidate;
            }
        }
    }
}

fn write_sfc(out: &mut String, sfc: &PlcopenSfcNetwork, level: usize) {
    let mut ids = IdAllocator::above(sfc);
    let step_ids: Vec<u32> = sfc
        .steps
        .iter()
        .map(|s| s.local_id.unwrap_or_else(|| ids.next_id()))
        .collect();
    let transition_ids: Vec<u32> = sfc
        .transitions
        .iter()
        .map(|t| t.local_id.unwrap_or_else(|| ids.next_id()))
        .collect();
    let step_id = |name: &str| {
        sfc.steps
            .iter()
            .position(|s| s.name == name)
            .map(|i| step_ids[i])
    };

    indent(out, level);
    out.push_str("<SFC>\n");

    for (step, id) in sfc.steps.iter().zip(&step_ids) {
        indent(out, level + 1);
        out.push_str(&format!("<step localId=\"{}\"", id));
        push_attr(out, "name", &step.name);
        if step.initial {
            out.push_str(" initialStep=\"true\"");
        }
        let incoming: Vec<(u32, Option<&str>)> = sfc
            .transitions
            .iter()
            .zip(&transition_ids)
            .filter(|(t, _)| t.to.iter().any(|n| *n == step.name))
            .map(|(_, tid)| (*tid, None))
            .collect();
        if step.position.is_none() && incoming.is_empty() {
            out.push_str("/>\n");
            continue;
        }
        out.push_str(">\n");
        write_position(out, step.position.as_ref(), level + 2);
        write_connection_point_in(out, incoming, level + 2);
        indent(out, level + 1);
        out.push_str("</step>\n");
    }

    for (transition, id) in sfc.transitions.iter().zip(&transition_ids) {
        indent(out, level + 1);
        out.push_str(&format!("<transition localId=\"{}\">\n", id));
        let sources: Vec<(u32, Option<&str>)> = transition
            .from
            .iter()
            .filter_map(|name| {
                let id = step_id(name.as_str());
                if id.is_none() {
                    debug!(step = %name, "transition source has no matching step");
                }
                id
            })
            .map(|sid| (sid, None))
            .collect();
        write_connection_point_in(out, sources, level + 2);
        if let Some(cond) = &transition.condition {
            indent(out, level + 2);
            out.push_str("<condition>\n");
            indent(out, level + 3);
            out.push_str("<inline>\n");
            write_text_block(out, "ST", cond, level + 4);
            indent(out, level + 3);
            out.push_str("</inline>\n");
            indent(out, level + 2);
            out.push_str("</condition>\n");
        }
        indent(out, level + 1);
        out.push_str("</transition>\n");
    }

    // Targets without a matching step are jumps.
    for (transition, tid) in sfc.transitions.iter().zip(&transition_ids) {
        for target in transition.to.iter().filter(|n| step_id(n.as_str()).is_none()) {
            indent(out, level + 1);
            out.push_str(&format!("<jumpStep localId=\"{}\"", ids.next_id()));
            push_attr(out, "targetName", target);
            out.push_str(">\n");
            write_connection_point_in(out, [(*tid, None)], level + 2);
            indent(out, level + 1);
            out.push_str("</jumpStep>\n");
        }
    }

    for (step, sid) in sfc.steps.iter().zip(&step_ids) {
        if step.actions.is_empty() {
            continue;
        }
        indent(out, level + 1);
        out.push_str(&format!("<actionBlock localId=\"{}\">\n", ids.next_id()));
        write_connection_point_in(out, [(*sid, None)], level + 2);
        for action in &step.actions {
            indent(out, level + 2);
            out.push_str(&format!(
                "<action localId=\"{}\" qualifier=\"N\"><reference",
                ids.next_id()
            ));
            push_attr(out, "name", action);
            out.push_str("/></action>\n");
        }
        indent(out, level + 1);
        out.push_str("</actionBlock>\n");
    }

    indent(out, level);
    out.push_str("</SFC>\n");
}

fn write_sfc_actions(out: &mut String, actions: &[PlcopenSfcAction], level: usize) {
    indent(out, level);
    out.push_str("<actions>\n");
    for action in actions {
        indent(out, level + 1);
        out.push_str("<action");
        push_attr(out, "name", &action.name);
        out.push_str(">\n");
        indent(out, level + 2);
        out.push_str("<body>\n");
        write_text_block(out, "ST", action.body.as_deref().unwrap_or(""), level + 3);
        indent(out, level + 2);
        out.push_str("</body>\n");
        indent(out, level + 1);
        out.push_str("</action>\n");
    }
    indent(out, level);
    out.push_str("</actions>\n");
}

// ────────────────────────────────────────────────────────────────────────────
// Instances
// ────────────────────────────────────────────────────────────────────────────

fn write_configuration(out: &mut String, cfg: &PlcopenConfiguration, level: usize) {
    indent(out, level);
    out.push_str("<configuration");
    push_attr(out, "name", &cfg.name);
    out.push_str(">\n");
    for res in &cfg.resources {
        write_resource(out, res, level + 1);
    }
    write_var_section(out, "globalVars", &cfg.global_vars, level + 1);
    indent(out, level);
    out.push_str("</configuration>\n");
}

fn write_resource(out: &mut String, res: &PlcopenResource, level: usize) {
    indent(out, level);
    out.push_str("<resource");
    push_attr(out, "name", &res.name);
    out.push_str(">\n");
    for task in &res.tasks {
        indent(out, level + 1);
        out.push_str("<task");
        push_attr(out, "name", &task.name);
        push_opt_attr(out, "interval", task.interval.as_deref());
        push_opt_attr(out, "priority", task.priority.as_deref());
        if task.pou_instances.is_empty() {
            out.push_str("/>\n");
            continue;
        }
        out.push_str(">\n");
        for inst in &task.pou_instances {
            write_pou_instance(out, inst, level + 2);
        }
        indent(out, level + 1);
        out.push_str("</task>\n");
    }
    write_var_section(out, "globalVars", &res.global_vars, level + 1);
    for inst in &res.pou_instances {
        write_pou_instance(out, inst, level + 1);
    }
    indent(out, level);
    out.push_str("</resource>\n");
}

fn write_pou_instance(out: &mut String, inst: &PlcopenPouInstance, level: usize) {
    indent(out, level);
    out.push_str("<pouInstance");
    push_attr(out, "name", &inst.name);
    push_attr(out, "typeName", &inst.type_name);
    out.push_str("/>\n");
}
