//! PLCopen TC6 XML → [`PlcopenProject`].

use super::body::parse_pou_body;
use super::helpers::*;
use super::type_expr::TypeExpr;
use crate::config::ParserLimits;
use crate::error::ParseFailure;
use crate::model::*;
use roxmltree::{Document, Node};
use tracing::debug;

pub const DEFAULT_POU_NAME: &str = "UnnamedPOU";
pub const DEFAULT_DATA_TYPE_NAME: &str = "UnnamedType";
pub const DEFAULT_CONFIGURATION_NAME: &str = "UnnamedConfiguration";
pub const DEFAULT_RESOURCE_NAME: &str = "UnnamedResource";
pub const DEFAULT_TASK_NAME: &str = "UnnamedTask";
pub const DEFAULT_INSTANCE_NAME: &str = "UnnamedInstance";

pub(crate) fn parse_project_document(
    text: &str,
    limits: &ParserLimits,
) -> Result<PlcopenProject, ParseFailure> {
    let doc = Document::parse_with_options(text, limits.xml_options())?;
    parse_project_root(doc.root_element(), limits)
}

pub(crate) fn parse_project_root(
    root: Node,
    limits: &ParserLimits,
) -> Result<PlcopenProject, ParseFailure> {
    if !root.has_tag_name("project") {
        return Err(ParseFailure::MissingRoot {
            expected: "project",
            found: root.tag_name().name().to_string(),
        });
    }
    parse_project(root, limits)
}

fn parse_project(root: Node, limits: &ParserLimits) -> Result<PlcopenProject, ParseFailure> {
    let file_header = child(root, "fileHeader");
    let content_header = child(root, "contentHeader");
    let header_attr = |name: &str| {
        file_header
            .and_then(|h| attr(h, name))
            .or_else(|| content_header.and_then(|h| attr(h, name)))
    };

    let name = attr(root, "name").or_else(|| {
        content_header.and_then(|h| attr(h, "name").or_else(|| attr(h, "projectName")))
    });

    let mut data_types = Vec::new();
    if let Some(dts) = child_path(root, &["types", "dataTypes"]) {
        for dt in children_named(dts, "dataType") {
            data_types.push(parse_data_type(dt, limits)?);
        }
    }

    let mut pous = Vec::new();
    if let Some(pou_list) = child_path(root, &["types", "pous"]) {
        for pou in children_named(pou_list, "pou") {
            pous.push(parse_pou(pou, limits)?);
        }
    }

    let mut configurations = Vec::new();
    if let Some(cfgs) = child_path(root, &["instances", "configurations"]) {
        for cfg in children_named(cfgs, "configuration") {
            configurations.push(parse_configuration(cfg, limits)?);
        }
    }

    debug!(
        pous = pous.len(),
        data_types = data_types.len(),
        configurations = configurations.len(),
        "parsed PLCopen project"
    );

    Ok(PlcopenProject {
        name,
        company_name: header_attr("companyName"),
        product_name: header_attr("productName"),
        product_version: header_attr("productVersion"),
        copyright: header_attr("copyright"),
        creation_date_time: file_header.and_then(|h| attr(h, "creationDateTime")),
        data_types,
        pous,
        configurations,
    })
}

fn parse_pou(node: Node, limits: &ParserLimits) -> Result<PlcopenPou, ParseFailure> {
    let name = attr_or(node, "name", DEFAULT_POU_NAME);
    let pou_type = node
        .attribute("pouType")
        .map(PouType::from_attr)
        .unwrap_or_default();
    let interface = match child(node, "interface") {
        Some(iface) => parse_interface(iface, limits)?,
        None => PlcopenPouInterface::default(),
    };
    let body = parse_pou_body(node);
    Ok(PlcopenPou {
        name,
        pou_type,
        comment: documentation(node),
        interface,
        body,
    })
}

fn parse_interface(node: Node, limits: &ParserLimits) -> Result<PlcopenPouInterface, ParseFailure> {
    let mut iface = PlcopenPouInterface::default();
    for section in VarSection::ALL {
        // Sections may repeat (e.g. a CONSTANT and a plain localVars block).
        for block in elements(node).filter(|c| c.has_tag_name(section.tag())) {
            let vars = parse_var_list(block, limits)?;
            iface.section_mut(section).extend(vars);
        }
    }
    if let Some(rt) = child(node, "returnType") {
        iface.return_type = Some(TypeExpr::from_xml(rt, limits.max_type_depth)?.to_string());
    }
    Ok(iface)
}

/// All `<variable>` children of a var section. Variables without a name are
/// skipped.
pub(crate) fn parse_var_list(
    node: Node,
    limits: &ParserLimits,
) -> Result<Vec<PlcopenVarDeclaration>, ParseFailure> {
    let mut vars = Vec::new();
    for var in children_named(node, "variable") {
        let Some(name) = attr(var, "name") else {
            debug!(section = node.tag_name().name(), "skipping <variable> without name");
            continue;
        };
        let var_type = match child(var, "type") {
            Some(t) => TypeExpr::from_xml(t, limits.max_type_depth)?.to_string(),
            None => super::type_expr::UNKNOWN_TYPE.to_string(),
        };
        vars.push(PlcopenVarDeclaration {
            name,
            var_type,
            comment: documentation(var),
            address: attr(var, "address"),
            initial_value: child(var, "initialValue").and_then(initial_value),
        });
    }
    Ok(vars)
}

fn initial_value(node: Node) -> Option<String> {
    child(node, "simpleValue")
        .and_then(|sv| attr(sv, "value"))
        .or_else(|| normalized_text(node))
}

fn parse_data_type(node: Node, limits: &ParserLimits) -> Result<PlcopenDataType, ParseFailure> {
    let name = attr_or(node, "name", DEFAULT_DATA_TYPE_NAME);
    let mut members = Vec::new();
    let mut enum_values = Vec::new();
    let base_type = match child(node, "baseType") {
        Some(bt) => match elements(bt).next() {
            Some(s) if s.has_tag_name("struct") => {
                members = parse_var_list(s, limits)?;
                "STRUCT".to_string()
            }
            Some(e) if e.has_tag_name("enum") => {
                if let Some(values) = child(e, "values") {
                    enum_values = children_named(values, "value")
                        .filter_map(|v| attr(v, "name"))
                        .collect();
                }
                "ENUM".to_string()
            }
            _ => TypeExpr::from_xml(bt, limits.max_type_depth)?.to_string(),
        },
        None => super::type_expr::UNKNOWN_TYPE.to_string(),
    };
    Ok(PlcopenDataType {
        name,
        base_type,
        members,
        enum_values,
        initial_value: child(node, "initialValue").and_then(initial_value),
        comment: documentation(node),
    })
}

fn parse_configuration(
    node: Node,
    limits: &ParserLimits,
) -> Result<PlcopenConfiguration, ParseFailure> {
    let mut resources = Vec::new();
    for res in children_named(node, "resource") {
        resources.push(parse_resource(res, limits)?);
    }
    Ok(PlcopenConfiguration {
        name: attr_or(node, "name", DEFAULT_CONFIGURATION_NAME),
        resources,
        global_vars: parse_global_vars(node, limits)?,
    })
}

fn parse_resource(node: Node, limits: &ParserLimits) -> Result<PlcopenResource, ParseFailure> {
    let tasks = children_named(node, "task")
        .map(|task| PlcopenTask {
            name: attr_or(task, "name", DEFAULT_TASK_NAME),
            interval: attr(task, "interval"),
            priority: attr(task, "priority"),
            pou_instances: children_named(task, "pouInstance").map(parse_pou_instance).collect(),
        })
        .collect();
    Ok(PlcopenResource {
        name: attr_or(node, "name", DEFAULT_RESOURCE_NAME),
        tasks,
        pou_instances: children_named(node, "pouInstance").map(parse_pou_instance).collect(),
        global_vars: parse_global_vars(node, limits)?,
    })
}

fn parse_pou_instance(node: Node) -> PlcopenPouInstance {
    PlcopenPouInstance {
        name: attr_or(node, "name", DEFAULT_INSTANCE_NAME),
        type_name: attr_or(node, "typeName", ""),
    }
}

fn parse_global_vars(
    node: Node,
    limits: &ParserLimits,
) -> Result<Vec<PlcopenVarDeclaration>, ParseFailure> {
    let mut vars = Vec::new();
    for block in children_named(node, "globalVars") {
        vars.extend(parse_var_list(block, limits)?);
    }
    Ok(vars)
}
