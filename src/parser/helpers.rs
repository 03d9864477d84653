//! Small accessors over roxmltree nodes shared by both dialects.
//!
//! Tag comparisons go through `has_tag_name(&str)`, which ignores the
//! namespace, so documents with or without the PLCopen namespace parse alike.

use crate::model::PlcopenPosition;
use roxmltree::Node;

/// Element children of `node`.
pub fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| c.is_element())
}

/// Element children of `node` with the given local name.
pub fn children_named<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |c| c.is_element() && c.has_tag_name(tag))
}

/// First element child of `node` with the given local name.
pub fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.has_tag_name(tag))
}

/// Follow a path of child tags, taking the first match at each level.
pub fn child_path<'a, 'input>(node: Node<'a, 'input>, path: &[&str]) -> Option<Node<'a, 'input>> {
    path.iter().try_fold(node, |n, tag| child(n, tag))
}

/// Attribute value, with empty values treated as absent.
pub fn attr(node: Node, name: &str) -> Option<String> {
    node.attribute(name)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

pub fn attr_or(node: Node, name: &str, default: &str) -> String {
    attr(node, name).unwrap_or_else(|| default.to_string())
}

pub fn attr_is_true(node: Node, name: &str) -> bool {
    node.attribute(name)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
}

pub fn local_id(node: Node) -> Option<u32> {
    node.attribute("localId")
        .and_then(|s| s.trim().parse::<u32>().ok())
}

/// Float attribute; absent, unparsable and NaN all map to `None`.
pub fn attr_f64(node: Node, name: &str) -> Option<f64> {
    node.attribute(name)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| !v.is_nan())
}

/// `<position x=… y=…/>` child of a graphical element.
pub fn position(node: Node) -> Option<PlcopenPosition> {
    let pos = child(node, "position")?;
    Some(PlcopenPosition {
        x: attr_f64(pos, "x").unwrap_or(0.0),
        y: attr_f64(pos, "y").unwrap_or(0.0),
    })
}

/// Concatenated text of all descendant text nodes (xhtml wrappers included).
pub fn text_content(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Descendant text with CRLF normalized and surrounding whitespace trimmed.
/// Returns `None` when nothing remains.
pub fn normalized_text(node: Node) -> Option<String> {
    let text = text_content(node).replace("\r\n", "\n");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trimmed text of a `<documentation>` child.
pub fn documentation(node: Node) -> Option<String> {
    child(node, "documentation").and_then(normalized_text)
}

/// `refLocalId`s of every `<connection>` under `connectionPointIn`.
pub fn incoming_refs(node: Node) -> Vec<u32> {
    incoming_connections(node)
        .filter_map(|c| c.attribute("refLocalId"))
        .filter_map(|s| s.trim().parse::<u32>().ok())
        .collect()
}

/// `<connection>` elements under the `connectionPointIn` children of `node`.
pub fn incoming_connections<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    children_named(node, "connectionPointIn").flat_map(|cp| children_named(cp, "connection"))
}
