//! LOM metadata → JSON, following xmltodict's conventions so the output
//! matches what existing consumers of the extracted dicts expect:
//! attributes become `@name`, mixed text becomes `#text`, repeated child
//! elements become arrays and empty elements become `null`.
//!
//! `<langstring>` wrappers are dropped in favour of their text.

use roxmltree::Node;
use serde_json::{Map, Value};

use crate::package::Metadata;

const SECTIONS: &[&str] = &["general", "rights", "educational", "lifecycle"];

/// Collect the LOM sections under a `<metadata>` element.
pub fn collect_metadata(metadata: Node<'_, '_>) -> Metadata {
    let mut out = Map::new();
    let Some(lom) = child(metadata, "lom") else {
        return out;
    };
    for section in SECTIONS {
        if let Some(elem) = child(lom, section) {
            out.insert(section.to_string(), element_to_json(elem));
        }
    }
    out
}

/// First child element with the given local name.
pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

pub fn element_to_json(node: Node<'_, '_>) -> Value {
    let mut map = Map::new();
    for attr in node.attributes() {
        map.insert(format!("@{}", attr.name()), Value::String(attr.value().to_string()));
    }

    let mut text = String::new();
    for c in node.children() {
        if c.is_text() {
            text.push_str(c.text().unwrap_or_default());
        } else if c.is_element() && c.tag_name().name() == "langstring" {
            text.push_str(&all_text(c));
        } else if c.is_element() {
            push_child(&mut map, c.tag_name().name(), element_to_json(c));
        }
    }
    let text = text.trim();

    if map.is_empty() {
        return if text.is_empty() {
            Value::Null
        } else {
            Value::String(text.to_string())
        };
    }
    if !text.is_empty() {
        map.insert("#text".to_string(), Value::String(text.to_string()));
    }
    Value::Object(map)
}

/// All descendant text, concatenated in document order.
pub(crate) fn all_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn push_child(map: &mut Map<String, Value>, name: &str, value: Value) {
    match map.get_mut(name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name.to_string(), value);
        }
    }
}
