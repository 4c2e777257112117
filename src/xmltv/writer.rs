//! XMLTV serialization
//!
//! Stable two-space indentation, text-only elements kept inline, empty
//! elements self-closing. The output starts with exactly one canonical
//! UTF-8 declaration.

use quick_xml::escape::{escape, partial_escape};
use std::path::Path;

use super::sanitize::CANONICAL_DECLARATION;
use super::{Document, Element, XmlNode};
use crate::errors::PipelineError;

/// Serialize the full document to text
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    out.push_str(CANONICAL_DECLARATION);
    out.push('\n');
    write_element(&mut out, &doc.root, 0);
    out.push('\n');
    out
}

/// Serialize and write to the destination path
pub fn write_document(doc: &Document, path: &Path) -> Result<(), PipelineError> {
    std::fs::write(path, serialize(doc)).map_err(|e| PipelineError::write_failed(path, e))
}

fn write_element(out: &mut String, element: &Element, depth: usize) {
    let indent = "  ".repeat(depth);
    out.push_str(&indent);
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }

    let has_element_children = element.elements().next().is_some();
    out.push('>');

    if has_element_children {
        for child in &element.children {
            out.push('\n');
            match child {
                XmlNode::Element(el) => write_element(out, el, depth + 1),
                XmlNode::Text(text) => {
                    out.push_str(&"  ".repeat(depth + 1));
                    out.push_str(&partial_escape(text.trim()));
                }
            }
        }
        out.push('\n');
        out.push_str(&indent);
    } else {
        // Text-only content stays inline: <title>Telediario</title>
        out.push_str(&partial_escape(&element.text()));
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}
