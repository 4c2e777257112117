//! XMLTV loader
//!
//! Strict streaming parse into the owned tree first; if the feed is still
//! broken after sanitizing, a tolerant recovery pass auto-closes unbalanced
//! start tags and drops stray end tags. Whatever survives must have a `tv`
//! root, otherwise the document is rejected as malformed.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use super::{Document, Element, XmlNode};
use crate::errors::PipelineError;

/// Parse sanitized text into a document tree.
///
/// Fails with [`PipelineError::MalformedInput`] carrying the parser
/// diagnostics when neither the strict nor the recovery pass produces a
/// well-formed tree with a `tv` root.
pub fn parse_document(text: &str) -> Result<Document, PipelineError> {
    match parse_tree(text, true) {
        Ok(nodes) => root_from(nodes),
        Err(strict_err) => {
            debug!("strict parse failed ({strict_err}), attempting recovery");
            let nodes = parse_tree(text, false)
                .map_err(|_| PipelineError::MalformedInput(strict_err.clone()))?;
            let doc = root_from(nodes)
                .map_err(|_| PipelineError::MalformedInput(strict_err.clone()))?;
            warn!("input recovered from malformed markup: {strict_err}");
            Ok(doc)
        }
    }
}

/// The recovered (or parsed) node list must be exactly one `tv` element.
fn root_from(nodes: Vec<XmlNode>) -> Result<Document, PipelineError> {
    let mut elements = nodes.into_iter().filter_map(|node| match node {
        XmlNode::Element(el) => Some(el),
        XmlNode::Text(_) => None,
    });

    let root = elements
        .next()
        .ok_or_else(|| PipelineError::MalformedInput("document has no root element".into()))?;
    if root.name != "tv" {
        return Err(PipelineError::MalformedInput(format!(
            "expected <tv> root, found <{}>",
            root.name
        )));
    }
    if elements.next().is_some() {
        return Err(PipelineError::MalformedInput(
            "multiple root elements".into(),
        ));
    }
    Ok(Document { root })
}

/// Event loop shared by the strict and tolerant passes. Returns the
/// top-level node list; errors are stringified parser diagnostics with the
/// byte position.
fn parse_tree(text: &str, strict: bool) -> Result<Vec<XmlNode>, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = strict;
    // Tolerant pass: stray end tags must not desync quick-xml's internal
    // open-tag bookkeeping, otherwise the real closing tag later reports as
    // unmatched. Our own `stack` still decides what each end tag closes.
    reader.config_mut().allow_unmatched_ends = !strict;

    let mut stack: Vec<Element> = Vec::new();
    let mut top_level: Vec<XmlNode> = Vec::new();

    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(element_from(&start)),
            Ok(Event::Empty(start)) => {
                attach(XmlNode::Element(element_from(&start)), &mut stack, &mut top_level);
            }
            Ok(Event::End(end)) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                if strict {
                    // Name mismatches already error out of read_event; an end
                    // tag with nothing open is the remaining ill-formed case.
                    let element = stack
                        .pop()
                        .ok_or_else(|| format!("unexpected </{name}> at byte {position}"))?;
                    attach(XmlNode::Element(element), &mut stack, &mut top_level);
                } else if let Some(open_at) = stack.iter().rposition(|el| el.name == name) {
                    // Auto-close everything opened below the matching tag
                    while stack.len() > open_at {
                        let element = stack.pop().expect("stack length checked");
                        attach(XmlNode::Element(element), &mut stack, &mut top_level);
                    }
                }
                // Tolerant mode drops stray end tags silently
            }
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(e) if strict => return Err(format!("{e} at byte {position}")),
                    Err(_) => String::from_utf8_lossy(t.as_ref()).into_owned(),
                };
                if !text.is_empty() {
                    attach(XmlNode::Text(text), &mut stack, &mut top_level);
                }
            }
            Ok(Event::CData(cdata)) => {
                let text = String::from_utf8_lossy(cdata.as_ref()).into_owned();
                attach(XmlNode::Text(text), &mut stack, &mut top_level);
            }
            Ok(Event::Decl(_)) | Ok(Event::Comment(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("{e} at byte {position}")),
        }
    }

    if !stack.is_empty() {
        if strict {
            let open: Vec<&str> = stack.iter().map(|el| el.name.as_str()).collect();
            return Err(format!("unclosed elements at end of input: {}", open.join(", ")));
        }
        while let Some(element) = stack.pop() {
            attach(XmlNode::Element(element), &mut stack, &mut top_level);
        }
    }

    Ok(top_level)
}

fn element_from(start: &BytesStart) -> Element {
    let mut element = Element::new(&String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        element.attributes.push((key, value));
    }
    element
}

fn attach(node: XmlNode, stack: &mut [Element], top_level: &mut Vec<XmlNode>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top_level.push(node),
    }
}
