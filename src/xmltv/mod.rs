//! XMLTV document model
//!
//! A small owned tree: ordered attributes, ordered children, text nodes.
//! The tree is generic XML so unknown elements and attributes survive a
//! round trip untouched; the XMLTV shape (`tv`/`channel`/`programme`) is
//! understood through the typed accessors below.

pub mod parser;
pub mod sanitize;
pub mod writer;

pub use parser::parse_document;
pub use sanitize::sanitize;
pub use writer::serialize;

/// One node in the document tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum XmlNode {
    Element(Element),
    Text(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        }
    }
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter for literal construction
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style text child for literal construction
    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(XmlNode::Text(text.to_string()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value and keeping its position
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self
                .attributes
                .push((name.to_string(), value.to_string())),
        }
    }

    /// Concatenated text content of direct text children
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlNode::Text(text) = child {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace all text children with a single text node, keeping element
    /// children and their order intact
    pub fn set_text(&mut self, text: &str) {
        self.children.retain(|c| matches!(c, XmlNode::Element(_)));
        if self.children.is_empty() {
            self.children.push(XmlNode::Text(text.to_string()));
        } else {
            self.children.insert(0, XmlNode::Text(text.to_string()));
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|el| el.name == name)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Direct element children
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    /// Index into `children` of the first element with this name
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|child| {
            child
                .as_element()
                .map(|el| el.name == name)
                .unwrap_or(false)
        })
    }

    pub fn push_element(&mut self, element: Element) {
        self.children.push(XmlNode::Element(element));
    }

    pub fn insert_element(&mut self, index: usize, element: Element) {
        self.children.insert(index, XmlNode::Element(element));
    }
}

/// An XMLTV document: a `tv` root owning channels and programmes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new() -> Self {
        Self {
            root: Element::new("tv"),
        }
    }

    pub fn channels(&self) -> impl Iterator<Item = &Element> {
        self.root.elements().filter(|el| el.name == "channel")
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.root.elements_mut().filter(|el| el.name == "channel")
    }

    pub fn programmes(&self) -> impl Iterator<Item = &Element> {
        self.root.elements().filter(|el| el.name == "programme")
    }

    pub fn programmes_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.root.elements_mut().filter(|el| el.name == "programme")
    }

    pub fn channel_count(&self) -> usize {
        self.channels().count()
    }

    pub fn programme_count(&self) -> usize {
        self.programmes().count()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
