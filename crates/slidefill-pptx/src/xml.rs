//! Arena-backed XML element tree.
//!
//! Slide parts are parsed into an [`XmlDocument`] whose nodes live in a single
//! `Vec` and refer to each other by [`NodeId`]. A document owns every node it
//! holds; copying a subtree into another document ([`XmlDocument::import`])
//! allocates fresh nodes in the destination arena, so source and copy never
//! share anything mutable.
//!
//! Detached nodes (after [`XmlDocument::remove_child`] or
//! [`XmlDocument::clear_children`]) stay in the arena but are unreachable from
//! the root and are never serialized.

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{PptxError, Result};

/// Declaration written at the top of every serialized part
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Handle to a node inside one [`XmlDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Content of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

/// An element with its qualified name and attributes (unescaped)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    children: Vec<NodeId>,
}

impl Element {
    /// Create an element without attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Name without namespace prefix (`p:sp` -> `sp`)
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Namespace prefix, if any (`p:sp` -> `p`)
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Look up an attribute by its qualified name
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Strip the namespace prefix of a qualified name
pub fn local_name(name: &str) -> &str {
    name.split_once(':').map(|(_, local)| local).unwrap_or(name)
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
}

/// An XML document stored as an arena of nodes
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    nodes: Vec<Node>,
    root: NodeId,
}

impl XmlDocument {
    /// Create a document with a single root element
    pub fn with_root(root: Element) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element(root),
                parent: None,
            }],
            root: NodeId(0),
        }
    }

    /// Parse a document from UTF-8 bytes
    ///
    /// Whitespace text is preserved, so serializing an untouched document
    /// reproduces the same element content.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(xml)
            .map_err(|e| PptxError::invalid_package(format!("XML part is not UTF-8: {}", e)))?;
        let text = text.trim_start_matches('\u{feff}');

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    let id = push_element(&mut nodes, stack.last().copied(), e)?;
                    if stack.is_empty() && root.is_none() {
                        root = Some(id);
                    }
                    stack.push(id);
                }
                Event::Empty(ref e) => {
                    let id = push_element(&mut nodes, stack.last().copied(), e)?;
                    if stack.is_empty() && root.is_none() {
                        root = Some(id);
                    }
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(ref e) => {
                    if let Some(&parent) = stack.last() {
                        let text = e.unescape()?.into_owned();
                        push_leaf(&mut nodes, parent, NodeKind::Text(text));
                    }
                }
                Event::CData(e) => {
                    if let Some(&parent) = stack.last() {
                        let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                        push_leaf(&mut nodes, parent, NodeKind::CData(text));
                    }
                }
                Event::Comment(ref e) => {
                    if let Some(&parent) = stack.last() {
                        let text = String::from_utf8_lossy(e).into_owned();
                        push_leaf(&mut nodes, parent, NodeKind::Comment(text));
                    }
                }
                Event::Eof => break,
                // Declaration, processing instructions and doctype are regenerated
                _ => {}
            }
        }

        let root = root.ok_or_else(|| PptxError::invalid_package("XML part has no root element"))?;
        Ok(Self { nodes, root })
    }

    /// The root element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, including detached ones
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Node content
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Element data, if the node is an element
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Mutable element data, if the node is an element
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Local name of an element node
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::local_name)
    }

    /// Attribute of an element node by qualified name
    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attribute(key))
    }

    /// Parent of a node (None for the root and detached nodes)
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// All children of a node, in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => &el.children,
            _ => &[],
        }
    }

    /// Element children of a node
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.element(child).is_some())
    }

    /// Element children with the given local name
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        local: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.child_elements(id)
            .filter(move |&child| self.local_name(child) == Some(local))
    }

    /// First element child with the given local name
    pub fn first_child(&self, id: NodeId, local: &str) -> Option<NodeId> {
        self.children_named(id, local).next()
    }

    /// Follow a path of local names from `id` (first match at each step)
    pub fn find_path(&self, id: NodeId, path: &[&str]) -> Option<NodeId> {
        path.iter()
            .try_fold(id, |current, local| self.first_child(current, local))
    }

    /// All descendant elements with the given local name, in document order
    pub fn descendants_named(&self, id: NodeId, local: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut pending: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = pending.pop() {
            if self.local_name(current) == Some(local) {
                found.push(current);
            }
            pending.extend(self.children(current).iter().rev().copied());
        }
        found
    }

    /// Concatenated text of all text and CDATA descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) | NodeKind::CData(t) => out.push_str(t),
            NodeKind::Element(el) => {
                for &child in &el.children {
                    self.collect_text(child, out);
                }
            }
            NodeKind::Comment(_) => {}
        }
    }

    /// Replace all children of an element with a single text node
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.clear_children(id);
        let text = text.into();
        if !text.is_empty() {
            let child = self.alloc(NodeKind::Text(text));
            self.append_child(id, child);
        }
    }

    /// Allocate a detached element
    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.alloc(NodeKind::Element(element))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { kind, parent: None });
        id
    }

    /// Append a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    /// Insert a detached node at `index` among the children of `parent`
    ///
    /// Indexes past the end append. Non-element parents are ignored.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if let NodeKind::Element(el) = &mut self.nodes[parent.0].kind {
            let index = index.min(el.children.len());
            el.children.insert(index, child);
            self.nodes[child.0].parent = Some(parent);
        }
    }

    /// Detach `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let removed = match &mut self.nodes[parent.0].kind {
            NodeKind::Element(el) => match el.children.iter().position(|&c| c == child) {
                Some(pos) => {
                    el.children.remove(pos);
                    true
                }
                None => false,
            },
            _ => false,
        };
        if removed {
            self.nodes[child.0].parent = None;
        }
        removed
    }

    /// Detach every child of an element
    pub fn clear_children(&mut self, id: NodeId) {
        let children = match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => std::mem::take(&mut el.children),
            _ => return,
        };
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Deep-copy the subtree rooted at `node` of `source` into this arena
    ///
    /// Returns the detached copy of `node`; attach it with
    /// [`XmlDocument::append_child`] or [`XmlDocument::insert_child`].
    pub fn import(&mut self, source: &XmlDocument, node: NodeId) -> NodeId {
        let kind = match &source.nodes[node.0].kind {
            NodeKind::Element(el) => NodeKind::Element(Element {
                name: el.name.clone(),
                attributes: el.attributes.clone(),
                children: Vec::new(),
            }),
            other => other.clone(),
        };
        let copy = self.alloc(kind);
        for &child in source.children(node) {
            let child_copy = self.import(source, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Serialize the document, declaration included
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.nodes.len() * 16);
        out.push_str(XML_DECLARATION);
        out.push('\n');
        self.write_node(self.root, &mut out);
        out
    }

    /// Serialize one subtree without declaration
    pub fn subtree_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for (key, value) in &el.attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape(value.as_str()));
                    out.push('"');
                }
                if el.children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in &el.children {
                        self.write_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(&el.name);
                    out.push('>');
                }
            }
            NodeKind::Text(t) => out.push_str(&partial_escape(t.as_str())),
            NodeKind::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            NodeKind::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
        }
    }
}

fn push_element(nodes: &mut Vec<Node>, parent: Option<NodeId>, e: &BytesStart<'_>) -> Result<NodeId> {
    let mut element = Element::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }

    let id = NodeId(nodes.len());
    nodes.push(Node {
        kind: NodeKind::Element(element),
        parent,
    });
    if let Some(parent) = parent {
        if let NodeKind::Element(el) = &mut nodes[parent.0].kind {
            el.children.push(id);
        }
    }
    Ok(id)
}

fn push_leaf(nodes: &mut Vec<Node>, parent: NodeId, kind: NodeKind) {
    let id = NodeId(nodes.len());
    nodes.push(Node {
        kind,
        parent: Some(parent),
    });
    if let NodeKind::Element(el) = &mut nodes[parent.0].kind {
        el.children.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="urn:a" xmlns:p="urn:p"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:rPr lang="en-US" b="1"/><a:t>Tom &amp; Jerry</a:t></a:r><a:r><a:t> </a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#;

    #[test]
    fn test_parse_and_navigate() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let root = doc.root();
        assert_eq!(doc.local_name(root), Some("sld"));

        let tree = doc.find_path(root, &["cSld", "spTree"]).unwrap();
        assert_eq!(doc.children_named(tree, "sp").count(), 1);

        let texts = doc.descendants_named(root, "t");
        assert_eq!(texts.len(), 2);
        assert_eq!(doc.text_content(texts[0]), "Tom & Jerry");
        // Whitespace-only text is kept
        assert_eq!(doc.text_content(texts[1]), " ");
    }

    #[test]
    fn test_roundtrip_preserves_content() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let xml = doc.to_xml();
        assert!(xml.contains(r#"<a:rPr lang="en-US" b="1"/>"#));
        assert!(xml.contains("<a:t>Tom &amp; Jerry</a:t>"));
        assert!(xml.contains("<a:t> </a:t>"));

        let reparsed = XmlDocument::parse(xml.as_bytes()).unwrap();
        assert_eq!(reparsed.to_xml(), xml);
    }

    #[test]
    fn test_attribute_escaping() {
        let mut doc = XmlDocument::with_root(Element::new("root"));
        let child = doc.create_element(Element::new("item").with_attribute("name", "a \"b\" <c>"));
        doc.append_child(doc.root(), child);

        let xml = doc.subtree_xml(doc.root());
        assert!(xml.contains("&quot;b&quot;"));
        assert!(xml.contains("&lt;c&gt;"));

        let reparsed = XmlDocument::parse(xml.as_bytes()).unwrap();
        let item = reparsed.first_child(reparsed.root(), "item").unwrap();
        assert_eq!(reparsed.attribute(item, "name"), Some("a \"b\" <c>"));
    }

    #[test]
    fn test_set_text() {
        let mut doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let t = doc.descendants_named(doc.root(), "t")[0];
        doc.set_text(t, "<new>");
        assert_eq!(doc.text_content(t), "<new>");
        assert!(doc.to_xml().contains("<a:t>&lt;new&gt;</a:t>"));
    }

    #[test]
    fn test_import_is_independent() {
        let source = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let sp = source.descendants_named(source.root(), "sp")[0];

        let mut target = XmlDocument::with_root(Element::new("p:spTree"));
        let copy = target.import(&source, sp);
        target.append_child(target.root(), copy);

        let t = target.descendants_named(target.root(), "t")[0];
        target.set_text(t, "changed");

        // The source is untouched
        let source_t = source.descendants_named(source.root(), "t")[0];
        assert_eq!(source.text_content(source_t), "Tom & Jerry");
        assert_eq!(target.text_content(t), "changed");
        assert_eq!(target.parent(copy), Some(target.root()));
    }

    #[test]
    fn test_remove_and_insert_child() {
        let mut doc = XmlDocument::with_root(Element::new("list"));
        let root = doc.root();
        let a = doc.create_element(Element::new("a"));
        let b = doc.create_element(Element::new("b"));
        doc.append_child(root, a);
        doc.append_child(root, b);

        assert!(doc.remove_child(root, a));
        assert!(!doc.remove_child(root, a));
        doc.insert_child(root, 1, a);

        let names: Vec<_> = doc
            .child_elements(root)
            .filter_map(|id| doc.local_name(id))
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        assert!(XmlDocument::parse(b"").is_err());
        assert!(XmlDocument::parse(b"<?xml version=\"1.0\"?>").is_err());
    }

    #[test]
    fn test_local_name_and_prefix() {
        let el = Element::new("p:sldIdLst");
        assert_eq!(el.local_name(), "sldIdLst");
        assert_eq!(el.prefix(), Some("p"));
        assert_eq!(local_name("Types"), "Types");
    }
}
