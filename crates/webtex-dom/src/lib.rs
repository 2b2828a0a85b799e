//! Arena-backed host document model.
//!
//! Nodes live in a flat arena and are addressed by [`NodeId`]. A node that
//! has been detached keeps its slot (ids are never reused), so stale ids can
//! always be asked whether they are still attached to the document root.

use std::fmt::Write as _;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The document node of every [`Document`].
    pub const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    /// Pre-rendered markup, serialized verbatim.
    Raw(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn create_raw(&mut self, markup: impl Into<String>) -> NodeId {
        self.push(NodeKind::Raw(markup.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    /// Whether `id` names a slot in this arena.
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.index())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate from the parent of `id` up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    // =========================================================================
    // Tree surgery
    // =========================================================================

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Remove `id` from its parent. The subtree below `id` stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|c| *c != id);
        }
    }

    /// Replace `old` with `replacements` at the same position in one step.
    ///
    /// Returns `false` (and changes nothing) when `old` has no parent.
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) -> bool {
        let Some(parent) = self.nodes[old.index()].parent else {
            return false;
        };
        for r in replacements {
            self.detach(*r);
        }
        let Some(pos) = self.nodes[parent.index()]
            .children
            .iter()
            .position(|c| *c == old)
        else {
            return false;
        };
        self.nodes[parent.index()]
            .children
            .splice(pos..=pos, replacements.iter().copied());
        for r in replacements {
            self.nodes[r.index()].parent = Some(parent);
        }
        self.nodes[old.index()].parent = None;
        true
    }

    /// Whether `id` is still reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if id == self.root() {
            return true;
        }
        self.ancestors(id).any(|a| a == self.root())
    }

    // =========================================================================
    // Node accessors
    // =========================================================================

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeKind::Text(t) = &mut self.nodes[id.index()].kind {
            *t = text.into();
        }
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: impl Into<String>) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.index()].kind {
            let value = value.into();
            match attributes.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
                Some(slot) => slot.1 = value,
                None => attributes.push((key.to_ascii_lowercase(), value)),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.index()].kind {
            attributes.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|v| v.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let joined = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", joined);
    }

    /// All nodes below `id` in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of all text nodes below (and including) `id`.
    /// Raw markup does not contribute.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let NodeKind::Text(t) = self.kind(id) {
            out.push_str(t);
        }
        for d in self.descendants(id) {
            if let NodeKind::Text(t) = self.kind(d) {
                out.push_str(t);
            }
        }
        out
    }

    /// Merge runs of adjacent text children of `parent` and drop empty ones.
    pub fn merge_adjacent_text(&mut self, parent: NodeId) {
        let children = self.nodes[parent.index()].children.clone();
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        for child in children {
            let text = match &self.nodes[child.index()].kind {
                NodeKind::Text(t) => Some(t.clone()),
                _ => None,
            };
            match (text, kept.last().copied()) {
                (Some(t), Some(prev)) if matches!(self.kind(prev), NodeKind::Text(_)) => {
                    if let NodeKind::Text(p) = &mut self.nodes[prev.index()].kind {
                        p.push_str(&t);
                    }
                    self.nodes[child.index()].parent = None;
                }
                (Some(t), _) if t.is_empty() => {
                    self.nodes[child.index()].parent = None;
                }
                _ => kept.push(child),
            }
        }
        self.nodes[parent.index()].children = kept;
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Serialize the children of `id` as an HTML fragment.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for c in self.children(id) {
            self.write_node(*c, &mut out);
        }
        out
    }

    /// Serialize `id` and its subtree as an HTML fragment.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Document => {
                for c in self.children(id) {
                    self.write_node(*c, out);
                }
            }
            NodeKind::Element { name, attributes } => {
                out.push('<');
                out.push_str(name);
                for (k, v) in attributes {
                    let _ = write!(out, " {}=\"{}\"", k, escape_html(v, true));
                }
                out.push('>');
                if is_void_element(name) {
                    return;
                }
                for c in self.children(id) {
                    self.write_node(*c, out);
                }
                let _ = write!(out, "</{}>", name);
            }
            NodeKind::Text(t) => out.push_str(&escape_html(t, false)),
            NodeKind::Raw(m) => out.push_str(m),
            NodeKind::Comment(c) => {
                let _ = write!(out, "<!--{}-->", c);
            }
        }
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = self.doc.parent(cur);
        Some(cur)
    }
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

/// Escape `&`, `<`, `>` (and `"` inside attribute values).
pub fn escape_html(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Document, NodeKind};

    fn paragraph(doc: &mut Document, text: &str) -> (super::NodeId, super::NodeId) {
        let p = doc.create_element("p");
        let t = doc.create_text(text);
        doc.append_child(p, t);
        let root = doc.root();
        doc.append_child(root, p);
        (p, t)
    }

    #[test]
    fn test_replace_with_keeps_position() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "a b c");
        let a = doc.create_text("a ");
        let span = doc.create_element("span");
        let c = doc.create_text(" c");
        assert!(doc.replace_with(t, &[a, span, c]));
        assert_eq!(doc.children(p), &[a, span, c]);
        assert!(!doc.is_attached(t));
        assert!(doc.is_attached(span));
    }

    #[test]
    fn test_replace_detached_is_noop() {
        let mut doc = Document::new();
        let (_, t) = paragraph(&mut doc, "x");
        doc.detach(t);
        let n = doc.create_text("y");
        assert!(!doc.replace_with(t, &[n]));
        assert!(!doc.is_attached(n));
    }

    #[test]
    fn test_classes_and_attrs() {
        let mut doc = Document::new();
        let el = doc.create_element("SPAN");
        doc.add_class(el, "one");
        doc.add_class(el, "two");
        doc.add_class(el, "one");
        assert_eq!(doc.attr(el, "class"), Some("one two"));
        assert!(doc.has_class(el, "two"));
        doc.set_attr(el, "data-x", "1");
        doc.remove_attr(el, "DATA-X");
        assert_eq!(doc.attr(el, "data-x"), None);
        assert_eq!(doc.tag_name(el), Some("span"));
    }

    #[test]
    fn test_merge_adjacent_text() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "ab");
        let b = doc.create_text("");
        let c = doc.create_text("cd");
        doc.append_child(p, b);
        doc.append_child(p, c);
        doc.merge_adjacent_text(p);
        assert_eq!(doc.children(p), &[t]);
        assert_eq!(doc.text(t), Some("abcd"));
    }

    #[test]
    fn test_serialization_escapes_text_not_raw() {
        let mut doc = Document::new();
        let (p, _) = paragraph(&mut doc, "a < b & c");
        let raw = doc.create_raw("<b>x</b>");
        doc.append_child(p, raw);
        doc.set_attr(p, "title", "\"q\"");
        assert_eq!(
            doc.inner_html(doc.root()),
            "<p title=\"&quot;q&quot;\">a &lt; b &amp; c<b>x</b></p>"
        );
        assert!(matches!(doc.kind(raw), NodeKind::Raw(_)));
    }

    #[test]
    fn test_descendants_document_order() {
        let mut doc = Document::new();
        let (p1, t1) = paragraph(&mut doc, "1");
        let (p2, t2) = paragraph(&mut doc, "2");
        assert_eq!(doc.descendants(doc.root()), vec![p1, t1, p2, t2]);
        assert_eq!(doc.text_content(doc.root()), "12");
    }
}
