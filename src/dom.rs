use std::collections::HashMap;

use crate::error::{Error, Result};

/// Handle to a node in a [`Page`](crate::Page) document.
///
/// Handles stay valid after the node is detached; a detached node is simply no
/// longer reachable from the document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let id_attr = attrs.get("id").cloned();
        let id = self.create_node(Some(parent), NodeType::Element(Element { tag_name, attrs }));
        if let Some(id_attr) = id_attr {
            if self.is_connected(id) {
                self.id_index.entry(id_attr).or_insert(id);
            }
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn is_valid_node(&self, node_id: NodeId) -> bool {
        node_id.0 < self.nodes.len()
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0)?.parent
    }

    pub(crate) fn is_connected(&self, node_id: NodeId) -> bool {
        let mut cursor = Some(node_id);
        while let Some(current) = cursor {
            if current == self.root {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    /// Inclusive ancestor chain, innermost first.
    pub(crate) fn path_to_root(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cursor = Some(node_id);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.parent(node);
        }
        path
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document | NodeType::Element(_) => {
                let mut out = String::new();
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
            NodeType::Text(text) => text.clone(),
        }
    }

    pub(crate) fn set_text_content(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        if self.element(node_id).is_none() {
            return Err(Error::NotAnElement(node_id));
        }
        let old_children = std::mem::take(&mut self.nodes[node_id.0].children);
        for child in old_children {
            self.nodes[child.0].parent = None;
        }
        if !value.is_empty() {
            self.create_text(node_id, value.to_string());
        }
        self.rebuild_id_index();
        Ok(())
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.element(node_id)
            .and_then(|e| e.attrs.get(&name.to_ascii_lowercase()))
            .map(String::as_str)
    }

    pub(crate) fn has_attr(&self, node_id: NodeId, name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|e| e.attrs.contains_key(&name.to_ascii_lowercase()))
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let lowered = name.to_ascii_lowercase();
        let element = self
            .element_mut(node_id)
            .ok_or(Error::NotAnElement(node_id))?;
        element.attrs.insert(lowered.clone(), value.to_string());
        if lowered == "id" {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub(crate) fn remove_attr(&mut self, node_id: NodeId, name: &str) -> Result<()> {
        let lowered = name.to_ascii_lowercase();
        let element = self
            .element_mut(node_id)
            .ok_or(Error::NotAnElement(node_id))?;
        element.attrs.remove(&lowered);
        if lowered == "id" {
            self.rebuild_id_index();
        }
        Ok(())
    }

    /// Moves the children of `fragment`'s root under `parent`, keeping their order.
    pub(crate) fn append_fragment(&mut self, parent: NodeId, fragment: &Dom) -> Result<Vec<NodeId>> {
        if !self.can_have_children(parent) {
            return Err(Error::NotAnElement(parent));
        }
        let mut appended = Vec::new();
        for child in &fragment.nodes[fragment.root.0].children {
            appended.push(self.clone_subtree_from_dom(fragment, *child, parent));
        }
        self.rebuild_id_index();
        Ok(appended)
    }

    fn clone_subtree_from_dom(&mut self, source: &Dom, source_node: NodeId, parent: NodeId) -> NodeId {
        let node_type = source.nodes[source_node.0].node_type.clone();
        let node = self.create_node(Some(parent), node_type);
        for child in &source.nodes[source_node.0].children {
            self.clone_subtree_from_dom(source, *child, node);
        }
        node
    }

    fn can_have_children(&self, node_id: NodeId) -> bool {
        matches!(
            self.nodes.get(node_id.0).map(|node| &node.node_type),
            Some(NodeType::Document | NodeType::Element(_))
        )
    }

    pub(crate) fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if node == self.root || self.element(node).is_none() {
            return Err(Error::NotAnElement(node));
        }
        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        self.nodes[parent.0].children.retain(|id| *id != node);
        self.nodes[node.0].parent = None;
        self.rebuild_id_index();
        Ok(())
    }

    fn rebuild_id_index(&mut self) {
        let mut next = HashMap::new();
        for node in self.all_element_nodes() {
            if let Some(id) = self.attr(node, "id") {
                next.entry(id.to_string()).or_insert(node);
            }
        }
        self.id_index = next;
    }

    fn collect_elements_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        if matches!(self.nodes[node_id.0].node_type, NodeType::Element(_)) {
            out.push(node_id);
        }
        for child in &self.nodes[node_id.0].children {
            self.collect_elements_dfs(*child, out);
        }
    }

    /// Every connected element in document order.
    pub(crate) fn all_element_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements_dfs(self.root, &mut out);
        out
    }

    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document => {
                let mut out = String::new();
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.dump_node(*child));
                }
                out
            }
            NodeType::Text(text) => text.clone(),
            NodeType::Element(element) => {
                let mut attrs = element.attrs.iter().collect::<Vec<_>>();
                attrs.sort();
                let mut out = String::new();
                out.push('<');
                out.push_str(&element.tag_name);
                for (k, v) in attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(v);
                    out.push('"');
                }
                out.push('>');
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.dump_node(*child));
                }
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
                out
            }
        }
    }

    /// Short human label used in trace lines, e.g. `div#save`.
    pub(crate) fn node_label(&self, node_id: NodeId) -> String {
        match self.nodes.get(node_id.0).map(|node| &node.node_type) {
            Some(NodeType::Document) => "document".into(),
            Some(NodeType::Text(_)) => "#text".into(),
            Some(NodeType::Element(element)) => match element.attrs.get("id") {
                Some(id) => format!("{}#{id}", element.tag_name),
                None => element.tag_name.clone(),
            },
            None => "?".into(),
        }
    }
}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;

    #[test]
    fn elements_are_collected_in_document_order() -> Result<()> {
        let dom = parse_html("<div id='a'><span id='b'></span></div><p id='c'></p>")?;
        let labels = dom
            .all_element_nodes()
            .into_iter()
            .map(|node| dom.node_label(node))
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["div#a", "span#b", "p#c"]);
        Ok(())
    }

    #[test]
    fn removed_nodes_leave_the_id_index_and_traversal() -> Result<()> {
        let mut dom = parse_html("<div id='a'><span id='b'></span></div>")?;
        let b = dom.by_id("b").ok_or_else(|| Error::SelectorNotFound("#b".into()))?;
        dom.remove_node(b)?;
        assert_eq!(dom.by_id("b"), None);
        assert!(!dom.is_connected(b));
        assert_eq!(dom.all_element_nodes().len(), 1);
        Ok(())
    }

    #[test]
    fn set_text_content_replaces_children() -> Result<()> {
        let mut dom = parse_html("<p id='p'>old <b>bold</b></p>")?;
        let p = dom.by_id("p").ok_or_else(|| Error::SelectorNotFound("#p".into()))?;
        dom.set_text_content(p, "new")?;
        assert_eq!(dom.text_content(p), "new");
        assert_eq!(dom.dump_node(p), "<p id=\"p\">new</p>");
        Ok(())
    }

    #[test]
    fn attributes_are_case_insensitive_by_name() -> Result<()> {
        let mut dom = parse_html("<div id='d' Data-Role='x'></div>")?;
        let d = dom.by_id("d").ok_or_else(|| Error::SelectorNotFound("#d".into()))?;
        assert_eq!(dom.attr(d, "data-role"), Some("x"));
        dom.set_attr(d, "DATA-ROLE", "y")?;
        assert_eq!(dom.attr(d, "data-role"), Some("y"));
        dom.remove_attr(d, "data-role")?;
        assert!(!dom.has_attr(d, "data-role"));
        Ok(())
    }

    #[test]
    fn attribute_writes_on_text_nodes_fail() -> Result<()> {
        let mut dom = parse_html("<p id='p'>text</p>")?;
        let p = dom.by_id("p").ok_or_else(|| Error::SelectorNotFound("#p".into()))?;
        let text = dom.nodes[p.0].children[0];
        assert_eq!(dom.set_attr(text, "x", "y"), Err(Error::NotAnElement(text)));
        Ok(())
    }

    #[test]
    fn truncate_chars_marks_cut_values() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
