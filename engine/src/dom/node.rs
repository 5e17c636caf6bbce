use thiserror::Error;

pub type NodeId = usize;

/// Errors raised when a node id does not refer to something usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("node {0} does not exist")]
    NoSuchNode(NodeId),
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
    #[error("node {0} is detached from the document")]
    Detached(NodeId),
}

#[derive(Debug, Clone)]
pub enum NodeType {
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag_name: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementData {
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the first attribute with a matching name, or appends one.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.attributes.remove(idx).1)
    }

    /// Whitespace separated tokens of the `class` attribute.
    pub fn class_list(&self) -> impl Iterator<Item = &str> {
        self.get_attribute("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_list().any(|c| c == class)
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub node_type: NodeType,
}

#[derive(Debug, Default)]
pub struct Dom {
    pub nodes: Vec<Node>,
    /// Contents of the page's `<!DOCTYPE ...>`, if it had one.
    pub doctype: Option<String>,
}

impl Dom {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            doctype: None,
        }
    }

    /// A dom holding only the synthetic `document` root.
    pub fn with_document() -> Self {
        let mut dom = Self::new();
        dom.create_element("document", vec![], None);
        dom
    }

    pub fn create_element(
        &mut self,
        tag_name: &str,
        attrs: Vec<(String, String)>,
        parent: Option<NodeId>,
    ) -> NodeId {
        let element = ElementData {
            tag_name: tag_name.to_string(),
            attributes: attrs,
        };
        self.push_node(NodeType::Element(element), parent)
    }

    pub fn create_text(&mut self, text: &str, parent: Option<NodeId>) -> NodeId {
        self.push_node(NodeType::Text(text.to_string()), parent)
    }

    pub fn create_comment(&mut self, text: &str, parent: Option<NodeId>) -> NodeId {
        self.push_node(NodeType::Comment(text.to_string()), parent)
    }

    fn push_node(&mut self, node_type: NodeType, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            children: vec![],
            parent,
            node_type,
        });
        if let Some(pid) = parent {
            self.nodes[pid].children.push(id);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id).ok_or(DomError::NoSuchNode(id))
    }

    pub fn element(&self, id: NodeId) -> Result<&ElementData, DomError> {
        match &self.node(id)?.node_type {
            NodeType::Element(el) => Ok(el),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        let node = self.nodes.get_mut(id).ok_or(DomError::NoSuchNode(id))?;
        match &mut node.node_type {
            NodeType::Element(el) => Ok(el),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Result<Option<&str>, DomError> {
        Ok(self.element(id)?.get_attribute(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?.set_attribute(name, value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        Ok(self.element_mut(id)?.remove_attribute(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> Result<bool, DomError> {
        Ok(self.element(id)?.has_class(class))
    }

    /// Elements reachable from the root whose class list contains `class`,
    /// in document order. `<template>` contents are inert and not searched.
    pub fn elements_by_class_name(&self, class: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        if self.nodes.is_empty() {
            return found;
        }
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            let NodeType::Element(el) = &node.node_type else {
                continue;
            };
            if id != self.root() && el.has_class(class) {
                found.push(id);
            }
            if !el.is("template") {
                stack.extend(node.children.iter().rev());
            }
        }
        found
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.element(parent)?;
        self.node(child)?;
        self.detach(child)?;
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        Ok(())
    }

    /// Unlinks `id` from its parent. The subtree stays in the arena.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self.node(id)?.parent;
        if let Some(pid) = parent {
            self.nodes[pid].children.retain(|&c| c != id);
        }
        self.nodes[id].parent = None;
        Ok(())
    }

    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            dom: self,
            next: self.nodes.get(id).and_then(|n| n.parent),
        }
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        if id == self.root() {
            return !self.nodes.is_empty();
        }
        if id >= self.nodes.len() {
            return false;
        }
        self.ancestors(id).last() == Some(self.root())
    }
}

pub struct Ancestors<'a> {
    dom: &'a Dom,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.dom.nodes[id].parent;
        Some(id)
    }
}
