//! A small arena DOM.
//!
//! Node handles are generational: once a node is freed its [`NodeId`] never resolves again,
//! even if the slot is reused. Handle equality is node identity.

use std::fmt;

use crate::error::{Error, Result};
use crate::html;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<NodeData>,
}

#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        doc.root = doc.alloc(NodeKind::Document);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, detached ones included.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(data);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(data),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .ok_or(Error::StaleNode(id))?;
        if slot.generation != id.generation {
            return Err(Error::StaleNode(id));
        }
        slot.node.as_mut().ok_or(Error::StaleNode(id))
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    /// True while `id` refers to a node that has not been freed.
    pub fn contains(&self, id: NodeId) -> bool {
        self.data(id).is_some()
    }

    /// True when `id` is connected to the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(node) = cur {
            if node == self.root {
                return true;
            }
            cur = self.data(node).and_then(|d| d.parent);
        }
        false
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(
            self.data(id).map(|d| &d.kind),
            Some(NodeKind::Element { .. })
        )
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).map(|d| &d.kind)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.data(id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.data(id)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match self.data(id).map(|d| &d.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs.as_slice(),
            _ => &[],
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        if let NodeKind::Element { attrs, .. } = &mut self.data_mut(id)?.kind {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<()> {
        if let NodeKind::Element { attrs, .. } = &mut self.data_mut(id)?.kind {
            attrs.retain(|(k, _)| k != name);
        }
        Ok(())
    }

    /// Replace all attributes of `id` with `attrs`.
    pub fn replace_attrs(&mut self, id: NodeId, new_attrs: Vec<(String, String)>) -> Result<()> {
        if let NodeKind::Element { attrs, .. } = &mut self.data_mut(id)?.kind {
            *attrs = new_attrs;
        }
        Ok(())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }

    /// Remove `id` from its parent; the subtree stays alive.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.data_mut(id)?.parent.take();
        if let Some(parent) = parent {
            if let Ok(p) = self.data_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
        Ok(())
    }

    /// Insert `child` under `parent` before `reference` (or last when `None`), moving it from
    /// its previous parent if needed.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        if !self.contains(parent) {
            return Err(Error::StaleNode(parent));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(Error::Hierarchy { parent, child });
        }
        self.detach(child)?;
        let p = self.data_mut(parent)?;
        let at = reference
            .and_then(|r| p.children.iter().position(|&c| c == r))
            .unwrap_or(p.children.len());
        p.children.insert(at, child);
        self.data_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Put `new` where `old` is; `old` ends up detached but alive.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        if old == new {
            return Ok(());
        }
        let Some(parent) = self.parent(old) else {
            return self.detach(new);
        };
        self.insert_before(parent, new, Some(old))?;
        self.detach(old)
    }

    /// Detach `id` and free its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let slot = &mut self.slots[n.index as usize];
            if slot.generation != n.generation {
                continue;
            }
            if let Some(data) = slot.node.take() {
                stack.extend(data.children);
                self.free.push(n.index);
            }
        }
        Ok(())
    }

    /// Free every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) -> Result<()> {
        let children = self.children(id).to_vec();
        for child in children {
            self.remove(child)?;
        }
        Ok(())
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Pre-order descendants of `id` carrying attribute `name`.
    pub fn find_with_attr(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.attr(n, name).is_some())
            .collect()
    }

    pub fn find_by_class(&self, id: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.has_class(n, class))
            .collect()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeKind::Text(t)) = self.kind(id) {
            out.push_str(t);
        }
        for n in self.descendants(id) {
            if let Some(NodeKind::Text(t)) = self.kind(n) {
                out.push_str(t);
            }
        }
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            html::serialize_into(self, child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        html::serialize_into(self, id, &mut out);
        out
    }

    /// Materialise `markup` as detached top-level nodes.
    pub fn parse_fragment(&mut self, markup: &str) -> Vec<NodeId> {
        html::parse_fragment(self, markup)
    }

    /// Replace the children of `id` with the nodes parsed from `markup`.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Result<()> {
        if !self.contains(id) {
            return Err(Error::StaleNode(id));
        }
        self.clear_children(id)?;
        for node in self.parse_fragment(markup) {
            self.append_child(id, node)?;
        }
        Ok(())
    }
}
