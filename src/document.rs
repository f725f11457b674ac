//! Arena-backed element/text tree with DOM-like form-control state
use crate::errors::TreeError;
use crate::tree::{TreeMut, TreeRead};
use crate::types::{ControlFacet, NodeKind, SelectionRange, input_type, input_type_supports_selection};
use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena slot plus the slot's generation at creation time. Once the node is
/// reclaimed the handle never resolves again, even if the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
}

/// Runtime state written through the control setters. `None` means the markup
/// default still applies.
#[derive(Debug, Clone, Default)]
struct ControlState {
    value: Option<String>,
    checked: Option<bool>,
    selected: Option<bool>,
    selection: Option<SelectionRange>,
}

#[derive(Debug, Clone)]
struct NodeEntry {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    control: ControlState,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    entry: Option<NodeEntry>,
}

/// Serializable view of a subtree's markup-level shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeSnapshot {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        children: Vec<NodeSnapshot>,
    },
    Text {
        text: String,
    },
}

/// Removed subtrees stay addressable until `release_detached` runs, which the
/// reconciler does once at the end of every call. Freed slots are reused under a
/// bumped generation.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    focused: Option<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Document::new("div")
    }
}

impl Document {
    pub fn new(root_tag: &str) -> Self {
        let mut document = Document {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            focused: None,
        };
        document.root = document.create_element(root_tag);
        document
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    /// Nodes currently allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    /// Size of the arena including free slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let entry = NodeEntry {
            data,
            parent: None,
            children: Vec::new(),
            control: ControlState::default(),
        };
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                slot.entry = Some(entry);
                return NodeId {
                    index,
                    generation: slot.generation,
                };
            }
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn get(&self, id: NodeId) -> Option<&NodeEntry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeEntry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    fn entry(&self, id: NodeId) -> Result<&NodeEntry, TreeError> {
        self.get(id).ok_or_else(|| TreeError::UnknownNode {
            details: id.to_string(),
        })
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry, TreeError> {
        self.get_mut(id).ok_or_else(|| TreeError::UnknownNode {
            details: id.to_string(),
        })
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|entry| entry.parent)
    }

    /// True when `node` is `ancestor` or lies inside its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    /// Follows child indices from the root.
    pub fn node_at(&self, path: &[usize]) -> Option<NodeId> {
        let mut current = self.root;
        for &index in path {
            current = *self.get(current)?.children.get(index)?;
        }
        Some(current)
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(entry) = self.get(id) else {
            return;
        };
        match &entry.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element { .. } => {
                for child in &entry.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Gives input focus to an attached element.
    pub fn focus(&mut self, id: NodeId) -> Result<(), TreeError> {
        if self.kind(id) != NodeKind::Element || !self.is_attached(id) {
            return Err(TreeError::WrongKind {
                operation: "focus",
                kind: self.describe(id),
            });
        }
        self.focused = Some(id);
        Ok(())
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    pub fn snapshot(&self, id: NodeId) -> Option<NodeSnapshot> {
        let entry = self.get(id)?;
        Some(match &entry.data {
            NodeData::Text(text) => NodeSnapshot::Text { text: text.clone() },
            NodeData::Element { tag, attributes } => NodeSnapshot::Element {
                tag: tag.clone(),
                attributes: attributes.clone(),
                children: entry
                    .children
                    .iter()
                    .filter_map(|child| self.snapshot(*child))
                    .collect(),
            },
        })
    }

    fn describe(&self, id: NodeId) -> String {
        match self.get(id).map(|entry| &entry.data) {
            Some(NodeData::Element { tag, .. }) => format!("<{tag}> {id}"),
            Some(NodeData::Text(_)) => format!("text {id}"),
            None => format!("unknown {id}"),
        }
    }

    fn facet(&self, id: NodeId) -> Option<ControlFacet> {
        match self.tag(id)? {
            "input" => Some(input_type(self.attribute(id, "type")).1),
            "textarea" => Some(ControlFacet::TextArea),
            "option" => Some(ControlFacet::Option),
            _ => None,
        }
    }

    fn supports_selection(&self, id: NodeId) -> bool {
        match self.tag(id) {
            Some("textarea") => true,
            Some("input") => input_type_supports_selection(input_type(self.attribute(id, "type")).0),
            _ => false,
        }
    }

    fn value_len(&self, id: NodeId) -> usize {
        self.value(id).map(|v| v.chars().count()).unwrap_or(0)
    }

    fn detach(&mut self, child: NodeId) -> Result<(), TreeError> {
        if let Some(old_parent) = self.entry(child)?.parent {
            self.entry_mut(old_parent)?.children.retain(|c| *c != child);
            self.entry_mut(child)?.parent = None;
        }
        Ok(())
    }

    fn ensure_child(&self, parent: NodeId, child: NodeId) -> Result<usize, TreeError> {
        self.entry(parent)?
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or_else(|| TreeError::NotAChild {
                parent: self.describe(parent),
                child: self.describe(child),
            })
    }

    fn ensure_element(&self, id: NodeId, operation: &'static str) -> Result<(), TreeError> {
        match self.entry(id)?.data {
            NodeData::Element { .. } => Ok(()),
            NodeData::Text(_) => Err(TreeError::WrongKind {
                operation,
                kind: self.describe(id),
            }),
        }
    }

    fn ensure_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.ensure_element(parent, "insert")?;
        self.entry(child)?;
        if self.contains(child, parent) {
            return Err(TreeError::Cycle {
                parent: self.describe(parent),
                child: self.describe(child),
            });
        }
        Ok(())
    }

    fn drop_focus_within(&mut self, subtree: NodeId) {
        if let Some(focused) = self.focused {
            if self.contains(subtree, focused) {
                self.focused = None;
            }
        }
    }

    fn import_node<S: TreeRead + ?Sized>(&mut self, source: &S, node: S::Handle) -> NodeId {
        let id = match source.kind(node) {
            NodeKind::Text => self.create_text(source.text(node).unwrap_or_default()),
            NodeKind::Element => {
                let id = self.create_element(source.tag(node).unwrap_or("div"));
                if let Some(NodeData::Element { attributes, .. }) =
                    self.get_mut(id).map(|entry| &mut entry.data)
                {
                    attributes.extend(source.attributes(node));
                }
                id
            }
        };
        for child in source.children(node) {
            let copy = self.import_node(source, child);
            if let Some(entry) = self.get_mut(copy) {
                entry.parent = Some(id);
            }
            if let Some(entry) = self.get_mut(id) {
                entry.children.push(copy);
            }
        }
        self.copy_control_state(source, node, id);
        id
    }

    // Only state that differs from the copied markup default becomes written state.
    fn copy_control_state<S: TreeRead + ?Sized>(&mut self, source: &S, node: S::Handle, id: NodeId) {
        let Some(facet) = self.facet(id) else {
            return;
        };
        let value = source.value(node).filter(|v| Some(v) != self.value(id).as_ref());
        let checked = source.checked(node);
        let checked = (facet.carries_checked() && checked != self.checked(id)).then_some(checked);
        let selected = source.selected(node);
        let selected = (facet == ControlFacet::Option && selected != self.selected(id)).then_some(selected);
        let Some(control) = self.get_mut(id).map(|entry| &mut entry.control) else {
            return;
        };
        if facet != ControlFacet::Option {
            control.value = value;
        }
        control.checked = checked;
        control.selected = selected;
    }
}

impl TreeRead for Document {
    type Handle = NodeId;

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node)
            .map(|entry| entry.children.clone())
            .unwrap_or_default()
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        match self.get(node).map(|entry| &entry.data) {
            Some(NodeData::Element { .. }) => NodeKind::Element,
            _ => NodeKind::Text,
        }
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.data {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        match self.get(node).map(|entry| &entry.data) {
            Some(NodeData::Element { attributes, .. }) => attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.get(node)?.data {
            NodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    fn value(&self, node: NodeId) -> Option<String> {
        let entry = self.get(node)?;
        match self.tag(node)? {
            "input" => Some(
                entry
                    .control
                    .value
                    .clone()
                    .or_else(|| self.attribute(node, "value").map(str::to_string))
                    .unwrap_or_default(),
            ),
            "textarea" => Some(
                entry
                    .control
                    .value
                    .clone()
                    .unwrap_or_else(|| self.text_content(node)),
            ),
            _ => None,
        }
    }

    fn checked(&self, node: NodeId) -> bool {
        match self.get(node) {
            Some(entry) if self.tag(node) == Some("input") => entry
                .control
                .checked
                .unwrap_or_else(|| self.has_attribute(node, "checked")),
            _ => false,
        }
    }

    fn selected(&self, node: NodeId) -> bool {
        match self.get(node) {
            Some(entry) if self.tag(node) == Some("option") => entry
                .control
                .selected
                .unwrap_or_else(|| self.has_attribute(node, "selected")),
            _ => false,
        }
    }
}

impl TreeMut for Document {
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        let kind = self.describe(node);
        match &mut self.entry_mut(node)?.data {
            NodeData::Element { attributes, .. } => {
                attributes.insert(name.to_string(), value.to_string());
                Ok(())
            }
            NodeData::Text(_) => Err(TreeError::WrongKind {
                operation: "set_attribute",
                kind,
            }),
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), TreeError> {
        let kind = self.describe(node);
        match &mut self.entry_mut(node)?.data {
            NodeData::Element { attributes, .. } => {
                attributes.shift_remove(name);
                Ok(())
            }
            NodeData::Text(_) => Err(TreeError::WrongKind {
                operation: "remove_attribute",
                kind,
            }),
        }
    }

    fn import_subtree<S: TreeRead + ?Sized>(
        &mut self,
        source: &S,
        node: S::Handle,
    ) -> Result<NodeId, TreeError> {
        Ok(self.import_node(source, node))
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), TreeError> {
        self.ensure_insertable(parent, child)?;
        if before == Some(child) {
            // Inserting a node before itself keeps it where it is.
            return self.ensure_child(parent, child).map(|_| ());
        }
        if let Some(before) = before {
            self.ensure_child(parent, before)?;
        }
        self.detach(child)?;
        let index = match before {
            Some(before) => self.ensure_child(parent, before)?,
            None => self.entry(parent)?.children.len(),
        };
        self.entry_mut(parent)?.children.insert(index, child);
        self.entry_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let index = self.ensure_child(parent, child)?;
        self.entry_mut(parent)?.children.remove(index);
        self.entry_mut(child)?.parent = None;
        self.drop_focus_within(child);
        Ok(())
    }

    fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<(), TreeError> {
        self.ensure_child(parent, old_child)?;
        if new_child == old_child {
            return Ok(());
        }
        self.ensure_insertable(parent, new_child)?;
        self.detach(new_child)?;
        let index = self.ensure_child(parent, old_child)?;
        self.entry_mut(parent)?.children[index] = new_child;
        self.entry_mut(new_child)?.parent = Some(parent);
        self.entry_mut(old_child)?.parent = None;
        self.drop_focus_within(old_child);
        Ok(())
    }

    fn set_value(&mut self, node: NodeId, value: &str) -> Result<(), TreeError> {
        if !self.facet(node).is_some_and(|f| f != ControlFacet::Option) {
            return Err(TreeError::WrongKind {
                operation: "set_value",
                kind: self.describe(node),
            });
        }
        let changed = self.value(node).as_deref() != Some(value);
        let selectable = self.supports_selection(node);
        let control = &mut self.entry_mut(node)?.control;
        control.value = Some(value.to_string());
        if changed && selectable {
            // Programmatic value changes put the caret at the end.
            control.selection = Some(SelectionRange::collapsed(value.chars().count()));
        }
        Ok(())
    }

    fn set_checked(&mut self, node: NodeId, checked: bool) -> Result<(), TreeError> {
        if self.tag(node) != Some("input") {
            return Err(TreeError::WrongKind {
                operation: "set_checked",
                kind: self.describe(node),
            });
        }
        self.entry_mut(node)?.control.checked = Some(checked);
        Ok(())
    }

    fn set_selected(&mut self, node: NodeId, selected: bool) -> Result<(), TreeError> {
        if self.tag(node) != Some("option") {
            return Err(TreeError::WrongKind {
                operation: "set_selected",
                kind: self.describe(node),
            });
        }
        self.entry_mut(node)?.control.selected = Some(selected);
        Ok(())
    }

    fn is_focused(&self, node: NodeId) -> bool {
        self.focused == Some(node)
    }

    fn selection_range(&self, node: NodeId) -> Option<SelectionRange> {
        if !self.supports_selection(node) {
            return None;
        }
        let len = self.value_len(node);
        let stored = self.get(node)?.control.selection;
        Some(stored.unwrap_or(SelectionRange::collapsed(len)).clamp(len))
    }

    fn set_selection_range(&mut self, node: NodeId, range: SelectionRange) -> Result<(), TreeError> {
        if !self.supports_selection(node) {
            return Err(TreeError::WrongKind {
                operation: "set_selection_range",
                kind: self.describe(node),
            });
        }
        let len = self.value_len(node);
        self.entry_mut(node)?.control.selection = Some(range.clamp(len));
        Ok(())
    }

    /// Frees every node that is unreachable from the root.
    fn release_detached(&mut self) {
        let mut reachable = vec![false; self.slots.len()];
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            if let Some(entry) = self.get(id) {
                reachable[id.index as usize] = true;
                pending.extend(entry.children.iter().copied());
            }
        }

        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.is_some() && !reachable[index] {
                slot.entry = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                freed += 1;
            }
        }
        if self.focused.is_some_and(|id| self.get(id).is_none()) {
            self.focused = None;
        }
        if freed > 0 {
            trace!("reclaimed {freed} detached nodes");
        }
    }
}
