//! Capabilities the reconciler needs from a tree.
//!
//! The candidate tree only has to be readable; the live tree must also support the
//! primitive mutations. Handles must stay unique for the duration of one
//! reconciliation call (a removed node's handle must not be recycled mid-call);
//! `TreeMut::release_detached` marks the point after which it may be.
use crate::errors::TreeError;
use crate::types::{NodeKind, SelectionRange};
use std::fmt::Debug;
use std::hash::Hash;

pub trait TreeRead {
    type Handle: Copy + Eq + Hash + Debug;

    /// Children in document order.
    fn children(&self, node: Self::Handle) -> Vec<Self::Handle>;

    fn kind(&self, node: Self::Handle) -> NodeKind;

    /// Lowercase tag name; `None` for text nodes.
    fn tag(&self, node: Self::Handle) -> Option<&str>;

    /// Text content of a text node; `None` for elements.
    fn text(&self, node: Self::Handle) -> Option<&str>;

    /// Attributes in insertion order.
    fn attributes(&self, node: Self::Handle) -> Vec<(String, String)>;

    fn attribute(&self, node: Self::Handle, name: &str) -> Option<&str>;

    fn has_attribute(&self, node: Self::Handle, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Current value of a form control; `None` for nodes without one.
    fn value(&self, node: Self::Handle) -> Option<String>;

    fn checked(&self, node: Self::Handle) -> bool;

    fn selected(&self, node: Self::Handle) -> bool;
}

pub trait TreeMut: TreeRead {
    fn set_attribute(&mut self, node: Self::Handle, name: &str, value: &str)
    -> Result<(), TreeError>;

    fn remove_attribute(&mut self, node: Self::Handle, name: &str) -> Result<(), TreeError>;

    /// Deep-copies `node` out of `source` into this tree. The copy is detached and
    /// carries markup and control state, never focus or selection.
    fn import_subtree<S: TreeRead + ?Sized>(
        &mut self,
        source: &S,
        node: S::Handle,
    ) -> Result<Self::Handle, TreeError>;

    /// Moves or inserts `child` before `before`, appending when `before` is `None`.
    /// `child` is detached from any previous parent first.
    fn insert_before(
        &mut self,
        parent: Self::Handle,
        child: Self::Handle,
        before: Option<Self::Handle>,
    ) -> Result<(), TreeError>;

    fn append_child(&mut self, parent: Self::Handle, child: Self::Handle) -> Result<(), TreeError> {
        self.insert_before(parent, child, None)
    }

    fn remove_child(&mut self, parent: Self::Handle, child: Self::Handle) -> Result<(), TreeError>;

    fn replace_child(
        &mut self,
        parent: Self::Handle,
        new_child: Self::Handle,
        old_child: Self::Handle,
    ) -> Result<(), TreeError>;

    fn set_value(&mut self, node: Self::Handle, value: &str) -> Result<(), TreeError>;

    fn set_checked(&mut self, node: Self::Handle, checked: bool) -> Result<(), TreeError>;

    fn set_selected(&mut self, node: Self::Handle, selected: bool) -> Result<(), TreeError>;

    fn is_focused(&self, node: Self::Handle) -> bool;

    /// `None` when the node has no selection range (not a text control, or a type
    /// that does not expose one).
    fn selection_range(&self, node: Self::Handle) -> Option<SelectionRange>;

    fn set_selection_range(
        &mut self,
        node: Self::Handle,
        range: SelectionRange,
    ) -> Result<(), TreeError>;

    /// Runs once when a reconciliation call ends, whether it succeeded or not.
    /// Trees may reclaim nodes that are no longer attached; handles to them must
    /// not resolve afterwards.
    fn release_detached(&mut self) {}
}
