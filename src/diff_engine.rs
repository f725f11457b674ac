//! Per-node replace-or-update decision and recursive descent
use crate::align::{Keys, align_children};
use crate::attributes::sync_attributes;
use crate::config::MorphOptions;
use crate::control_state::sync_control_state;
use crate::errors::{InvariantViolation, MorphError};
use crate::keys::KeyResolver;
use crate::tree::{TreeMut, TreeRead};
use crate::types::{ControlFacet, MorphStats, NodeClass, classify};
use log::{error, trace};

/// State of one reconciliation call. Dropping the engine discards the key cache.
pub struct DiffEngine<'a, C: TreeRead, L: TreeMut> {
    candidate: &'a C,
    live: &'a mut L,
    options: &'a MorphOptions,
    keys: Keys<C, L>,
    stats: MorphStats,
}

impl<'a, C: TreeRead, L: TreeMut> DiffEngine<'a, C, L> {
    pub fn new(candidate: &'a C, live: &'a mut L, options: &'a MorphOptions) -> Self {
        DiffEngine {
            candidate,
            live,
            options,
            keys: KeyResolver::new(&options.key_attribute),
            stats: MorphStats::default(),
        }
    }

    pub fn into_stats(self) -> MorphStats {
        self.stats
    }

    /// Reconciles the children of `live_node` against those of `candidate_node`.
    pub fn diff(&mut self, candidate_node: C::Handle, live_node: L::Handle) -> Result<(), MorphError> {
        align_children(
            self.candidate,
            candidate_node,
            &mut *self.live,
            live_node,
            &mut self.keys,
            &mut self.stats,
        )?;

        let candidate_children = self.candidate.children(candidate_node);
        let live_children = self.live.children(live_node);
        if candidate_children.len() != live_children.len() {
            let violation = InvariantViolation::ChildCountMismatch {
                candidate: candidate_children.len(),
                live: live_children.len(),
            };
            error!("{violation}");
            return Err(violation.into());
        }

        for (candidate_child, live_child) in candidate_children.into_iter().zip(live_children) {
            self.compare(candidate_child, live_child, live_node)?;
        }
        Ok(())
    }

    /// Replaces `live_node` with a clone of `candidate_node`, or updates it in place
    /// and descends into its children.
    pub fn compare(
        &mut self,
        candidate_node: C::Handle,
        live_node: L::Handle,
        live_parent: L::Handle,
    ) -> Result<(), MorphError> {
        let wanted = classify(self.candidate, candidate_node);
        let current = classify(&*self.live, live_node);

        if should_replace(&wanted, &current) {
            trace!("replacing {:?} under {:?}", live_node, live_parent);
            let clone = self.live.import_subtree(self.candidate, candidate_node)?;
            self.live.replace_child(live_parent, clone, live_node)?;
            self.stats.replaced += 1;
            return Ok(());
        }

        if let Some(facet) = current.control() {
            sync_control_state(
                facet,
                self.candidate,
                candidate_node,
                &mut *self.live,
                live_node,
                self.options.preserve_selection,
                &mut self.stats,
            )?;
        }

        if let NodeClass::Element { control, .. } = current {
            sync_attributes(
                self.candidate,
                candidate_node,
                &mut *self.live,
                live_node,
                &mut self.stats,
            )?;
            // A text-area's children are its default value; its content is owned by
            // the value assignment above.
            if control != Some(ControlFacet::TextArea) {
                self.diff(candidate_node, live_node)?;
            }
        }
        Ok(())
    }
}

fn should_replace(wanted: &NodeClass, current: &NodeClass) -> bool {
    match (wanted, current) {
        (NodeClass::Text { value: a }, NodeClass::Text { value: b }) => a != b,
        (
            NodeClass::Element {
                tag: a,
                input_type: a_type,
                ..
            },
            NodeClass::Element {
                tag: b,
                input_type: b_type,
                ..
            },
        ) => a != b || a_type != b_type,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, NodeId};
    use crate::types::SelectionRange;

    fn input(doc: &mut Document, parent: NodeId, ty: &str, value: &str) -> NodeId {
        let node = doc.create_element("input");
        doc.set_attribute(node, "type", ty).unwrap();
        doc.set_attribute(node, "value", value).unwrap();
        doc.append_child(parent, node).unwrap();
        node
    }

    fn run(candidate: &Document, live: &mut Document) -> MorphStats {
        let options = MorphOptions::default();
        let l_root = live.root();
        let mut engine = DiffEngine::new(candidate, live, &options);
        engine.diff(candidate.root(), l_root).unwrap();
        engine.into_stats()
    }

    #[test]
    fn different_input_types_replace_the_node() {
        let mut candidate = Document::default();
        let c_root = candidate.root();
        input(&mut candidate, c_root, "checkbox", "on");

        let mut live = Document::default();
        let l_root = live.root();
        let old = input(&mut live, l_root, "text", "typed");
        live.set_attribute(old, "class", "keep-me").unwrap();
        live.focus(old).unwrap();

        let stats = run(&candidate, &mut live);
        let now = live.children(l_root)[0];
        assert_ne!(now, old);
        assert_eq!(live.attribute(now, "type"), Some("checkbox"));
        assert!(!live.has_attribute(now, "class"));
        assert_eq!(live.focused(), None);
        assert_eq!(stats.replaced, 1);
    }

    #[test]
    fn same_type_updates_in_place() {
        let mut candidate = Document::default();
        let c_root = candidate.root();
        input(&mut candidate, c_root, "text", "new");

        let mut live = Document::default();
        let l_root = live.root();
        let old = input(&mut live, l_root, "TEXT", "old");
        live.set_value(old, "typed").unwrap();

        run(&candidate, &mut live);
        assert_eq!(live.children(l_root), vec![old]);
        assert_eq!(live.value(old).as_deref(), Some("new"));
        assert_eq!(live.attribute(old, "type"), Some("text"));
    }

    #[test]
    fn textarea_children_are_never_diffed() {
        let mut candidate = Document::default();
        let c_area = candidate.create_element("textarea");
        let c_text = candidate.create_text("candidate body");
        candidate.append_child(c_area, c_text).unwrap();
        let c_root = candidate.root();
        candidate.append_child(c_root, c_area).unwrap();

        let mut live = Document::default();
        let l_area = live.create_element("textarea");
        let l_text = live.create_text("stale body");
        live.append_child(l_area, l_text).unwrap();
        let l_root = live.root();
        live.append_child(l_root, l_area).unwrap();
        live.focus(l_area).unwrap();
        live.set_selection_range(l_area, SelectionRange::new(1, 4)).unwrap();

        let stats = run(&candidate, &mut live);
        assert_eq!(live.children(l_area), vec![l_text]);
        assert_eq!(live.text(l_text), Some("stale body"));
        assert_eq!(live.value(l_area).as_deref(), Some("candidate body"));
        assert_eq!(live.selection_range(l_area), Some(SelectionRange::new(1, 4)));
        assert_eq!(stats.replaced, 0);
        assert_eq!(stats.selections_restored, 1);
    }

    #[test]
    fn differing_text_is_replaced_not_edited() {
        let mut candidate = Document::default();
        let c_root = candidate.root();
        let c_text = candidate.create_text("after");
        candidate.append_child(c_root, c_text).unwrap();

        let mut live = Document::default();
        let l_root = live.root();
        let l_text = live.create_text("before");
        live.append_child(l_root, l_text).unwrap();

        run(&candidate, &mut live);
        let now = live.children(l_root)[0];
        assert_ne!(now, l_text);
        assert_eq!(live.text(now), Some("after"));
    }

    #[test]
    fn replace_decision_table() {
        let text = |v: &str| NodeClass::Text { value: v.to_string() };
        let element = |tag: &str, ty: Option<&'static str>| NodeClass::Element {
            tag: tag.to_string(),
            input_type: ty,
            control: None,
        };
        assert!(!should_replace(&text("a"), &text("a")));
        assert!(should_replace(&text("a"), &text("b")));
        assert!(should_replace(&text("a"), &element("p", None)));
        assert!(should_replace(&element("p", None), &element("div", None)));
        assert!(!should_replace(&element("p", None), &element("p", None)));
        assert!(should_replace(&element("input", Some("text")), &element("input", Some("email"))));
    }
}
