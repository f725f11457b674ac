//! Copies runtime control state (selected, checked, value) onto a live node
use crate::errors::TreeError;
use crate::tree::{TreeMut, TreeRead};
use crate::types::{ControlFacet, MorphStats};
use log::trace;

/// Copies the state that `facet` carries from the candidate control to the live one.
pub fn sync_control_state<C, L>(
    facet: ControlFacet,
    candidate: &C,
    candidate_node: C::Handle,
    live: &mut L,
    live_node: L::Handle,
    preserve_selection: bool,
    stats: &mut MorphStats,
) -> Result<(), TreeError>
where
    C: TreeRead + ?Sized,
    L: TreeMut + ?Sized,
{
    if facet == ControlFacet::Option {
        let selected = candidate.selected(candidate_node);
        if live.selected(live_node) != selected {
            live.set_selected(live_node, selected)?;
        }
    } else if facet.carries_checked() {
        let checked = candidate.checked(candidate_node);
        if live.checked(live_node) != checked {
            live.set_checked(live_node, checked)?;
        }
    } else if facet.carries_value() {
        let value = candidate.value(candidate_node).unwrap_or_default();
        if assign_value(live, live_node, &value, preserve_selection, stats)? {
            stats.values_assigned += 1;
        }
    }
    // Button-like inputs keep whatever value the live control holds.
    Ok(())
}

/// Writes `value` into a live control, keeping the selection range in place when
/// the control holds focus. Returns whether a write happened.
pub fn assign_value<L: TreeMut + ?Sized>(
    live: &mut L,
    node: L::Handle,
    value: &str,
    preserve_selection: bool,
    stats: &mut MorphStats,
) -> Result<bool, TreeError> {
    if live.value(node).as_deref() == Some(value) {
        return Ok(false);
    }
    let saved = if preserve_selection && live.is_focused(node) {
        live.selection_range(node)
    } else {
        None
    };
    live.set_value(node, value)?;
    if let Some(range) = saved {
        trace!("restoring selection {}..{} on {:?}", range.start, range.end, node);
        live.set_selection_range(node, range)?;
        stats.selections_restored += 1;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, NodeId};
    use crate::types::SelectionRange;

    fn attached_input(doc: &mut Document, value: &str) -> NodeId {
        let input = doc.create_element("input");
        doc.set_attribute(input, "value", value).unwrap();
        doc.append_child(doc.root(), input).unwrap();
        input
    }

    #[test]
    fn focused_control_keeps_its_caret() {
        let mut live = Document::default();
        let input = attached_input(&mut live, "foo");
        live.focus(input).unwrap();
        live.set_selection_range(input, SelectionRange::collapsed(3)).unwrap();

        let mut stats = MorphStats::default();
        assert!(assign_value(&mut live, input, "foobar", true, &mut stats).unwrap());
        assert_eq!(live.value(input).as_deref(), Some("foobar"));
        assert_eq!(live.selection_range(input), Some(SelectionRange::collapsed(3)));
        assert_eq!(stats.selections_restored, 1);
    }

    #[test]
    fn unfocused_control_is_simply_overwritten() {
        let mut live = Document::default();
        let input = attached_input(&mut live, "foo");
        live.set_selection_range(input, SelectionRange::collapsed(1)).unwrap();

        let mut stats = MorphStats::default();
        assign_value(&mut live, input, "foobar", true, &mut stats).unwrap();
        assert_eq!(live.selection_range(input), Some(SelectionRange::collapsed(6)));
        assert_eq!(stats.selections_restored, 0);
    }

    #[test]
    fn preservation_can_be_switched_off() {
        let mut live = Document::default();
        let input = attached_input(&mut live, "foo");
        live.focus(input).unwrap();
        live.set_selection_range(input, SelectionRange::new(0, 2)).unwrap();

        let mut stats = MorphStats::default();
        assign_value(&mut live, input, "bar!", false, &mut stats).unwrap();
        assert_eq!(live.selection_range(input), Some(SelectionRange::collapsed(4)));
    }

    #[test]
    fn equal_value_is_not_written() {
        let mut live = Document::default();
        let input = attached_input(&mut live, "same");
        let mut stats = MorphStats::default();
        assert!(!assign_value(&mut live, input, "same", true, &mut stats).unwrap());
    }

    #[test]
    fn checked_and_selected_follow_the_candidate() {
        let mut candidate = Document::default();
        let c_box = candidate.create_element("input");
        candidate.set_attribute(c_box, "type", "checkbox").unwrap();
        candidate.set_attribute(c_box, "checked", "").unwrap();
        let c_opt = candidate.create_element("option");

        let mut live = Document::default();
        let l_box = live.create_element("input");
        live.set_attribute(l_box, "type", "checkbox").unwrap();
        let l_opt = live.create_element("option");
        live.set_selected(l_opt, true).unwrap();

        let mut stats = MorphStats::default();
        sync_control_state(ControlFacet::Checkbox, &candidate, c_box, &mut live, l_box, true, &mut stats)
            .unwrap();
        sync_control_state(ControlFacet::Option, &candidate, c_opt, &mut live, l_opt, true, &mut stats)
            .unwrap();

        assert!(live.checked(l_box));
        assert!(!live.selected(l_opt));
    }

    #[test]
    fn radio_checkedness_is_copied() {
        let mut candidate = Document::default();
        let c_radio = candidate.create_element("input");
        candidate.set_attribute(c_radio, "type", "radio").unwrap();

        let mut live = Document::default();
        let l_radio = live.create_element("input");
        live.set_attribute(l_radio, "type", "radio").unwrap();
        live.set_checked(l_radio, true).unwrap();

        let mut stats = MorphStats::default();
        sync_control_state(ControlFacet::Radio, &candidate, c_radio, &mut live, l_radio, true, &mut stats)
            .unwrap();
        assert!(!live.checked(l_radio));
    }

    #[test]
    fn button_like_value_is_left_alone() {
        let mut candidate = Document::default();
        let c_submit = candidate.create_element("input");
        candidate.set_attribute(c_submit, "type", "submit").unwrap();
        candidate.set_attribute(c_submit, "value", "Send").unwrap();

        let mut live = Document::default();
        let l_submit = live.create_element("input");
        live.set_attribute(l_submit, "type", "submit").unwrap();
        live.set_value(l_submit, "Sending").unwrap();

        let mut stats = MorphStats::default();
        sync_control_state(
            ControlFacet::NonValueControl,
            &candidate,
            c_submit,
            &mut live,
            l_submit,
            true,
            &mut stats,
        )
        .unwrap();
        assert_eq!(live.value(l_submit).as_deref(), Some("Sending"));
        assert_eq!(stats.values_assigned, 0);
    }
}
