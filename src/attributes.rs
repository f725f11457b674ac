//! Attribute-set synchronisation between a candidate and a live element
use crate::errors::TreeError;
use crate::tree::{TreeMut, TreeRead};
use crate::types::MorphStats;
use std::collections::HashSet;

/// Makes `live`'s attributes equal to `candidate`'s. Matching values are left
/// alone; the result is the same as an unconditional overwrite.
pub fn sync_attributes<C, L>(
    candidate: &C,
    candidate_node: C::Handle,
    live: &mut L,
    live_node: L::Handle,
    stats: &mut MorphStats,
) -> Result<(), TreeError>
where
    C: TreeRead + ?Sized,
    L: TreeMut + ?Sized,
{
    let wanted = candidate.attributes(candidate_node);
    for (name, value) in &wanted {
        if live.attribute(live_node, name) != Some(value.as_str()) {
            live.set_attribute(live_node, name, value)?;
            stats.attributes_set += 1;
        }
    }

    let keep: HashSet<&str> = wanted.iter().map(|(name, _)| name.as_str()).collect();
    for (name, _) in live.attributes(live_node) {
        if !keep.contains(name.as_str()) {
            live.remove_attribute(live_node, &name)?;
            stats.attributes_removed += 1;
        }
    }
    Ok(())
}
