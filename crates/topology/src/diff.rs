//! Identity-keyed diff of two entity collections

use std::collections::BTreeMap;

/// Result of matching desired against observed entities by name
///
/// All three sets iterate in name order because the inputs are ordered maps;
/// the sequencer does not rely on that and sorts on its own.
#[derive(Debug)]
pub struct EntityDiff<'a, E> {
    /// Present in desired only
    pub added: Vec<&'a E>,
    /// Present in observed only
    pub removed: Vec<&'a E>,
    /// Present in both: (desired, observed)
    pub matched: Vec<(&'a E, &'a E)>,
}

impl<E> EntityDiff<'_, E> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.matched.is_empty()
    }
}

/// Partition `desired` and `observed` into added, removed and matched pairs
pub fn diff<'a, E>(
    desired: &'a BTreeMap<String, E>,
    observed: &'a BTreeMap<String, E>,
) -> EntityDiff<'a, E> {
    let mut added = Vec::new();
    let mut matched = Vec::new();

    for (name, d) in desired {
        match observed.get(name) {
            Some(o) => matched.push((d, o)),
            None => added.push(d),
        }
    }

    let removed = observed
        .iter()
        .filter(|(name, _)| !desired.contains_key(*name))
        .map(|(_, o)| o)
        .collect();

    EntityDiff {
        added,
        removed,
        matched,
    }
}
