//! Minimal cut sets and their combinations.

use std::collections::BTreeSet;
use std::fmt;

use log::warn;

use crate::error::{Error, Result};
use crate::tree::FaultTree;
use crate::types::NodeId;

/// A set of basic events whose joint occurrence triggers the top event.
///
/// Events are identified by their [`NodeId`] in the fault tree the set was
/// computed from; equality and hashing are set based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MinimalCutSet {
    events: BTreeSet<NodeId>,
}

impl MinimalCutSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cut set, rejecting repeated events.
    pub fn from_events(events: impl IntoIterator<Item = NodeId>) -> Result<Self> {
        let mut set = Self::new();
        for event in events {
            set.insert(event)?;
        }
        Ok(set)
    }

    /// Adds a basic event; inserting an event already in the set is an error.
    pub fn insert(&mut self, event: NodeId) -> Result<()> {
        if self.events.insert(event) {
            Ok(())
        } else {
            Err(Error::IllegalCutSetInsertion {
                event: event.to_string(),
            })
        }
    }

    pub fn contains(&self, event: NodeId) -> bool {
        self.events.contains(&event)
    }

    /// Number of events, also known as the order of the cut set.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.events.iter().copied()
    }

    pub fn is_subset(&self, other: &MinimalCutSet) -> bool {
        self.events.is_subset(&other.events)
    }

    /// Names of the events in `tree`, sorted.
    pub fn names(&self, tree: &FaultTree) -> Vec<String> {
        let mut names: Vec<String> = self.iter().map(|id| tree.name(id).to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Renders the set as `{A, B}` using the names in `tree`.
    pub fn display<'a>(&'a self, tree: &'a FaultTree) -> impl fmt::Display + 'a {
        DisplayCutSet { set: self, tree }
    }
}

struct DisplayCutSet<'a> {
    set: &'a MinimalCutSet,
    tree: &'a FaultTree,
}

impl fmt::Display for DisplayCutSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.set.names(self.tree).join(", "))
    }
}

/// All non-empty combinations of `cut_sets`, ordered by size and then
/// lexicographically by position.
///
/// These are the terms of the inclusion-exclusion expansion of the top-event
/// probability. There are `2^n - 1` of them.
pub fn cut_set_combinations(cut_sets: &[MinimalCutSet]) -> Vec<Vec<&MinimalCutSet>> {
    if cut_sets.len() > 20 {
        warn!("enumerating combinations of {} cut sets", cut_sets.len());
    }
    let mut result = Vec::new();
    for size in 1..=cut_sets.len() {
        let mut current = Vec::with_capacity(size);
        combine(cut_sets, size, 0, &mut current, &mut result);
    }
    result
}

fn combine<'a>(
    cut_sets: &'a [MinimalCutSet],
    remaining: usize,
    start: usize,
    current: &mut Vec<&'a MinimalCutSet>,
    out: &mut Vec<Vec<&'a MinimalCutSet>>,
) {
    if remaining == 0 {
        out.push(current.clone());
        return;
    }
    for i in start..=cut_sets.len() - remaining {
        current.push(&cut_sets[i]);
        combine(cut_sets, remaining - 1, i + 1, current, out);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn set(ids: &[u32]) -> MinimalCutSet {
        MinimalCutSet::from_events(ids.iter().map(|&i| NodeId::new(i))).unwrap()
    }

    #[test]
    fn test_insert_twice_is_illegal() {
        let mut cs = MinimalCutSet::new();
        cs.insert(NodeId::new(1)).unwrap();
        assert_eq!(
            cs.insert(NodeId::new(1)),
            Err(Error::IllegalCutSetInsertion {
                event: "n1".to_string()
            })
        );
        assert!(MinimalCutSet::from_events([NodeId::new(2), NodeId::new(2)]).is_err());
    }

    #[test]
    fn test_set_equality() {
        assert_eq!(set(&[1, 2, 3]), set(&[3, 1, 2]));
        assert_ne!(set(&[1, 2]), set(&[1, 3]));
        assert!(set(&[1]).is_subset(&set(&[1, 2])));
        assert!(!set(&[1, 4]).is_subset(&set(&[1, 2])));
    }

    #[test]
    fn test_combinations() {
        let sets = vec![set(&[1]), set(&[2]), set(&[3])];
        let combos = cut_set_combinations(&sets);
        assert_eq!(combos.len(), 7);
        assert_eq!(combos[0], vec![&sets[0]]);
        assert_eq!(combos[3], vec![&sets[0], &sets[1]]);
        assert_eq!(combos[5], vec![&sets[1], &sets[2]]);
        assert_eq!(combos[6], vec![&sets[0], &sets[1], &sets[2]]);

        assert!(cut_set_combinations(&[]).is_empty());
    }
}
