//! Requirement evaluation: whether a study's prerequisites are met.
//!
//! Everything here is a pure query over the graph, the external flags and a
//! read-only ownership view. Nothing is cached: override conditions may
//! depend on flags that change without any purchase happening.

use crate::condition::{Condition, GameFlags, OwnershipView};
use crate::graph::{Edge, SlotSet, StudyGraph, StudyVariant};
use crate::id::StudyId;

pub struct RequirementEvaluator<'a> {
    graph: &'a StudyGraph,
    flags: &'a GameFlags,
    owned: &'a dyn OwnershipView,
}

impl<'a> RequirementEvaluator<'a> {
    pub fn new(graph: &'a StudyGraph, flags: &'a GameFlags, owned: &'a dyn OwnershipView) -> Self {
        Self {
            graph,
            flags,
            owned,
        }
    }

    fn holds(&self, condition: &Condition) -> bool {
        condition.evaluate(self.flags, self.owned)
    }

    /// An edge is satisfied by its override or by owning its source.
    pub fn edge_satisfied(&self, edge: &Edge) -> bool {
        edge.override_when.as_ref().is_some_and(|c| self.holds(c)) || self.owned.owns(edge.from)
    }

    /// Incoming edges are OR-combined. Without any, the variant's intrinsic
    /// requirement decides; a challenge with no edges is never satisfied.
    pub fn is_satisfied(&self, id: StudyId) -> bool {
        let Some(node) = self.graph.node(id) else {
            return false;
        };
        if self.graph.has_incoming(id) {
            return self.graph.incoming(id).any(|e| self.edge_satisfied(e));
        }
        match &node.variant {
            StudyVariant::Normal { requirement, .. } | StudyVariant::Dilation { requirement } => {
                self.holds(requirement)
            }
            StudyVariant::Challenge(_) => false,
        }
    }

    /// Position-based exclusivity: a study in a slot branch is available if
    /// its branch is already committed, the set has spare capacity, or the
    /// set is currently unlimited.
    pub fn slot_allows(&self, id: StudyId) -> bool {
        let Some((set, branch)) = self.graph.slot_of(id) else {
            return true;
        };
        if self.holds(&set.unlimited_when) {
            return true;
        }
        let committed = set.committed(self.owned);
        committed.contains(&branch)
            || (committed.len() as u32) < set.capacity_for(self.flags, self.owned)
    }

    /// Locked-path purchase: the rule is enabled, the study's own locked
    /// requirement holds and the budget is not exhausted.
    pub fn locked_allows(&self, id: StudyId, locked_count: u32) -> bool {
        let Some(locked) = self.graph.locked_path() else {
            return false;
        };
        let Some(StudyVariant::Normal {
            locked_requirement, ..
        }) = self.graph.node(id).map(|n| &n.variant)
        else {
            return false;
        };
        if !self.holds(&locked.enabled) || !self.holds(locked_requirement) {
            return false;
        }
        match &locked.budget_counter {
            Some(counter) => self.flags.counter(counter) > aeon_core::Decimal::from(locked_count),
            None => true,
        }
    }

    /// Challenge-specific gate on top of edge satisfaction.
    pub fn challenge_allows(&self, id: StudyId, remembered: Option<StudyId>) -> bool {
        let Some(spec) = self.graph.node(id).and_then(|n| n.challenge_spec()) else {
            return false;
        };
        (spec.remember_unlock && remembered == Some(id)) || self.holds(&spec.secondary)
    }

    /// Committed branch indices of a slot set.
    pub fn committed_branches(&self, set: &SlotSet) -> Vec<usize> {
        set.committed(self.owned)
    }

    /// Whether `set` currently admits every branch at once.
    pub fn set_saturated(&self, set: &SlotSet) -> bool {
        self.holds(&set.unlimited_when)
            || set.committed(self.owned).len() as u32 >= set.capacity_for(self.flags, self.owned)
    }
}
