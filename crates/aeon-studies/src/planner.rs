//! Buy-until planning.
//!
//! Given a target study, buy as much of the way toward it as possible without
//! guessing between mutually exclusive branches. The tree's
//! [`PlannerLayout`] is an ordered list of [`Phase`]s; each phase either lets
//! planning continue or stops it. The whole plan is best effort: purchases
//! made before a stop or a failed final purchase are kept.

use tracing::{debug, trace};

use crate::condition::{Condition, GameFlags};
use crate::graph::{SlotSet, StudyGraph};
use crate::id::{StudyId, StudyKind};
use crate::ledger::PurchaseLedger;
use crate::requirement::RequirementEvaluator;

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// One step of the buy-until algorithm. Numbers are normal study numbers.
#[derive(Debug, Clone)]
pub enum Phase {
    /// Attempt the target itself.
    Target,

    /// Stop unless the target number is at least `min_target`.
    Gate { min_target: u32 },

    /// While `when` holds, buy every study in `first..=last` that lies
    /// before the target's row, ascending.
    Linear {
        first: u32,
        last: u32,
        when: Condition,
    },

    /// Exclusive branch section. When the set admits every branch, buy the
    /// whole range before the target's row and continue. Otherwise a target
    /// past `branch_last` is ambiguous and stops planning; a target inside a
    /// branch buys that branch (and tops up the first already-committed
    /// branch) and then stops.
    Branching {
        set: String,
        first: u32,
        last: u32,
        branch_last: u32,
    },

    /// If the target lies in a branch of `set` (at or before `branch_last`),
    /// buy that branch up to the target.
    BranchFirst { set: String, branch_last: u32 },

    /// Buy the first committed branch of `set` up to the target; stop if no
    /// branch is committed.
    CommittedBranch { set: String },

    /// Buy the join study once the target is at or past it.
    Convergence { study: u32 },

    /// Paired section: studies `first..=last` form pairs feeding
    /// `feeds_first..=feeds_last` (pair `c` feeds `feeds_first + c`). While
    /// `bypass` holds, buy the feeding pair, the whole paired range, then the
    /// target. Otherwise stop unless a member of the feeding pair is owned.
    Paired {
        first: u32,
        last: u32,
        feeds_first: u32,
        feeds_last: u32,
        bypass: Condition,
    },
}

#[derive(Debug, Clone)]
pub struct PlannerLayout {
    /// Study numbers per row (`71 / 10` is row 7).
    pub row_stride: u32,
    pub phases: Vec<Phase>,
}

impl Default for PlannerLayout {
    fn default() -> Self {
        Self {
            row_stride: 10,
            phases: vec![Phase::Target],
        }
    }
}

/// Diagnostics for one buy-until call. Success is judged by ownership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanReport {
    pub target: Option<StudyId>,
    pub attempted: Vec<StudyId>,
    pub purchased: Vec<StudyId>,
    /// Index of the phase that stopped planning, if any.
    pub stopped_at: Option<usize>,
    pub target_owned: bool,
}

enum Flow {
    Continue,
    Stop,
}

// ---------------------------------------------------------------------------
// PathPlanner
// ---------------------------------------------------------------------------

pub struct PathPlanner<'a> {
    graph: &'a StudyGraph,
    flags: &'a GameFlags,
    ledger: &'a mut PurchaseLedger,
    report: PlanReport,
}

impl<'a> PathPlanner<'a> {
    pub fn new(graph: &'a StudyGraph, flags: &'a GameFlags, ledger: &'a mut PurchaseLedger) -> Self {
        Self {
            graph,
            flags,
            ledger,
            report: PlanReport::default(),
        }
    }

    /// Buy toward `target`.
    pub fn plan(mut self, target: StudyId) -> PlanReport {
        self.report.target = Some(target);
        match target {
            StudyId::Normal(n) => self.plan_normal(n),
            StudyId::Challenge(_) => self.plan_challenge(target),
            StudyId::Dilation(n) => self.plan_dilation(n),
        }
        self.report.target_owned = self.ledger.owns(target);
        debug!(
            target = %target,
            purchased = self.report.purchased.len(),
            reached = self.report.target_owned,
            "buy-until finished"
        );
        self.report
    }

    fn plan_normal(&mut self, n: u32) {
        let graph = self.graph;
        for (idx, phase) in graph.planner().phases.iter().enumerate() {
            trace!(phase = idx, ?phase, target = n, "planner phase");
            if let Flow::Stop = self.run_phase(phase, n) {
                trace!(phase = idx, "planner stopped");
                self.report.stopped_at = Some(idx);
                return;
            }
        }
    }

    fn plan_challenge(&mut self, target: StudyId) {
        let graph = self.graph;
        if let Some(spec) = graph.node(target).and_then(|n| n.challenge_spec()) {
            match spec.approach {
                Some(StudyId::Normal(n)) => self.plan_normal(n),
                Some(other) => {
                    self.buy(other);
                }
                None => {}
            }
            for &extra in &spec.approach_extra {
                self.buy(extra);
            }
        }
        self.buy(target);
    }

    fn plan_dilation(&mut self, n: u32) {
        let graph = self.graph;
        for id in graph.studies_of(StudyKind::Dilation) {
            if id.number() <= n {
                self.buy(id);
            }
        }
    }

    fn run_phase(&mut self, phase: &Phase, n: u32) -> Flow {
        let graph = self.graph;
        let target = StudyId::Normal(n);
        let stride = graph.row_stride().max(1);
        let last_before_row = (n / stride * stride).checked_sub(1);

        match phase {
            Phase::Target => {
                self.buy(target);
            }
            Phase::Gate { min_target } => {
                if n < *min_target {
                    return Flow::Stop;
                }
            }
            Phase::Linear { first, last, when } => {
                if self.holds(when) {
                    if let Some(prev) = last_before_row {
                        self.buy_range(*first, (*last).min(prev));
                    }
                }
            }
            Phase::Branching {
                set,
                first,
                last,
                branch_last,
            } => {
                let Some(set) = graph.slot_set(set) else {
                    return Flow::Continue;
                };
                let saturated =
                    RequirementEvaluator::new(graph, self.flags, &*self.ledger).set_saturated(set);
                if saturated {
                    if let Some(prev) = last_before_row {
                        self.buy_range(*first, (*last).min(prev));
                    }
                    return Flow::Continue;
                }
                if n > *branch_last {
                    return Flow::Stop;
                }
                let committed = set.committed(&*self.ledger);
                let requested = set.branch_of(target);
                if let Some(branch) = requested {
                    self.buy_branch_until(set, branch, n);
                }
                if let (Some(&first_committed), Some(prev)) = (committed.first(), last_before_row) {
                    if Some(first_committed) != requested {
                        self.buy_branch_until(set, first_committed, prev);
                    }
                }
                return Flow::Stop;
            }
            Phase::BranchFirst { set, branch_last } => {
                if n <= *branch_last {
                    if let Some(set) = graph.slot_set(set) {
                        if let Some(branch) = set.branch_of(target) {
                            self.buy_branch_until(set, branch, n);
                        }
                    }
                }
            }
            Phase::CommittedBranch { set } => {
                let Some(set) = graph.slot_set(set) else {
                    return Flow::Continue;
                };
                let Some(&branch) = set.committed(&*self.ledger).first() else {
                    return Flow::Stop;
                };
                self.buy_branch_until(set, branch, n);
            }
            Phase::Convergence { study } => {
                if n >= *study {
                    self.buy(StudyId::Normal(*study));
                }
            }
            Phase::Paired {
                first,
                last,
                feeds_first,
                feeds_last,
                bypass,
            } => {
                if n < *feeds_first || n > *feeds_last {
                    return Flow::Continue;
                }
                let pair = first + 2 * (n - feeds_first);
                let members = [StudyId::Normal(pair), StudyId::Normal(pair + 1)];
                if self.holds(bypass) {
                    for member in members {
                        self.buy(member);
                    }
                    self.buy_range(*first, *last);
                    self.buy(target);
                } else if !members.iter().any(|&m| self.ledger.owns(m)) {
                    return Flow::Stop;
                } else {
                    self.buy(target);
                }
            }
        }
        Flow::Continue
    }

    fn holds(&self, condition: &Condition) -> bool {
        condition.evaluate(self.flags, &*self.ledger)
    }

    fn buy(&mut self, id: StudyId) -> bool {
        if self.ledger.owns(id) {
            return false;
        }
        self.report.attempted.push(id);
        let bought = self.ledger.purchase(self.graph, self.flags, id);
        if bought {
            self.report.purchased.push(id);
        }
        bought
    }

    /// Buy existing normal studies numbered `first..=last`, ascending.
    fn buy_range(&mut self, first: u32, last: u32) {
        let graph = self.graph;
        for id in graph.studies_of(StudyKind::Normal) {
            let number = id.number();
            if number > last {
                break;
            }
            if number >= first {
                self.buy(id);
            }
        }
    }

    fn buy_branch_until(&mut self, set: &SlotSet, branch: usize, max: u32) {
        let Some(branch) = set.branches.get(branch) else {
            return;
        };
        for &id in &branch.studies {
            if id.number() <= max {
                self.buy(id);
            }
        }
    }
}
