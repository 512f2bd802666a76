//! Static study definitions: nodes, prerequisite edges, slot sets and the
//! locked-path rule.
//!
//! A [`StudyGraph`] is built once through [`StudyGraphBuilder`], validated
//! (unique ids, matching variants, no dangling edges, no cycles) and never
//! mutated afterwards. Edges live in a slot-map arena and reference studies
//! by id, so the graph holds no references between nodes.

use aeon_core::Decimal;
use slotmap::{SlotMap, new_key_type};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::condition::{Condition, GameFlags, OwnershipView};
use crate::event::Unlock;
use crate::id::{StudyId, StudyKind};
use crate::planner::{Phase, PlannerLayout};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while validating a study graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate study: {0}")]
    DuplicateStudy(StudyId),

    #[error("study {0} has a variant that does not match its id")]
    KindMismatch(StudyId),

    #[error("edge {from} -> {to} references an unknown study")]
    DanglingEdge { from: StudyId, to: StudyId },

    #[error("study {0} lists itself as a prerequisite")]
    SelfLoop(StudyId),

    #[error("cycle detected among studies {0:?}")]
    CycleDetected(Vec<StudyId>),

    #[error("duplicate slot set '{0}'")]
    DuplicateSlotSet(String),

    #[error("slot set '{set}' references unknown or non-normal study {study}")]
    UnknownSlotMember { set: String, study: StudyId },

    #[error("study {0} belongs to more than one slot branch")]
    DuplicateSlotMember(StudyId),

    #[error("planner references unknown slot set '{0}'")]
    UnknownSlotSet(String),

    #[error("study {from} references unknown study {to}")]
    UnknownReference { from: StudyId, to: StudyId },
}

// ---------------------------------------------------------------------------
// Cost
// ---------------------------------------------------------------------------

/// A cost evaluated against the current external state.
pub type CostFn = Arc<dyn Fn(&GameFlags) -> Decimal + Send + Sync>;

#[derive(Clone)]
pub enum StudyCost {
    Fixed(Decimal),
    /// Evaluated at purchase time.
    Computed(CostFn),
}

impl StudyCost {
    pub fn computed(f: impl Fn(&GameFlags) -> Decimal + Send + Sync + 'static) -> Self {
        StudyCost::Computed(Arc::new(f))
    }

    pub fn current(&self, flags: &GameFlags) -> Decimal {
        match self {
            StudyCost::Fixed(cost) => *cost,
            StudyCost::Computed(f) => f(flags),
        }
    }
}

impl fmt::Debug for StudyCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudyCost::Fixed(cost) => write!(f, "Fixed({cost})"),
            StudyCost::Computed(_) => write!(f, "Computed(<fn>)"),
        }
    }
}

impl From<u32> for StudyCost {
    fn from(v: u32) -> Self {
        StudyCost::Fixed(Decimal::from(v))
    }
}

impl From<Decimal> for StudyCost {
    fn from(v: Decimal) -> Self {
        StudyCost::Fixed(v)
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Extra rules for a challenge-gated study.
#[derive(Debug, Clone, Default)]
pub struct ChallengeSpec {
    /// Must hold, on top of a satisfied incoming edge, to unlock.
    pub secondary: Condition,

    /// Once unlocked, the challenge may be unlocked again without
    /// re-checking `secondary` until it is completed.
    pub remember_unlock: bool,

    /// Normal study the planner buys toward before this challenge.
    pub approach: Option<StudyId>,

    /// Studies bought directly after the approach.
    pub approach_extra: Vec<StudyId>,
}

/// Variant-specific data. Exactly one per node.
#[derive(Debug, Clone)]
pub enum StudyVariant {
    Normal {
        /// Intrinsic requirement, used only when the study has no incoming
        /// edges.
        requirement: Condition,
        /// Requirement under the locked-path rule.
        locked_requirement: Condition,
    },
    Challenge(ChallengeSpec),
    Dilation {
        requirement: Condition,
    },
}

impl StudyVariant {
    pub fn kind(&self) -> StudyKind {
        match self {
            StudyVariant::Normal { .. } => StudyKind::Normal,
            StudyVariant::Challenge(_) => StudyKind::Challenge,
            StudyVariant::Dilation { .. } => StudyKind::Dilation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StudyNode {
    pub id: StudyId,
    pub cost: StudyCost,
    pub variant: StudyVariant,
    /// Reported the first time this study is ever bought.
    pub unlocks: Vec<Unlock>,
}

impl StudyNode {
    pub fn normal(number: u32, cost: impl Into<StudyCost>) -> Self {
        Self {
            id: StudyId::Normal(number),
            cost: cost.into(),
            variant: StudyVariant::Normal {
                requirement: Condition::Always,
                locked_requirement: Condition::Never,
            },
            unlocks: Vec::new(),
        }
    }

    pub fn challenge(number: u32, cost: impl Into<StudyCost>, spec: ChallengeSpec) -> Self {
        Self {
            id: StudyId::Challenge(number),
            cost: cost.into(),
            variant: StudyVariant::Challenge(spec),
            unlocks: Vec::new(),
        }
    }

    pub fn dilation(number: u32, cost: impl Into<StudyCost>) -> Self {
        Self {
            id: StudyId::Dilation(number),
            cost: cost.into(),
            variant: StudyVariant::Dilation {
                requirement: Condition::Always,
            },
            unlocks: Vec::new(),
        }
    }

    /// Set the intrinsic requirement. Ignored for challenges.
    pub fn with_requirement(mut self, condition: Condition) -> Self {
        match &mut self.variant {
            StudyVariant::Normal { requirement, .. } | StudyVariant::Dilation { requirement } => {
                *requirement = condition;
            }
            StudyVariant::Challenge(_) => {}
        }
        self
    }

    /// Set the locked-path requirement. Only meaningful for normal studies.
    pub fn with_locked_requirement(mut self, condition: Condition) -> Self {
        if let StudyVariant::Normal {
            locked_requirement, ..
        } = &mut self.variant
        {
            *locked_requirement = condition;
        }
        self
    }

    pub fn with_unlock(mut self, unlock: Unlock) -> Self {
        self.unlocks.push(unlock);
        self
    }

    pub fn challenge_spec(&self) -> Option<&ChallengeSpec> {
        match &self.variant {
            StudyVariant::Challenge(spec) => Some(spec),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

new_key_type! {
    /// Arena key for an [`Edge`].
    pub struct EdgeId;
}

/// `from -> to`. Satisfied when `from` is owned or `override_when` holds.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: StudyId,
    pub to: StudyId,
    pub override_when: Option<Condition>,
}

// ---------------------------------------------------------------------------
// Slot sets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SlotBranch {
    pub name: String,
    pub studies: Vec<StudyId>,
}

/// Mutually exclusive branches. A branch is committed once any of its
/// studies is owned; at most `capacity` branches may be committed unless
/// `unlimited_when` holds.
#[derive(Debug, Clone)]
pub struct SlotSet {
    pub name: String,
    pub branches: Vec<SlotBranch>,
    pub capacity: u32,
    pub bonuses: Vec<(Condition, u32)>,
    pub unlimited_when: Condition,
}

impl SlotSet {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            branches: Vec::new(),
            capacity,
            bonuses: Vec::new(),
            unlimited_when: Condition::Never,
        }
    }

    /// Add a branch of normal studies.
    pub fn branch(mut self, name: impl Into<String>, studies: impl IntoIterator<Item = u32>) -> Self {
        self.branches.push(SlotBranch {
            name: name.into(),
            studies: studies.into_iter().map(StudyId::Normal).collect(),
        });
        self
    }

    /// Raise capacity by `extra` while `condition` holds.
    pub fn bonus(mut self, condition: Condition, extra: u32) -> Self {
        self.bonuses.push((condition, extra));
        self
    }

    pub fn unlimited_when(mut self, condition: Condition) -> Self {
        self.unlimited_when = condition;
        self
    }

    pub fn capacity_for(&self, flags: &GameFlags, owned: &dyn OwnershipView) -> u32 {
        self.bonuses
            .iter()
            .filter(|(c, _)| c.evaluate(flags, owned))
            .fold(self.capacity, |cap, (_, extra)| cap.saturating_add(*extra))
    }

    /// Indices of committed branches, in declaration order.
    pub fn committed(&self, owned: &dyn OwnershipView) -> Vec<usize> {
        self.branches
            .iter()
            .enumerate()
            .filter(|(_, b)| b.studies.iter().any(|&s| owned.owns(s)))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn branch_of(&self, id: StudyId) -> Option<usize> {
        self.branches.iter().position(|b| b.studies.contains(&id))
    }

    pub fn branch_named(&self, name: &str) -> Option<usize> {
        self.branches.iter().position(|b| b.name == name)
    }
}

/// Lets normal studies be bought outside their usual requirement, up to a
/// budget read from a counter.
#[derive(Debug, Clone)]
pub struct LockedPath {
    pub enabled: Condition,
    /// Counter holding the number of locked purchases allowed. Unbounded
    /// when `None`.
    pub budget_counter: Option<String>,
}

// ---------------------------------------------------------------------------
// StudyGraph
// ---------------------------------------------------------------------------

/// The validated, immutable study tree definition.
#[derive(Debug, Clone)]
pub struct StudyGraph {
    nodes: BTreeMap<StudyId, StudyNode>,
    edges: SlotMap<EdgeId, Edge>,
    incoming: HashMap<StudyId, Vec<EdgeId>>,
    outgoing: HashMap<StudyId, Vec<EdgeId>>,
    slot_sets: Vec<SlotSet>,
    /// study -> (slot set index, branch index)
    slot_index: HashMap<StudyId, (usize, usize)>,
    locked_path: Option<LockedPath>,
    planner: PlannerLayout,
    topo_order: Vec<StudyId>,
}

impl StudyGraph {
    pub fn builder() -> StudyGraphBuilder {
        StudyGraphBuilder::new()
    }

    pub fn node(&self, id: StudyId) -> Option<&StudyNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: StudyId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All studies in id order (normal, then challenges, then dilation).
    pub fn studies(&self) -> impl Iterator<Item = &StudyNode> {
        self.nodes.values()
    }

    /// Studies of one kind in ascending number order.
    pub fn studies_of(&self, kind: StudyKind) -> impl Iterator<Item = StudyId> + '_ {
        self.nodes.keys().copied().filter(move |id| id.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges ending at `id`, in insertion order.
    pub fn incoming(&self, id: StudyId) -> impl Iterator<Item = &Edge> {
        self.incoming
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|&e| self.edges.get(e))
    }

    /// Edges starting at `id`, in insertion order.
    pub fn outgoing(&self, id: StudyId) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|&e| self.edges.get(e))
    }

    pub fn has_incoming(&self, id: StudyId) -> bool {
        self.incoming.get(&id).is_some_and(|e| !e.is_empty())
    }

    pub fn slot_sets(&self) -> &[SlotSet] {
        &self.slot_sets
    }

    pub fn slot_set(&self, name: &str) -> Option<&SlotSet> {
        self.slot_sets.iter().find(|s| s.name == name)
    }

    /// The slot set and branch index a study belongs to.
    pub fn slot_of(&self, id: StudyId) -> Option<(&SlotSet, usize)> {
        let &(set, branch) = self.slot_index.get(&id)?;
        Some((&self.slot_sets[set], branch))
    }

    pub fn locked_path(&self) -> Option<&LockedPath> {
        self.locked_path.as_ref()
    }

    pub fn planner(&self) -> &PlannerLayout {
        &self.planner
    }

    pub fn row_stride(&self) -> u32 {
        self.planner.row_stride
    }

    /// Topological order computed at build time.
    pub fn topological_order(&self) -> &[StudyId] {
        &self.topo_order
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects definitions and validates them into a [`StudyGraph`].
#[derive(Debug, Default)]
pub struct StudyGraphBuilder {
    nodes: Vec<StudyNode>,
    edges: Vec<Edge>,
    slot_sets: Vec<SlotSet>,
    locked_path: Option<LockedPath>,
    planner: PlannerLayout,
}

impl StudyGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_study(&mut self, node: StudyNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn add_edge(&mut self, from: StudyId, to: StudyId) -> &mut Self {
        self.edges.push(Edge {
            from,
            to,
            override_when: None,
        });
        self
    }

    pub fn add_edge_with_override(
        &mut self,
        from: StudyId,
        to: StudyId,
        override_when: Condition,
    ) -> &mut Self {
        self.edges.push(Edge {
            from,
            to,
            override_when: Some(override_when),
        });
        self
    }

    pub fn add_slot_set(&mut self, set: SlotSet) -> &mut Self {
        self.slot_sets.push(set);
        self
    }

    pub fn set_locked_path(&mut self, locked: LockedPath) -> &mut Self {
        self.locked_path = Some(locked);
        self
    }

    pub fn set_planner(&mut self, planner: PlannerLayout) -> &mut Self {
        self.planner = planner;
        self
    }

    pub fn build(self) -> Result<StudyGraph, GraphError> {
        let mut nodes = BTreeMap::new();
        for node in self.nodes {
            if node.variant.kind() != node.id.kind() {
                return Err(GraphError::KindMismatch(node.id));
            }
            if nodes.contains_key(&node.id) {
                return Err(GraphError::DuplicateStudy(node.id));
            }
            nodes.insert(node.id, node);
        }

        for node in nodes.values() {
            if let Some(spec) = node.challenge_spec() {
                for &target in spec.approach.iter().chain(&spec.approach_extra) {
                    if !nodes.contains_key(&target) {
                        return Err(GraphError::UnknownReference {
                            from: node.id,
                            to: target,
                        });
                    }
                }
            }
        }

        let mut edges = SlotMap::with_key();
        let mut incoming: HashMap<StudyId, Vec<EdgeId>> = HashMap::new();
        let mut outgoing: HashMap<StudyId, Vec<EdgeId>> = HashMap::new();
        for edge in self.edges {
            if edge.from == edge.to {
                return Err(GraphError::SelfLoop(edge.from));
            }
            if !nodes.contains_key(&edge.from) || !nodes.contains_key(&edge.to) {
                return Err(GraphError::DanglingEdge {
                    from: edge.from,
                    to: edge.to,
                });
            }
            let (from, to) = (edge.from, edge.to);
            let id = edges.insert(edge);
            incoming.entry(to).or_default().push(id);
            outgoing.entry(from).or_default().push(id);
        }

        let mut slot_index = HashMap::new();
        for (set_idx, set) in self.slot_sets.iter().enumerate() {
            if self.slot_sets[..set_idx].iter().any(|s| s.name == set.name) {
                return Err(GraphError::DuplicateSlotSet(set.name.clone()));
            }
            for (branch_idx, branch) in set.branches.iter().enumerate() {
                for &study in &branch.studies {
                    if !study.is_normal() || !nodes.contains_key(&study) {
                        return Err(GraphError::UnknownSlotMember {
                            set: set.name.clone(),
                            study,
                        });
                    }
                    if slot_index.insert(study, (set_idx, branch_idx)).is_some() {
                        return Err(GraphError::DuplicateSlotMember(study));
                    }
                }
            }
        }

        for phase in &self.planner.phases {
            if let Phase::Branching { set, .. }
            | Phase::BranchFirst { set, .. }
            | Phase::CommittedBranch { set } = phase
            {
                if !self.slot_sets.iter().any(|s| &s.name == set) {
                    return Err(GraphError::UnknownSlotSet(set.clone()));
                }
            }
        }

        let topo_order = topological_order(&nodes, &edges, &outgoing)?;

        Ok(StudyGraph {
            nodes,
            edges,
            incoming,
            outgoing,
            slot_sets: self.slot_sets,
            slot_index,
            locked_path: self.locked_path,
            planner: self.planner,
            topo_order,
        })
    }
}

// ---------------------------------------------------------------------------
// Topological sort (Kahn's algorithm)
// ---------------------------------------------------------------------------

fn topological_order(
    nodes: &BTreeMap<StudyId, StudyNode>,
    edges: &SlotMap<EdgeId, Edge>,
    outgoing: &HashMap<StudyId, Vec<EdgeId>>,
) -> Result<Vec<StudyId>, GraphError> {
    let mut in_degree: BTreeMap<StudyId, usize> = nodes.keys().map(|&id| (id, 0)).collect();
    for (_, edge) in edges {
        if let Some(deg) = in_degree.get_mut(&edge.to) {
            *deg += 1;
        }
    }

    let mut queue: VecDeque<StudyId> = in_degree
        .iter()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(id) = queue.pop_front() {
        order.push(id);
        for &eid in outgoing.get(&id).into_iter().flatten() {
            let Some(edge) = edges.get(eid) else {
                continue;
            };
            if let Some(deg) = in_degree.get_mut(&edge.to) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(edge.to);
                }
            }
        }
    }

    if order.len() < nodes.len() {
        let stuck = in_degree
            .into_iter()
            .filter(|&(_, deg)| deg > 0)
            .map(|(id, _)| id)
            .collect();
        return Err(GraphError::CycleDetected(stuck));
    }
    Ok(order)
}
