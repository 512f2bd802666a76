//! Serde data file structs for study tree definitions.
//!
//! These structs define the on-disk format for studies, edges, slot sets and
//! the buy-until phase list. They are deserialized from RON, JSON, or TOML
//! data files and then resolved into engine types by the loader. Studies are
//! referenced by label (`"TS71"`, `"EC5"`, `"DS1"`).

use aeon_core::Decimal;
use serde::Deserialize;

// ===========================================================================
// Tree
// ===========================================================================

/// A complete study tree definition.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyTreeData {
    #[serde(default = "default_row_stride")]
    pub row_stride: u32,
    pub studies: Vec<StudyData>,
    #[serde(default)]
    pub edges: Vec<EdgeData>,
    #[serde(default)]
    pub slot_sets: Vec<SlotSetData>,
    #[serde(default)]
    pub locked_path: Option<LockedPathData>,
    #[serde(default)]
    pub planner: Vec<PhaseData>,
}

fn default_row_stride() -> u32 {
    10
}

// ===========================================================================
// Studies
// ===========================================================================

/// A study definition. The label prefix selects the kind.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyData {
    pub id: String,
    pub cost: Decimal,
    /// Plain edges from each listed study.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Intrinsic requirement, used when the study has no incoming edges.
    #[serde(default)]
    pub requirement: Option<ConditionData>,
    #[serde(default)]
    pub locked_requirement: Option<ConditionData>,
    /// Only valid on `EC` studies.
    #[serde(default)]
    pub challenge: Option<ChallengeData>,
    #[serde(default)]
    pub unlocks: Vec<UnlockData>,
}

/// Extra rules for a challenge study.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChallengeData {
    #[serde(default)]
    pub secondary: Option<ConditionData>,
    #[serde(default)]
    pub remember_unlock: bool,
    #[serde(default)]
    pub approach: Option<String>,
    #[serde(default)]
    pub approach_extra: Vec<String>,
}

/// What the first purchase of a study unlocks.
#[derive(Debug, Clone, Deserialize)]
pub enum UnlockData {
    Tab(String),
    Grant { counter: String, amount: Decimal },
    Custom(String),
}

/// An edge with an override predicate. Plain edges are usually written as
/// `prerequisites` instead.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeData {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub override_when: Option<ConditionData>,
}

// ===========================================================================
// Conditions
// ===========================================================================

/// A predicate over flags, counters and ownership.
#[derive(Debug, Clone, Deserialize)]
pub enum ConditionData {
    Always,
    Never,
    Flag(String),
    Owns(String),
    CounterAtLeast {
        counter: String,
        value: Decimal,
    },
    Progress {
        counter: String,
        base: Decimal,
        step: ProgressStepData,
        completions: String,
    },
    Not(Box<ConditionData>),
    All(Vec<ConditionData>),
    Any(Vec<ConditionData>),
}

/// How a progress threshold grows per completion.
#[derive(Debug, Clone, Copy, Deserialize)]
pub enum ProgressStepData {
    Add(Decimal),
    Mul(Decimal),
}

// ===========================================================================
// Slot sets and locked path
// ===========================================================================

/// A set of mutually exclusive branches.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotSetData {
    pub name: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    pub branches: Vec<BranchData>,
    #[serde(default)]
    pub bonuses: Vec<BonusData>,
    #[serde(default)]
    pub unlimited_when: Option<ConditionData>,
}

fn default_capacity() -> u32 {
    1
}

/// A named branch of normal study numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchData {
    pub name: String,
    pub studies: Vec<u32>,
}

/// Extra slot capacity while a condition holds.
#[derive(Debug, Clone, Deserialize)]
pub struct BonusData {
    pub when: ConditionData,
    pub extra: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockedPathData {
    pub enabled: ConditionData,
    #[serde(default)]
    pub budget_counter: Option<String>,
}

// ===========================================================================
// Planner
// ===========================================================================

/// One buy-until phase. Numbers are normal study numbers.
#[derive(Debug, Clone, Deserialize)]
pub enum PhaseData {
    Target,
    Gate {
        min_target: u32,
    },
    Linear {
        first: u32,
        last: u32,
        #[serde(default)]
        when: Option<ConditionData>,
    },
    Branching {
        set: String,
        first: u32,
        last: u32,
        branch_last: u32,
    },
    BranchFirst {
        set: String,
        branch_last: u32,
    },
    CommittedBranch {
        set: String,
    },
    Convergence {
        study: u32,
    },
    Paired {
        first: u32,
        last: u32,
        feeds_first: u32,
        feeds_last: u32,
        #[serde(default)]
        bypass: Option<ConditionData>,
    },
}

// ===========================================================================
// Tests
// ===========================================================================
