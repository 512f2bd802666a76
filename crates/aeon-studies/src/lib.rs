//! Time-study tree engine.
//!
//! A directed acyclic graph of purchasable studies gated by prerequisites,
//! paid for with a theorem balance, with full respec and a compact
//! `id,id,...|N` string form of the owned set.
//!
//! # Overview
//!
//! Studies are declared once through [`StudyGraph::builder`] and never change
//! afterwards. All mutable state lives in a [`PurchaseLedger`]: the theorem
//! balance, the owned studies in purchase order, the single active challenge
//! slot and the price paid for each purchase. [`RequirementEvaluator`] answers
//! "may this be bought" as a pure query over the graph, the external
//! [`GameFlags`] snapshot and the ledger.
//!
//! Incoming edges are OR-combined: a study is available once any incoming
//! edge is satisfied, either because its source is owned or because its
//! override [`Condition`] holds. Mutually exclusive branches are
//! [`SlotSet`]s, resolved lazily from what the player already owns.
//!
//! [`PathPlanner`] implements buy-until: it walks the layout's ordered
//! [`Phase`] list and buys as much of the way to a target as it can without
//! guessing between branches.
//!
//! [`StudyTree`] bundles everything into one session and forwards
//! [`StudyEvent`]s to subscribers.
//!
//! # Study kinds
//!
//! - **Normal**: tree nodes, optionally members of a slot branch.
//! - **Challenge**: at most one active at a time, with a secondary unlock
//!   requirement that may be remembered until the challenge is completed.
//! - **Dilation**: a separately respecced subset whose first purchase may
//!   report [`Unlock`]s.

pub mod condition;
pub mod economy;
pub mod event;
pub mod graph;
pub mod id;
pub mod ledger;
pub mod planner;
pub mod requirement;
pub mod serializer;
pub mod standard;
pub mod tree;

pub use condition::{Condition, GameFlags, OwnershipView};
pub use event::{StudyEvent, Unlock};
pub use graph::{GraphError, SlotSet, StudyGraph, StudyGraphBuilder, StudyNode};
pub use id::{StudyId, StudyKind};
pub use ledger::{LedgerError, PurchaseLedger};
pub use planner::{PathPlanner, Phase, PlanReport, PlannerLayout};
pub use requirement::RequirementEvaluator;
pub use tree::StudyTree;
