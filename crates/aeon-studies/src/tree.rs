//! The session facade.
//!
//! A [`StudyTree`] owns one graph, one ledger and the external flag snapshot,
//! and forwards ledger events to subscribers after every operation. Each
//! session is independent: no state is shared between trees.

use aeon_core::Decimal;
use aeon_core::cache::DerivedCache;
use aeon_core::hooks::{HookBus, HookFilter, HookId, Listener};
use tracing::info;

use crate::condition::GameFlags;
use crate::economy::{TheoremCurrency, TheoremShop, Wallet};
use crate::event::StudyEvent;
use crate::graph::{GraphError, StudyGraph};
use crate::id::StudyId;
use crate::ledger::{LedgerError, PurchaseLedger};
use crate::planner::{PathPlanner, PlanReport};
use crate::requirement::RequirementEvaluator;
use crate::serializer::{self, ImportOutcome};
use crate::standard::{self, PresetMode};

pub struct StudyTree {
    graph: StudyGraph,
    ledger: PurchaseLedger,
    flags: GameFlags,
    theorems: TheoremShop,
    hooks: HookBus<StudyEvent>,
    export_cache: DerivedCache<String>,
}

impl std::fmt::Debug for StudyTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudyTree")
            .field("studies", &self.graph.len())
            .field("owned", &self.ledger.owned_count())
            .field("balance", &self.ledger.balance())
            .field("listeners", &self.hooks.len())
            .finish()
    }
}

impl StudyTree {
    pub fn new(graph: StudyGraph) -> Self {
        Self::with_ledger(graph, PurchaseLedger::new())
    }

    /// Resume from a previously persisted ledger.
    pub fn with_ledger(graph: StudyGraph, ledger: PurchaseLedger) -> Self {
        Self {
            graph,
            ledger,
            flags: GameFlags::new(),
            theorems: TheoremShop::new(),
            hooks: HookBus::new(),
            export_cache: DerivedCache::new(),
        }
    }

    /// A session over the standard layout.
    pub fn standard() -> Result<Self, GraphError> {
        Ok(Self::new(standard::layout()?))
    }

    // -- Accessors --

    pub fn graph(&self) -> &StudyGraph {
        &self.graph
    }

    pub fn ledger(&self) -> &PurchaseLedger {
        &self.ledger
    }

    pub fn flags(&self) -> &GameFlags {
        &self.flags
    }

    /// External state changes go here; requirements are re-evaluated on the
    /// next query.
    pub fn flags_mut(&mut self) -> &mut GameFlags {
        &mut self.flags
    }

    pub fn theorems(&self) -> &TheoremShop {
        &self.theorems
    }

    pub fn balance(&self) -> Decimal {
        self.ledger.balance()
    }

    pub fn owns(&self, id: StudyId) -> bool {
        self.ledger.owns(id)
    }

    /// Requirement queries against the current state.
    pub fn evaluator(&self) -> RequirementEvaluator<'_> {
        RequirementEvaluator::new(&self.graph, &self.flags, &self.ledger)
    }

    pub fn is_satisfied(&self, id: StudyId) -> bool {
        self.evaluator().is_satisfied(id)
    }

    pub fn is_affordable(&self, id: StudyId) -> bool {
        self.ledger.is_affordable(&self.graph, &self.flags, id)
    }

    pub fn can_purchase(&self, id: StudyId) -> bool {
        self.ledger.can_purchase(&self.graph, &self.flags, id)
    }

    // -- Hooks --

    pub fn subscribe(&mut self, listener: Listener<StudyEvent>) -> HookId {
        self.hooks.subscribe(listener)
    }

    pub fn subscribe_filtered(
        &mut self,
        filter: HookFilter<StudyEvent>,
        listener: Listener<StudyEvent>,
    ) -> HookId {
        self.hooks.subscribe_filtered(filter, listener)
    }

    pub fn unsubscribe(&mut self, id: HookId) -> bool {
        self.hooks.unsubscribe(id)
    }

    fn flush_events(&mut self) {
        for event in self.ledger.drain_events() {
            self.hooks.emit(&event);
        }
    }

    // -- Operations --

    pub fn credit(&mut self, amount: Decimal) {
        self.ledger.credit(amount);
    }

    pub fn purchase(&mut self, id: StudyId) -> bool {
        let bought = self.ledger.purchase(&self.graph, &self.flags, id);
        self.flush_events();
        bought
    }

    /// Buy toward `target`. Partial progress is kept.
    pub fn purchase_until(&mut self, target: StudyId) -> PlanReport {
        let report = PathPlanner::new(&self.graph, &self.flags, &mut self.ledger).plan(target);
        self.flush_events();
        report
    }

    pub fn refund(&mut self, id: StudyId) -> Result<Decimal, LedgerError> {
        let credited = self.ledger.refund(id);
        self.flush_events();
        credited
    }

    pub fn respec(&mut self) -> Decimal {
        let credited = self.ledger.respec();
        self.flush_events();
        credited
    }

    pub fn respec_dilation(&mut self) -> Decimal {
        let credited = self.ledger.respec_dilation();
        self.flush_events();
        credited
    }

    pub fn release_challenge(&mut self) -> Option<Decimal> {
        let credited = self.ledger.release_challenge();
        self.flush_events();
        credited
    }

    /// A challenge run finished: forget its remembered requirement, free the
    /// slot and respec the normal studies. Returns the total credited.
    pub fn complete_challenge(&mut self, id: StudyId) -> Decimal {
        let released = self.ledger.complete_challenge(id).unwrap_or_default();
        let credited = released + self.ledger.respec();
        info!(challenge = %id, %credited, "challenge completed");
        self.flush_events();
        credited
    }

    /// Epoch reset: ownership, balance and theorem purchases are cleared.
    pub fn reset(&mut self) {
        self.ledger.reset();
        self.theorems.reset();
        self.flush_events();
    }

    // -- Tree strings --

    /// The `id,id,...|N` string, recomputed only after ownership changes.
    pub fn export(&mut self) -> String {
        let ledger = &self.ledger;
        self.export_cache
            .get(ledger.generation(), || serializer::export(ledger))
            .clone()
    }

    pub fn import(&mut self, input: &str) -> ImportOutcome {
        let outcome = serializer::import(&self.graph, &self.flags, &mut self.ledger, input);
        self.flush_events();
        outcome
    }

    /// Import a standard [`path_preset`](standard::path_preset).
    pub fn apply_preset(&mut self, mode: PresetMode, args: &[&str]) -> ImportOutcome {
        let preset = standard::path_preset(&self.graph, &self.flags, mode, args);
        self.import(&preset)
    }

    // -- Theorems --

    pub fn buy_theorem(&mut self, currency: TheoremCurrency, wallet: &mut Wallet) -> bool {
        self.theorems.buy(currency, wallet, &self.flags, &mut self.ledger)
    }

    pub fn buy_max_theorems(&mut self, wallet: &mut Wallet) -> u64 {
        self.theorems.buy_max_all(wallet, &self.flags, &mut self.ledger)
    }
}
