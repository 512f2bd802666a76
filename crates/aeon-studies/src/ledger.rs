//! The mutable ownership and currency state.
//!
//! The ledger is the only component that changes ownership or the theorem
//! balance. Every purchase records the price actually paid and refunds credit
//! that snapshot, so a respec always restores exactly what was spent even when
//! a computed cost has moved since.

use aeon_core::Decimal;
use aeon_core::cache::Generation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::condition::{GameFlags, OwnershipView};
use crate::event::StudyEvent;
use crate::graph::{StudyGraph, StudyNode, StudyVariant};
use crate::id::StudyId;
use crate::requirement::RequirementEvaluator;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("study {0} is not owned")]
    NotOwned(StudyId),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One owned study and what was paid for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: StudyId,
    pub paid: Decimal,
    /// Bought through the locked-path rule.
    #[serde(default)]
    pub locked: bool,
}

/// Outcome of a successful purchasability check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acquisition {
    pub cost: Decimal,
    pub locked: bool,
}

// ---------------------------------------------------------------------------
// PurchaseLedger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurchaseLedger {
    balance: Decimal,

    /// Normal studies in purchase order.
    normal: Vec<Purchase>,

    /// The single active challenge slot.
    challenge: Option<Purchase>,

    /// Dilation studies in purchase order.
    dilation: Vec<Purchase>,

    owned: BTreeSet<StudyId>,

    /// Purchases made through the locked path since the last respec.
    locked_purchases: u32,

    /// Challenge whose secondary requirement was met and is remembered.
    remembered_challenge: Option<StudyId>,

    /// Every study ever bought; unlocks fire only on the first purchase.
    ever_bought: BTreeSet<StudyId>,

    generation: Generation,

    /// Events emitted since last drain. Not serialized (transient).
    #[serde(skip)]
    events: Vec<StudyEvent>,
}

impl OwnershipView for PurchaseLedger {
    fn owns(&self, id: StudyId) -> bool {
        self.owned.contains(&id)
    }
}

impl PurchaseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger starting with `balance` theorems.
    pub fn with_balance(balance: Decimal) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    // -- Query API --

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn owns(&self, id: StudyId) -> bool {
        self.owned.contains(&id)
    }

    /// Owned normal studies in purchase order.
    pub fn owned_normal(&self) -> impl Iterator<Item = StudyId> + '_ {
        self.normal.iter().map(|p| p.id)
    }

    pub fn normal_purchases(&self) -> &[Purchase] {
        &self.normal
    }

    pub fn active_challenge(&self) -> Option<StudyId> {
        self.challenge.as_ref().map(|p| p.id)
    }

    pub fn owned_dilation(&self) -> impl Iterator<Item = StudyId> + '_ {
        self.dilation.iter().map(|p| p.id)
    }

    pub fn dilation_purchases(&self) -> &[Purchase] {
        &self.dilation
    }

    pub fn owned_count(&self) -> usize {
        self.owned.len()
    }

    pub fn remembered_challenge(&self) -> Option<StudyId> {
        self.remembered_challenge
    }

    pub fn locked_purchases(&self) -> u32 {
        self.locked_purchases
    }

    pub fn has_ever_bought(&self, id: StudyId) -> bool {
        self.ever_bought.contains(&id)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Theorems currently invested in normal studies and the active
    /// challenge.
    pub fn spent(&self) -> Decimal {
        self.normal
            .iter()
            .chain(self.challenge.as_ref())
            .map(|p| p.paid)
            .sum()
    }

    /// Whether any normal study in `row` is owned.
    pub fn has_row(&self, row: u32, stride: u32) -> bool {
        self.normal.iter().any(|p| p.id.row(stride) == row)
    }

    /// Check whether `id` can be bought right now, without buying it.
    pub fn check(&self, graph: &StudyGraph, flags: &GameFlags, id: StudyId) -> Option<Acquisition> {
        let node = graph.node(id)?;
        if self.owns(id) {
            return None;
        }
        let cost = node.cost.current(flags);
        if self.balance < cost {
            return None;
        }

        let eval = RequirementEvaluator::new(graph, flags, self);
        let locked = match &node.variant {
            StudyVariant::Normal { .. } => {
                if eval.is_satisfied(id) && eval.slot_allows(id) {
                    false
                } else if eval.locked_allows(id, self.locked_purchases) {
                    true
                } else {
                    return None;
                }
            }
            StudyVariant::Challenge(_) => {
                if self.challenge.is_some()
                    || !eval.is_satisfied(id)
                    || !eval.challenge_allows(id, self.remembered_challenge)
                {
                    return None;
                }
                false
            }
            StudyVariant::Dilation { .. } => {
                if !eval.is_satisfied(id) {
                    return None;
                }
                false
            }
        };
        Some(Acquisition { cost, locked })
    }

    pub fn can_purchase(&self, graph: &StudyGraph, flags: &GameFlags, id: StudyId) -> bool {
        self.check(graph, flags, id).is_some()
    }

    pub fn is_affordable(&self, graph: &StudyGraph, flags: &GameFlags, id: StudyId) -> bool {
        graph
            .node(id)
            .is_some_and(|n| self.balance >= n.cost.current(flags))
    }

    // -- Mutations --

    /// Add theorems to the balance.
    pub fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
    }

    /// Buy one study. Returns `false` with no state change if it is unknown,
    /// already owned, unaffordable or its requirement is unmet.
    pub fn purchase(&mut self, graph: &StudyGraph, flags: &GameFlags, id: StudyId) -> bool {
        let Some(acquisition) = self.check(graph, flags, id) else {
            debug!(study = %id, "purchase rejected");
            return false;
        };
        let Some(node) = graph.node(id) else {
            return false;
        };
        self.commit(node, acquisition);
        true
    }

    fn commit(&mut self, node: &StudyNode, acquisition: Acquisition) {
        let id = node.id;
        let record = Purchase {
            id,
            paid: acquisition.cost,
            locked: acquisition.locked,
        };
        self.balance -= acquisition.cost;
        match &node.variant {
            StudyVariant::Normal { .. } => self.normal.push(record),
            StudyVariant::Challenge(spec) => {
                if spec.remember_unlock {
                    self.remembered_challenge = Some(id);
                }
                self.challenge = Some(record);
            }
            StudyVariant::Dilation { .. } => self.dilation.push(record),
        }
        if acquisition.locked {
            self.locked_purchases += 1;
        }
        self.owned.insert(id);
        debug!(study = %id, paid = %acquisition.cost, locked = acquisition.locked, "study purchased");

        self.events.push(StudyEvent::Purchased {
            id,
            paid: acquisition.cost,
        });
        if self.ever_bought.insert(id) && !node.unlocks.is_empty() {
            self.events.push(StudyEvent::Unlocked {
                id,
                unlocks: node.unlocks.clone(),
            });
        }
        self.ownership_changed();
    }

    /// Reverse one purchase, crediting what was paid for it.
    pub fn refund(&mut self, id: StudyId) -> Result<Decimal, LedgerError> {
        let record = self.take(id).ok_or(LedgerError::NotOwned(id))?;
        self.credit_refund(&record);
        self.ownership_changed();
        Ok(record.paid)
    }

    fn take(&mut self, id: StudyId) -> Option<Purchase> {
        if !self.owned.contains(&id) {
            return None;
        }
        let record = match id {
            StudyId::Normal(_) => {
                let pos = self.normal.iter().position(|p| p.id == id)?;
                self.normal.remove(pos)
            }
            StudyId::Challenge(_) => self.challenge.take_if(|p| p.id == id)?,
            StudyId::Dilation(_) => {
                let pos = self.dilation.iter().position(|p| p.id == id)?;
                self.dilation.remove(pos)
            }
        };
        self.owned.remove(&id);
        Some(record)
    }

    fn credit_refund(&mut self, record: &Purchase) {
        self.balance += record.paid;
        if record.locked {
            self.locked_purchases = self.locked_purchases.saturating_sub(1);
        }
        debug!(study = %record.id, credited = %record.paid, "study refunded");
        self.events.push(StudyEvent::Refunded {
            id: record.id,
            credited: record.paid,
        });
    }

    /// Refund every normal study and the active challenge, clear the slot and
    /// the locked-path counter. Returns the total credited.
    pub fn respec(&mut self) -> Decimal {
        let mut records = std::mem::take(&mut self.normal);
        records.extend(self.challenge.take());

        let mut credited = Decimal::ZERO;
        for record in &records {
            self.owned.remove(&record.id);
            self.credit_refund(record);
            credited += record.paid;
        }
        self.locked_purchases = 0;

        info!(refunded = records.len(), credited = %credited, "studies respecced");
        self.events.push(StudyEvent::Respec {
            refunded: records.len(),
            credited,
        });
        self.ownership_changed();
        credited
    }

    /// Refund the dilation subset only.
    pub fn respec_dilation(&mut self) -> Decimal {
        let records = std::mem::take(&mut self.dilation);
        let mut credited = Decimal::ZERO;
        for record in &records {
            self.owned.remove(&record.id);
            self.credit_refund(record);
            credited += record.paid;
        }

        info!(refunded = records.len(), credited = %credited, "dilation studies respecced");
        self.events.push(StudyEvent::DilationRespec {
            refunded: records.len(),
            credited,
        });
        self.ownership_changed();
        credited
    }

    /// Refund and clear the active challenge only.
    pub fn release_challenge(&mut self) -> Option<Decimal> {
        let id = self.active_challenge()?;
        self.refund(id).ok()
    }

    /// A challenge run was completed: release it if it is the active one and
    /// forget the remembered requirement.
    pub fn complete_challenge(&mut self, id: StudyId) -> Option<Decimal> {
        self.remembered_challenge = None;
        if self.active_challenge() == Some(id) {
            self.release_challenge()
        } else {
            None
        }
    }

    /// Epoch reset: clear all ownership, the balance and first-purchase
    /// memory. The generation keeps counting.
    pub fn reset(&mut self) {
        self.balance = Decimal::ZERO;
        self.normal.clear();
        self.challenge = None;
        self.dilation.clear();
        self.owned.clear();
        self.locked_purchases = 0;
        self.remembered_challenge = None;
        self.ever_bought.clear();
        info!("study ledger reset");
        self.ownership_changed();
    }

    fn ownership_changed(&mut self) {
        self.generation.bump();
        self.events.push(StudyEvent::OwnershipChanged {
            generation: self.generation,
        });
    }

    // -- Events --

    /// Drain all pending events.
    pub fn drain_events(&mut self) -> Vec<StudyEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[StudyEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::event::Unlock;
    use crate::graph::{ChallengeSpec, SlotSet, StudyCost, StudyNode};

    fn ts(n: u32) -> StudyId {
        StudyId::Normal(n)
    }

    fn ec(n: u32) -> StudyId {
        StudyId::Challenge(n)
    }

    fn dec(v: u32) -> Decimal {
        Decimal::from(v)
    }

    /// 11 -> 21, 11 -> 22, {21, 22} -> 31, EC1 <- 31, EC2 <- 31, DS1 root.
    fn small_tree() -> StudyGraph {
        let mut b = StudyGraph::builder();
        b.add_study(StudyNode::normal(11, 1))
            .add_study(StudyNode::normal(21, 3))
            .add_study(StudyNode::normal(22, 2))
            .add_study(StudyNode::normal(31, 5))
            .add_study(StudyNode::challenge(
                1,
                10,
                ChallengeSpec {
                    remember_unlock: true,
                    secondary: Condition::counter_at_least("eternities", 10u32),
                    ..ChallengeSpec::default()
                },
            ))
            .add_study(StudyNode::challenge(2, 10, ChallengeSpec::default()))
            .add_study(
                StudyNode::dilation(1, StudyCost::computed(|f| f.counter("dilation.price")))
                    .with_unlock(Unlock::Tab("dilation".into())),
            );
        b.add_edge(ts(11), ts(21))
            .add_edge(ts(11), ts(22))
            .add_edge(ts(21), ts(31))
            .add_edge(ts(22), ts(31))
            .add_edge(ts(31), ec(1))
            .add_edge(ts(31), ec(2));
        b.build().unwrap()
    }

    // -----------------------------------------------------------------------
    // Test 1: Purchase debits and appends in order
    // -----------------------------------------------------------------------
    #[test]
    fn purchase_debits_and_records_order() {
        let graph = small_tree();
        let flags = GameFlags::new();
        let mut ledger = PurchaseLedger::with_balance(dec(100));

        assert!(ledger.purchase(&graph, &flags, ts(11)));
        assert!(ledger.purchase(&graph, &flags, ts(22)));
        assert!(ledger.purchase(&graph, &flags, ts(21)));
        assert_eq!(ledger.balance(), dec(94));
        assert_eq!(
            ledger.owned_normal().collect::<Vec<_>>(),
            vec![ts(11), ts(22), ts(21)]
        );
        assert_eq!(ledger.spent(), dec(6));
        assert!(ledger.has_row(2, 10));
        assert!(!ledger.has_row(3, 10));
    }

    // -----------------------------------------------------------------------
    // Test 2: Second purchase of the same study is a no-op
    // -----------------------------------------------------------------------
    #[test]
    fn purchase_is_idempotent() {
        let graph = small_tree();
        let flags = GameFlags::new();
        let mut ledger = PurchaseLedger::with_balance(dec(10));
        assert!(ledger.purchase(&graph, &flags, ts(11)));
        let generation = ledger.generation();
        assert!(!ledger.purchase(&graph, &flags, ts(11)));
        assert_eq!(ledger.balance(), dec(9));
        assert_eq!(ledger.generation(), generation);
    }

    // -----------------------------------------------------------------------
    // Test 3: Requirement and affordability gating
    // -----------------------------------------------------------------------
    #[test]
    fn gating_by_requirement_and_balance() {
        let graph = small_tree();
        let flags = GameFlags::new();
        let mut ledger = PurchaseLedger::with_balance(dec(3));
        assert!(!ledger.purchase(&graph, &flags, ts(21)));
        assert!(ledger.purchase(&graph, &flags, ts(11)));
        assert!(!ledger.purchase(&graph, &flags, ts(21)), "3 > 2 remaining");
        assert!(ledger.purchase(&graph, &flags, ts(22)));
        assert_eq!(ledger.balance(), Decimal::ZERO);
        assert!(!ledger.purchase(&graph, &flags, ts(99)));
    }

    // -----------------------------------------------------------------------
    // Test 4: Refund reverses exactly and rejects unowned studies
    // -----------------------------------------------------------------------
    #[test]
    fn refund_reverses_purchase() {
        let graph = small_tree();
        let flags = GameFlags::new();
        let mut ledger = PurchaseLedger::with_balance(dec(10));
        ledger.purchase(&graph, &flags, ts(11));
        assert_eq!(ledger.refund(ts(11)), Ok(dec(1)));
        assert_eq!(ledger.balance(), dec(10));
        assert!(!ledger.owns(ts(11)));

        assert_eq!(ledger.refund(ts(11)), Err(LedgerError::NotOwned(ts(11))));
        assert_eq!(ledger.balance(), dec(10));
    }

    // -----------------------------------------------------------------------
    // Test 5: Only one challenge slot
    // -----------------------------------------------------------------------
    #[test]
    fn single_challenge_slot() {
        let graph = small_tree();
        let flags = GameFlags::new().with_counter("eternities", 10u32);
        let mut ledger = PurchaseLedger::with_balance(dec(100));
        for id in [ts(11), ts(21), ts(31)] {
            assert!(ledger.purchase(&graph, &flags, id));
        }
        assert!(ledger.purchase(&graph, &flags, ec(2)));
        assert!(!ledger.purchase(&graph, &flags, ec(1)));
        assert_eq!(ledger.active_challenge(), Some(ec(2)));

        assert_eq!(ledger.release_challenge(), Some(dec(10)));
        assert!(ledger.purchase(&graph, &flags, ec(1)));
        assert_eq!(ledger.active_challenge(), Some(ec(1)));
    }

    #[test]
    fn respec_frees_the_challenge_slot() {
        let graph = small_tree();
        let flags = GameFlags::new().with_counter("eternities", 10u32);
        let mut ledger = PurchaseLedger::with_balance(dec(100));
        for id in [ts(11), ts(21), ts(31), ec(2)] {
            assert!(ledger.purchase(&graph, &flags, id));
        }

        assert_eq!(ledger.respec(), dec(19));
        assert_eq!(ledger.active_challenge(), None);

        for id in [ts(11), ts(21), ts(31)] {
            assert!(ledger.purchase(&graph, &flags, id));
        }
        assert!(ledger.purchase(&graph, &flags, ec(1)));
        assert_eq!(ledger.active_challenge(), Some(ec(1)));
        assert_eq!(ledger.balance(), dec(81));
    }

    #[test]
    fn remembered_challenge_skips_secondary() {
        let graph = small_tree();
        let rich = GameFlags::new().with_counter("eternities", 10u32);
        let poor = GameFlags::new();
        let mut ledger = PurchaseLedger::with_balance(dec(100));
        for id in [ts(11), ts(21), ts(31)] {
            ledger.purchase(&graph, &rich, id);
        }
        assert!(!ledger.purchase(&graph, &poor, ec(1)));
        assert!(ledger.purchase(&graph, &rich, ec(1)));
        ledger.release_challenge();
        assert!(ledger.purchase(&graph, &poor, ec(1)), "remembered");

        ledger.complete_challenge(ec(1));
        assert_eq!(ledger.active_challenge(), None);
        assert!(!ledger.purchase(&graph, &poor, ec(1)));
    }

    // -----------------------------------------------------------------------
    // Test 6: Respec refunds normal + challenge, not dilation
    // -----------------------------------------------------------------------
    #[test]
    fn respec_is_complete() {
        let graph = small_tree();
        let flags = GameFlags::new()
            .with_counter("eternities", 10u32)
            .with_counter("dilation.price", 7u32);
        let mut ledger = PurchaseLedger::with_balance(dec(100));
        for id in [ts(11), ts(22), ts(31), ec(1), StudyId::Dilation(1)] {
            assert!(ledger.purchase(&graph, &flags, id), "{id}");
        }
        assert_eq!(ledger.balance(), dec(75));
        ledger.drain_events();

        assert_eq!(ledger.respec(), dec(18));
        assert_eq!(ledger.balance(), dec(93));
        assert_eq!(ledger.owned_normal().count(), 0);
        assert_eq!(ledger.active_challenge(), None);
        assert!(ledger.owns(StudyId::Dilation(1)));

        let events = ledger.drain_events();
        assert!(events.contains(&StudyEvent::Respec {
            refunded: 4,
            credited: dec(18)
        }));
    }

    #[test]
    fn empty_respec_reports_zero() {
        let mut ledger = PurchaseLedger::new();
        ledger.respec();
        assert!(matches!(
            ledger.drain_events()[0],
            StudyEvent::Respec { refunded: 0, .. }
        ));
    }

    // -----------------------------------------------------------------------
    // Test 7: Refund uses the price paid, not the current price
    // -----------------------------------------------------------------------
    #[test]
    fn refund_uses_snapshot_price() {
        let graph = small_tree();
        let mut flags = GameFlags::new().with_counter("dilation.price", 5u32);
        let mut ledger = PurchaseLedger::with_balance(dec(20));
        assert!(ledger.purchase(&graph, &flags, StudyId::Dilation(1)));
        flags.set_counter("dilation.price", 500u32);
        assert_eq!(ledger.respec_dilation(), dec(5));
        assert_eq!(ledger.balance(), dec(20));
    }

    // -----------------------------------------------------------------------
    // Test 8: Unlocks fire once per reset cycle
    // -----------------------------------------------------------------------
    #[test]
    fn unlocks_fire_on_first_purchase_only() {
        let graph = small_tree();
        let flags = GameFlags::new().with_counter("dilation.price", 1u32);
        let mut ledger = PurchaseLedger::with_balance(dec(10));
        let unlocked = |events: &[StudyEvent]| {
            events
                .iter()
                .filter(|e| matches!(e, StudyEvent::Unlocked { .. }))
                .count()
        };

        ledger.purchase(&graph, &flags, StudyId::Dilation(1));
        assert_eq!(unlocked(&ledger.drain_events()), 1);

        ledger.respec_dilation();
        ledger.purchase(&graph, &flags, StudyId::Dilation(1));
        assert_eq!(unlocked(&ledger.drain_events()), 0);

        ledger.reset();
        ledger.credit(dec(10));
        ledger.purchase(&graph, &flags, StudyId::Dilation(1));
        assert_eq!(unlocked(&ledger.drain_events()), 1);
    }

    #[test]
    fn generation_and_invalidation_signal() {
        let graph = small_tree();
        let flags = GameFlags::new();
        let mut ledger = PurchaseLedger::with_balance(dec(10));
        let before = ledger.generation();
        ledger.purchase(&graph, &flags, ts(11));
        assert!(ledger.generation() > before);
        assert_eq!(
            ledger.pending_events().last(),
            Some(&StudyEvent::OwnershipChanged {
                generation: ledger.generation()
            })
        );
    }

    #[test]
    fn slot_exclusivity_blocks_second_branch() {
        let mut b = StudyGraph::builder();
        for n in [11, 21, 22] {
            b.add_study(StudyNode::normal(n, 1));
        }
        b.add_edge(ts(11), ts(21)).add_edge(ts(11), ts(22));
        b.add_slot_set(SlotSet::new("pair", 1).branch("l", [21]).branch("r", [22]));
        let graph = b.build().unwrap();
        let flags = GameFlags::new();
        let mut ledger = PurchaseLedger::with_balance(dec(10));
        ledger.purchase(&graph, &flags, ts(11));
        assert!(ledger.purchase(&graph, &flags, ts(22)));
        assert!(!ledger.purchase(&graph, &flags, ts(21)));
    }

    #[test]
    fn serde_round_trip_keeps_state() {
        let graph = small_tree();
        let flags = GameFlags::new();
        let mut ledger = PurchaseLedger::with_balance(dec(10));
        ledger.purchase(&graph, &flags, ts(11));
        let json = serde_json::to_string(&ledger).unwrap();
        let restored: PurchaseLedger = serde_json::from_str(&json).unwrap();
        assert!(restored.owns(ts(11)));
        assert_eq!(restored.balance(), dec(9));
        assert!(restored.pending_events().is_empty());
    }
}
