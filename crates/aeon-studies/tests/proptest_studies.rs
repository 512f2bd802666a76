//! Property-based tests for ledger and tree-string invariants over the
//! standard layout.

use aeon_core::Decimal;
use aeon_studies::serializer;
use aeon_studies::standard;
use aeon_studies::{GameFlags, PurchaseLedger, StudyGraph, StudyId, StudyKind};
use proptest::prelude::*;
use std::sync::OnceLock;

fn graph() -> &'static StudyGraph {
    static GRAPH: OnceLock<StudyGraph> = OnceLock::new();
    GRAPH.get_or_init(|| standard::layout().unwrap())
}

fn normal_ids() -> Vec<StudyId> {
    graph().studies_of(StudyKind::Normal).collect()
}

fn all_ids() -> Vec<StudyId> {
    graph().studies().map(|n| n.id).collect()
}

fn rich() -> PurchaseLedger {
    PurchaseLedger::with_balance(Decimal::from(1_000_000u32))
}

// ===========================================================================
// Generators
// ===========================================================================

/// Indices into a study list; many picks will be unpurchasable, which is
/// fine since failures must leave no trace.
fn arb_picks(len: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..len, 0..60)
}

/// Flags that open some optional parts of the tree.
fn arb_flags() -> impl Strategy<Value = GameFlags> {
    (any::<bool>(), any::<bool>(), 0u32..3).prop_map(|(split, perk, completions)| {
        let mut flags = GameFlags::new();
        flags.set_flag(standard::flags::TIME_STUDY_SPLIT, split);
        flags.set_flag(standard::flags::STUDY_EC_REQUIREMENT, perk);
        for n in 1..=10 {
            flags.set_counter(standard::flags::completions(n), completions);
        }
        flags
    })
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn respec_refunds_everything_spent(picks in arb_picks(all_ids().len()), flags in arb_flags()) {
        let ids = all_ids();
        let mut ledger = rich();
        let start = ledger.balance();
        for i in picks {
            ledger.purchase(graph(), &flags, ids[i]);
        }
        let dilation: Decimal = ledger.dilation_purchases().iter().map(|p| p.paid).sum();
        let spent = ledger.spent();

        let credited = ledger.respec();
        prop_assert_eq!(credited, spent);
        prop_assert_eq!(ledger.owned_normal().count(), 0);
        prop_assert_eq!(ledger.active_challenge(), None);
        prop_assert_eq!(ledger.balance() + dilation, start);
    }

    #[test]
    fn repeated_purchase_is_a_no_op(picks in arb_picks(all_ids().len()), flags in arb_flags()) {
        let ids = all_ids();
        let mut ledger = rich();
        for i in picks {
            if ledger.purchase(graph(), &flags, ids[i]) {
                let balance = ledger.balance();
                let owned = ledger.owned_count();
                prop_assert!(!ledger.purchase(graph(), &flags, ids[i]));
                prop_assert_eq!(ledger.balance(), balance);
                prop_assert_eq!(ledger.owned_count(), owned);
            }
        }
    }

    #[test]
    fn failed_purchase_leaves_no_trace(picks in arb_picks(all_ids().len())) {
        let ids = all_ids();
        let flags = GameFlags::new();
        let mut ledger = PurchaseLedger::with_balance(Decimal::from(40u32));
        for i in picks {
            let before = (ledger.balance(), ledger.owned_count(), ledger.generation());
            if !ledger.purchase(graph(), &flags, ids[i]) {
                prop_assert_eq!((ledger.balance(), ledger.owned_count(), ledger.generation()), before);
            }
        }
    }

    #[test]
    fn export_import_round_trip(
        picks in arb_picks(normal_ids().len()),
        challenge in prop::option::of(1u32..=12),
        flags in arb_flags(),
    ) {
        let ids = normal_ids();
        let mut source = rich();
        for i in picks {
            source.purchase(graph(), &flags, ids[i]);
        }
        if let Some(n) = challenge {
            source.purchase(graph(), &flags, StudyId::Challenge(n));
        }
        let text = serializer::export(&source);

        let mut replay = rich();
        serializer::import(graph(), &flags, &mut replay, &text);
        prop_assert_eq!(
            replay.owned_normal().collect::<Vec<_>>(),
            source.owned_normal().collect::<Vec<_>>()
        );
        prop_assert_eq!(replay.active_challenge(), source.active_challenge());
        prop_assert_eq!(serializer::export(&replay), text);
    }

    #[test]
    fn import_never_panics(input in ".{0,80}") {
        let mut ledger = rich();
        serializer::import(graph(), &GameFlags::new(), &mut ledger, &input);
    }
}
