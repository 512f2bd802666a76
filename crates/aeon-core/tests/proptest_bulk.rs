//! Property-based tests for decimal arithmetic and bulk purchase search.

use aeon_core::Decimal;
use aeon_core::bulk::{BulkMode, bulk_buy, cumulative_cost};
use aeon_core::cost::{CostFunction, GeometricCost, PiecewiseCost};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

/// A decimal spanning plain and scientific ranges.
fn arb_decimal() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        (0u64..1_000_000).prop_map(Decimal::from),
        (1.0f64..10.0, 0i64..5000).prop_map(|(m, e)| Decimal::from_mantissa_exponent(m, e)),
    ]
}

fn arb_geometric() -> impl Strategy<Value = GeometricCost> {
    (1u32..100, 2u32..1000)
        .prop_map(|(base, ratio)| GeometricCost::new(Decimal::from(base), Decimal::from(ratio)))
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn ordering_agrees_with_log10(a in arb_decimal(), b in arb_decimal()) {
        if a.log10() + 1e-9 < b.log10() {
            prop_assert!(a < b);
        }
    }

    #[test]
    fn addition_is_monotonic(a in arb_decimal(), b in arb_decimal()) {
        prop_assert!(a + b >= a);
        prop_assert!(a + b >= b);
    }

    #[test]
    fn display_parses_back(a in arb_decimal()) {
        let parsed: Decimal = a.to_string().parse().unwrap();
        prop_assert_eq!(parsed, a);
    }

    #[test]
    fn bulk_result_is_maximal(
        cost in arb_geometric(),
        owned in 0u64..50,
        balance_log in 0.0f64..400.0,
    ) {
        let balance = Decimal::from_log10(balance_log);
        match bulk_buy(balance, &cost, owned, BulkMode::Cumulative) {
            None => prop_assert!(cost.cost_after(owned) > balance),
            Some(purchase) => {
                prop_assert!(purchase.quantity >= 1);
                prop_assert!(purchase.price <= balance);
                let next = cumulative_cost(&cost, owned, purchase.quantity + 1);
                prop_assert!(next > balance);
            }
        }
    }

    #[test]
    fn last_unit_bulk_is_maximal(owned in 0u64..1500, balance_log in 2.0f64..6000.0) {
        let curve = PiecewiseCost::eternity_multiplier();
        let balance = Decimal::from_log10(balance_log);
        if let Some(purchase) = bulk_buy(balance, &curve, owned, BulkMode::LastUnit) {
            prop_assert!(purchase.price <= balance);
            prop_assert!(curve.cost_after(owned + purchase.quantity) > balance);
        }
    }
}
