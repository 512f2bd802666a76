//! Largest-affordable-quantity search over a [`CostFunction`].

use serde::{Deserialize, Serialize};

use crate::cost::CostFunction;
use crate::decimal::Decimal;

/// Upper bound on the quantity a single bulk purchase may return.
pub const MAX_BULK: u64 = 1 << 24;

/// Terms smaller than `total * NEGLIGIBLE_RATIO` are dropped from sums.
const NEGLIGIBLE_RATIO: f64 = 1e-17;

/// How the price of a bulk purchase is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkMode {
    /// Pay the sum of every unit's price.
    Cumulative,
    /// Pay only the price of the last unit bought (curves where earlier units
    /// are absorbed into the last one).
    LastUnit,
}

/// Result of a bulk search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulkPurchase {
    pub quantity: u64,
    pub price: Decimal,
}

/// Total price of `quantity` units starting after `owned`.
///
/// Uses the curve's closed form when it has one. Otherwise summed from the
/// most expensive unit down, stopping once a term can no longer affect the
/// total.
pub fn cumulative_cost<F>(cost: &F, owned: u64, quantity: u64) -> Decimal
where
    F: CostFunction + ?Sized,
{
    sum_units(cost, owned, quantity, None)
}

/// Like [`cumulative_cost`], but stops summing once the total exceeds
/// `limit`. The result is exact when it is at most `limit`.
fn cumulative_cost_capped<F>(cost: &F, owned: u64, quantity: u64, limit: Decimal) -> Decimal
where
    F: CostFunction + ?Sized,
{
    sum_units(cost, owned, quantity, Some(limit))
}

fn sum_units<F>(cost: &F, owned: u64, quantity: u64, limit: Option<Decimal>) -> Decimal
where
    F: CostFunction + ?Sized,
{
    if let Some(total) = cost.range_cost(owned, quantity) {
        return total;
    }
    let negligible = Decimal::from_f64(NEGLIGIBLE_RATIO);
    let end = owned.saturating_add(quantity);
    let mut total = Decimal::ZERO;
    for count in (owned..end).rev() {
        let unit = cost.cost_after(count);
        if !total.is_zero() && unit < total * negligible {
            break;
        }
        total += unit;
        if limit.is_some_and(|limit| total > limit) {
            break;
        }
    }
    total
}

/// Find the largest quantity affordable with `balance`.
///
/// Doubles the quantity until it becomes unaffordable, then binary searches
/// between the last affordable and the first unaffordable quantity. Returns
/// `None` when not even one unit is affordable. Quantities are capped at
/// [`MAX_BULK`].
pub fn bulk_buy<F>(balance: Decimal, cost: &F, owned: u64, mode: BulkMode) -> Option<BulkPurchase>
where
    F: CostFunction + ?Sized,
{
    let price_of = |quantity: u64| match mode {
        BulkMode::Cumulative => cumulative_cost_capped(cost, owned, quantity, balance),
        BulkMode::LastUnit => cost.cost_after(owned.saturating_add(quantity - 1)),
    };

    if price_of(1) > balance {
        return None;
    }

    let mut affordable = 1u64;
    let mut unaffordable = 2u64;
    loop {
        if price_of(unaffordable) > balance {
            break;
        }
        affordable = unaffordable;
        if affordable >= MAX_BULK {
            return Some(BulkPurchase {
                quantity: MAX_BULK,
                price: price_of(MAX_BULK),
            });
        }
        unaffordable = affordable.saturating_mul(2).min(MAX_BULK);
    }

    while unaffordable - affordable > 1 {
        let mid = affordable + (unaffordable - affordable) / 2;
        if price_of(mid) <= balance {
            affordable = mid;
        } else {
            unaffordable = mid;
        }
    }

    Some(BulkPurchase {
        quantity: affordable,
        price: price_of(affordable),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{GeometricCost, LinearCost, PiecewiseCost};
    use std::cell::Cell;

    fn doubling() -> GeometricCost {
        GeometricCost::new(Decimal::ONE, Decimal::from(2u32))
    }

    #[test]
    fn cumulative_cost_of_doubling_curve() {
        // 1 + 2 + 4 + 8
        assert_eq!(cumulative_cost(&doubling(), 0, 4), Decimal::from(15u32));
        // 4 + 8
        assert_eq!(cumulative_cost(&doubling(), 2, 2), Decimal::from(12u32));
        assert_eq!(cumulative_cost(&doubling(), 5, 0), Decimal::ZERO);
    }

    #[test]
    fn unaffordable_returns_none() {
        assert_eq!(bulk_buy(Decimal::ZERO, &doubling(), 0, BulkMode::Cumulative), None);
        assert_eq!(
            bulk_buy(Decimal::from(3u32), &doubling(), 2, BulkMode::Cumulative),
            None
        );
    }

    #[test]
    fn cumulative_bulk_exact_boundary() {
        let result = bulk_buy(Decimal::from(15u32), &doubling(), 0, BulkMode::Cumulative).unwrap();
        assert_eq!(result.quantity, 4);
        assert_eq!(result.price, Decimal::from(15u32));

        let result = bulk_buy(Decimal::from(14u32), &doubling(), 0, BulkMode::Cumulative).unwrap();
        assert_eq!(result.quantity, 3);
        assert_eq!(result.price, Decimal::from(7u32));
    }

    #[test]
    fn last_unit_bulk_charges_final_price() {
        // Units cost 1, 2, 4, 8, 16; paying only the last.
        let result = bulk_buy(Decimal::from(10u32), &doubling(), 0, BulkMode::LastUnit).unwrap();
        assert_eq!(result.quantity, 4);
        assert_eq!(result.price, Decimal::from(8u32));
    }

    #[test]
    fn bulk_never_exceeds_balance() {
        let curve = PiecewiseCost::eternity_multiplier();
        let balance: Decimal = "1e5000".parse().unwrap();
        let result = bulk_buy(balance, &curve, 10, BulkMode::Cumulative).unwrap();
        assert!(result.price <= balance);
        let one_more = cumulative_cost(&curve, 10, result.quantity + 1);
        assert!(one_more > balance);
    }

    #[test]
    fn capped_sum_stops_past_the_limit() {
        let calls = Cell::new(0u64);
        let flat = |_: u64| {
            calls.set(calls.get() + 1);
            Decimal::ONE
        };
        let total = cumulative_cost_capped(&flat, 0, MAX_BULK, Decimal::from(10u32));
        assert!(total > Decimal::from(10u32));
        assert_eq!(calls.get(), 11);

        let result = bulk_buy(Decimal::from(100u32), &flat, 0, BulkMode::Cumulative).unwrap();
        assert_eq!(result.quantity, 100);
        assert_eq!(result.price, Decimal::from(100u32));
    }

    #[test]
    fn linear_bulk_uses_the_series_sum() {
        let curve = LinearCost::new(Decimal::ONE, Decimal::ONE);
        let balance = Decimal::from(1_000_000_000_000u64);
        let result = bulk_buy(balance, &curve, 0, BulkMode::Cumulative).unwrap();
        assert_eq!(result.quantity, 1_414_213);
        assert_eq!(result.price, Decimal::from(999_999_911_791u64));
    }

    #[test]
    fn bulk_is_capped() {
        let free = |_: u64| Decimal::ZERO;
        let result = bulk_buy(Decimal::ONE, &free, 0, BulkMode::LastUnit).unwrap();
        assert_eq!(result.quantity, MAX_BULK);
    }
}
