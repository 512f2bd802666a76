//! Cost curves for repeatable purchases.
//!
//! A [`CostFunction`] maps "how many already owned" to the price of the next
//! unit. Curves are expected to be non-decreasing in the count; the bulk
//! search in [`crate::bulk`] relies on that.

use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;

/// Price of the next unit given the number already bought.
pub trait CostFunction {
    fn cost_after(&self, count: u64) -> Decimal;

    /// Closed-form total of `quantity` units starting after `owned`, for
    /// curves that have one. `None` makes callers sum unit by unit.
    fn range_cost(&self, _owned: u64, _quantity: u64) -> Option<Decimal> {
        None
    }
}

impl<F> CostFunction for F
where
    F: Fn(u64) -> Decimal,
{
    fn cost_after(&self, count: u64) -> Decimal {
        self(count)
    }
}

// ---------------------------------------------------------------------------
// Geometric
// ---------------------------------------------------------------------------

/// `base * ratio^count`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometricCost {
    pub base: Decimal,
    pub ratio: Decimal,
}

impl GeometricCost {
    pub fn new(base: Decimal, ratio: Decimal) -> Self {
        Self { base, ratio }
    }
}

impl CostFunction for GeometricCost {
    fn cost_after(&self, count: u64) -> Decimal {
        self.base * self.ratio.powf(count as f64)
    }

    /// `base * r^owned * (r^quantity - 1) / (r - 1)`.
    fn range_cost(&self, owned: u64, quantity: u64) -> Option<Decimal> {
        if quantity == 0 {
            return Some(Decimal::ZERO);
        }
        if self.ratio == Decimal::ONE {
            return Some(self.base * Decimal::from(quantity));
        }
        let growth = self.ratio.powf(quantity as f64) - Decimal::ONE;
        Some(self.cost_after(owned) * growth / (self.ratio - Decimal::ONE))
    }
}

// ---------------------------------------------------------------------------
// Linear
// ---------------------------------------------------------------------------

/// `base + step * count`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCost {
    pub base: Decimal,
    pub step: Decimal,
}

impl LinearCost {
    pub fn new(base: Decimal, step: Decimal) -> Self {
        Self { base, step }
    }
}

impl CostFunction for LinearCost {
    fn cost_after(&self, count: u64) -> Decimal {
        self.base + self.step * Decimal::from(count)
    }

    /// Arithmetic series: `quantity * base + step * (quantity * owned + quantity * (quantity - 1) / 2)`.
    fn range_cost(&self, owned: u64, quantity: u64) -> Option<Decimal> {
        let q = quantity as f64;
        let steps = q * owned as f64 + q * (q - 1.0) / 2.0;
        Some(self.base * Decimal::from_f64(q) + self.step * Decimal::from_f64(steps))
    }
}

// ---------------------------------------------------------------------------
// Piecewise
// ---------------------------------------------------------------------------

/// One geometric regime, applying while `count <= up_to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRegime {
    pub up_to: u64,
    pub ratio: f64,
}

/// Past the last regime: `ratio^(count + (count - offset)^power)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuperlinearTail {
    pub ratio: f64,
    pub offset: u64,
    pub power: f64,
}

/// A base price scaled by the first regime whose bound covers the count,
/// falling back to a super-linear tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseCost {
    pub base: Decimal,
    pub regimes: Vec<CostRegime>,
    pub tail: SuperlinearTail,
}

impl PiecewiseCost {
    /// The eternity-point multiplier upgrade curve.
    pub fn eternity_multiplier() -> Self {
        Self {
            base: Decimal::from(500u32),
            regimes: vec![
                CostRegime { up_to: 58, ratio: 50.0 },
                CostRegime { up_to: 153, ratio: 100.0 },
                CostRegime { up_to: 481, ratio: 500.0 },
                CostRegime { up_to: 1333, ratio: 1000.0 },
            ],
            tail: SuperlinearTail {
                ratio: 1000.0,
                offset: 1334,
                power: 1.2,
            },
        }
    }
}

impl CostFunction for PiecewiseCost {
    fn cost_after(&self, count: u64) -> Decimal {
        let n = count as f64;
        if let Some(regime) = self.regimes.iter().find(|r| count <= r.up_to) {
            return self.base * Decimal::pow(regime.ratio, n);
        }
        let excess = count.saturating_sub(self.tail.offset) as f64;
        self.base * Decimal::pow(self.tail.ratio, n + excess.powf(self.tail.power))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_cost_functions() {
        let linear = |n: u64| Decimal::from(n + 1);
        assert_eq!(linear.cost_after(0), Decimal::ONE);
        assert_eq!(linear.cost_after(9), Decimal::from(10u32));
    }

    #[test]
    fn geometric_cost_scales_by_ratio() {
        let cost = GeometricCost::new(Decimal::from(3u32), Decimal::from(2u32));
        assert_eq!(cost.cost_after(0), Decimal::from(3u32));
        assert_eq!(cost.cost_after(4), Decimal::from(48u32));
    }

    #[test]
    fn geometric_range_cost_is_the_series_sum() {
        let cost = GeometricCost::new(Decimal::from(3u32), Decimal::from(2u32));
        // 12 + 24 + 48
        assert_eq!(cost.range_cost(2, 3), Some(Decimal::from(84u32)));
        assert_eq!(cost.range_cost(7, 0), Some(Decimal::ZERO));

        let flat = GeometricCost::new(Decimal::from(5u32), Decimal::ONE);
        assert_eq!(flat.range_cost(100, 4), Some(Decimal::from(20u32)));
    }

    #[test]
    fn linear_range_cost_matches_unit_sum() {
        let cost = LinearCost::new(Decimal::from(2u32), Decimal::from(3u32));
        let by_unit: Decimal = (4..9).map(|n| cost.cost_after(n)).sum();
        assert_eq!(cost.range_cost(4, 5), Some(by_unit));
        assert_eq!(cost.cost_after(4), Decimal::from(14u32));
    }

    #[test]
    fn closures_have_no_closed_form() {
        let linear = |n: u64| Decimal::from(n + 1);
        assert_eq!(linear.range_cost(0, 10), None);
    }

    #[test]
    fn geometric_cost_with_huge_ratio() {
        let cost = GeometricCost::new("1e20000".parse().unwrap(), "1e20000".parse().unwrap());
        assert_eq!(cost.cost_after(0).exponent(), 20000);
        assert_eq!(cost.cost_after(2).exponent(), 60000);
    }

    #[test]
    fn eternity_multiplier_regimes() {
        let curve = PiecewiseCost::eternity_multiplier();
        assert_eq!(curve.cost_after(0), Decimal::from(500u32));
        assert!((curve.cost_after(1).to_f64() - 25_000.0).abs() < 1e-6);
        // First regime ends at 58, second starts at 59.
        let at_58 = curve.cost_after(58).log10();
        let at_59 = curve.cost_after(59).log10();
        assert!((at_58 - (500f64.log10() + 58.0 * 50f64.log10())).abs() < 1e-6);
        assert!((at_59 - (500f64.log10() + 59.0 * 2.0)).abs() < 1e-6);
    }

    #[test]
    fn eternity_multiplier_tail_is_superlinear() {
        let curve = PiecewiseCost::eternity_multiplier();
        let at_1334 = curve.cost_after(1334).log10();
        assert!((at_1334 - (500f64.log10() + 1334.0 * 3.0)).abs() < 1e-6);
        let at_1400 = curve.cost_after(1400).log10();
        let expected = 500f64.log10() + 3.0 * (1400.0 + 66f64.powf(1.2));
        assert!((at_1400 - expected).abs() < 1e-6);
    }

    #[test]
    fn eternity_multiplier_is_monotonic() {
        let curve = PiecewiseCost::eternity_multiplier();
        let mut prev = curve.cost_after(0);
        for n in 1..2000 {
            let next = curve.cost_after(n);
            assert!(next > prev, "cost drops at {n}");
            prev = next;
        }
    }
}
