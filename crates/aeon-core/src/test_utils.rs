//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::cost::{GeometricCost, LinearCost};
use crate::decimal::Decimal;

/// Parse a decimal literal, panicking on malformed input.
pub fn dec(s: &str) -> Decimal {
    s.parse()
        .unwrap_or_else(|e| panic!("bad decimal literal {s:?}: {e}"))
}

/// `1, 2, 4, 8, ...`
pub fn doubling_cost() -> GeometricCost {
    GeometricCost::new(Decimal::ONE, Decimal::from(2u32))
}

/// `base + step * n`
pub fn linear_cost(base: u64, step: u64) -> LinearCost {
    LinearCost::new(Decimal::from(base), Decimal::from(step))
}
