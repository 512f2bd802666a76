//! Aeon Core -- numeric and plumbing primitives for incremental-game engines.
//!
//! This crate holds everything the purchase engines share but that knows
//! nothing about any particular upgrade tree: large-magnitude numbers, cost
//! curves, bulk-purchase search, notification hooks, and generation-keyed
//! caches.
//!
//! # Key Types
//!
//! - [`decimal::Decimal`] -- Plain `f64` below `1e300`, mantissa/exponent above.
//! - [`cost::CostFunction`] -- Price of the next unit given the owned count.
//! - [`cost::PiecewiseCost`] -- Regime-switching geometric curve with a
//!   super-linear tail.
//! - [`bulk::bulk_buy`] -- Largest affordable quantity via doubling
//!   and binary search.
//! - [`hooks::HookBus`] -- Ordered, synchronous, passive listeners.
//! - [`cache::DerivedCache`] -- Lazily recomputed value keyed on a
//!   [`cache::Generation`].

pub mod bulk;
pub mod cache;
pub mod cost;
pub mod decimal;
pub mod hooks;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use decimal::Decimal;
