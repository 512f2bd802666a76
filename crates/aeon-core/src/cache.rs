//! Generation counters and values derived from them.
//!
//! A state owner bumps its [`Generation`] on every mutation. Consumers hold a
//! [`DerivedCache`] keyed on the generation it was computed at and recompute
//! lazily on the first read after a change.

use serde::{Deserialize, Serialize};

/// Monotonic mutation counter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Generation(pub u64);

impl Generation {
    pub fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// A value computed from state at a particular [`Generation`].
#[derive(Debug, Clone)]
pub struct DerivedCache<T> {
    value: Option<T>,
    computed_at: Option<Generation>,
    recomputes: u64,
}

impl<T> Default for DerivedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DerivedCache<T> {
    pub fn new() -> Self {
        Self {
            value: None,
            computed_at: None,
            recomputes: 0,
        }
    }

    /// Return the cached value, recomputing if it was computed at a
    /// different generation.
    pub fn get(&mut self, current: Generation, compute: impl FnOnce() -> T) -> &T {
        if self.computed_at != Some(current) {
            self.value = None;
        }
        self.computed_at = Some(current);
        let recomputes = &mut self.recomputes;
        self.value.get_or_insert_with(|| {
            *recomputes += 1;
            compute()
        })
    }

    /// Whether a read at `current` would hit the cache.
    pub fn is_fresh(&self, current: Generation) -> bool {
        self.value.is_some() && self.computed_at == Some(current)
    }

    pub fn invalidate(&mut self) {
        self.value = None;
        self.computed_at = None;
    }

    /// How many times the value has been computed.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }
}
