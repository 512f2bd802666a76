//! Predicates over external game state and ownership.
//!
//! Conditions are data first so that layouts can be loaded from files. The
//! only closure-backed form is [`Condition::Custom`], which sees the
//! [`GameFlags`] snapshot and nothing else.

use aeon_core::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::id::StudyId;

// ---------------------------------------------------------------------------
// GameFlags
// ---------------------------------------------------------------------------

/// Read-only snapshot of the global state study predicates depend on:
/// named unlock flags and named numeric counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameFlags {
    flags: BTreeSet<String>,
    counters: BTreeMap<String, Decimal>,
}

impl GameFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_flag(&mut self, name: impl Into<String>, on: bool) {
        let name = name.into();
        if on {
            self.flags.insert(name);
        } else {
            self.flags.remove(&name);
        }
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    pub fn set_counter(&mut self, name: impl Into<String>, value: impl Into<Decimal>) {
        self.counters.insert(name.into(), value.into());
    }

    pub fn add_counter(&mut self, name: impl Into<String>, amount: impl Into<Decimal>) {
        let entry = self.counters.entry(name.into()).or_default();
        *entry += amount.into();
    }

    /// Counter value, zero when unset.
    pub fn counter(&self, name: &str) -> Decimal {
        self.counters.get(name).copied().unwrap_or_default()
    }

    /// Builder form of [`set_flag`](Self::set_flag).
    pub fn with_flag(mut self, name: impl Into<String>) -> Self {
        self.set_flag(name, true);
        self
    }

    /// Builder form of [`set_counter`](Self::set_counter).
    pub fn with_counter(mut self, name: impl Into<String>, value: impl Into<Decimal>) -> Self {
        self.set_counter(name, value);
        self
    }
}

// ---------------------------------------------------------------------------
// Ownership view
// ---------------------------------------------------------------------------

/// Read-only ownership query. Implemented by the ledger and by test doubles.
pub trait OwnershipView {
    fn owns(&self, id: StudyId) -> bool;
}

impl OwnershipView for BTreeSet<StudyId> {
    fn owns(&self, id: StudyId) -> bool {
        self.contains(&id)
    }
}

impl OwnershipView for Vec<StudyId> {
    fn owns(&self, id: StudyId) -> bool {
        self.contains(&id)
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// A pure predicate over [`GameFlags`].
pub type Predicate = Arc<dyn Fn(&GameFlags) -> bool + Send + Sync>;

/// A named closure condition. The name is only for diagnostics.
#[derive(Clone)]
pub struct CustomPredicate {
    pub name: String,
    predicate: Predicate,
}

impl CustomPredicate {
    pub fn new(name: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }

    pub fn test(&self, flags: &GameFlags) -> bool {
        (self.predicate)(flags)
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomPredicate({})", self.name)
    }
}

/// How a [`Condition::Progress`] threshold grows with completions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProgressStep {
    /// `base + step * completions`
    Add(Decimal),
    /// `base * step^completions`
    Mul(Decimal),
}

#[derive(Debug, Clone, Default)]
pub enum Condition {
    #[default]
    Always,
    Never,
    /// A named unlock flag is set.
    Flag(String),
    /// A study is owned.
    Owns(StudyId),
    /// A counter has reached a value.
    CounterAtLeast { counter: String, value: Decimal },
    /// A counter has reached a threshold that grows with a completion count.
    Progress {
        counter: String,
        base: Decimal,
        step: ProgressStep,
        completions: String,
    },
    Not(Box<Condition>),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Custom(CustomPredicate),
}

impl Condition {
    pub fn flag(name: impl Into<String>) -> Self {
        Condition::Flag(name.into())
    }

    pub fn owns(id: StudyId) -> Self {
        Condition::Owns(id)
    }

    pub fn counter_at_least(counter: impl Into<String>, value: impl Into<Decimal>) -> Self {
        Condition::CounterAtLeast {
            counter: counter.into(),
            value: value.into(),
        }
    }

    pub fn custom(
        name: impl Into<String>,
        predicate: impl Fn(&GameFlags) -> bool + Send + Sync + 'static,
    ) -> Self {
        Condition::Custom(CustomPredicate::new(name, Arc::new(predicate)))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Condition) -> Self {
        Condition::Not(Box::new(inner))
    }

    pub fn evaluate(&self, flags: &GameFlags, owned: &dyn OwnershipView) -> bool {
        match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::Flag(name) => flags.has_flag(name),
            Condition::Owns(id) => owned.owns(*id),
            Condition::CounterAtLeast { counter, value } => flags.counter(counter) >= *value,
            Condition::Progress { counter, .. } => {
                flags.counter(counter) >= self.threshold(flags).unwrap_or_default()
            }
            Condition::Not(inner) => !inner.evaluate(flags, owned),
            Condition::All(all) => all.iter().all(|c| c.evaluate(flags, owned)),
            Condition::Any(any) => any.iter().any(|c| c.evaluate(flags, owned)),
            Condition::Custom(custom) => custom.test(flags),
        }
    }

    /// Current target of a `Progress` condition, `None` for other forms.
    pub fn threshold(&self, flags: &GameFlags) -> Option<Decimal> {
        let Condition::Progress {
            base,
            step,
            completions,
            ..
        } = self
        else {
            return None;
        };
        let done = flags.counter(completions);
        Some(match step {
            ProgressStep::Add(step) => *base + *step * done,
            ProgressStep::Mul(step) => *base * step.powf(done.to_f64()),
        })
    }
}
