//! Study events and unlock side effects.

use aeon_core::Decimal;
use aeon_core::cache::Generation;
use serde::{Deserialize, Serialize};

use crate::id::StudyId;

/// A side effect owed to an external system the first time a study is bought.
/// The engine only reports it; game code applies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Unlock {
    /// Reveal a previously hidden UI tab.
    Tab(String),

    /// Grant a starting amount of a resource counter.
    Grant { counter: String, amount: Decimal },

    /// Game-defined unlock. The key is opaque to the engine.
    Custom(String),
}

/// Events emitted by the purchase ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum StudyEvent {
    Purchased {
        id: StudyId,
        paid: Decimal,
    },

    Refunded {
        id: StudyId,
        credited: Decimal,
    },

    /// First-ever purchase of a study carrying unlocks.
    Unlocked {
        id: StudyId,
        unlocks: Vec<Unlock>,
    },

    /// Normal studies and the active challenge were refunded together.
    /// `refunded == 0` marks an empty respec.
    Respec {
        refunded: usize,
        credited: Decimal,
    },

    /// The dilation subset was refunded.
    DilationRespec {
        refunded: usize,
        credited: Decimal,
    },

    /// The owned set changed; read-through caches keyed on an older
    /// generation are stale.
    OwnershipChanged {
        generation: Generation,
    },
}

impl StudyEvent {
    /// The study this event concerns, if it concerns exactly one.
    pub fn study(&self) -> Option<StudyId> {
        match self {
            StudyEvent::Purchased { id, .. }
            | StudyEvent::Refunded { id, .. }
            | StudyEvent::Unlocked { id, .. } => Some(*id),
            _ => None,
        }
    }
}
