//! The `id,id,...|N` tree string.
//!
//! The list holds the owned normal studies in purchase order and `N` is the
//! active challenge number, or `0` when none is active. Import replays the
//! string as ordinary purchases, so anything unbuyable is skipped rather than
//! rejected.

use tracing::debug;

use crate::condition::GameFlags;
use crate::graph::StudyGraph;
use crate::id::StudyId;
use crate::ledger::PurchaseLedger;

// ---------------------------------------------------------------------------
// Parsed form
// ---------------------------------------------------------------------------

/// A tree string split into its parts. Malformed tokens are already gone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTree {
    pub studies: Vec<u32>,
    /// `None` for a missing, zero or malformed trailing segment.
    pub challenge: Option<u32>,
    /// Tokens that were not unsigned integers.
    pub malformed: Vec<String>,
}

/// What an import actually did. Diagnostic only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub purchased: Vec<StudyId>,
    /// Tokens dropped as malformed, unknown or unpurchasable.
    pub skipped: Vec<String>,
    /// The challenge activated by the trailing segment.
    pub challenge: Option<StudyId>,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Render the ledger's normal studies and active challenge.
pub fn export(ledger: &PurchaseLedger) -> String {
    let studies: Vec<String> = ledger.owned_normal().map(|id| id.number().to_string()).collect();
    let challenge = ledger.active_challenge().map_or(0, StudyId::number);
    format!("{}|{challenge}", studies.join(","))
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Split a tree string. Only the first two `|` segments are considered.
pub fn parse(input: &str) -> ParsedTree {
    let mut segments = input.trim().split('|');
    let list = segments.next().unwrap_or_default();
    let challenge = segments
        .next()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|&n| n != 0);

    let mut parsed = ParsedTree {
        challenge,
        ..ParsedTree::default()
    };
    for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<u32>() {
            Ok(n) => parsed.studies.push(n),
            Err(_) => {
                debug!(token, "dropping malformed study token");
                parsed.malformed.push(token.to_string());
            }
        }
    }
    parsed
}

/// Purchase every listed study in order, then activate the challenge.
pub fn import(
    graph: &StudyGraph,
    flags: &GameFlags,
    ledger: &mut PurchaseLedger,
    input: &str,
) -> ImportOutcome {
    let parsed = parse(input);
    let mut outcome = ImportOutcome {
        skipped: parsed.malformed,
        ..ImportOutcome::default()
    };

    for n in parsed.studies {
        let id = StudyId::Normal(n);
        if ledger.owns(id) {
            continue;
        }
        if !graph.contains(id) {
            debug!(study = n, "dropping unknown study token");
            outcome.skipped.push(n.to_string());
        } else if ledger.purchase(graph, flags, id) {
            outcome.purchased.push(id);
        } else {
            outcome.skipped.push(n.to_string());
        }
    }

    if let Some(n) = parsed.challenge {
        let id = StudyId::Challenge(n);
        if ledger.owns(id) || (graph.contains(id) && ledger.purchase(graph, flags, id)) {
            outcome.challenge = Some(id);
        } else {
            debug!(challenge = n, "challenge from tree string not activated");
        }
    }

    debug!(
        purchased = outcome.purchased.len(),
        skipped = outcome.skipped.len(),
        "tree string imported"
    );
    outcome
}
