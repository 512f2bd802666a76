//! Study tree example: theorems, buy-until, tree strings and respec.
//!
//! Builds the standard study tree, buys theorems from a wallet, walks the
//! planner down one dimension and one pace path, exports the owned set,
//! respecs and re-imports it. Finishes by loading the shipped data tree.
//!
//! Run with: `cargo run -p aeon-examples --example study_tree`
//! Set `RUST_LOG=aeon_studies=debug` to see every purchase.

use aeon_core::Decimal;
use aeon_studies::economy::{TheoremCurrency, Wallet};
use aeon_studies::standard::{PresetMode, flags};
use aeon_studies::{StudyEvent, StudyId, StudyTree};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aeon_studies=info,aeon_data=info")),
        )
        .init();

    let mut tree = StudyTree::standard().expect("standard layout is valid");

    // --- Listen for unlocks and respecs ---

    tree.subscribe_filtered(
        Box::new(|e: &StudyEvent| matches!(e, StudyEvent::Unlocked { .. } | StudyEvent::Respec { .. })),
        Box::new(|e: &StudyEvent| println!("  event: {e:?}")),
    );

    // --- Buy theorems ---

    tree.flags_mut().set_counter(flags::TIME_DIMENSIONS_BOUGHT, 1u32);
    let mut wallet = Wallet {
        antimatter: "1e20000".parse().expect("valid decimal"),
        infinity_points: "1e400".parse().expect("valid decimal"),
        eternity_points: Decimal::from(5000u32),
    };
    let bought = tree.buy_max_theorems(&mut wallet);
    println!("Bought {bought} theorems, balance {}", tree.balance());
    for currency in TheoremCurrency::ALL {
        println!(
            "  {currency:?}: {} bought, next costs {}",
            tree.theorems().counts().get(currency),
            tree.theorems().cost(currency)
        );
    }

    // --- Buy-until ---

    for target in [82, 111, 143, 151] {
        let report = tree.purchase_until(StudyId::Normal(target));
        println!(
            "Buy until TS{target}: bought {} studies, reached = {}",
            report.purchased.len(),
            report.target_owned
        );
    }

    // --- Tree strings and respec ---

    let exported = tree.export();
    println!("Exported: {exported}");
    let spent = tree.ledger().spent();
    let credited = tree.respec();
    assert_eq!(spent, credited);
    let outcome = tree.import(&exported);
    println!(
        "Re-imported {} studies, {} skipped",
        outcome.purchased.len(),
        outcome.skipped.len()
    );

    tree.respec();
    let outcome = tree.apply_preset(PresetMode::All, &["td", "passive"]);
    println!("Preset all/td/passive bought {} studies: {}", outcome.purchased.len(), tree.export());

    // --- Data-driven tree ---

    let data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../aeon-data/data");
    match aeon_data::load_study_tree(&data_dir) {
        Ok(graph) => {
            let mut loaded = StudyTree::new(graph);
            loaded.credit(Decimal::from(100u32));
            let report = loaded.purchase_until(StudyId::Normal(103));
            info!(reached = report.target_owned, "data tree planned");
            println!("Data tree: {}", loaded.export());
        }
        Err(e) => eprintln!("could not load data tree: {e}"),
    }
}
