#![no_main]
use aeon_core::Decimal;
use aeon_studies::serializer;
use aeon_studies::standard;
use aeon_studies::{GameFlags, PurchaseLedger};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary tree strings must never panic, and whatever was imported
    // must export to a string that imports to the same state.
    let Ok(graph) = standard::layout() else {
        return;
    };
    let flags = GameFlags::new();
    let mut ledger = PurchaseLedger::with_balance(Decimal::from(100_000u32));
    serializer::import(&graph, &flags, &mut ledger, data);

    let text = serializer::export(&ledger);
    let mut replay = PurchaseLedger::with_balance(Decimal::from(100_000u32));
    serializer::import(&graph, &flags, &mut replay, &text);
    assert_eq!(serializer::export(&replay), text);
});
