//! Criterion benchmarks for buy-until planning and tree strings.
//!
//! - `plan_to_234`: deepest normal target with a committed dimension path.
//! - `plan_ambiguous`: early stop when no dimension path is chosen.
//! - `import_full_tree`: replaying an exported late-game tree.

use aeon_core::Decimal;
use aeon_studies::serializer;
use aeon_studies::standard;
use aeon_studies::{GameFlags, PathPlanner, PurchaseLedger, StudyId};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn funded() -> PurchaseLedger {
    PurchaseLedger::with_balance(Decimal::from(100_000u32))
}

fn bench_plan_deep(c: &mut Criterion) {
    let graph = standard::layout().unwrap();
    let flags = GameFlags::new()
        .with_flag(standard::flags::LOCKED_PATH)
        .with_counter(standard::flags::LOCKED_BUDGET, 10u32)
        .with_counter(standard::flags::completions(1), 1u32)
        .with_counter(standard::flags::completions(2), 1u32)
        .with_counter(standard::flags::completions(3), 1u32)
        .with_counter(standard::flags::completions(10), 1u32);
    c.bench_function("plan_to_234", |b| {
        b.iter(|| {
            let mut ledger = funded();
            ledger.purchase(&graph, &flags, StudyId::Normal(11));
            PathPlanner::new(&graph, &flags, &mut ledger).plan(black_box(StudyId::Normal(234)))
        })
    });
}

fn bench_plan_ambiguous(c: &mut Criterion) {
    let graph = standard::layout().unwrap();
    let flags = GameFlags::new();
    c.bench_function("plan_ambiguous", |b| {
        b.iter(|| {
            let mut ledger = funded();
            PathPlanner::new(&graph, &flags, &mut ledger).plan(black_box(StudyId::Normal(151)))
        })
    });
}

fn bench_import(c: &mut Criterion) {
    let graph = standard::layout().unwrap();
    let flags = GameFlags::new().with_counter(standard::flags::completions(10), 1u32);
    let mut source = funded();
    for n in [11, 21, 22, 31, 32, 33, 41, 42, 51, 61, 73, 83, 93, 103, 111, 123, 133, 143, 151] {
        source.purchase(&graph, &flags, StudyId::Normal(n));
    }
    let text = serializer::export(&source);
    c.bench_function("import_full_tree", |b| {
        b.iter(|| {
            let mut ledger = funded();
            serializer::import(&graph, &flags, &mut ledger, black_box(&text))
        })
    });
}

criterion_group!(benches, bench_plan_deep, bench_plan_ambiguous, bench_import);
criterion_main!(benches);
