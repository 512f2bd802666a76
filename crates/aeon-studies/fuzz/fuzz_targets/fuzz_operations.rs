#![no_main]
use aeon_core::Decimal;
use aeon_studies::{StudyId, StudyTree};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

/// A structured tree operation for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Purchase { number: u8 },
    PurchaseUntil { number: u8 },
    Challenge { number: u8 },
    Refund { number: u8 },
    Respec,
    ReleaseChallenge,
    Credit { amount: u16 },
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

fn normal(number: u8) -> StudyId {
    StudyId::Normal(u32::from(number))
}

fuzz_target!(|input: FuzzInput| {
    let Ok(mut tree) = StudyTree::standard() else {
        return;
    };
    tree.credit(Decimal::from(10_000u32));

    let max_ops = input.ops.len().min(200);
    for op in &input.ops[..max_ops] {
        match *op {
            FuzzOp::Purchase { number } => {
                tree.purchase(normal(number));
            }
            FuzzOp::PurchaseUntil { number } => {
                tree.purchase_until(normal(number));
            }
            FuzzOp::Challenge { number } => {
                tree.purchase(StudyId::Challenge(u32::from(number % 13)));
            }
            FuzzOp::Refund { number } => {
                let _ = tree.refund(normal(number));
            }
            FuzzOp::Respec => {
                tree.respec();
            }
            FuzzOp::ReleaseChallenge => {
                tree.release_challenge();
            }
            FuzzOp::Credit { amount } => tree.credit(Decimal::from(u32::from(amount))),
        }

        assert!(!tree.balance().is_negative());
    }

    // Whatever survived the sequence is refunded in full.
    let spent = tree.ledger().spent();
    assert_eq!(tree.respec(), spent);
    assert_eq!(tree.ledger().owned_normal().count(), 0);
});
