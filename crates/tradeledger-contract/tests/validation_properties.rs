//! Property-style checks of the trade contract over many generated inputs.
//!
//! Each test sweeps a family of proposals and asserts the admit/reject
//! decision holds for every member, not just a single example.

use tradeledger_contract::{validate, verify};
use tradeledger_types::*;

fn parties(n: usize) -> Vec<Party> {
    (0..n).map(|i| Party::dummy(&format!("O=Party{i}"))).collect()
}

fn body(inputs: Vec<StateAndRef>, outputs: Vec<TradeRecord>, commands: Vec<Command>) -> TransactionBody {
    TransactionBody {
        inputs,
        outputs,
        commands,
        notary: Party::dummy("O=Notary"),
        salt: [0u8; 16],
    }
}

fn input(record: TradeRecord) -> StateAndRef {
    StateAndRef {
        record,
        state_ref: StateRef::new(TxId([1u8; 32]), 0),
    }
}

#[test]
fn create_with_same_party_always_rejected() {
    for p in parties(4) {
        for amount in [0, 1, 500, 1000, u64::MAX] {
            let r = TradeRecord::dummy(&p, &p, amount);
            let err = validate(None, Some(&r), &[p.key, p.key], TransitionKind::Create)
                .unwrap_err();
            assert!(matches!(err, LedgerError::SameParty(_)), "amount {amount}: {err}");
        }
    }
}

#[test]
fn create_with_zero_amount_always_rejected() {
    let ps = parties(3);
    for from in &ps {
        for to in ps.iter().filter(|p| p.key != from.key) {
            let r = TradeRecord::dummy(from, to, 0);
            let err = validate(None, Some(&r), &[from.key, to.key], TransitionKind::Create)
                .unwrap_err();
            assert!(matches!(err, LedgerError::NonPositiveAmount(0)));
        }
    }
}

#[test]
fn create_accepts_iff_signers_are_from_then_to() {
    let ps = parties(3);
    let (from, to, other) = (&ps[0], &ps[1], &ps[2]);
    let r = TradeRecord::dummy(from, to, 250);

    let candidates: Vec<Vec<PartyKey>> = vec![
        vec![],
        vec![from.key],
        vec![to.key],
        vec![from.key, to.key],
        vec![to.key, from.key],
        vec![from.key, other.key],
        vec![from.key, from.key],
        vec![from.key, to.key, other.key],
    ];
    for signers in candidates {
        let admitted = validate(None, Some(&r), &signers, TransitionKind::Create).is_ok();
        assert_eq!(admitted, signers == vec![from.key, to.key], "signers {signers:?}");
    }
}

#[test]
fn settle_accepts_iff_shape_status_and_signer_match() {
    let ps = parties(3);
    let (from, to, other) = (&ps[0], &ps[1], &ps[2]);
    let prior = TradeRecord::dummy(from, to, 250);
    let settled = prior.settled_by(to.clone());

    let shapes: Vec<(Vec<StateAndRef>, Vec<TradeRecord>, bool)> = vec![
        (vec![input(prior.clone())], vec![settled.clone()], true),
        (vec![], vec![settled.clone()], false),
        (vec![input(prior.clone())], vec![], false),
        (vec![input(prior.clone()), input(prior.clone())], vec![settled.clone()], false),
        (vec![input(prior.clone())], vec![settled.clone(), settled.clone()], false),
        (vec![input(prior.clone())], vec![prior.clone()], false),
    ];
    for (inputs, outputs, shape_ok) in shapes {
        for (signers, signer_ok) in [
            (vec![to.key], true),
            (vec![from.key], false),
            (vec![other.key], false),
            (vec![to.key, from.key], false),
            (vec![], false),
        ] {
            let tx = body(
                inputs.clone(),
                outputs.clone(),
                vec![Command::new(TransitionKind::Settle, signers.clone())],
            );
            assert_eq!(
                verify(&tx).is_ok(),
                shape_ok && signer_ok,
                "inputs={} outputs={} signers={signers:?}",
                inputs.len(),
                outputs.len()
            );
        }
    }
}

#[test]
fn settle_status_compare_ignores_case_on_the_wire() {
    let ps = parties(2);
    let prior = TradeRecord::dummy(&ps[0], &ps[1], 10);
    let mut json = serde_json::to_value(prior.settled_by(ps[1].clone())).unwrap();
    json["status"] = serde_json::Value::String("settled".into());
    let settled: TradeRecord = serde_json::from_value(json).unwrap();
    assert!(validate(Some(&prior), Some(&settled), &[ps[1].key], TransitionKind::Settle).is_ok());
}

#[test]
fn close_accepts_iff_sole_signer_is_consumed_to_party() {
    let ps = parties(3);
    let (from, to, other) = (&ps[0], &ps[1], &ps[2]);
    for prior in [
        TradeRecord::dummy(from, to, 5),
        TradeRecord::dummy(from, to, 5).settled_by(to.clone()),
    ] {
        for (signers, ok) in [
            (vec![to.key], true),
            (vec![from.key], false),
            (vec![other.key], false),
            (vec![to.key, to.key], false),
        ] {
            let admitted = validate(Some(&prior), None, &signers, TransitionKind::Close).is_ok();
            assert_eq!(admitted, ok, "status {} signers {signers:?}", prior.status);
        }
    }
}

#[test]
fn more_than_one_command_rejected_before_kind_rules() {
    let ps = parties(2);
    let r = TradeRecord::dummy(&ps[0], &ps[1], 10);
    let good = Command::new(TransitionKind::Create, vec![ps[0].key, ps[1].key]);
    let tx = body(vec![], vec![r], vec![good.clone(), good]);
    assert!(matches!(verify(&tx).unwrap_err(), LedgerError::CommandCount(2)));
}

#[test]
fn unrecognised_command_rejected() {
    let ps = parties(2);
    let r = TradeRecord::dummy(&ps[0], &ps[1], 10);
    let err = validate(
        None,
        Some(&r),
        &[ps[0].key, ps[1].key],
        TransitionKind::Other("Transfer".into()),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::UnrecognisedTransition(name) if name == "Transfer"));
}
