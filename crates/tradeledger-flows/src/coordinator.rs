//! Transition coordinator: builds the candidate transaction for each kind
//! of transition and validates it locally before anything leaves the node.

use chrono::{DateTime, Utc};

use tradeledger_contract::validate;
use tradeledger_types::{
    Command, Party, PartyKey, Result, StateAndRef, TradeRecord, TransactionBody, TransitionKind,
};

/// A locally validated transition, ready for the protocol driver.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub kind: TransitionKind,
    pub body: TransactionBody,
    /// Everyone besides the initiator who must learn the outcome.
    pub counterparties: Vec<Party>,
}

impl Proposal {
    /// Counterparties whose signature the initiator must collect.
    #[must_use]
    pub fn signing_counterparties(&self) -> Vec<&Party> {
        let required = self.body.required_signers();
        self.counterparties
            .iter()
            .filter(|p| required.contains(&p.key))
            .collect()
    }
}

/// A new trade from `initiator` to `to_party`. Signers are
/// `[initiator, to_party]` in that order.
pub fn propose_create(
    initiator: &Party,
    to_party: &Party,
    amount: u64,
    trade_date: DateTime<Utc>,
    notary: &Party,
) -> Result<Proposal> {
    let record = TradeRecord::submitted(initiator.clone(), to_party.clone(), amount, trade_date);
    let signers = vec![initiator.key, to_party.key];
    validate(None, Some(&record), &signers, TransitionKind::Create)?;

    let counterparties = others(initiator, &record);
    Ok(build(
        TransitionKind::Create,
        Vec::new(),
        vec![record],
        signers,
        notary,
        counterparties,
    ))
}

/// Settle `current` as `initiator`. Only succeeds when the initiator is the
/// record's `to_party`.
pub fn propose_settle(initiator: &Party, current: StateAndRef, notary: &Party) -> Result<Proposal> {
    let successor = current.record.settled_by(initiator.clone());
    let signers = vec![initiator.key];
    validate(
        Some(&current.record),
        Some(&successor),
        &signers,
        TransitionKind::Settle,
    )?;

    let counterparties = others(initiator, &current.record);
    Ok(build(
        TransitionKind::Settle,
        vec![current],
        vec![successor],
        signers,
        notary,
        counterparties,
    ))
}

/// Consume `current` with no successor.
pub fn propose_close(initiator: &Party, current: StateAndRef, notary: &Party) -> Result<Proposal> {
    let signers = vec![initiator.key];
    validate(Some(&current.record), None, &signers, TransitionKind::Close)?;

    let counterparties = others(initiator, &current.record);
    Ok(build(
        TransitionKind::Close,
        vec![current],
        Vec::new(),
        signers,
        notary,
        counterparties,
    ))
}

fn build(
    kind: TransitionKind,
    inputs: Vec<StateAndRef>,
    outputs: Vec<TradeRecord>,
    signers: Vec<PartyKey>,
    notary: &Party,
    counterparties: Vec<Party>,
) -> Proposal {
    let body = TransactionBody {
        inputs,
        outputs,
        commands: vec![Command::new(kind.clone(), signers)],
        notary: notary.clone(),
        salt: rand::random(),
    };
    Proposal {
        kind,
        body,
        counterparties,
    }
}

fn others(initiator: &Party, record: &TradeRecord) -> Vec<Party> {
    record
        .participants()
        .into_iter()
        .filter(|p| p.key != initiator.key)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeledger_types::{LedgerError, StateRef, TradeStatus, TxId};

    fn parties() -> (Party, Party, Party) {
        (
            Party::dummy("O=Alice"),
            Party::dummy("O=Bob"),
            Party::dummy("O=Notary"),
        )
    }

    fn current(record: TradeRecord) -> StateAndRef {
        StateAndRef {
            record,
            state_ref: StateRef::new(TxId([1u8; 32]), 0),
        }
    }

    #[test]
    fn create_orders_signers_and_targets_counterparty() {
        let (alice, bob, notary) = parties();
        let p = propose_create(&alice, &bob, 500, Utc::now(), &notary).unwrap();

        assert_eq!(p.body.commands[0].signers, vec![alice.key, bob.key]);
        assert_eq!(p.counterparties, vec![bob.clone()]);
        assert_eq!(p.signing_counterparties(), vec![&bob]);
        let record = &p.body.outputs[0];
        assert_eq!(record.status, TradeStatus::Submitted);
        assert!(record.updated_by.is_none());
        assert_eq!(p.body.notary, notary);
    }

    #[test]
    fn create_rejects_zero_amount_locally() {
        let (alice, bob, notary) = parties();
        let err = propose_create(&alice, &bob, 0, Utc::now(), &notary).unwrap_err();
        assert!(matches!(err, LedgerError::NonPositiveAmount(0)));
    }

    #[test]
    fn create_rejects_self_trade_locally() {
        let (alice, _, notary) = parties();
        let err = propose_create(&alice, &alice, 0, Utc::now(), &notary).unwrap_err();
        assert!(matches!(err, LedgerError::SameParty(_)));
    }

    #[test]
    fn settle_by_to_party_needs_no_counter_signature() {
        let (alice, bob, notary) = parties();
        let record = TradeRecord::dummy(&alice, &bob, 500);
        let p = propose_settle(&bob, current(record.clone()), &notary).unwrap();

        let successor = &p.body.outputs[0];
        assert_eq!(successor.id, record.id);
        assert_eq!(successor.status, TradeStatus::Settled);
        assert_eq!(successor.updated_by.as_ref(), Some(&bob));
        assert_eq!(p.counterparties, vec![alice]);
        assert!(p.signing_counterparties().is_empty());
    }

    #[test]
    fn settle_by_from_party_is_signer_mismatch() {
        let (alice, bob, notary) = parties();
        let record = TradeRecord::dummy(&alice, &bob, 500);
        let err = propose_settle(&alice, current(record), &notary).unwrap_err();
        assert!(matches!(err, LedgerError::SignerMismatch { .. }));
    }

    #[test]
    fn close_consumes_without_successor() {
        let (alice, bob, notary) = parties();
        let record = TradeRecord::dummy(&alice, &bob, 500);
        let p = propose_close(&bob, current(record), &notary).unwrap();
        assert_eq!(p.body.inputs.len(), 1);
        assert!(p.body.outputs.is_empty());

        let record = TradeRecord::dummy(&alice, &bob, 500);
        assert!(propose_close(&alice, current(record), &notary).is_err());
    }

    #[test]
    fn identical_proposals_are_distinct_transactions() {
        let (alice, bob, notary) = parties();
        let record = TradeRecord::dummy(&alice, &bob, 500);
        let a = propose_settle(&bob, current(record.clone()), &notary).unwrap();
        let b = propose_settle(&bob, current(record), &notary).unwrap();
        assert_ne!(a.body.id(), b.body.id());
    }
}
