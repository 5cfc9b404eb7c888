//! Contract rules for trade transitions.
//!
//! | Kind   | Inputs | Outputs | Extra checks                        | Signers (ordered)        |
//! |--------|--------|---------|-------------------------------------|--------------------------|
//! | CREATE | 0      | 1       | parties differ, amount >= 1         | `[from_party, to_party]` |
//! | SETTLE | 1      | 1       | output status SETTLED               | `[to_party]` of output   |
//! | CLOSE  | 1      | 0       |                                     | `[to_party]` of input    |
//!
//! Signer lists are compared positionally: `[to, from]` is not `[from, to]`.

use tradeledger_types::{
    Command, LedgerError, PartyKey, Result, TradeRecord, TradeStatus, TransactionBody,
    TransitionKind, constants, format_keys,
};

/// Verify a whole transaction body against the trade contract.
pub fn verify(body: &TransactionBody) -> Result<()> {
    let inputs: Vec<&TradeRecord> = body.inputs.iter().map(|i| &i.record).collect();
    let outputs: Vec<&TradeRecord> = body.outputs.iter().collect();
    verify_parts(&inputs, &outputs, &body.commands)
}

/// Single-transition form: prior version (if any), proposed version (if
/// any), the declared signers, and the kind.
pub fn validate(
    prior: Option<&TradeRecord>,
    proposed: Option<&TradeRecord>,
    declared_signers: &[PartyKey],
    kind: TransitionKind,
) -> Result<()> {
    let inputs: Vec<&TradeRecord> = prior.into_iter().collect();
    let outputs: Vec<&TradeRecord> = proposed.into_iter().collect();
    verify_parts(
        &inputs,
        &outputs,
        &[Command::new(kind, declared_signers.to_vec())],
    )
}

/// Core rule dispatch over consumed inputs, created outputs and commands.
///
/// # Errors
/// The first rule that fails, as one of the `TL_ERR_1xx` validation errors.
pub fn verify_parts(
    inputs: &[&TradeRecord],
    outputs: &[&TradeRecord],
    commands: &[Command],
) -> Result<()> {
    let [command] = commands else {
        return Err(LedgerError::CommandCount(commands.len()));
    };

    let result = match &command.kind {
        TransitionKind::Create => verify_create(inputs, outputs, &command.signers),
        TransitionKind::Settle => verify_settle(inputs, outputs, &command.signers),
        TransitionKind::Close => verify_close(inputs, outputs, &command.signers),
        TransitionKind::Other(name) => Err(LedgerError::UnrecognisedTransition(name.clone())),
    };

    if let Err(err) = &result {
        tracing::debug!(kind = %command.kind, error = %err, "Contract rejected transition");
    }
    result
}

fn verify_create(
    inputs: &[&TradeRecord],
    outputs: &[&TradeRecord],
    signers: &[PartyKey],
) -> Result<()> {
    let kind = TransitionKind::Create;
    expect_count(&kind, inputs.len(), 0, outputs.len(), 1)?;
    let output = outputs[0];

    if output.from_party.key == output.to_party.key {
        return Err(LedgerError::SameParty(output.to_party.name.clone()));
    }
    if output.amount < constants::MIN_TRADE_AMOUNT {
        return Err(LedgerError::NonPositiveAmount(output.amount));
    }

    let expected = [output.from_party.key, output.to_party.key];
    if signers.len() != expected.len() {
        return Err(LedgerError::SignerCount {
            kind,
            expected: expected.len(),
            actual: signers.len(),
        });
    }
    expect_signers(kind, &expected, signers)
}

fn verify_settle(
    inputs: &[&TradeRecord],
    outputs: &[&TradeRecord],
    signers: &[PartyKey],
) -> Result<()> {
    let kind = TransitionKind::Settle;
    expect_count(&kind, inputs.len(), 1, outputs.len(), 1)?;
    let output = outputs[0];

    if output.status != TradeStatus::Settled {
        return Err(LedgerError::WrongStatus {
            kind,
            expected: TradeStatus::Settled.to_string(),
            actual: output.status.to_string(),
        });
    }
    expect_signers(kind, &[output.to_party.key], signers)
}

fn verify_close(
    inputs: &[&TradeRecord],
    outputs: &[&TradeRecord],
    signers: &[PartyKey],
) -> Result<()> {
    let kind = TransitionKind::Close;
    expect_count(&kind, inputs.len(), 1, outputs.len(), 0)?;
    expect_signers(kind, &[inputs[0].to_party.key], signers)
}

fn expect_count(
    kind: &TransitionKind,
    inputs: usize,
    expected_inputs: usize,
    outputs: usize,
    expected_outputs: usize,
) -> Result<()> {
    if inputs != expected_inputs {
        return Err(LedgerError::InputCount {
            kind: kind.clone(),
            expected: expected_inputs,
            actual: inputs,
        });
    }
    if outputs != expected_outputs {
        return Err(LedgerError::OutputCount {
            kind: kind.clone(),
            expected: expected_outputs,
            actual: outputs,
        });
    }
    Ok(())
}

fn expect_signers(kind: TransitionKind, expected: &[PartyKey], declared: &[PartyKey]) -> Result<()> {
    if declared != expected {
        return Err(LedgerError::SignerMismatch {
            kind,
            expected: format_keys(expected),
            declared: format_keys(declared),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeledger_types::Party;

    fn parties() -> (Party, Party) {
        (Party::dummy("O=Alice"), Party::dummy("O=Bob"))
    }

    #[test]
    fn create_admits_ordered_pair() {
        let (a, b) = parties();
        let r = TradeRecord::dummy(&a, &b, 500);
        assert!(validate(None, Some(&r), &[a.key, b.key], TransitionKind::Create).is_ok());
    }

    #[test]
    fn create_rejects_reversed_pair() {
        let (a, b) = parties();
        let r = TradeRecord::dummy(&a, &b, 500);
        let err = validate(None, Some(&r), &[b.key, a.key], TransitionKind::Create).unwrap_err();
        assert!(matches!(err, LedgerError::SignerMismatch { .. }));
    }

    #[test]
    fn create_rejects_single_signer() {
        let (a, b) = parties();
        let r = TradeRecord::dummy(&a, &b, 500);
        let err = validate(None, Some(&r), &[a.key], TransitionKind::Create).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::SignerCount { expected: 2, actual: 1, .. }
        ));
    }

    #[test]
    fn create_rejects_prior_version() {
        let (a, b) = parties();
        let r = TradeRecord::dummy(&a, &b, 500);
        let err =
            validate(Some(&r), Some(&r), &[a.key, b.key], TransitionKind::Create).unwrap_err();
        assert!(matches!(err, LedgerError::InputCount { expected: 0, actual: 1, .. }));
    }

    #[test]
    fn same_party_checked_before_signers() {
        let (a, _) = parties();
        let r = TradeRecord::dummy(&a, &a, 500);
        let err = validate(None, Some(&r), &[], TransitionKind::Create).unwrap_err();
        assert!(matches!(err, LedgerError::SameParty(_)));
    }

    #[test]
    fn settle_requires_settled_status() {
        let (a, b) = parties();
        let prior = TradeRecord::dummy(&a, &b, 500);
        let err =
            validate(Some(&prior), Some(&prior), &[b.key], TransitionKind::Settle).unwrap_err();
        assert!(matches!(err, LedgerError::WrongStatus { .. }));
    }

    #[test]
    fn settle_requires_output() {
        let (a, b) = parties();
        let prior = TradeRecord::dummy(&a, &b, 500);
        let err = validate(Some(&prior), None, &[b.key], TransitionKind::Settle).unwrap_err();
        assert!(matches!(err, LedgerError::OutputCount { expected: 1, actual: 0, .. }));
    }

    #[test]
    fn close_rejects_successor() {
        let (a, b) = parties();
        let prior = TradeRecord::dummy(&a, &b, 500);
        let next = prior.settled_by(b.clone());
        let err =
            validate(Some(&prior), Some(&next), &[b.key], TransitionKind::Close).unwrap_err();
        assert!(matches!(err, LedgerError::OutputCount { expected: 0, actual: 1, .. }));
    }

    #[test]
    fn close_admits_to_party() {
        let (a, b) = parties();
        let prior = TradeRecord::dummy(&a, &b, 500);
        assert!(validate(Some(&prior), None, &[b.key], TransitionKind::Close).is_ok());
    }

    #[test]
    fn no_commands_rejected() {
        let err = verify_parts(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, LedgerError::CommandCount(0)));
    }
}
