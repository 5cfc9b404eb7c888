//! Uniqueness provider: each state reference is consumed at most once.
//!
//! Like a UTXO set: a [`StateRef`] becomes spendable when a finalised
//! transaction issues it and stops being spendable the moment another
//! finalised transaction consumes it. Unlike a settlement cache there is no
//! eviction: forgetting a consumed ref would re-open it for double-spend.

use std::collections::HashMap;

use tradeledger_types::{LedgerError, Result, StateAndRef, StateRef, TradeRecord, TxId};

/// Tracks issued and consumed state references.
#[derive(Debug, Default)]
pub struct UniquenessProvider {
    /// Every ref ever issued, with the record it points at.
    issued: HashMap<StateRef, TradeRecord>,
    /// Consumed refs and the transaction that consumed them.
    consumed: HashMap<StateRef, TxId>,
}

impl UniquenessProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that every input exists as issued, then consume them all for
    /// `tx_id`. Either every input is consumed or none is.
    ///
    /// Re-committing the same transaction is a no-op.
    ///
    /// # Errors
    /// - [`LedgerError::UnknownStateRef`] if an input was never issued or its
    ///   record differs from the issued one
    /// - [`LedgerError::Conflict`] if an input was consumed by another transaction
    pub fn commit(&mut self, inputs: &[StateAndRef], tx_id: TxId) -> Result<()> {
        for input in inputs {
            match self.issued.get(&input.state_ref) {
                Some(record) if *record == input.record => {}
                _ => return Err(LedgerError::UnknownStateRef(input.state_ref)),
            }
            if let Some(consumed_by) = self.consumed.get(&input.state_ref) {
                if *consumed_by != tx_id {
                    return Err(LedgerError::Conflict {
                        state_ref: input.state_ref,
                        consumed_by: *consumed_by,
                    });
                }
            }
        }

        for input in inputs {
            self.consumed.insert(input.state_ref, tx_id);
        }
        Ok(())
    }

    /// Make freshly created outputs spendable.
    pub fn issue(&mut self, outputs: impl IntoIterator<Item = StateAndRef>) {
        for output in outputs {
            self.issued.entry(output.state_ref).or_insert(output.record);
        }
    }

    /// The transaction that consumed `state_ref`, if any.
    #[must_use]
    pub fn consumed_by(&self, state_ref: &StateRef) -> Option<TxId> {
        self.consumed.get(state_ref).copied()
    }

    #[must_use]
    pub fn is_consumed(&self, state_ref: &StateRef) -> bool {
        self.consumed.contains_key(state_ref)
    }

    /// Issued and not yet consumed.
    #[must_use]
    pub fn is_unconsumed(&self, state_ref: &StateRef) -> bool {
        self.issued.contains_key(state_ref) && !self.is_consumed(state_ref)
    }

    /// Number of consumed refs tracked.
    #[must_use]
    pub fn consumed_count(&self) -> usize {
        self.consumed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeledger_types::Party;

    fn issued(provider: &mut UniquenessProvider, seed: u8) -> StateAndRef {
        let a = Party::dummy("O=Alice");
        let b = Party::dummy("O=Bob");
        let sar = StateAndRef {
            record: TradeRecord::dummy(&a, &b, 100),
            state_ref: StateRef::new(TxId([seed; 32]), 0),
        };
        provider.issue([sar.clone()]);
        sar
    }

    #[test]
    fn first_consume_ok() {
        let mut p = UniquenessProvider::new();
        let input = issued(&mut p, 1);
        assert!(p.is_unconsumed(&input.state_ref));
        p.commit(&[input.clone()], TxId([9u8; 32])).unwrap();
        assert_eq!(p.consumed_by(&input.state_ref), Some(TxId([9u8; 32])));
        assert!(!p.is_unconsumed(&input.state_ref));
    }

    #[test]
    fn double_spend_blocked() {
        let mut p = UniquenessProvider::new();
        let input = issued(&mut p, 1);
        p.commit(&[input.clone()], TxId([9u8; 32])).unwrap();

        let err = p.commit(&[input.clone()], TxId([8u8; 32])).unwrap_err();
        assert!(
            matches!(err, LedgerError::Conflict { consumed_by, .. } if consumed_by == TxId([9u8; 32])),
            "Expected Conflict, got: {err:?}"
        );
    }

    #[test]
    fn same_tx_recommit_is_noop() {
        let mut p = UniquenessProvider::new();
        let input = issued(&mut p, 1);
        p.commit(&[input.clone()], TxId([9u8; 32])).unwrap();
        assert!(p.commit(&[input], TxId([9u8; 32])).is_ok());
        assert_eq!(p.consumed_count(), 1);
    }

    #[test]
    fn unknown_ref_rejected() {
        let mut p = UniquenessProvider::new();
        let a = Party::dummy("O=Alice");
        let b = Party::dummy("O=Bob");
        let forged = StateAndRef {
            record: TradeRecord::dummy(&a, &b, 100),
            state_ref: StateRef::new(TxId([3u8; 32]), 0),
        };
        let err = p.commit(&[forged], TxId([9u8; 32])).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownStateRef(_)));
    }

    #[test]
    fn altered_record_rejected() {
        let mut p = UniquenessProvider::new();
        let mut input = issued(&mut p, 1);
        input.record.amount = 1;
        let err = p.commit(&[input], TxId([9u8; 32])).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownStateRef(_)));
    }

    #[test]
    fn conflict_consumes_nothing() {
        let mut p = UniquenessProvider::new();
        let spent = issued(&mut p, 1);
        let fresh = issued(&mut p, 2);
        p.commit(&[spent.clone()], TxId([9u8; 32])).unwrap();

        assert!(p.commit(&[fresh.clone(), spent], TxId([8u8; 32])).is_err());
        assert!(p.is_unconsumed(&fresh.state_ref), "fresh input must stay unconsumed");
    }
}
