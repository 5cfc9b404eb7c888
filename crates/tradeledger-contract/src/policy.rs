//! Responder-side business policies.
//!
//! A policy runs on the responder *after* the contract admitted a proposal
//! and *before* the responder signs. It may tighten, never loosen, what the
//! contract allows. A refusal aborts the transition for every party.

use std::{fmt, sync::Arc};

use tradeledger_types::{NodeConfig, TransactionBody, TransitionKind};

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Refuse(String),
}

impl Verdict {
    #[must_use]
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// A responder's accept/reject predicate over proposals it is asked to sign.
pub trait ResponderPolicy: Send + Sync + fmt::Debug {
    fn check(&self, body: &TransactionBody) -> Verdict;
}

/// Signs anything the contract admits.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ResponderPolicy for AcceptAll {
    fn check(&self, _body: &TransactionBody) -> Verdict {
        Verdict::Accept
    }
}

/// Refuses new trades whose amount is above `max`.
#[derive(Debug, Clone, Copy)]
pub struct AmountCeiling {
    max: u64,
}

impl AmountCeiling {
    #[must_use]
    pub fn new(max: u64) -> Self {
        Self { max }
    }

    #[must_use]
    pub fn max(&self) -> u64 {
        self.max
    }
}

impl ResponderPolicy for AmountCeiling {
    fn check(&self, body: &TransactionBody) -> Verdict {
        let creates = body
            .commands
            .iter()
            .any(|c| c.kind == TransitionKind::Create);
        if !creates {
            return Verdict::Accept;
        }
        match body.outputs.iter().find(|o| o.amount > self.max) {
            Some(output) => Verdict::Refuse(format!(
                "trade amount {} exceeds ceiling {}",
                output.amount, self.max
            )),
            None => Verdict::Accept,
        }
    }
}

/// The policy a node runs with, derived from its config.
#[must_use]
pub fn policy_for(config: &NodeConfig) -> Arc<dyn ResponderPolicy> {
    match config.max_trade_amount {
        Some(max) => Arc::new(AmountCeiling::new(max)),
        None => Arc::new(AcceptAll),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeledger_types::{Command, Party, TradeRecord};

    fn body(kind: TransitionKind, amount: u64) -> TransactionBody {
        let (a, b) = (Party::dummy("O=Alice"), Party::dummy("O=Bob"));
        TransactionBody {
            inputs: vec![],
            outputs: vec![TradeRecord::dummy(&a, &b, amount)],
            commands: vec![Command::new(kind, vec![a.key, b.key])],
            notary: Party::dummy("O=Notary"),
            salt: [0u8; 16],
        }
    }

    #[test]
    fn ceiling_is_inclusive() {
        let policy = AmountCeiling::new(1000);
        assert!(policy.check(&body(TransitionKind::Create, 1000)).is_accept());
        assert_eq!(
            policy.check(&body(TransitionKind::Create, 1001)),
            Verdict::Refuse("trade amount 1001 exceeds ceiling 1000".into())
        );
    }

    #[test]
    fn ceiling_ignores_non_create() {
        let policy = AmountCeiling::new(10);
        assert!(policy.check(&body(TransitionKind::Settle, 5000)).is_accept());
    }

    #[test]
    fn accept_all_accepts() {
        assert!(AcceptAll.check(&body(TransitionKind::Create, u64::MAX)).is_accept());
    }

    #[test]
    fn policy_from_config() {
        let mut cfg = NodeConfig::named("O=Bob");
        let policy = policy_for(&cfg);
        assert!(!policy.check(&body(TransitionKind::Create, 5000)).is_accept());

        cfg.max_trade_amount = None;
        let policy = policy_for(&cfg);
        assert!(policy.check(&body(TransitionKind::Create, 5000)).is_accept());
    }
}
