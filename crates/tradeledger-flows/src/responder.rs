//! Responder side of the settlement protocol, as an explicit state machine.
//!
//! ```text
//!  AwaitingProposal ──Proposal──▶ AwaitingFinality ──Finalized──▶ Done
//!        │ (Create only)                 │
//!        └───── any error or Abort ──────┴──────────────────────▶ Aborted
//! ```
//!
//! Settle and Close carry no counter-signature round, so their responder
//! starts in `AwaitingFinality`.

use std::fmt;

use tracing::{debug, info, warn};

use tradeledger_contract::Verdict;
use tradeledger_ledger::{InboundSession, Session};
use tradeledger_types::{
    FinalizedTransaction, FlowMessage, LedgerError, Party, Result, SignedTransaction,
    TransactionBody, TransactionSignature, TransitionKind, TxId,
};

use crate::node::NodeServices;

/// Where a responder is in its exchange with the initiator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderState {
    AwaitingProposal,
    /// `expected` is the transaction this responder signed, if it signed one.
    AwaitingFinality { expected: Option<TxId> },
    Done(TxId),
    Aborted { reason: String },
}

impl ResponderState {
    /// The state a responder starts in for a session of `kind`.
    #[must_use]
    pub fn initial(kind: &TransitionKind) -> Self {
        match kind {
            TransitionKind::Create => Self::AwaitingProposal,
            _ => Self::AwaitingFinality { expected: None },
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Aborted { .. })
    }
}

impl fmt::Display for ResponderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingProposal => f.write_str("AwaitingProposal"),
            Self::AwaitingFinality { .. } => f.write_str("AwaitingFinality"),
            Self::Done(tx_id) => write!(f, "Done({tx_id})"),
            Self::Aborted { reason } => write!(f, "Aborted({reason})"),
        }
    }
}

struct Responder<'a> {
    services: &'a NodeServices,
    initiator: Party,
    session: Session,
    state: ResponderState,
}

/// Serve one inbound session to completion and return the terminal state.
pub(crate) async fn respond(services: &NodeServices, inbound: InboundSession) -> ResponderState {
    let state = ResponderState::initial(inbound.session.kind());
    let mut responder = Responder {
        services,
        initiator: inbound.initiator,
        session: inbound.session,
        state,
    };
    responder.run().await;
    responder.state
}

impl Responder<'_> {
    async fn run(&mut self) {
        while !self.state.is_terminal() {
            let step = match self.session.receive().await {
                Ok(message) => self.handle(message).await,
                Err(err) => Err(err),
            };
            if let Err(err) = step {
                self.fail(err).await;
            }
        }
    }

    async fn handle(&mut self, message: FlowMessage) -> Result<()> {
        match (self.state.clone(), message) {
            (_, FlowMessage::Abort { reason }) => Err(LedgerError::Aborted(reason)),
            (ResponderState::AwaitingProposal, FlowMessage::Proposal(stx)) => {
                let signature = self.sign_proposal(&stx)?;
                self.session.send(FlowMessage::Signature(signature)).await?;
                debug!(session = %self.session.id(), tx_id = %stx.id, "Signed proposal");
                self.state = ResponderState::AwaitingFinality {
                    expected: Some(stx.id),
                };
                Ok(())
            }
            (ResponderState::AwaitingFinality { expected }, FlowMessage::Finalized(finalized)) => {
                if let Some(expected) = expected {
                    if finalized.id() != expected {
                        return Err(LedgerError::UnexpectedTransaction {
                            expected,
                            actual: finalized.id(),
                        });
                    }
                }
                self.check_finalized(&finalized)?;
                self.services.vault.write().await.record(&finalized);
                self.session.send(FlowMessage::Ack).await?;
                info!(
                    party = %self.services.party(),
                    initiator = %self.initiator,
                    tx_id = %finalized.id(),
                    "Recorded finalised transaction"
                );
                self.state = ResponderState::Done(finalized.id());
                Ok(())
            }
            (state, other) => Err(LedgerError::UnexpectedMessage {
                state: state.to_string(),
                message: other.name().to_string(),
            }),
        }
    }

    /// Check a proposal the way the initiator's contract and this party's
    /// policy require, then sign it.
    fn sign_proposal(&self, stx: &SignedTransaction) -> Result<TransactionSignature> {
        let me = self.services.party();
        stx.verify_signatures_except(&[me.key])?;
        self.check_body(&stx.body, stx)?;
        if !stx.body.required_signers().contains(&me.key) {
            return Err(LedgerError::UnexpectedSigner(me.key));
        }

        if let Verdict::Refuse(reason) = self.services.policy.check(&stx.body) {
            return Err(LedgerError::Refused {
                party: me.name.clone(),
                reason,
            });
        }
        Ok(self.services.identity.sign(&stx.id))
    }

    fn check_finalized(&self, finalized: &FinalizedTransaction) -> Result<()> {
        finalized.verify()?;
        self.check_body(&finalized.tx.body, &finalized.tx)
    }

    /// Checks shared by proposals and finalisations: right notary, the
    /// initiator actually signed, the transition matches the session, and
    /// the contract admits it.
    fn check_body(&self, body: &TransactionBody, stx: &SignedTransaction) -> Result<()> {
        let notary = self.services.network_map.notary();
        if body.notary.key != notary.key {
            return Err(LedgerError::UnexpectedSigner(body.notary.key));
        }
        if !stx.is_signed_by(&self.initiator.key) {
            return Err(LedgerError::MissingSignatures(self.initiator.name.clone()));
        }
        let kind = self.session.kind();
        if !body.commands.iter().all(|c| &c.kind == kind) {
            return Err(LedgerError::NotPermitted {
                party: self.initiator.name.clone(),
                kind: kind.clone(),
            });
        }
        tradeledger_contract::verify(body)
    }

    async fn fail(&mut self, err: LedgerError) {
        match &err {
            LedgerError::Aborted(_) => {
                debug!(session = %self.session.id(), error = %err, "Initiator aborted");
            }
            LedgerError::Transport(_) | LedgerError::SessionTimeout { .. } => {
                warn!(session = %self.session.id(), error = %err, "Session lost");
            }
            _ => {
                warn!(
                    session = %self.session.id(),
                    initiator = %self.initiator,
                    error = %err,
                    "Refusing transition"
                );
                // best effort; the initiator may have gone
                let _ = self
                    .session
                    .send(FlowMessage::Refused {
                        reason: refusal_reason(&err),
                    })
                    .await;
            }
        }
        self.state = ResponderState::Aborted {
            reason: err.to_string(),
        };
    }
}

fn refusal_reason(err: &LedgerError) -> String {
    match err {
        LedgerError::Refused { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}
