//! Initiator side of the settlement protocol.
//!
//! ```text
//!  sign ─▶ open sessions ─▶ collect signatures ─▶ notarise ─▶ record
//!                                                    │
//!                         Abort to every session ◀── fails
//!  record ─▶ Finalized to every session ─▶ wait for every Ack
//! ```
//!
//! Nothing is recorded anywhere until the notary has signed. A failure
//! before that point sends `Abort` to each open session and leaves every
//! vault untouched. A failure after it surfaces as `FinalityUnconfirmed`:
//! the transition stands and must not be retried.

use tracing::{debug, info, warn};

use tradeledger_ledger::Session;
use tradeledger_types::{
    FinalizedTransaction, FlowMessage, LedgerError, PartyKey, Result, SignedTransaction,
};

use crate::{coordinator::Proposal, node::NodeServices};

pub(crate) async fn run(
    services: &NodeServices,
    proposal: Proposal,
) -> Result<FinalizedTransaction> {
    let me = services.party();
    let signing: Vec<PartyKey> = proposal
        .signing_counterparties()
        .into_iter()
        .map(|p| p.key)
        .collect();
    let stx = SignedTransaction::sign_initial(proposal.body, &services.identity);
    debug!(tx_id = %stx.id, kind = %proposal.kind, "Signed proposal");

    let mut sessions = Vec::with_capacity(proposal.counterparties.len());
    for party in &proposal.counterparties {
        let opened = services
            .network
            .open(
                me,
                party,
                proposal.kind.clone(),
                services.config.session_timeout(),
            )
            .await;
        match opened {
            Ok(session) => sessions.push(session),
            Err(err) => {
                abort_all(&sessions, &err).await;
                return Err(err);
            }
        }
    }

    let tx_id = stx.id;
    let finalized = match collect_and_notarise(services, stx, &signing, &mut sessions).await {
        Ok(finalized) => finalized,
        Err(err) => {
            warn!(tx_id = %tx_id, error = %err, "Aborting transition");
            abort_all(&sessions, &err).await;
            return Err(err);
        }
    };

    services.vault.write().await.record(&finalized);
    distribute(&finalized, &mut sessions).await?;

    info!(
        tx_id = %finalized.id(),
        kind = %proposal.kind,
        party = %me,
        counterparties = sessions.len(),
        "Transition committed"
    );
    Ok(finalized)
}

async fn collect_and_notarise(
    services: &NodeServices,
    mut stx: SignedTransaction,
    signing: &[PartyKey],
    sessions: &mut [Session],
) -> Result<FinalizedTransaction> {
    for session in sessions
        .iter_mut()
        .filter(|s| signing.contains(&s.counterparty().key))
    {
        session.send(FlowMessage::Proposal(stx.clone())).await?;
        let signature = match session.receive().await? {
            FlowMessage::Signature(signature) => signature,
            FlowMessage::Refused { reason } => {
                return Err(LedgerError::Refused {
                    party: session.counterparty().name.clone(),
                    reason,
                });
            }
            other => return Err(unexpected("awaiting signature", &other)),
        };
        if signature.by != session.counterparty().key {
            return Err(LedgerError::UnexpectedSigner(signature.by));
        }
        signature.verify(&stx.id)?;
        debug!(tx_id = %stx.id, from = %session.counterparty(), "Collected signature");
        stx.add_signature(signature);
    }

    stx.verify_required_signatures()?;
    services.notary.submit(stx).await
}

/// Hand the notarised transaction to every session and wait for each to
/// confirm it was recorded. The transaction is already final, so any
/// failure here is reported as [`LedgerError::FinalityUnconfirmed`].
async fn distribute(finalized: &FinalizedTransaction, sessions: &mut [Session]) -> Result<()> {
    for session in sessions.iter_mut() {
        if let Err(err) = confirm(finalized, session).await {
            warn!(
                tx_id = %finalized.id(),
                party = %session.counterparty(),
                error = %err,
                "Counterparty did not confirm finalised transaction"
            );
            return Err(LedgerError::FinalityUnconfirmed {
                tx_id: finalized.id(),
                party: session.counterparty().name.clone(),
                reason: err.to_string(),
            });
        }
    }
    Ok(())
}

async fn confirm(finalized: &FinalizedTransaction, session: &mut Session) -> Result<()> {
    session
        .send(FlowMessage::Finalized(finalized.clone()))
        .await?;
    match session.receive().await? {
        FlowMessage::Ack => Ok(()),
        FlowMessage::Refused { reason } => Err(LedgerError::Refused {
            party: session.counterparty().name.clone(),
            reason,
        }),
        other => Err(unexpected("awaiting ack", &other)),
    }
}

async fn abort_all(sessions: &[Session], cause: &LedgerError) {
    for session in sessions {
        // the counterparty may already have gone
        let _ = session
            .send(FlowMessage::Abort {
                reason: cause.to_string(),
            })
            .await;
    }
}

fn unexpected(state: &str, message: &FlowMessage) -> LedgerError {
    LedgerError::UnexpectedMessage {
        state: state.to_string(),
        message: message.name().to_string(),
    }
}
