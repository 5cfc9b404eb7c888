//! Notary: the consensus collaborator that finalises transactions.
//!
//! The notary runs as a single actor task. Submissions queue on an mpsc
//! channel and are handled one at a time, so two transactions racing to
//! consume the same [`StateRef`] are decided in arrival order: the first
//! wins, the second gets [`LedgerError::Conflict`].
//!
//! Before signing, the notary re-checks everything a counterparty would:
//! transaction id, every required signature, and the trade contract.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use tradeledger_types::{
    FinalizedTransaction, LedgerError, LocalIdentity, NotaryConfig, Party, Result,
    SignedTransaction, StateRef, TxId,
};

use crate::uniqueness::UniquenessProvider;

/// Cloneable client for a running notary.
#[derive(Clone, Debug)]
pub struct NotaryHandle {
    tx: mpsc::Sender<NotaryRequest>,
    party: Party,
}

impl NotaryHandle {
    /// The notary's identity, to be named in every transaction body.
    #[must_use]
    pub fn party(&self) -> &Party {
        &self.party
    }

    /// Submit a fully signed transaction for finality.
    ///
    /// # Errors
    /// - any signature or contract error from re-verification
    /// - [`LedgerError::Conflict`] if an input was already consumed
    /// - [`LedgerError::UnknownStateRef`] if an input was never issued
    /// - [`LedgerError::Transport`] if the notary is gone
    pub async fn submit(&self, tx: SignedTransaction) -> Result<FinalizedTransaction> {
        let (rsp_tx, rsp_rx) = oneshot::channel();
        self.request(NotaryRequest::Submit { tx, rsp_tx }).await?;
        rsp_rx.await.map_err(|_| unavailable())?
    }

    /// The transaction that consumed `state_ref`, if any.
    pub async fn consumed_by(&self, state_ref: StateRef) -> Result<Option<TxId>> {
        let (rsp_tx, rsp_rx) = oneshot::channel();
        self.request(NotaryRequest::ConsumedBy { state_ref, rsp_tx })
            .await?;
        rsp_rx.await.map_err(|_| unavailable())
    }

    /// Stop the notary task. Later requests fail with a transport error.
    pub async fn shutdown(&self) -> Result<()> {
        let (rsp_tx, rsp_rx) = oneshot::channel();
        self.request(NotaryRequest::Shutdown { rsp_tx }).await?;
        rsp_rx.await.map_err(|_| unavailable())
    }

    async fn request(&self, request: NotaryRequest) -> Result<()> {
        self.tx.send(request).await.map_err(|_| unavailable())
    }
}

fn unavailable() -> LedgerError {
    LedgerError::Transport("notary unavailable".into())
}

enum NotaryRequest {
    Submit {
        tx: SignedTransaction,
        rsp_tx: oneshot::Sender<Result<FinalizedTransaction>>,
    },
    ConsumedBy {
        state_ref: StateRef,
        rsp_tx: oneshot::Sender<Option<TxId>>,
    },
    Shutdown {
        rsp_tx: oneshot::Sender<()>,
    },
}

/// Entry point for starting a notary.
pub struct Notary;

impl Notary {
    /// Start a notary with a freshly generated key.
    pub fn spawn(config: &NotaryConfig) -> Result<NotaryHandle> {
        config.validate()?;
        let identity = LocalIdentity::generate(config.name.clone());
        Ok(Self::spawn_with_identity(identity, config.request_capacity))
    }

    /// Start a notary that signs with `identity`.
    #[must_use]
    pub fn spawn_with_identity(identity: LocalIdentity, request_capacity: usize) -> NotaryHandle {
        let (tx, rx) = mpsc::channel(request_capacity.max(1));
        let party = identity.party().clone();
        let actor = NotaryActor {
            rx,
            identity,
            uniqueness: UniquenessProvider::new(),
            finalized: HashMap::new(),
        };
        tokio::spawn(actor.run());
        NotaryHandle { tx, party }
    }
}

struct NotaryActor {
    rx: mpsc::Receiver<NotaryRequest>,
    identity: LocalIdentity,
    uniqueness: UniquenessProvider,
    /// Every transaction this notary has finalised, by id.
    finalized: HashMap<TxId, FinalizedTransaction>,
}

impl NotaryActor {
    async fn run(mut self) {
        while let Some(request) = self.rx.recv().await {
            match request {
                NotaryRequest::Submit { tx, rsp_tx } => {
                    let result = self.notarise(tx);
                    // the submitter may have given up waiting
                    let _ = rsp_tx.send(result);
                }
                NotaryRequest::ConsumedBy { state_ref, rsp_tx } => {
                    let _ = rsp_tx.send(self.uniqueness.consumed_by(&state_ref));
                }
                NotaryRequest::Shutdown { rsp_tx } => {
                    let _ = rsp_tx.send(());
                    break;
                }
            }
        }
        info!(
            notary = %self.identity.party(),
            finalized = self.finalized.len(),
            "Notary terminating"
        );
    }

    fn notarise(&mut self, tx: SignedTransaction) -> Result<FinalizedTransaction> {
        tx.check_id()?;
        if let Some(done) = self.finalized.get(&tx.id) {
            debug!(tx_id = %tx.id, "Transaction already finalised, returning prior result");
            return Ok(done.clone());
        }

        if tx.body.notary.key != self.identity.key() {
            return Err(LedgerError::UnexpectedSigner(tx.body.notary.key));
        }
        tx.verify_required_signatures()?;
        tradeledger_contract::verify(&tx.body)?;

        if let Err(err) = self.uniqueness.commit(&tx.body.inputs, tx.id) {
            warn!(tx_id = %tx.id, error = %err, "Notarisation refused");
            return Err(err);
        }

        let notary_signature = self.identity.sign(&tx.id);
        let finalized = FinalizedTransaction {
            tx,
            notary_signature,
        };
        self.uniqueness.issue(finalized.output_refs());
        self.finalized.insert(finalized.id(), finalized.clone());

        info!(
            tx_id = %finalized.id(),
            inputs = finalized.tx.body.inputs.len(),
            outputs = finalized.tx.body.outputs.len(),
            "Transaction notarised"
        );
        Ok(finalized)
    }
}
