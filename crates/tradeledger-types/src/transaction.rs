//! Ledger transactions: consumed inputs, created outputs, one command.
//!
//! A transaction moves a trade from one version to the next. Its
//! [`TxId`] is the SHA-256 of a canonical signing payload, so every signer
//! signs exactly the same bytes regardless of how the body was transported.
//!
//! ```text
//!   TransactionBody ──sign──▶ SignedTransaction ──notarise──▶ FinalizedTransaction
//!   (inputs, outputs,          (+ party signatures)            (+ notary signature)
//!    command, notary, salt)
//! ```

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    LedgerError, LocalIdentity, Party, PartyKey, Result, StateRef, TradeRecord,
    TransactionSignature, TxId, constants, party::format_keys,
};

/// The kind of transition a command requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Zero inputs, one new SUBMITTED record.
    Create,
    /// One input, one SETTLED successor.
    Settle,
    /// One input, no successor.
    Close,
    /// A command issued by some other contract. Never admitted by trade rules.
    Other(String),
}

impl TransitionKind {
    fn tag(&self) -> &str {
        match self {
            Self::Create => "CREATE",
            Self::Settle => "SETTLE",
            Self::Close => "CLOSE",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A transition request plus the keys that must authorise it, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub kind: TransitionKind,
    pub signers: Vec<PartyKey>,
}

impl Command {
    #[must_use]
    pub fn new(kind: TransitionKind, signers: Vec<PartyKey>) -> Self {
        Self { kind, signers }
    }
}

/// A record version together with the ledger reference that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAndRef {
    pub record: TradeRecord,
    pub state_ref: StateRef,
}

/// The unsigned content of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    /// Versions consumed by this transaction.
    pub inputs: Vec<StateAndRef>,
    /// Versions created by this transaction.
    pub outputs: Vec<TradeRecord>,
    pub commands: Vec<Command>,
    /// The notary that must finalise this transaction.
    pub notary: Party,
    /// Random salt; keeps otherwise identical proposals distinct.
    pub salt: [u8; 16],
}

impl TransactionBody {
    /// Canonical signing payload.
    ///
    /// Format: `"tradeledger:tx:v1:" || salt || notary || inputs || outputs || commands`,
    /// each list prefixed with its length.
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(512);
        payload.extend_from_slice(constants::TX_DOMAIN_TAG);
        payload.extend_from_slice(&self.salt);
        self.notary.write_signing_bytes(&mut payload);

        payload.extend_from_slice(&(self.inputs.len() as u64).to_le_bytes());
        for input in &self.inputs {
            payload.extend_from_slice(input.state_ref.tx_id.as_bytes());
            payload.extend_from_slice(&input.state_ref.index.to_le_bytes());
            input.record.write_signing_bytes(&mut payload);
        }

        payload.extend_from_slice(&(self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            output.write_signing_bytes(&mut payload);
        }

        payload.extend_from_slice(&(self.commands.len() as u64).to_le_bytes());
        for command in &self.commands {
            let tag = command.kind.tag().as_bytes();
            payload.extend_from_slice(&(tag.len() as u64).to_le_bytes());
            payload.extend_from_slice(tag);
            payload.extend_from_slice(&(command.signers.len() as u64).to_le_bytes());
            for signer in &command.signers {
                payload.extend_from_slice(signer.as_bytes());
            }
        }
        payload
    }

    /// The transaction id: SHA-256 of [`Self::signing_payload`].
    #[must_use]
    pub fn id(&self) -> TxId {
        let hash = Sha256::digest(self.signing_payload());
        TxId(hash.into())
    }

    /// Every key named by any command, first occurrence order, no duplicates.
    #[must_use]
    pub fn required_signers(&self) -> Vec<PartyKey> {
        let mut seen = HashSet::new();
        self.commands
            .iter()
            .flat_map(|c| c.signers.iter().copied())
            .filter(|k| seen.insert(*k))
            .collect()
    }

    #[must_use]
    pub fn input_refs(&self) -> Vec<StateRef> {
        self.inputs.iter().map(|i| i.state_ref).collect()
    }
}

/// A transaction body with the signatures collected so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub body: TransactionBody,
    pub id: TxId,
    pub signatures: Vec<TransactionSignature>,
}

impl SignedTransaction {
    /// Compute the id of `body` and sign it with `identity`.
    #[must_use]
    pub fn sign_initial(body: TransactionBody, identity: &LocalIdentity) -> Self {
        let id = body.id();
        let signature = identity.sign(&id);
        Self {
            body,
            id,
            signatures: vec![signature],
        }
    }

    /// Add a signature, replacing any earlier one from the same key.
    pub fn add_signature(&mut self, signature: TransactionSignature) {
        self.signatures.retain(|s| s.by != signature.by);
        self.signatures.push(signature);
    }

    /// Check that `id` really is the hash of `body`.
    pub fn check_id(&self) -> Result<()> {
        let computed = self.body.id();
        if computed != self.id {
            return Err(LedgerError::TxIdMismatch {
                claimed: self.id,
                computed,
            });
        }
        Ok(())
    }

    /// Verify the id and every attached signature, and require a signature
    /// from each required signer except those in `allowed_missing`.
    ///
    /// # Errors
    /// - `TxIdMismatch` if the id does not match the body
    /// - `UnexpectedSigner` if a signature is from a key no command names
    /// - `SignatureInvalid` if a signature does not verify
    /// - `MissingSignatures` if a required signer has not signed
    pub fn verify_signatures_except(&self, allowed_missing: &[PartyKey]) -> Result<()> {
        self.check_id()?;

        let required = self.body.required_signers();
        for signature in &self.signatures {
            if !required.contains(&signature.by) {
                return Err(LedgerError::UnexpectedSigner(signature.by));
            }
            signature.verify(&self.id)?;
        }

        let missing: Vec<PartyKey> = required
            .into_iter()
            .filter(|k| !allowed_missing.contains(k))
            .filter(|k| !self.signatures.iter().any(|s| s.by == *k))
            .collect();
        if !missing.is_empty() {
            return Err(LedgerError::MissingSignatures(format_keys(&missing)));
        }
        Ok(())
    }

    /// Verify that every required signer has signed.
    pub fn verify_required_signatures(&self) -> Result<()> {
        self.verify_signatures_except(&[])
    }

    /// Whether `key` has already signed.
    #[must_use]
    pub fn is_signed_by(&self, key: &PartyKey) -> bool {
        self.signatures.iter().any(|s| s.by == *key)
    }
}

/// A transaction accepted and signed by the notary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedTransaction {
    pub tx: SignedTransaction,
    pub notary_signature: TransactionSignature,
}

impl FinalizedTransaction {
    #[must_use]
    pub fn id(&self) -> TxId {
        self.tx.id
    }

    /// Verify the notary signature and every party signature.
    ///
    /// # Errors
    /// - `UnexpectedSigner` if the notary signature is not from the notary
    ///   named in the body
    /// - anything [`SignedTransaction::verify_required_signatures`] returns
    pub fn verify(&self) -> Result<()> {
        if self.notary_signature.by != self.tx.body.notary.key {
            return Err(LedgerError::UnexpectedSigner(self.notary_signature.by));
        }
        self.tx.check_id()?;
        self.notary_signature.verify(&self.tx.id)?;
        self.tx.verify_required_signatures()
    }

    /// The versions this transaction created, with their new references.
    #[must_use]
    pub fn output_refs(&self) -> Vec<StateAndRef> {
        self.tx
            .body
            .outputs
            .iter()
            .zip(0u32..)
            .map(|(record, index)| StateAndRef {
                record: record.clone(),
                state_ref: StateRef::new(self.tx.id, index),
            })
            .collect()
    }

    /// The references this transaction consumed.
    #[must_use]
    pub fn consumed_refs(&self) -> Vec<StateRef> {
        self.tx.body.input_refs()
    }
}
