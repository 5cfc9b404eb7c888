//! Parties, their signing keys, and transaction signatures.
//!
//! A party is known to the network by a legal name and an ed25519 public
//! key. Signer lists on commands are lists of [`PartyKey`]s; a signature is
//! always over the 32 bytes of a [`TxId`].

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result, TxId};

/// Raw ed25519 public key (32 bytes) identifying a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PartyKey(pub [u8; 32]);

impl PartyKey {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PartyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key:{}", hex::encode(&self.0[..8]))
    }
}

/// A well-known identity on the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    /// Legal name, e.g. `"O=PartyA,L=London,C=GB"`.
    pub name: String,
    /// The key this party signs with.
    pub key: PartyKey,
}

impl Party {
    #[must_use]
    pub fn new(name: impl Into<String>, key: PartyKey) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    /// Append `name_len || name || key` to a signing payload.
    pub fn write_signing_bytes(&self, payload: &mut Vec<u8>) {
        payload.extend_from_slice(&(self.name.len() as u64).to_le_bytes());
        payload.extend_from_slice(self.name.as_bytes());
        payload.extend_from_slice(self.key.as_bytes());
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Render a signer list for error messages.
#[must_use]
pub fn format_keys(keys: &[PartyKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A party together with its private signing key. Never leaves the node.
#[derive(Clone)]
pub struct LocalIdentity {
    party: Party,
    signing_key: SigningKey,
}

impl LocalIdentity {
    /// Generate a fresh keypair for `name`.
    #[must_use]
    pub fn generate(name: impl Into<String>) -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self::from_signing_key(name, signing_key)
    }

    /// Deterministic identity from a 32-byte secret seed.
    #[must_use]
    pub fn from_seed(name: impl Into<String>, seed: [u8; 32]) -> Self {
        Self::from_signing_key(name, SigningKey::from_bytes(&seed))
    }

    fn from_signing_key(name: impl Into<String>, signing_key: SigningKey) -> Self {
        let key = PartyKey(signing_key.verifying_key().to_bytes());
        Self {
            party: Party::new(name, key),
            signing_key,
        }
    }

    #[must_use]
    pub fn party(&self) -> &Party {
        &self.party
    }

    #[must_use]
    pub fn key(&self) -> PartyKey {
        self.party.key
    }

    /// Sign a transaction id.
    #[must_use]
    pub fn sign(&self, tx_id: &TxId) -> TransactionSignature {
        let signature = self.signing_key.sign(tx_id.as_bytes());
        TransactionSignature {
            by: self.party.key,
            bytes: signature.to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalIdentity")
            .field("party", &self.party)
            .finish_non_exhaustive()
    }
}

/// An ed25519 signature by `by` over a transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    pub by: PartyKey,
    pub bytes: Vec<u8>,
}

impl TransactionSignature {
    /// Verify this signature against `tx_id`.
    ///
    /// # Errors
    /// Returns [`LedgerError::SignatureInvalid`] if the key or signature is
    /// malformed or the signature does not verify.
    pub fn verify(&self, tx_id: &TxId) -> Result<()> {
        let invalid = |_| LedgerError::SignatureInvalid(self.by);
        let key = VerifyingKey::from_bytes(&self.by.0).map_err(invalid)?;
        let signature = Signature::from_slice(&self.bytes).map_err(invalid)?;
        key.verify_strict(tx_id.as_bytes(), &signature)
            .map_err(invalid)
    }
}

/// Test party with a throwaway key. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Party {
    pub fn dummy(name: &str) -> Self {
        LocalIdentity::generate(name).party().clone()
    }
}
