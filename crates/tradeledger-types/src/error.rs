//! Error types for tradeledger.
//!
//! All errors use the `TL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Validation (contract rules)
//! - 2xx: Lookup
//! - 3xx: Responder refusal
//! - 4xx: Consensus / notarisation
//! - 5xx: Transport
//! - 6xx: Signatures and identity
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{PartyKey, StateRef, TradeId, TransitionKind, TxId};

/// Coarse classification of a [`LedgerError`].
///
/// Callers use this to decide what to surface and whether a retry of the
/// whole transition makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Refusal,
    Conflict,
    Transport,
    Internal,
}

/// Central error enum for all tradeledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// A transaction must carry exactly one command.
    #[error("TL_ERR_100: Transaction must carry exactly one command, found {0}")]
    CommandCount(usize),

    /// Wrong number of consumed input records for this transition.
    #[error("TL_ERR_101: {kind} expects {expected} input record(s), found {actual}")]
    InputCount {
        kind: TransitionKind,
        expected: usize,
        actual: usize,
    },

    /// Wrong number of created output records for this transition.
    #[error("TL_ERR_102: {kind} expects {expected} output record(s), found {actual}")]
    OutputCount {
        kind: TransitionKind,
        expected: usize,
        actual: usize,
    },

    /// Both sides of a trade are the same party.
    #[error("TL_ERR_103: Trade parties must differ: {0} is on both sides")]
    SameParty(String),

    /// Trade amount below the minimum of 1.
    #[error("TL_ERR_104: Trade amount must be at least 1, got {0}")]
    NonPositiveAmount(u64),

    /// Wrong number of declared signers.
    #[error("TL_ERR_105: {kind} requires {expected} signer(s), {actual} declared")]
    SignerCount {
        kind: TransitionKind,
        expected: usize,
        actual: usize,
    },

    /// Declared signers do not match the expected ordered signer list.
    #[error("TL_ERR_106: {kind} signer mismatch: expected [{expected}], declared [{declared}]")]
    SignerMismatch {
        kind: TransitionKind,
        expected: String,
        declared: String,
    },

    /// The proposed record carries the wrong status for this transition.
    #[error("TL_ERR_107: {kind} requires status {expected}, got {actual}")]
    WrongStatus {
        kind: TransitionKind,
        expected: String,
        actual: String,
    },

    /// The command does not belong to the trade contract.
    #[error("TL_ERR_108: Unrecognised transition: {0}")]
    UnrecognisedTransition(String),

    // =================================================================
    // Lookup Errors (2xx)
    // =================================================================
    /// No current version exists for this trade id.
    #[error("TL_ERR_200: Trade not found: {0}")]
    TradeNotFound(TradeId),

    /// The party name or key is not in the network map.
    #[error("TL_ERR_201: Unknown party: {0}")]
    UnknownParty(String),

    // =================================================================
    // Refusal Errors (3xx)
    // =================================================================
    /// A responder declined a proposal that passed contract validation.
    #[error("TL_ERR_300: Proposal refused by {party}: {reason}")]
    Refused { party: String, reason: String },

    /// The initiator aborted the transition after the session was opened.
    #[error("TL_ERR_301: Transition aborted by initiator: {0}")]
    Aborted(String),

    // =================================================================
    // Consensus Errors (4xx)
    // =================================================================
    /// An input was already consumed by another transaction.
    #[error("TL_ERR_400: State {state_ref} already consumed by transaction {consumed_by}")]
    Conflict { state_ref: StateRef, consumed_by: TxId },

    /// The input was never issued by the notary, or differs from what was issued.
    #[error("TL_ERR_401: Unknown state reference: {0}")]
    UnknownStateRef(StateRef),

    /// The transaction that reached finality is not the one we agreed to.
    #[error("TL_ERR_402: Unexpected finalised transaction: expected {expected}, got {actual}")]
    UnexpectedTransaction { expected: TxId, actual: TxId },

    // =================================================================
    // Transport Errors (5xx)
    // =================================================================
    /// Session could not be opened, or a send/receive failed.
    #[error("TL_ERR_500: Transport error: {0}")]
    Transport(String),

    /// The counterparty did not answer within the session timeout.
    #[error("TL_ERR_501: Session timed out after {timeout_ms}ms waiting for {party}")]
    SessionTimeout { party: String, timeout_ms: u64 },

    /// A message arrived that the protocol does not expect in this state.
    #[error("TL_ERR_502: Unexpected message in state {state}: {message}")]
    UnexpectedMessage { state: String, message: String },

    /// The notary finalised the transaction but a counterparty did not
    /// confirm recording it. The transition is committed.
    #[error("TL_ERR_503: Transaction {tx_id} is final but {party} did not confirm: {reason}")]
    FinalityUnconfirmed {
        tx_id: TxId,
        party: String,
        reason: String,
    },

    // =================================================================
    // Signature / Identity Errors (6xx)
    // =================================================================
    /// A signature failed to verify.
    #[error("TL_ERR_600: Invalid signature from {0}")]
    SignatureInvalid(PartyKey),

    /// Required signers have not signed.
    #[error("TL_ERR_601: Missing signatures from [{0}]")]
    MissingSignatures(String),

    /// A signature from a key that is not a required signer.
    #[error("TL_ERR_602: Unexpected signer {0}")]
    UnexpectedSigner(PartyKey),

    /// The id carried by a transaction does not match its body.
    #[error("TL_ERR_603: Transaction id mismatch: claimed {claimed}, computed {computed}")]
    TxIdMismatch { claimed: TxId, computed: TxId },

    /// The local party is not allowed to run this operation.
    #[error("TL_ERR_604: {party} may not initiate {kind}")]
    NotPermitted { party: String, kind: TransitionKind },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("TL_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("TL_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("TL_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl LedgerError {
    /// Map the error onto the caller-facing taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CommandCount(_)
            | Self::InputCount { .. }
            | Self::OutputCount { .. }
            | Self::SameParty(_)
            | Self::NonPositiveAmount(_)
            | Self::SignerCount { .. }
            | Self::SignerMismatch { .. }
            | Self::WrongStatus { .. }
            | Self::UnrecognisedTransition(_)
            | Self::SignatureInvalid(_)
            | Self::MissingSignatures(_)
            | Self::UnexpectedSigner(_)
            | Self::TxIdMismatch { .. }
            | Self::NotPermitted { .. } => ErrorKind::Validation,
            Self::TradeNotFound(_) | Self::UnknownParty(_) => ErrorKind::NotFound,
            Self::Refused { .. } | Self::Aborted(_) => ErrorKind::Refusal,
            Self::Conflict { .. } | Self::UnknownStateRef(_) | Self::UnexpectedTransaction { .. } => {
                ErrorKind::Conflict
            }
            Self::Transport(_)
            | Self::SessionTimeout { .. }
            | Self::UnexpectedMessage { .. }
            | Self::FinalityUnconfirmed { .. } => ErrorKind::Transport,
            Self::Internal(_) | Self::Serialization(_) | Self::Configuration(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether re-running the whole transition from scratch can succeed.
    ///
    /// Only transport failures before finality qualify: nothing was
    /// committed, and the prior version is still current.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport && !matches!(self, Self::FinalityUnconfirmed { .. })
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
