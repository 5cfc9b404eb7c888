//! Messages exchanged over an initiator/responder session.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{FinalizedTransaction, SignedTransaction, TransactionSignature};

/// One message on a flow session.
///
/// ```text
///  initiator                         responder
///     │── Proposal(stx) ───────────────▶│   (Create only)
///     │◀────────── Signature | Refused ─│
///     │── Finalized(ftx) | Abort ──────▶│
///     │◀──────────────────────── Ack ───│
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlowMessage {
    /// A partially signed transaction the responder is asked to sign.
    Proposal(SignedTransaction),
    /// The responder's signature over the proposal's id.
    Signature(TransactionSignature),
    /// The responder declined to sign.
    Refused { reason: String },
    /// The notarised transaction, for the responder to record.
    Finalized(FinalizedTransaction),
    /// The responder recorded the finalised transaction.
    Ack,
    /// The initiator gave up; nothing was committed.
    Abort { reason: String },
}

impl FlowMessage {
    /// Short name for logs and protocol errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Proposal(_) => "Proposal",
            Self::Signature(_) => "Signature",
            Self::Refused { .. } => "Refused",
            Self::Finalized(_) => "Finalized",
            Self::Ack => "Ack",
            Self::Abort { .. } => "Abort",
        }
    }
}

impl fmt::Display for FlowMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proposal(stx) => write!(f, "Proposal({})", stx.id),
            Self::Finalized(ftx) => write!(f, "Finalized({})", ftx.id()),
            Self::Refused { reason } | Self::Abort { reason } => {
                write!(f, "{}({reason})", self.name())
            }
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let msg = FlowMessage::Refused {
            reason: "amount too large".into(),
        };
        assert_eq!(msg.to_string(), "Refused(amount too large)");
        assert_eq!(FlowMessage::Ack.to_string(), "Ack");
    }

    #[test]
    fn serde_roundtrip() {
        let msg = FlowMessage::Abort {
            reason: "conflict".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: FlowMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "Abort");
    }
}
