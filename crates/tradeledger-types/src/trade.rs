//! The trade record: one immutable version of a bilateral trade obligation.
//!
//! ## Lifecycle
//!
//! ```text
//!   CREATE        ┌───────────┐  SETTLE   ┌─────────┐  CLOSE   ┌────────┐
//!  ──────────────▶│ SUBMITTED ├──────────▶│ SETTLED ├─────────▶│ CLOSED │
//!                 └───────────┘           └─────────┘          └────────┘
//! ```
//!
//! Each arrow produces a **new** version; the old one is consumed on the
//! ledger. CLOSE consumes without a successor, so `CLOSED` is never carried
//! by a live record. It is what a vault reports for an id whose last version
//! was consumed.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, Party, Result, TradeId};

/// Status of a trade record.
///
/// Parsing is case-insensitive, so `"settled"` and `"SETTLED"` are the same
/// status on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TradeStatus {
    Submitted,
    Settled,
    Closed,
}

impl TradeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Settled => "SETTLED",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        [Self::Submitted, Self::Settled, Self::Closed]
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LedgerError::Serialization(format!("unknown trade status {s:?}")))
    }
}

impl TryFrom<String> for TradeStatus {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TradeStatus> for String {
    fn from(status: TradeStatus) -> Self {
        status.as_str().to_string()
    }
}

/// One version of a trade.
///
/// `id`, both parties, `amount` and `trade_date` never change across
/// versions. Successors are built with [`TradeRecord::settled_by`]; there is
/// no in-place mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Stable trade identifier.
    pub id: TradeId,
    /// The party that created the obligation (seller).
    pub from_party: Party,
    /// The obligated counterparty (buyer); the only party that may settle or close.
    pub to_party: Party,
    /// Positive integer amount.
    pub amount: u64,
    /// When the trade was created.
    pub trade_date: DateTime<Utc>,
    pub status: TradeStatus,
    /// The party behind the most recent transition; `None` until settlement.
    pub updated_by: Option<Party>,
}

impl TradeRecord {
    /// A freshly submitted trade with a new id.
    #[must_use]
    pub fn submitted(
        from_party: Party,
        to_party: Party,
        amount: u64,
        trade_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TradeId::new(),
            from_party,
            to_party,
            amount,
            trade_date,
            status: TradeStatus::Submitted,
            updated_by: None,
        }
    }

    /// The settled successor of this version, recording who settled it.
    #[must_use]
    pub fn settled_by(&self, party: Party) -> Self {
        Self {
            status: TradeStatus::Settled,
            updated_by: Some(party),
            ..self.clone()
        }
    }

    /// Parties that hold this record in their vaults.
    #[must_use]
    pub fn participants(&self) -> [&Party; 2] {
        [&self.from_party, &self.to_party]
    }

    /// Append the canonical bytes of this record to a signing payload.
    ///
    /// Format: `id || from_party || to_party || amount || date_secs || date_nanos || status || updated_by?`,
    /// parties as written by [`Party::write_signing_bytes`].
    pub fn write_signing_bytes(&self, payload: &mut Vec<u8>) {
        payload.extend_from_slice(self.id.0.as_bytes());
        self.from_party.write_signing_bytes(payload);
        self.to_party.write_signing_bytes(payload);
        payload.extend_from_slice(&self.amount.to_le_bytes());
        payload.extend_from_slice(&self.trade_date.timestamp().to_le_bytes());
        payload.extend_from_slice(&self.trade_date.timestamp_subsec_nanos().to_le_bytes());
        let status = self.status.as_str().as_bytes();
        payload.extend_from_slice(&(status.len() as u64).to_le_bytes());
        payload.extend_from_slice(status);
        match &self.updated_by {
            Some(party) => {
                payload.push(1);
                party.write_signing_bytes(payload);
            }
            None => payload.push(0),
        }
    }

    /// Flat, queryable projection of this version.
    #[must_use]
    pub fn to_row(&self) -> TradeRow {
        TradeRow {
            trade_id: self.id.0,
            seller: self.from_party.name.clone(),
            buyer: self.to_party.name.clone(),
            amount: self.amount,
            trade_date: self.trade_date,
            status: self.status.to_string(),
            updated_by: self.updated_by.as_ref().map(|p| p.name.clone()),
        }
    }
}

impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade[{}] {} -> {} amount={} {}",
            self.id, self.from_party, self.to_party, self.amount, self.status,
        )
    }
}

/// Row of the `trade_state` table kept by record stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRow {
    pub trade_id: Uuid,
    pub seller: String,
    pub buyer: String,
    pub amount: u64,
    pub trade_date: DateTime<Utc>,
    pub status: String,
    pub updated_by: Option<String>,
}

impl TradeRow {
    /// Table name used by persistent stores.
    pub const TABLE: &'static str = "trade_state";
}

/// Dummy record for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl TradeRecord {
    pub fn dummy(from_party: &Party, to_party: &Party, amount: u64) -> Self {
        Self::submitted(from_party.clone(), to_party.clone(), amount, Utc::now())
    }
}
