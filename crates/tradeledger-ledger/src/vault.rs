//! Per-party record store.
//!
//! A vault only ever learns about the ledger through finalised
//! transactions. Recording one consumes its inputs from the current set and
//! adds its outputs; nothing is edited in place.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use tradeledger_types::{
    FinalizedTransaction, StateAndRef, TradeId, TradeRecord, TradeRow, TradeStatus, TxId,
};

/// The records one party knows about.
#[derive(Debug, Default)]
pub struct Vault {
    /// The single unconsumed version of each live trade.
    current: HashMap<TradeId, StateAndRef>,
    /// Every version seen, oldest first.
    history: HashMap<TradeId, Vec<TradeRecord>>,
    /// Trades whose last version was consumed without a successor.
    closed: HashSet<TradeId>,
    /// Transactions already applied.
    recorded: HashSet<TxId>,
}

impl Vault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a finalised transaction. Returns `false` if it was already applied.
    pub fn record(&mut self, finalized: &FinalizedTransaction) -> bool {
        if !self.recorded.insert(finalized.id()) {
            return false;
        }

        for input in &finalized.tx.body.inputs {
            let trade_id = input.record.id;
            let is_current = self
                .current
                .get(&trade_id)
                .is_some_and(|c| c.state_ref == input.state_ref);
            if is_current {
                self.current.remove(&trade_id);
                self.closed.insert(trade_id);
            }
        }

        for output in finalized.output_refs() {
            let trade_id = output.record.id;
            self.closed.remove(&trade_id);
            self.history
                .entry(trade_id)
                .or_default()
                .push(output.record.clone());
            self.current.insert(trade_id, output);
        }

        debug!(
            tx_id = %finalized.id(),
            current = self.current.len(),
            "Vault recorded transaction"
        );
        true
    }

    /// The current version of `trade_id`, with its ledger reference.
    #[must_use]
    pub fn find_current_by_id(&self, trade_id: &TradeId) -> Option<StateAndRef> {
        self.current.get(trade_id).cloned()
    }

    /// Status of the current version, or `CLOSED` if the trade was consumed
    /// without a successor. `None` for ids this vault never saw.
    #[must_use]
    pub fn status_of(&self, trade_id: &TradeId) -> Option<TradeStatus> {
        if let Some(current) = self.current.get(trade_id) {
            return Some(current.record.status);
        }
        self.closed.contains(trade_id).then_some(TradeStatus::Closed)
    }

    /// Every version of `trade_id` this vault has seen, oldest first.
    #[must_use]
    pub fn history(&self, trade_id: &TradeId) -> Vec<TradeRecord> {
        self.history.get(trade_id).cloned().unwrap_or_default()
    }

    /// All current versions.
    #[must_use]
    pub fn current(&self) -> Vec<StateAndRef> {
        self.current.values().cloned().collect()
    }

    /// Queryable projections of all current versions, oldest trade first.
    #[must_use]
    pub fn rows(&self) -> Vec<TradeRow> {
        let mut rows: Vec<TradeRow> = self.current.values().map(|s| s.record.to_row()).collect();
        rows.sort_by(|a, b| a.trade_date.cmp(&b.trade_date).then(a.trade_id.cmp(&b.trade_id)));
        rows
    }

    #[must_use]
    pub fn has_recorded(&self, tx_id: &TxId) -> bool {
        self.recorded.contains(tx_id)
    }

    /// Number of live trades.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}
