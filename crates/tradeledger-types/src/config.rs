//! Configuration for party nodes and the notary.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{LedgerError, Result, constants};

/// Configuration for a single party node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Legal name of the party this node runs for.
    pub name: String,
    /// How long to wait for any counterparty message.
    pub session_timeout_ms: u64,
    /// Responder-side ceiling on new trade amounts. `None` accepts any amount
    /// the contract admits.
    pub max_trade_amount: Option<u64>,
    /// Capacity of the inbound session queue.
    pub inbox_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            session_timeout_ms: constants::DEFAULT_SESSION_TIMEOUT_MS,
            max_trade_amount: Some(constants::DEFAULT_MAX_TRADE_AMOUNT),
            inbox_capacity: constants::DEFAULT_INBOX_CAPACITY,
        }
    }
}

impl NodeConfig {
    /// Default configuration for the named party.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| LedgerError::Configuration(format!("node config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::Configuration("node name must not be empty".into()));
        }
        if self.session_timeout_ms == 0 {
            return Err(LedgerError::Configuration(
                "session_timeout_ms must be > 0".into(),
            ));
        }
        if self.inbox_capacity == 0 {
            return Err(LedgerError::Configuration("inbox_capacity must be > 0".into()));
        }
        if self.max_trade_amount == Some(0) {
            return Err(LedgerError::Configuration(
                "max_trade_amount must be > 0 when set".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

/// Configuration for the notary service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotaryConfig {
    pub name: String,
    /// Capacity of the submission queue.
    pub request_capacity: usize,
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            name: constants::DEFAULT_NOTARY_NAME.to_string(),
            request_capacity: constants::DEFAULT_NOTARY_REQUEST_CAPACITY,
        }
    }
}

impl NotaryConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| LedgerError::Configuration(format!("notary config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::Configuration("notary name must not be empty".into()));
        }
        if self.request_capacity == 0 {
            return Err(LedgerError::Configuration(
                "request_capacity must be > 0".into(),
            ));
        }
        Ok(())
    }
}
