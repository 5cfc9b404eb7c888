//! # tradeledger-types
//!
//! Shared types, errors, and configuration for **tradeledger**.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`TradeId`], [`TxId`], [`StateRef`], [`SessionId`]
//! - **Parties**: [`Party`], [`PartyKey`], [`LocalIdentity`], [`TransactionSignature`]
//! - **Trade model**: [`TradeRecord`], [`TradeStatus`], [`TradeRow`]
//! - **Transactions**: [`TransitionKind`], [`Command`], [`StateAndRef`],
//!   [`TransactionBody`], [`SignedTransaction`], [`FinalizedTransaction`]
//! - **Session messages**: [`FlowMessage`]
//! - **Configuration**: [`NodeConfig`], [`NotaryConfig`]
//! - **Errors**: [`LedgerError`] with `TL_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod message;
pub mod party;
pub mod trade;
pub mod transaction;

pub use config::*;
pub use error::*;
pub use ids::*;
pub use message::*;
pub use party::{LocalIdentity, Party, PartyKey, TransactionSignature, format_keys};
pub use trade::*;
pub use transaction::*;
