//! # tradeledger-ledger
//!
//! The in-memory collaborators a trade flow talks to:
//!
//! - [`notary`]: single-actor notary that checks signatures, the contract,
//!   and input uniqueness before signing
//! - [`network`]: per-party inboxes and bidirectional sessions
//! - [`vault`]: each party's store of current and historical trade records
//! - [`network_map`]: party directory
//!
//! Nothing here knows about flows. The flows crate drives these pieces.

pub mod network;
pub mod network_map;
pub mod notary;
pub mod uniqueness;
pub mod vault;

pub use network::{InboundSession, Network, Session};
pub use network_map::NetworkMap;
pub use notary::{Notary, NotaryHandle};
pub use uniqueness::UniquenessProvider;
pub use vault::Vault;
