//! # tradeledger-contract
//!
//! The trade contract: the rules every party, and the notary, run before a
//! transaction may touch the ledger.
//!
//! - [`verify`] / [`validate`]: pure admit-or-reject decision per transition
//! - [`ResponderPolicy`]: business checks a responder applies *on top of*
//!   the contract before it signs (e.g. [`AmountCeiling`])
//!
//! Nothing in this crate performs I/O.

pub mod policy;
pub mod rules;

pub use policy::{AcceptAll, AmountCeiling, ResponderPolicy, Verdict, policy_for};
pub use rules::{validate, verify, verify_parts};
