//! # tradeledger-flows
//!
//! Runs trade transitions between parties.
//!
//! - [`PartyNode`]: a party's node with the caller surface
//!   `create_trade` / `settle_trade` / `close_trade`
//! - [`coordinator`]: builds and locally validates each transition
//! - the initiator and responder halves of the settlement protocol
//!
//! ## Transition lifecycle
//!
//! ```text
//!  caller ─▶ coordinator ─▶ initiator ──Proposal──▶ responder (Create)
//!             validate        │  ◀──Signature/Refused──┘
//!                             ├─▶ notary (uniqueness + contract)
//!                             └──Finalized──▶ responder ──Ack──▶
//! ```
//!
//! Every party re-runs the contract on what it signs or records. A failure
//! at any step leaves the prior version current for every party.

pub mod coordinator;
mod initiator;
pub mod node;
pub mod responder;

pub use coordinator::Proposal;
pub use node::PartyNode;
pub use responder::ResponderState;
