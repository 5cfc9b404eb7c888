//! System-wide constants for tradeledger.

/// Smallest admissible trade amount.
pub const MIN_TRADE_AMOUNT: u64 = 1;

/// Default ceiling a responder applies before signing a new trade.
pub const DEFAULT_MAX_TRADE_AMOUNT: u64 = 1000;

/// Default time to wait for a counterparty message, in milliseconds.
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 5_000;

/// Default capacity of a party's inbound session queue.
pub const DEFAULT_INBOX_CAPACITY: usize = 64;

/// Capacity of each direction of a session channel.
pub const SESSION_CHANNEL_CAPACITY: usize = 8;

/// Default capacity of the notary's request queue.
pub const DEFAULT_NOTARY_REQUEST_CAPACITY: usize = 128;

/// Default notary legal name.
pub const DEFAULT_NOTARY_NAME: &str = "O=Notary,L=London,C=GB";

/// Domain tag prefixed to every transaction signing payload.
pub const TX_DOMAIN_TAG: &[u8] = b"tradeledger:tx:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
