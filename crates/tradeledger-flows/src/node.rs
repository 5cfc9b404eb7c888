//! A party's node: its identity, vault, and the caller-facing operations.
//!
//! Starting a node registers it on the network and spawns a loop that
//! accepts inbound sessions, each handled by its own responder task.

use std::sync::Arc;

use chrono::Utc;
use tokio::{
    sync::{RwLock, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use tradeledger_contract::{ResponderPolicy, policy_for};
use tradeledger_ledger::{InboundSession, Network, NetworkMap, NotaryHandle, Vault};
use tradeledger_types::{
    FinalizedTransaction, LedgerError, LocalIdentity, NodeConfig, Party, Result, StateAndRef,
    TradeId, TradeRecord, TradeRow, TradeStatus, constants,
};

use crate::{coordinator, initiator, responder};

/// Everything a flow running on this node can reach.
#[derive(Debug)]
pub(crate) struct NodeServices {
    pub identity: LocalIdentity,
    pub config: NodeConfig,
    pub network: Network,
    pub notary: NotaryHandle,
    pub network_map: Arc<NetworkMap>,
    pub vault: RwLock<Vault>,
    pub policy: Arc<dyn ResponderPolicy>,
}

impl NodeServices {
    pub fn party(&self) -> &Party {
        self.identity.party()
    }
}

/// A running party node.
#[derive(Debug)]
pub struct PartyNode {
    services: Arc<NodeServices>,
    responder_loop: JoinHandle<()>,
}

impl PartyNode {
    /// Start a node with the responder policy its config describes.
    ///
    /// # Errors
    /// [`LedgerError::Configuration`] if the config is invalid or names a
    /// different party than `identity`.
    pub async fn start(
        config: NodeConfig,
        identity: LocalIdentity,
        network: Network,
        notary: NotaryHandle,
        network_map: Arc<NetworkMap>,
    ) -> Result<Self> {
        let policy = policy_for(&config);
        Self::start_with_policy(config, identity, network, notary, network_map, policy).await
    }

    /// Start a node with an explicit responder policy.
    pub async fn start_with_policy(
        config: NodeConfig,
        identity: LocalIdentity,
        network: Network,
        notary: NotaryHandle,
        network_map: Arc<NetworkMap>,
        policy: Arc<dyn ResponderPolicy>,
    ) -> Result<Self> {
        config.validate()?;
        if config.name != identity.party().name {
            return Err(LedgerError::Configuration(format!(
                "config is for {} but identity is {}",
                config.name,
                identity.party()
            )));
        }
        if notary.party() != network_map.notary() {
            return Err(LedgerError::Configuration(format!(
                "notary {} is not the network map notary {}",
                notary.party(),
                network_map.notary()
            )));
        }

        let inbox = network
            .register(identity.party(), config.inbox_capacity)
            .await;
        let services = Arc::new(NodeServices {
            identity,
            config,
            network,
            notary,
            network_map,
            vault: RwLock::new(Vault::new()),
            policy,
        });
        let responder_loop = tokio::spawn(serve(Arc::clone(&services), inbox));

        info!(
            party = %services.party(),
            policy = ?services.policy,
            version = constants::VERSION,
            "Node started"
        );
        Ok(Self {
            services,
            responder_loop,
        })
    }

    #[must_use]
    pub fn party(&self) -> &Party {
        self.services.party()
    }

    /// Create a trade obligating `to_party` for `amount`.
    ///
    /// # Errors
    /// - validation errors before any session opens
    /// - [`LedgerError::Refused`] if `to_party` declines
    /// - transport, timeout, and notary errors from the exchange
    pub async fn create_trade(&self, to_party: &Party, amount: u64) -> Result<TradeId> {
        let proposal = coordinator::propose_create(
            self.party(),
            to_party,
            amount,
            Utc::now(),
            self.services.network_map.notary(),
        )?;
        let finalized = self.drive(proposal).await?;
        committed_trade_id(&finalized)
    }

    /// [`Self::create_trade`] with the counterparty looked up by name.
    pub async fn create_trade_with(&self, to_name: &str, amount: u64) -> Result<TradeId> {
        let to_party = self.services.network_map.resolve(to_name)?;
        self.create_trade(&to_party, amount).await
    }

    /// Settle the current version of `trade_id`. Only its `to_party` may.
    ///
    /// # Errors
    /// - [`LedgerError::TradeNotFound`] if this node holds no current version
    /// - [`LedgerError::SignerMismatch`] if this node is not the `to_party`
    /// - [`LedgerError::Conflict`] if a concurrent transition won the race
    pub async fn settle_trade(&self, trade_id: TradeId) -> Result<TradeId> {
        let current = self.current(trade_id).await?;
        let proposal = coordinator::propose_settle(
            self.party(),
            current,
            self.services.network_map.notary(),
        )?;
        let finalized = self.drive(proposal).await?;
        committed_trade_id(&finalized)
    }

    /// Close the current version of `trade_id`, leaving no successor.
    pub async fn close_trade(&self, trade_id: TradeId) -> Result<()> {
        let current = self.current(trade_id).await?;
        let proposal = coordinator::propose_close(
            self.party(),
            current,
            self.services.network_map.notary(),
        )?;
        self.drive(proposal).await?;
        Ok(())
    }

    /// The current version of `trade_id` in this node's vault.
    pub async fn find_trade(&self, trade_id: TradeId) -> Option<TradeRecord> {
        self.services
            .vault
            .read()
            .await
            .find_current_by_id(&trade_id)
            .map(|s| s.record)
    }

    /// Current status, or `CLOSED` for a trade consumed without successor.
    pub async fn status_of(&self, trade_id: TradeId) -> Option<TradeStatus> {
        self.services.vault.read().await.status_of(&trade_id)
    }

    /// Every version of `trade_id` this node has recorded.
    pub async fn history(&self, trade_id: TradeId) -> Vec<TradeRecord> {
        self.services.vault.read().await.history(&trade_id)
    }

    /// `trade_state` rows for every current trade.
    pub async fn rows(&self) -> Vec<TradeRow> {
        self.services.vault.read().await.rows()
    }

    /// Leave the network and stop accepting sessions.
    pub async fn shutdown(&self) {
        self.services.network.deregister(self.party()).await;
        self.responder_loop.abort();
        info!(party = %self.party(), "Node stopped");
    }

    async fn current(&self, trade_id: TradeId) -> Result<StateAndRef> {
        self.services
            .vault
            .read()
            .await
            .find_current_by_id(&trade_id)
            .ok_or(LedgerError::TradeNotFound(trade_id))
    }

    async fn drive(&self, proposal: coordinator::Proposal) -> Result<FinalizedTransaction> {
        let kind = proposal.kind.clone();
        initiator::run(&self.services, proposal)
            .await
            .inspect_err(|e| warn!(party = %self.party(), kind = %kind, error = %e, "Transition failed"))
    }
}

impl Drop for PartyNode {
    fn drop(&mut self) {
        self.responder_loop.abort();
    }
}

/// The trade a finalised Create or Settle produced.
fn committed_trade_id(finalized: &FinalizedTransaction) -> Result<TradeId> {
    finalized
        .tx
        .body
        .outputs
        .first()
        .map(|r| r.id)
        .ok_or_else(|| LedgerError::Internal(format!("{} has no output", finalized.id())))
}

async fn serve(services: Arc<NodeServices>, mut inbox: mpsc::Receiver<InboundSession>) {
    while let Some(inbound) = inbox.recv().await {
        debug!(
            party = %services.party(),
            initiator = %inbound.initiator,
            session = %inbound.session.id(),
            "Accepted inbound session"
        );
        let services = Arc::clone(&services);
        tokio::spawn(async move {
            let kind = inbound.session.kind().clone();
            let outcome = responder::respond(&services, inbound).await;
            debug!(party = %services.party(), kind = %kind, outcome = ?outcome, "Responder finished");
        });
    }
}
