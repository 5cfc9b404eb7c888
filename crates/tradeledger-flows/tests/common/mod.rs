//! Shared harness for the flows integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use tradeledger_flows::PartyNode;
use tradeledger_ledger::{Network, NetworkMap, Notary, NotaryHandle};
use tradeledger_types::{LocalIdentity, NodeConfig, NotaryConfig, Party};

pub const PARTY_A: &str = "O=PartyA,L=London,C=GB";
pub const PARTY_B: &str = "O=PartyB,L=New York,C=US";
pub const PARTY_C: &str = "O=PartyC,L=Paris,C=FR";

/// Install a test subscriber once per test binary. `RUST_LOG` overrides
/// the default `warn` filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A network, a notary, and one started node per party name.
pub struct Harness {
    pub network: Network,
    pub notary: NotaryHandle,
    pub map: Arc<NetworkMap>,
    pub nodes: Vec<PartyNode>,
}

impl Harness {
    pub async fn start(names: &[&str]) -> Self {
        Self::start_with(names, |name| NodeConfig::named(name)).await
    }

    pub async fn start_with(names: &[&str], config: impl Fn(&str) -> NodeConfig) -> Self {
        init_tracing();
        let network = Network::new();
        let notary = Notary::spawn(&NotaryConfig::default()).expect("default notary config");

        let identities: Vec<LocalIdentity> =
            names.iter().map(|name| LocalIdentity::generate(*name)).collect();
        let mut map = NetworkMap::new(notary.party().clone());
        for identity in &identities {
            map.add(identity.party().clone());
        }
        let map = Arc::new(map);

        let mut nodes = Vec::with_capacity(identities.len());
        for identity in identities {
            let cfg = config(&identity.party().name);
            let node = PartyNode::start(
                cfg,
                identity,
                network.clone(),
                notary.clone(),
                Arc::clone(&map),
            )
            .await
            .expect("node starts");
            nodes.push(node);
        }

        Self {
            network,
            notary,
            map,
            nodes,
        }
    }

    pub fn node(&self, index: usize) -> &PartyNode {
        &self.nodes[index]
    }

    pub fn party(&self, index: usize) -> Party {
        self.nodes[index].party().clone()
    }
}
