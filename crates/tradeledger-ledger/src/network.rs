//! In-memory session transport between parties.
//!
//! Every party registers an inbox. Opening a session creates a pair of
//! bounded channels and hands the far end to the counterparty's inbox as an
//! [`InboundSession`]. Parties share nothing else: all coordination is by
//! the messages they exchange on a session.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use tradeledger_types::{
    FlowMessage, LedgerError, Party, PartyKey, Result, SessionId, TransitionKind, constants,
};

/// One end of an initiator/responder session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    counterparty: Party,
    kind: TransitionKind,
    outbound: mpsc::Sender<FlowMessage>,
    inbound: mpsc::Receiver<FlowMessage>,
    timeout: Duration,
}

impl Session {
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn counterparty(&self) -> &Party {
        &self.counterparty
    }

    /// The transition this session was opened for.
    #[must_use]
    pub fn kind(&self) -> &TransitionKind {
        &self.kind
    }

    /// Send a message to the counterparty.
    ///
    /// # Errors
    /// [`LedgerError::Transport`] if the counterparty dropped its end.
    pub async fn send(&self, message: FlowMessage) -> Result<()> {
        debug!(session = %self.id, to = %self.counterparty, message = %message, "Session send");
        self.outbound.send(message).await.map_err(|_| {
            LedgerError::Transport(format!(
                "{} closed {} before send",
                self.counterparty, self.id
            ))
        })
    }

    /// Wait for the next message from the counterparty.
    ///
    /// # Errors
    /// - [`LedgerError::SessionTimeout`] if nothing arrives in time
    /// - [`LedgerError::Transport`] if the counterparty dropped its end
    pub async fn receive(&mut self) -> Result<FlowMessage> {
        match tokio::time::timeout(self.timeout, self.inbound.recv()).await {
            Ok(Some(message)) => {
                debug!(session = %self.id, from = %self.counterparty, message = %message, "Session receive");
                Ok(message)
            }
            Ok(None) => Err(LedgerError::Transport(format!(
                "{} closed {}",
                self.counterparty, self.id
            ))),
            Err(_) => Err(LedgerError::SessionTimeout {
                party: self.counterparty.name.clone(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

/// A session opened by someone else, delivered to the responder's inbox.
#[derive(Debug)]
pub struct InboundSession {
    pub initiator: Party,
    pub session: Session,
}

/// Shared registry of party inboxes.
#[derive(Clone, Debug, Default)]
pub struct Network {
    inboxes: Arc<RwLock<HashMap<PartyKey, mpsc::Sender<InboundSession>>>>,
}

impl Network {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `party` and return the receiver its node listens on.
    /// Re-registering replaces the previous inbox.
    pub async fn register(&self, party: &Party, capacity: usize) -> mpsc::Receiver<InboundSession> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.inboxes.write().await.insert(party.key, tx);
        debug!(party = %party, "Registered on network");
        rx
    }

    /// Remove `party`; later attempts to open a session to it fail.
    pub async fn deregister(&self, party: &Party) {
        self.inboxes.write().await.remove(&party.key);
        debug!(party = %party, "Deregistered from network");
    }

    pub async fn is_registered(&self, party: &Party) -> bool {
        self.inboxes.read().await.contains_key(&party.key)
    }

    /// Open a session from `initiator` to `counterparty` for a `kind` transition.
    ///
    /// # Errors
    /// [`LedgerError::Transport`] if the counterparty is not registered or
    /// its inbox is closed.
    pub async fn open(
        &self,
        initiator: &Party,
        counterparty: &Party,
        kind: TransitionKind,
        timeout: Duration,
    ) -> Result<Session> {
        let inbox = self
            .inboxes
            .read()
            .await
            .get(&counterparty.key)
            .cloned()
            .ok_or_else(|| {
                LedgerError::Transport(format!("{counterparty} is not reachable"))
            })?;

        let id = SessionId::new();
        let (to_responder, from_initiator) = mpsc::channel(constants::SESSION_CHANNEL_CAPACITY);
        let (to_initiator, from_responder) = mpsc::channel(constants::SESSION_CHANNEL_CAPACITY);

        let responder_end = Session {
            id,
            counterparty: initiator.clone(),
            kind: kind.clone(),
            outbound: to_initiator,
            inbound: from_initiator,
            timeout,
        };
        inbox
            .send(InboundSession {
                initiator: initiator.clone(),
                session: responder_end,
            })
            .await
            .map_err(|_| LedgerError::Transport(format!("{counterparty} inbox is closed")))?;

        debug!(session = %id, from = %initiator, to = %counterparty, kind = %kind, "Session opened");
        Ok(Session {
            id,
            counterparty: counterparty.clone(),
            kind,
            outbound: to_responder,
            inbound: from_responder,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn open_delivers_far_end() {
        let net = Network::new();
        let (a, b) = (Party::dummy("O=Alice"), Party::dummy("O=Bob"));
        let mut inbox = net.register(&b, 4).await;

        let mut session = net
            .open(&a, &b, TransitionKind::Create, TIMEOUT)
            .await
            .unwrap();
        let mut inbound = inbox.recv().await.unwrap();
        assert_eq!(inbound.initiator, a);
        assert_eq!(inbound.session.id(), session.id());
        assert_eq!(inbound.session.kind(), &TransitionKind::Create);

        session.send(FlowMessage::Ack).await.unwrap();
        assert!(matches!(inbound.session.receive().await.unwrap(), FlowMessage::Ack));

        inbound
            .session
            .send(FlowMessage::Refused { reason: "no".into() })
            .await
            .unwrap();
        assert!(matches!(
            session.receive().await.unwrap(),
            FlowMessage::Refused { .. }
        ));
    }

    #[tokio::test]
    async fn open_to_unknown_party_fails() {
        let net = Network::new();
        let (a, b) = (Party::dummy("O=Alice"), Party::dummy("O=Bob"));
        let err = net
            .open(&a, &b, TransitionKind::Create, TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Transport(_)));
    }

    #[tokio::test]
    async fn silent_counterparty_times_out() {
        let net = Network::new();
        let (a, b) = (Party::dummy("O=Alice"), Party::dummy("O=Bob"));
        let _inbox = net.register(&b, 4).await;
        let mut session = net
            .open(&a, &b, TransitionKind::Settle, Duration::from_millis(20))
            .await
            .unwrap();
        let err = session.receive().await.unwrap_err();
        assert!(matches!(err, LedgerError::SessionTimeout { timeout_ms: 20, .. }));
    }

    #[tokio::test]
    async fn dropped_far_end_is_transport_error() {
        let net = Network::new();
        let (a, b) = (Party::dummy("O=Alice"), Party::dummy("O=Bob"));
        let mut inbox = net.register(&b, 4).await;
        let mut session = net
            .open(&a, &b, TransitionKind::Close, TIMEOUT)
            .await
            .unwrap();
        drop(inbox.recv().await.unwrap());
        assert!(matches!(
            session.receive().await.unwrap_err(),
            LedgerError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn deregister_blocks_new_sessions() {
        let net = Network::new();
        let (a, b) = (Party::dummy("O=Alice"), Party::dummy("O=Bob"));
        let _inbox = net.register(&b, 4).await;
        assert!(net.is_registered(&b).await);
        net.deregister(&b).await;
        assert!(!net.is_registered(&b).await);
        assert!(net.open(&a, &b, TransitionKind::Create, TIMEOUT).await.is_err());
    }
}
