//! The network attacker.
//!
//! In active mode every message an honest actor sends ends up in the
//! [`Adversary`]'s intercept queue and nowhere else. The adversary may
//! forward, drop, duplicate, reorder, retag or replace messages, and may
//! compute with the public algebra and oracles, but it never sees a
//! long-term secret or an exponent: those never leave the actors.
//!
//! Reusable behaviours are packaged as [`Strategy`] implementations.

use crate::{
    algebra::{GroupAlgebra, SharedGroup},
    logging,
    material::Token,
    network::{ActorId, ActorTag, Envelope, Message, Network, NetworkError},
    oracle::{Digest, Oracle, SharedOracle},
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Full control over an active network.
pub struct Adversary {
    network: Arc<Network>,
    intercepts: mpsc::UnboundedReceiver<Envelope>,
    closed: CancellationToken,
    group: SharedGroup,
    oracle: SharedOracle,
    /// Whether the last intercepted message is still being acted on.
    holding: bool,
}

impl Adversary {
    pub(crate) fn new(
        network: Arc<Network>,
        intercepts: mpsc::UnboundedReceiver<Envelope>,
        group: SharedGroup,
        oracle: SharedOracle,
    ) -> Self {
        let closed = network.closed_token();
        Self {
            network,
            intercepts,
            closed,
            group,
            oracle,
            holding: false,
        }
    }

    fn let_go(&mut self) {
        if std::mem::take(&mut self.holding) {
            self.network.activity.release();
        }
    }

    /// Waits for the next message an honest actor sends. Returns `None`
    /// once the run is over.
    ///
    /// Calling this again signals that the adversary is done with the
    /// previous message.
    pub async fn intercept(&mut self) -> Option<Envelope> {
        self.let_go();
        let envelope = tokio::select! {
            biased;
            envelope = self.intercepts.recv() => envelope,
            _ = self.closed.cancelled() => None,
        };
        self.holding = envelope.is_some();
        envelope
    }

    /// Takes a message if one is already queued.
    pub fn try_intercept(&mut self) -> Option<Envelope> {
        self.let_go();
        let envelope = self.intercepts.try_recv().ok();
        self.holding = envelope.is_some();
        envelope
    }

    /// Places a message in an actor's inbox. The message may be anything
    /// well-formed: an intercepted one, a replayed one or a forgery.
    pub fn deliver(&self, to: ActorId, message: Message) -> Result<(), NetworkError> {
        logging::message_injected(to, &message);
        self.network.deliver(to, message)
    }

    /// Delivers a message to the partner its sender was spawned with.
    pub fn forward(&self, envelope: Envelope) -> Result<(), NetworkError> {
        match self.network.partner_of(envelope.from.id) {
            Some(partner) => self.network.deliver(partner, envelope.message),
            None => {
                self.discard(&envelope);
                Ok(())
            }
        }
    }

    /// Plays a copy of an earlier message to another actor. The envelope
    /// may come from [`Adversary::observed`] long after it was first sent.
    pub fn replay(&self, envelope: &Envelope, to: ActorId) -> Result<(), NetworkError> {
        self.deliver(to, envelope.message.clone())
    }

    /// Drops a message on the floor.
    pub fn discard(&self, envelope: &Envelope) {
        logging::message_dropped(envelope, "discarded by the adversary");
    }

    /// Every message sent so far, including ones already delivered.
    pub fn observed(&self) -> Vec<Envelope> {
        self.network.observed()
    }

    /// The public directory of spawned actors.
    pub fn actors(&self) -> Vec<ActorTag> {
        self.network.directory()
    }

    pub fn tag(&self, id: ActorId) -> Option<ActorTag> {
        self.network.tag(id)
    }

    pub fn partner_of(&self, id: ActorId) -> Option<ActorId> {
        self.network.partner_of(id)
    }

    /// The public group operations.
    pub fn group(&self) -> &dyn GroupAlgebra {
        &*self.group
    }

    /// The public hash, KDF and MAC functions.
    pub fn oracle(&self) -> &dyn Oracle {
        &*self.oracle
    }

    /// Turns an oracle output into a confirmation token the adversary can
    /// send under any host tag.
    pub fn forge_token(&self, digest: Digest) -> Token {
        Token(digest)
    }
}

impl Drop for Adversary {
    fn drop(&mut self) {
        self.let_go();
        self.intercepts.close();
        while self.intercepts.try_recv().is_ok() {
            self.network.activity.release();
        }
    }
}

/// Read-only access to the traffic of any network.
#[derive(Clone)]
pub struct Eavesdropper {
    network: Arc<Network>,
}

impl Eavesdropper {
    pub(crate) fn new(network: Arc<Network>) -> Self {
        Self { network }
    }

    pub fn observed(&self) -> Vec<Envelope> {
        self.network.observed()
    }

    pub fn actors(&self) -> Vec<ActorTag> {
        self.network.directory()
    }
}

/// A packaged attacker behaviour.
#[async_trait]
pub trait Strategy: Send + 'static {
    fn name(&self) -> &'static str;

    /// Drives the adversary until [`Adversary::intercept`] returns `None`.
    async fn run(self: Box<Self>, adversary: Adversary);
}

/// Sends one actor's traffic somewhere other than its partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub from: ActorId,
    pub to: ActorId,
    /// Rewrite the sender tag to the host the receiver expects to hear from.
    pub retag: bool,
}

/// Delivers messages along fixed routes.
///
/// A sender may have several routes, in which case each message is copied
/// to every target. Senders without a route are forwarded to their partner.
#[derive(Debug, Clone)]
pub struct Rewire {
    name: &'static str,
    routes: Vec<Route>,
}

impl Rewire {
    pub fn new(name: &'static str, routes: Vec<Route>) -> Self {
        Self { name, routes }
    }

    /// An honest relay.
    pub fn forward() -> Self {
        Self::new("forward", Vec::new())
    }

    /// Connects `initiator` to a responder that was addressed by someone
    /// else, retagging the responder's replies as the initiator's intended
    /// peer.
    pub fn misdirect(initiator: ActorId, responder: ActorId) -> Self {
        Self::new(
            "misdirect",
            vec![
                Route { from: initiator, to: responder, retag: true },
                Route { from: responder, to: initiator, retag: true },
            ],
        )
    }

    /// Crosses two concurrent sessions: each initiator talks to the other
    /// session's responder.
    pub fn swap(first: (ActorId, ActorId), second: (ActorId, ActorId)) -> Self {
        let ((i1, r1), (i2, r2)) = (first, second);
        Self::new(
            "swap",
            vec![
                Route { from: i1, to: r2, retag: false },
                Route { from: r2, to: i1, retag: false },
                Route { from: i2, to: r1, retag: false },
                Route { from: r1, to: i2, retag: false },
            ],
        )
    }

    /// Connects an initiator to a responder running on its own host.
    pub fn reflect(initiator: ActorId, responder: ActorId) -> Self {
        Self::misdirect(initiator, responder).named("reflect")
    }

    fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    fn route(&self, adversary: &Adversary, envelope: Envelope) -> Result<(), NetworkError> {
        let routes: Vec<&Route> = self
            .routes
            .iter()
            .filter(|route| route.from == envelope.from.id)
            .collect();
        if routes.is_empty() {
            return adversary.forward(envelope);
        }
        for route in routes {
            let mut message = envelope.message.clone();
            if route.retag {
                let receiver = adversary
                    .tag(route.to)
                    .ok_or(NetworkError::UnknownActor(route.to))?;
                message = message.retagged(receiver.peer);
            }
            adversary.deliver(route.to, message)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Strategy for Rewire {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(self: Box<Self>, mut adversary: Adversary) {
        while let Some(envelope) = adversary.intercept().await {
            if let Err(error) = self.route(&adversary, envelope) {
                tracing::warn!(target: "NETWORK", strategy = self.name, %error, "route failed");
            }
        }
    }
}
