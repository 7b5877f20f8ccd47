//! The shared public medium the session actors talk over.
//!
//! Actors never address each other directly. They hand every message to the
//! [`Network`], which in passive mode routes it to the actor's partner and in
//! active mode queues it for the [`Adversary`](crate::Adversary) to dispose
//! of. Either way a copy lands in the observation log.
//!
//! The network also tracks outstanding work so the orchestrator can tell
//! when the honest side has nothing left to do: each running actor and each
//! undelivered message holds one unit of [`Activity`].

use crate::{algebra::Element, logging, material::{SessionId, Token}, Host, Role};
use dashmap::DashMap;
use std::{
    fmt,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

/// Identifies one session actor for the lifetime of a run.
pub type ActorId = u64;

/// A well-formed protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A role's public Diffie-Hellman value, tagged with its claimed host.
    Share { sender: Host, public: Element },
    /// A key confirmation token, tagged with its claimed host.
    Confirm { sender: Host, token: Token },
}

impl Message {
    pub fn share(sender: Host, public: Element) -> Self {
        Self::Share { sender, public }
    }

    pub fn confirm(sender: Host, token: Token) -> Self {
        Self::Confirm { sender, token }
    }

    /// The host tag the message claims to come from.
    pub fn sender(&self) -> &Host {
        match self {
            Message::Share { sender, .. } | Message::Confirm { sender, .. } => sender,
        }
    }

    /// The same payload under a different host tag.
    pub fn retagged(self, sender: Host) -> Self {
        match self {
            Message::Share { public, .. } => Message::Share { sender, public },
            Message::Confirm { token, .. } => Message::Confirm { sender, token },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Share { .. } => "share",
            Message::Confirm { .. } => "confirm",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Share { sender, public } => write!(f, "({sender}, {public:?})"),
            Message::Confirm { sender, token } => write!(f, "({sender}, {token:?})"),
        }
    }
}

/// Public routing information about a spawned actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorTag {
    pub id: ActorId,
    pub role: Role,
    /// The host this actor runs as.
    pub host: Host,
    /// The host it intends to talk to.
    pub peer: Host,
    /// The seed the orchestrator handed to this actor.
    pub seed: SessionId,
}

impl ActorTag {
    pub fn initiator(&self) -> &Host {
        match self.role {
            Role::Initiator => &self.host,
            Role::Responder => &self.peer,
        }
    }

    pub fn responder(&self) -> &Host {
        match self.role {
            Role::Initiator => &self.peer,
            Role::Responder => &self.host,
        }
    }
}

impl fmt::Display for ActorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {} -> {}", self.id, self.role, self.host, self.peer)
    }
}

/// A message together with the actor that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Position in the observation log.
    pub seq: u64,
    pub from: ActorTag,
    pub message: Message,
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    #[error("No actor with id {0} was ever spawned")]
    UnknownActor(ActorId),
    #[error("The network has been closed")]
    Closed,
}

/// Counts outstanding work and wakes waiters when it drops to zero.
#[derive(Debug, Default)]
pub(crate) struct Activity {
    busy: AtomicUsize,
    idle: Notify,
}

impl Activity {
    pub(crate) fn acquire(&self) {
        self.busy.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn release(&self) {
        if self.busy.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Resolves once nothing is outstanding.
    pub(crate) async fn quiesce(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.busy.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// The receiving end an actor blocks on.
#[derive(Debug)]
pub(crate) struct Inbox {
    receiver: mpsc::UnboundedReceiver<Message>,
    closed: CancellationToken,
    /// Whether the owner currently holds a unit of activity.
    held: bool,
}

impl Inbox {
    /// Waits for the next message. Returns `None` once the network closes.
    ///
    /// Waiting gives back the unit held for the previous message (or for
    /// the actor's startup); a returned message hands its unit over.
    pub(crate) async fn recv(&mut self, activity: &Activity) -> Option<Message> {
        if std::mem::take(&mut self.held) {
            activity.release();
        }
        let message = tokio::select! {
            biased;
            message = self.receiver.recv() => message,
            _ = self.closed.cancelled() => None,
        };
        self.held = message.is_some();
        message
    }

    /// Releases everything this inbox still accounts for.
    pub(crate) fn retire(&mut self, activity: &Activity) {
        if std::mem::take(&mut self.held) {
            activity.release();
        }
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {
            activity.release();
        }
    }
}

/// The public medium.
#[derive(Debug)]
pub struct Network {
    active: bool,
    inboxes: DashMap<ActorId, mpsc::UnboundedSender<Message>>,
    tags: DashMap<ActorId, ActorTag>,
    partners: DashMap<ActorId, ActorId>,
    observed: DashMap<u64, Envelope>,
    next_seq: AtomicU64,
    intercepts: mpsc::UnboundedSender<Envelope>,
    closed: CancellationToken,
    pub(crate) activity: Activity,
}

impl Network {
    /// Creates a network and the receiving end of its intercept queue. The
    /// queue only fills when `active` is set.
    pub(crate) fn new(active: bool) -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (intercepts, receiver) = mpsc::unbounded_channel();
        let network = Self {
            active,
            inboxes: DashMap::new(),
            tags: DashMap::new(),
            partners: DashMap::new(),
            observed: DashMap::new(),
            next_seq: AtomicU64::new(0),
            intercepts,
            closed: CancellationToken::new(),
            activity: Activity::default(),
        };
        (network, receiver)
    }

    /// Registers an actor and returns its inbox. The actor starts out
    /// holding one unit of activity.
    pub(crate) fn attach(&self, tag: ActorTag) -> Inbox {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.activity.acquire();
        self.inboxes.insert(tag.id, sender);
        self.tags.insert(tag.id, tag);
        Inbox {
            receiver,
            closed: self.closed.clone(),
            held: true,
        }
    }

    /// Records that two actors belong to the same honest run.
    pub(crate) fn pair(&self, initiator: ActorId, responder: ActorId) {
        self.partners.insert(initiator, responder);
        self.partners.insert(responder, initiator);
    }

    /// The actor an honest network would deliver `id`'s messages to.
    pub fn partner_of(&self, id: ActorId) -> Option<ActorId> {
        self.partners.get(&id).map(|entry| *entry.value())
    }

    /// Routing information for a spawned actor.
    pub fn tag(&self, id: ActorId) -> Option<ActorTag> {
        self.tags.get(&id).map(|entry| entry.value().clone())
    }

    /// Every spawned actor, by id.
    pub fn directory(&self) -> Vec<ActorTag> {
        let mut tags: Vec<ActorTag> = self.tags.iter().map(|e| e.value().clone()).collect();
        tags.sort_by_key(|tag| tag.id);
        tags
    }

    /// Called by an actor to put a message on the wire.
    pub(crate) fn send(&self, from: &ActorTag, message: Message) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let envelope = Envelope {
            seq,
            from: from.clone(),
            message,
        };
        self.observed.insert(seq, envelope.clone());
        logging::message_sent(&envelope);

        if self.active {
            self.activity.acquire();
            if self.intercepts.send(envelope).is_err() {
                self.activity.release();
            }
        } else {
            match self.partner_of(from.id) {
                Some(partner) => self.push(partner, envelope.message),
                None => logging::message_dropped(&envelope, "no partner"),
            }
        }
    }

    /// Puts a message straight into an actor's inbox.
    pub(crate) fn deliver(&self, to: ActorId, message: Message) -> Result<(), NetworkError> {
        if self.closed.is_cancelled() {
            return Err(NetworkError::Closed);
        }
        if !self.tags.contains_key(&to) {
            return Err(NetworkError::UnknownActor(to));
        }
        self.push(to, message);
        Ok(())
    }

    fn push(&self, to: ActorId, message: Message) {
        let Some(inbox) = self.inboxes.get(&to).map(|e| e.value().clone()) else {
            return;
        };
        self.activity.acquire();
        logging::message_delivered(to, &message);
        // A send error only means the actor has already finished.
        if inbox.send(message).is_err() {
            self.activity.release();
        }
    }

    /// Everything honest actors have sent so far, in order.
    pub fn observed(&self) -> Vec<Envelope> {
        let mut envelopes: Vec<Envelope> = self.observed.iter().map(|e| e.value().clone()).collect();
        envelopes.sort_by_key(|envelope| envelope.seq);
        envelopes
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Wakes every blocked actor with a closed channel.
    pub(crate) fn close(&self) {
        self.closed.cancel();
    }

    pub(crate) fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }
}
