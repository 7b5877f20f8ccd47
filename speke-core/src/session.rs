//! The initiator/responder state machine.
//!
//! One [`SessionActor`] runs one role of one handshake as its own task. It
//! is written once for both roles and every variant: everything that differs
//! between flavours comes from the [`Variant`](crate::Variant) it is given.
//!
//! Actors never fail loudly. A handshake that cannot make progress ends in
//! [`Terminal::Stalled`], which is how attacks become visible.

use crate::{
    algebra::{Element, Scalar, SharedGroup},
    credentials::CredentialStore,
    logging,
    material::{Key, SessionId},
    network::{ActorTag, Inbox, Message, Network},
    oracle::SharedOracle,
    recorder::{EventKind, Recorder},
    variant::{derive_session, ConfirmationFlow, KeyInput, SharedVariant, Transcript},
    Host, Role,
};
use std::{fmt, sync::Arc};

/// Where an actor is in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Start,
    LookupSecret,
    /// The actor's own share is on the wire.
    Exchanged,
    AwaitPeerShare,
    DerivedKey,
    SentConfirmation,
    AwaitPeerConfirmation,
    Confirmed,
    Stalled,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Why an actor stopped short of confirming a key.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum StallReason {
    #[error("No secret is configured for {initiator} and {responder}")]
    LookupFailure { initiator: Host, responder: Host },
    #[error("The network closed while waiting for a {awaiting} message")]
    ChannelClosed { awaiting: &'static str },
    #[error("The confirmation token claimed to come from {expected_from} did not verify")]
    ConfirmationMismatch { expected_from: Host },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Confirmed { session: SessionId, key: Key },
    Stalled { at: State, reason: StallReason },
}

/// How an actor's task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub tag: ActorTag,
    pub terminal: Terminal,
    /// Messages the actor ignored because they did not match what it was
    /// waiting for.
    pub shape_mismatches: usize,
}

impl Outcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.terminal, Terminal::Confirmed { .. })
    }

    pub fn key(&self) -> Option<&Key> {
        match &self.terminal {
            Terminal::Confirmed { key, .. } => Some(key),
            Terminal::Stalled { .. } => None,
        }
    }

    pub fn session(&self) -> Option<&SessionId> {
        match &self.terminal {
            Terminal::Confirmed { session, .. } => Some(session),
            Terminal::Stalled { .. } => None,
        }
    }

    pub fn stall_reason(&self) -> Option<&StallReason> {
        match &self.terminal {
            Terminal::Confirmed { .. } => None,
            Terminal::Stalled { reason, .. } => Some(reason),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.terminal {
            Terminal::Confirmed { session, key } => {
                write!(f, "{}: confirmed session {session} key {key}", self.tag)
            }
            Terminal::Stalled { at, reason } => write!(f, "{}: stalled at {at}: {reason}", self.tag),
        }
    }
}

/// Whatever a confirmed actor does with its key. Called exactly once.
pub trait KeyUse: Send + Sync + 'static {
    fn use_key(&self, tag: &ActorTag, key: &Key);
}

pub type SharedKeyUse = Arc<dyn KeyUse>;

/// Encrypts a fixed payload under an oracle-derived keystream.
pub struct DemoCipher {
    oracle: SharedOracle,
}

impl fmt::Debug for DemoCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DemoCipher({})", self.oracle.name())
    }
}

impl DemoCipher {
    pub const PAYLOAD: &'static [u8] = b"the quick brown fox jumps over the lazy dog";

    pub fn new(oracle: SharedOracle) -> Self {
        Self { oracle }
    }

    pub fn encrypt(&self, key: &Key) -> Vec<u8> {
        let stream = self.oracle.kdf("demo-keystream", &[key.as_bytes()]);
        Self::PAYLOAD
            .iter()
            .zip(stream.as_bytes().iter().cycle())
            .map(|(p, k)| p ^ k)
            .collect()
    }
}

impl KeyUse for DemoCipher {
    fn use_key(&self, tag: &ActorTag, key: &Key) {
        logging::key_used(tag, self.encrypt(key).len());
    }
}

/// Everything an actor shares with the rest of the run.
#[derive(Clone)]
pub(crate) struct Context {
    pub variant: SharedVariant,
    pub group: SharedGroup,
    pub oracle: SharedOracle,
    pub credentials: Arc<CredentialStore>,
    pub network: Arc<Network>,
    pub recorder: Arc<Recorder>,
    pub key_use: SharedKeyUse,
}

/// One role of one handshake.
pub(crate) struct SessionActor {
    tag: ActorTag,
    context: Context,
    inbox: Inbox,
    state: State,
    shape_mismatches: usize,
}

/// What a role holds after the share exchange.
struct Exchange {
    base: Element,
    own_public: Element,
    peer_public: Element,
    session: SessionId,
    key: Key,
    shared: Element,
}

impl SessionActor {
    pub(crate) fn new(tag: ActorTag, context: Context, inbox: Inbox) -> Self {
        Self {
            tag,
            context,
            inbox,
            state: State::Start,
            shape_mismatches: 0,
        }
    }

    pub(crate) fn tag(&self) -> &ActorTag {
        &self.tag
    }

    /// Drives the handshake to a terminal state.
    pub(crate) async fn run(mut self) -> Outcome {
        logging::actor_spawned(&self.tag);
        let terminal = match self.execute().await {
            Ok((session, key)) => Terminal::Confirmed { session, key },
            Err(reason) => {
                let at = self.state;
                logging::stalled(&self.tag, at, &reason);
                self.enter(State::Stalled);
                Terminal::Stalled { at, reason }
            }
        };
        self.inbox.retire(&self.context.network.activity);
        Outcome {
            tag: self.tag,
            terminal,
            shape_mismatches: self.shape_mismatches,
        }
    }

    fn enter(&mut self, state: State) {
        self.state = state;
        logging::transition(&self.tag, state);
    }

    async fn execute(&mut self) -> Result<(SessionId, Key), StallReason> {
        let exchange = self.exchange().await?;
        self.confirm(&exchange).await?;

        self.enter(State::Confirmed);
        let ctx = &self.context;
        let end = ctx.recorder.append(
            EventKind::End,
            &self.tag,
            exchange.session.clone(),
            exchange.peer_public.clone(),
            Some(exchange.key.clone()),
        );
        ctx.recorder
            .insert_row(&self.tag, exchange.session.clone(), exchange.key.clone());
        logging::confirmed(&self.tag, &end);
        ctx.key_use.use_key(&self.tag, &exchange.key);
        Ok((exchange.session, exchange.key))
    }

    /// Looks up the secret, swaps shares and derives the key.
    async fn exchange(&mut self) -> Result<Exchange, StallReason> {
        self.enter(State::LookupSecret);
        let (initiator, responder) = (self.tag.initiator(), self.tag.responder());
        let secret = self
            .context
            .credentials
            .get(initiator, responder)
            .ok_or_else(|| StallReason::LookupFailure {
                initiator: initiator.clone(),
                responder: responder.clone(),
            })?;

        let base = secret.element().clone();
        let exponent: Scalar = self.context.group.fresh_scalar();
        let own_public = self.context.group.exponentiate(&base, &exponent);
        self.context.recorder.append(
            EventKind::Start,
            &self.tag,
            self.tag.seed.clone(),
            own_public.clone(),
            None,
        );
        self.context
            .network
            .send(&self.tag, Message::share(self.tag.host.clone(), own_public.clone()));
        self.enter(State::Exchanged);

        self.enter(State::AwaitPeerShare);
        let peer_public = loop {
            match self.receive("share").await? {
                Message::Share { sender, public } if sender == self.tag.peer => break public,
                other => self.ignore(&other),
            }
        };

        self.enter(State::DerivedKey);
        let shared = self.context.group.exponentiate(&peer_public, &exponent);
        drop(exponent);
        let input = KeyInput {
            self_host: &self.tag.host,
            self_public: &own_public,
            peer_host: &self.tag.peer,
            peer_public: &peer_public,
            session: &self.tag.seed,
            shared: &shared,
        };
        let oracle = &*self.context.oracle;
        let binding = self.context.variant.session_binding();
        let session = derive_session(binding, oracle, &self.tag.seed, &input);
        let key = self.context.variant.derive_key(
            oracle,
            &KeyInput {
                session: &session,
                ..input
            },
        );

        Ok(Exchange {
            base,
            own_public,
            peer_public,
            session,
            key,
            shared,
        })
    }

    /// Runs the variant's confirmation round, if it has one.
    async fn confirm(&mut self, exchange: &Exchange) -> Result<(), StallReason> {
        let variant = self.context.variant.clone();
        let Some(confirmation) = variant.confirmation() else {
            return Ok(());
        };
        let role = self.tag.role;
        let (initiator_public, responder_public) = match role {
            Role::Initiator => (&exchange.own_public, &exchange.peer_public),
            Role::Responder => (&exchange.peer_public, &exchange.own_public),
        };
        let transcript = Transcript {
            initiator: self.tag.initiator(),
            responder: self.tag.responder(),
            initiator_public,
            responder_public,
            session: &exchange.session,
            key: &exchange.key,
            shared: &exchange.shared,
            base: &exchange.base,
        };
        let oracle = &*self.context.oracle;
        let own = confirmation.token(oracle, role, &transcript);
        let expected = confirmation.token(oracle, role.peer(), &transcript);

        let (sends, awaits, sends_first) = match (confirmation.flow(), role) {
            (ConfirmationFlow::Simultaneous, _) => (true, true, true),
            (ConfirmationFlow::InitiatorFirst, Role::Initiator) => (true, true, true),
            (ConfirmationFlow::InitiatorFirst, Role::Responder) => (true, true, false),
            (ConfirmationFlow::InitiatorOnly, Role::Initiator) => (true, false, true),
            (ConfirmationFlow::InitiatorOnly, Role::Responder) => (false, true, false),
        };

        let own = Message::confirm(self.tag.host.clone(), own);
        if sends && sends_first {
            self.context.network.send(&self.tag, own.clone());
            self.enter(State::SentConfirmation);
        }
        if awaits {
            self.enter(State::AwaitPeerConfirmation);
            let token = loop {
                match self.receive("confirm").await? {
                    Message::Confirm { sender, token } if sender == self.tag.peer => break token,
                    other => self.ignore(&other),
                }
            };
            if token != expected {
                return Err(StallReason::ConfirmationMismatch {
                    expected_from: self.tag.peer.clone(),
                });
            }
        }
        if sends && !sends_first {
            self.context.network.send(&self.tag, own);
            self.enter(State::SentConfirmation);
        }
        Ok(())
    }

    async fn receive(&mut self, awaiting: &'static str) -> Result<Message, StallReason> {
        self.inbox
            .recv(&self.context.network.activity)
            .await
            .ok_or(StallReason::ChannelClosed { awaiting })
    }

    fn ignore(&mut self, message: &Message) {
        self.shape_mismatches += 1;
        logging::shape_mismatch(&self.tag, self.state, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        algebra::SymbolicGroup,
        credentials::Secret,
        network::Envelope,
        oracle::SymbolicOracle,
        variant::{GeneratorReading, Variants},
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<(u64, Key)>>);

    impl KeyUse for Recording {
        fn use_key(&self, tag: &ActorTag, key: &Key) {
            self.0.lock().unwrap().push((tag.id, key.clone()));
        }
    }

    struct Harness {
        context: Context,
        used: Arc<Recording>,
    }

    fn harness(variant: &str, pairs: &[(&str, &str)]) -> Harness {
        let group: SharedGroup = Arc::new(SymbolicGroup::new());
        let oracle: SharedOracle = Arc::new(SymbolicOracle::new());
        let credentials = CredentialStore::new();
        for (a, b) in pairs {
            credentials.put(&Host::new(a), &Host::new(b), Secret::from_password(&*group, b"pw"));
        }
        let used = Arc::new(Recording::default());
        let (network, _) = Network::new(false);
        let context = Context {
            variant: Variants::by_name(variant, GeneratorReading::default()).unwrap(),
            group,
            oracle,
            credentials: Arc::new(credentials),
            network: Arc::new(network),
            recorder: Arc::new(Recorder::new()),
            key_use: used.clone(),
        };
        Harness { context, used }
    }

    fn actor(h: &Harness, id: u64, role: Role, host: &str, peer: &str, seed: &SessionId) -> SessionActor {
        let tag = ActorTag {
            id,
            role,
            host: Host::new(host),
            peer: Host::new(peer),
            seed: seed.clone(),
        };
        let inbox = h.context.network.attach(tag.clone());
        SessionActor::new(tag, h.context.clone(), inbox)
    }

    #[tokio::test]
    async fn honest_pair_confirms_the_same_key_for_every_variant() {
        for name in Variants::NAMES {
            let h = harness(name, &[("A", "B")]);
            let seed = SessionId::fresh();
            let initiator = actor(&h, 0, Role::Initiator, "A", "B", &seed);
            let responder = actor(&h, 1, Role::Responder, "B", "A", &seed);
            h.context.network.pair(0, 1);

            let (i, r) = tokio::join!(initiator.run(), responder.run());
            assert!(i.is_confirmed(), "{name}: {i}");
            assert!(r.is_confirmed(), "{name}: {r}");
            assert_eq!(i.key(), r.key(), "{name}");
            assert_eq!(i.session(), r.session(), "{name}");
            assert_eq!(h.used.0.lock().unwrap().len(), 2, "{name}");
        }
    }

    #[tokio::test]
    async fn missing_secret_stalls_without_sending() {
        let h = harness("jablon", &[("A", "B")]);
        let seed = SessionId::fresh();
        let outcome = actor(&h, 0, Role::Initiator, "A", "C", &seed).run().await;
        assert_eq!(
            outcome.terminal,
            Terminal::Stalled {
                at: State::LookupSecret,
                reason: StallReason::LookupFailure {
                    initiator: Host::new("A"),
                    responder: Host::new("C"),
                },
            }
        );
        assert!(h.context.network.observed().is_empty());
        assert!(h.context.recorder.events().is_empty());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn mistagged_shares_are_ignored() {
        let h = harness("jablon-nokc", &[("A", "B")]);
        let seed = SessionId::fresh();
        let responder = actor(&h, 1, Role::Responder, "B", "A", &seed);
        let group = h.context.group.clone();
        let stray = group.exponentiate(&group.base_from_secret(b"pw"), &group.fresh_scalar());
        h.context.network.deliver(1, Message::share(Host::new("C"), stray.clone())).unwrap();
        h.context.network.deliver(1, Message::share(Host::new("A"), stray)).unwrap();

        let outcome = responder.run().await;
        assert!(outcome.is_confirmed());
        assert_eq!(outcome.shape_mismatches, 1);
    }

    #[tokio::test]
    async fn closing_the_network_stalls_a_waiting_actor() {
        let h = harness("iso-2017", &[("A", "B")]);
        let seed = SessionId::fresh();
        let responder = actor(&h, 1, Role::Responder, "B", "A", &seed);
        let task = tokio::spawn(responder.run());
        h.context.network.activity.quiesce().await;
        h.context.network.close();
        let outcome = task.await.unwrap();
        assert_eq!(
            outcome.terminal,
            Terminal::Stalled {
                at: State::AwaitPeerShare,
                reason: StallReason::ChannelClosed { awaiting: "share" },
            }
        );
        assert!(h.used.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn starts_are_recorded_before_the_peer_answers() {
        for name in Variants::NAMES {
            let h = harness(name, &[("A", "B")]);
            let seed = SessionId::fresh();
            let responder = actor(&h, 1, Role::Responder, "B", "A", &seed);
            let task = tokio::spawn(responder.run());
            h.context.network.activity.quiesce().await;

            let events = h.context.recorder.events();
            let sent = h.context.network.observed();
            let [start] = events.as_slice() else {
                panic!("{name}: expected one start, got {events:?}");
            };
            let [Envelope { message: Message::Share { public, .. }, .. }] = sent.as_slice() else {
                panic!("{name}: expected one share, got {sent:?}");
            };
            assert_eq!(start.kind, EventKind::Start, "{name}");
            assert_eq!(&start.share, public, "{name}");
            assert_eq!(start.session, seed, "{name}");
            assert_eq!(start.key, None, "{name}");

            h.context.network.close();
            task.await.unwrap();
        }
    }

    #[test]
    fn demo_cipher_depends_on_the_key() {
        let oracle: SharedOracle = Arc::new(SymbolicOracle::new());
        let cipher = DemoCipher::new(oracle.clone());
        let k1 = Key(oracle.kdf("k", &[b"1"]));
        let k2 = Key(oracle.kdf("k", &[b"2"]));
        assert_eq!(cipher.encrypt(&k1).len(), DemoCipher::PAYLOAD.len());
        assert_ne!(cipher.encrypt(&k1), cipher.encrypt(&k2));
        assert_eq!(cipher.encrypt(&k1), cipher.encrypt(&k1));
        assert_eq!(format!("{cipher:?}"), "DemoCipher(symbolic)");
    }
}
