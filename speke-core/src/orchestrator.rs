//! Sets up a run and spawns session actors into it.

use crate::{
    adversary::{Adversary, Eavesdropper, Strategy},
    algebra::{SharedGroup, SymbolicGroup},
    checker::{self, Verdict},
    config::{AttackerMode, ConfigError, RunConfig},
    credentials::{CredentialStore, Secret},
    material::SessionId,
    network::{ActorId, ActorTag, Network},
    oracle::{SharedOracle, SymbolicOracle},
    recorder::{DetectionRow, Event, Recorder},
    session::{Context, DemoCipher, Outcome, SessionActor, SharedKeyUse},
    Host, Role,
};
use std::{fmt, sync::Arc};
use tokio::task::JoinSet;

/// The actors spawned for one honest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub seed: SessionId,
    pub initiator: ActorId,
    pub responder: ActorId,
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum AttackError {
    #[error("The attacker is passive and cannot touch traffic")]
    Passive,
    #[error("The adversary handle has already been taken")]
    Taken,
}

/// Owns every piece of a run: the store, the network, the recorder and the
/// actor tasks.
///
/// Any number of actors may be spawned at any time while the run is live.
/// [`finish`](Self::finish) waits for the run to go quiet, closes the
/// network and collects the outcome of every actor.
///
/// # Examples
///
/// ```
/// use speke_core::{Orchestrator, RunConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RunConfig::new("iso-2017")
///     .hosts(["A", "B"])
///     .credential("A", "B", "correct horse");
/// let mut run = Orchestrator::new(config)?;
/// run.spawn_session("A", "B");
/// let report = run.finish().await;
/// assert!(report.all_passed());
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    config: RunConfig,
    context: Context,
    adversary: Option<Adversary>,
    actors: JoinSet<Outcome>,
    attackers: JoinSet<()>,
    next_id: ActorId,
}

impl Orchestrator {
    /// Builds a run over the symbolic algebra and oracles.
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        Self::with_backends(config, Arc::new(SymbolicGroup::new()), Arc::new(SymbolicOracle::new()))
    }

    /// Builds a run over the given algebra and oracles. Fails before
    /// anything is spawned if the configuration is malformed.
    pub fn with_backends(
        config: RunConfig,
        group: SharedGroup,
        oracle: SharedOracle,
    ) -> Result<Self, ConfigError> {
        let variant = config.validate()?;
        let credentials = CredentialStore::new();
        for (a, b, password) in config.credentials() {
            credentials.put(a, b, Secret::from_password(&*group, password));
        }
        config.check_hazards(&credentials.shared_secret_hazards())?;

        let active = config.attacker_mode() == AttackerMode::Active;
        let (network, intercepts) = Network::new(active);
        let network = Arc::new(network);
        let adversary = active.then(|| {
            Adversary::new(network.clone(), intercepts, group.clone(), oracle.clone())
        });
        let key_use: SharedKeyUse = Arc::new(DemoCipher::new(oracle.clone()));

        Ok(Self {
            config,
            context: Context {
                variant,
                group,
                oracle,
                credentials: Arc::new(credentials),
                network,
                recorder: Arc::new(Recorder::new()),
                key_use,
            },
            adversary,
            actors: JoinSet::new(),
            attackers: JoinSet::new(),
            next_id: 0,
        })
    }

    /// Replaces what confirmed actors do with their keys.
    pub fn with_key_use(mut self, key_use: SharedKeyUse) -> Self {
        self.context.key_use = key_use;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Spawns an initiator and a responder for one run under a fresh seed
    /// and pairs them, so an honest network connects them to each other.
    ///
    /// Both actors are attached and paired before either task starts, so the
    /// first share always finds its partner.
    pub fn spawn_session(&mut self, initiator: impl Into<Host>, responder: impl Into<Host>) -> SessionHandle {
        let (initiator, responder) = (initiator.into(), responder.into());
        let seed = SessionId::fresh();
        let i = self.register(Role::Initiator, initiator.clone(), responder.clone(), seed.clone());
        let r = self.register(Role::Responder, responder, initiator, seed.clone());
        self.context.network.pair(i.tag().id, r.tag().id);
        let handle = SessionHandle {
            seed,
            initiator: i.tag().id,
            responder: r.tag().id,
        };
        self.launch(i);
        self.launch(r);
        handle
    }

    /// Spawns a lone initiator on `host` that wants to talk to `peer`.
    pub fn spawn_initiator(&mut self, host: impl Into<Host>, peer: impl Into<Host>, seed: SessionId) -> ActorId {
        self.spawn(Role::Initiator, host.into(), peer.into(), seed)
    }

    /// Spawns a lone responder on `host` that expects to hear from `peer`.
    pub fn spawn_responder(&mut self, host: impl Into<Host>, peer: impl Into<Host>, seed: SessionId) -> ActorId {
        self.spawn(Role::Responder, host.into(), peer.into(), seed)
    }

    fn spawn(&mut self, role: Role, host: Host, peer: Host, seed: SessionId) -> ActorId {
        let actor = self.register(role, host, peer, seed);
        let id = actor.tag().id;
        self.launch(actor);
        id
    }

    /// Attaches a new actor to the network without starting it.
    fn register(&mut self, role: Role, host: Host, peer: Host, seed: SessionId) -> SessionActor {
        let id = self.next_id;
        self.next_id += 1;
        let tag = ActorTag {
            id,
            role,
            host,
            peer,
            seed,
        };
        let inbox = self.context.network.attach(tag.clone());
        SessionActor::new(tag, self.context.clone(), inbox)
    }

    fn launch(&mut self, actor: SessionActor) {
        self.actors.spawn(actor.run());
    }

    /// Takes the active adversary. `None` under a passive attacker or if it
    /// was already taken.
    ///
    /// Every message the adversary has intercepted and not yet let go of
    /// counts as activity, so [`settle`](Self::settle) and
    /// [`finish`](Self::finish) wait on it. Drop the adversary, or hand it
    /// to a [`Strategy`], before finishing the run.
    pub fn adversary(&mut self) -> Option<Adversary> {
        self.adversary.take()
    }

    pub fn eavesdropper(&self) -> Eavesdropper {
        Eavesdropper::new(self.context.network.clone())
    }

    /// Hands the adversary to a strategy running as its own task.
    pub fn attack(&mut self, strategy: impl Strategy) -> Result<(), AttackError> {
        if self.config.attacker_mode() == AttackerMode::Passive {
            return Err(AttackError::Passive);
        }
        let adversary = self.adversary.take().ok_or(AttackError::Taken)?;
        tracing::info!(target: "NETWORK", strategy = strategy.name(), "attack started");
        self.attackers.spawn(Box::new(strategy).run(adversary));
        Ok(())
    }

    /// Waits until no actor can make progress and no message is in flight.
    ///
    /// Under an active attacker this only returns once the adversary has
    /// dealt with every intercepted message.
    pub async fn settle(&self) {
        self.context.network.activity.quiesce().await;
    }

    pub fn recorder(&self) -> &Recorder {
        &self.context.recorder
    }

    /// Checks every property against what has been recorded so far.
    pub fn verdicts(&self) -> Vec<Verdict> {
        checker::check_all(&self.context.recorder)
    }

    /// Settles the run, closes the network and collects every outcome.
    ///
    /// An adversary taken with [`adversary`](Self::adversary) and still held
    /// by the caller keeps the run from settling, and this never returns.
    pub async fn finish(mut self) -> RunReport {
        // An adversary nobody took would otherwise hold its queue forever.
        drop(self.adversary.take());
        self.settle().await;
        self.context.network.close();

        let mut outcomes = Vec::new();
        while let Some(joined) = self.actors.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
                Err(error) => tracing::error!(target: "SESSION", %error, "actor task cancelled"),
            }
        }
        while let Some(joined) = self.attackers.join_next().await {
            if let Err(error) = joined {
                if error.is_panic() {
                    std::panic::resume_unwind(error.into_panic());
                }
            }
        }
        outcomes.sort_by_key(|outcome| outcome.tag.id);

        let recorder = &self.context.recorder;
        RunReport {
            variant: self.config.variant_name().to_string(),
            attacker: self.config.attacker_mode(),
            outcomes,
            events: recorder.events(),
            initiator_rows: recorder.rows(Role::Initiator),
            responder_rows: recorder.rows(Role::Responder),
            verdicts: checker::check_all(recorder),
            credentials: self.context.credentials.clone(),
        }
    }
}

/// Everything a finished run produced.
pub struct RunReport {
    variant: String,
    attacker: AttackerMode,
    outcomes: Vec<Outcome>,
    events: Vec<Event>,
    initiator_rows: Vec<DetectionRow>,
    responder_rows: Vec<DetectionRow>,
    verdicts: Vec<Verdict>,
    credentials: Arc<CredentialStore>,
}

impl RunReport {
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Outcomes ordered by actor id.
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn outcome(&self, id: ActorId) -> Option<&Outcome> {
        self.outcomes.iter().find(|outcome| outcome.tag.id == id)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn rows(&self, role: Role) -> &[DetectionRow] {
        match role {
            Role::Initiator => &self.initiator_rows,
            Role::Responder => &self.responder_rows,
        }
    }

    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    pub fn verdict(&self, property: checker::Property) -> Option<&Verdict> {
        self.verdicts.iter().find(|verdict| verdict.property == property)
    }

    pub fn all_passed(&self) -> bool {
        self.verdicts.iter().all(Verdict::passed)
    }

    /// The long-term secret of a pair, revealed after a passive run to
    /// model a later compromise. Exponents are never part of a report.
    pub fn disclose(&self, a: &Host, b: &Host) -> Option<Secret> {
        match self.attacker {
            AttackerMode::Passive => self.credentials.get(a, b),
            AttackerMode::Active => None,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "variant {} under a {} attacker", self.variant, self.attacker)?;
        for outcome in &self.outcomes {
            writeln!(f, "  {outcome}")?;
        }
        for verdict in &self.verdicts {
            writeln!(f, "  {verdict}")?;
        }
        Ok(())
    }
}
