use super::{ScenarioError, Settings};
use speke_core::{
    material::SessionId, network::ActorId, AttackerMode, Orchestrator, Rewire, RunReport,
};

pub struct Reflection {
    pub report: RunReport,
    /// A, talking to B.
    pub initiator: ActorId,
    /// A second instance of A that believes B is calling it.
    pub responder: ActorId,
}

/// A starts a handshake with B. The attacker never contacts B: it
/// reflects A's own traffic into a responder running on A, so A ends up
/// negotiating with itself.
pub async fn reflection(settings: &Settings) -> Result<Reflection, ScenarioError> {
    let config = settings
        .config()
        .attacker(AttackerMode::Active)
        .hosts(["A", "B"])
        .credential("A", "B", "opensesame");
    let mut run = Orchestrator::new(config)?;
    let seed = SessionId::fresh();
    let initiator = run.spawn_initiator("A", "B", seed.clone());
    let responder = run.spawn_responder("A", "B", seed);
    run.attack(Rewire::reflect(initiator, responder))?;
    Ok(Reflection {
        report: run.finish().await,
        initiator,
        responder,
    })
}
