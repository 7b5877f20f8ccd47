use super::{ScenarioError, Settings};
use speke_core::{
    material::SessionId,
    network::{ActorId, Envelope, NetworkError},
    Adversary, AttackError, AttackerMode, Orchestrator, RunReport, SessionHandle,
};

pub struct Replay {
    pub report: RunReport,
    /// The handshake whose messages were recorded.
    pub original: SessionHandle,
    /// A later responder on B, under a fresh seed, that was fed the
    /// recording.
    pub replayed: ActorId,
}

/// Relays one handshake between A and B honestly and lets it finish. Then
/// spawns a new responder on B under a fresh seed and plays it every message
/// the original initiator sent, verbatim and in order.
///
/// Protocols whose responder completes without proof that the initiator is
/// live end up with two responder completions for one initiator start.
pub async fn replay(settings: &Settings) -> Result<Replay, ScenarioError> {
    let config = settings
        .config()
        .attacker(AttackerMode::Active)
        .hosts(["A", "B"])
        .credential("A", "B", "hunter2");
    let mut run = Orchestrator::new(config)?;
    let original = run.spawn_session("A", "B");
    let mut adversary = run.adversary().ok_or(AttackError::Taken)?;
    until_quiet(&run, &mut adversary, |adversary, envelope| adversary.forward(envelope)).await?;

    let replayed = run.spawn_responder("B", "A", SessionId::fresh());
    let recording: Vec<Envelope> = adversary
        .observed()
        .into_iter()
        .filter(|envelope| envelope.from.id == original.initiator)
        .collect();
    for envelope in &recording {
        adversary.replay(envelope, replayed)?;
    }
    until_quiet(&run, &mut adversary, |adversary, envelope| {
        adversary.discard(&envelope);
        Ok(())
    })
    .await?;

    drop(adversary);
    Ok(Replay {
        report: run.finish().await,
        original,
        replayed,
    })
}

/// Hands every intercepted message to `act` until the run goes quiet.
async fn until_quiet(
    run: &Orchestrator,
    adversary: &mut Adversary,
    act: impl Fn(&Adversary, Envelope) -> Result<(), NetworkError>,
) -> Result<(), NetworkError> {
    loop {
        tokio::select! {
            biased;
            _ = run.settle() => return Ok(()),
            envelope = adversary.intercept() => match envelope {
                Some(envelope) => act(adversary, envelope)?,
                None => return Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speke_core::{Property, StallReason, Witness};

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn replay_breaks_injectivity_but_not_agreement() {
        let Replay {
            report,
            original,
            replayed,
        } = replay(&Settings::new("jablon-nokc")).await.unwrap();
        assert!(report.outcome(original.responder).unwrap().is_confirmed());
        let replayed_outcome = report.outcome(replayed).unwrap();
        assert!(replayed_outcome.is_confirmed());
        assert_ne!(replayed_outcome.session(), Some(&original.seed));
        assert!(report.verdict(Property::Agreement).unwrap().passed(), "{report}");

        let injective = report.verdict(Property::InjectiveAgreement).unwrap();
        match injective.witness() {
            Some(Witness::Reused {
                start,
                first_end,
                second_end,
            }) => {
                assert_eq!(start.actor, original.initiator);
                assert_eq!(first_end.actor, original.responder);
                assert_eq!(second_end.actor, replayed);
            }
            other => panic!("expected a reused start, got {other:?}\n{report}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn key_confirmation_stops_the_replayed_responder() {
        let Replay {
            report,
            original,
            replayed,
        } = replay(&Settings::new("jablon")).await.unwrap();
        assert!(report.outcome(original.initiator).unwrap().is_confirmed());
        assert!(report.outcome(original.responder).unwrap().is_confirmed());
        assert!(matches!(
            report.outcome(replayed).unwrap().stall_reason(),
            Some(StallReason::ConfirmationMismatch { .. })
        ));
        assert!(report.all_passed(), "{report}");
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn derived_sessions_without_confirmation_are_replayable() {
        let Replay { report, replayed, .. } = replay(&Settings::new("iso-2017-nokc")).await.unwrap();
        assert!(report.outcome(replayed).unwrap().is_confirmed());
        assert!(report.verdict(Property::Agreement).unwrap().passed(), "{report}");
        assert!(matches!(
            report.verdict(Property::InjectiveAgreement).unwrap().witness(),
            Some(Witness::Reused { .. })
        ));
    }
}
