use super::{ScenarioError, Settings};
use speke_core::{AttackerMode, Orchestrator, Rewire, RunReport};

/// Runs `settings.sessions` handshakes between A and B.
///
/// Under a passive attacker the network delivers everything; under an
/// active one the adversary relays every message unchanged.
pub async fn honest(settings: &Settings) -> Result<RunReport, ScenarioError> {
    let config = settings
        .config()
        .attacker(settings.attacker)
        .hosts(["A", "B"])
        .credential("A", "B", "correct horse battery staple");
    let mut run = Orchestrator::new(config)?;
    for _ in 0..settings.sessions {
        run.spawn_session("A", "B");
    }
    if settings.attacker == AttackerMode::Active {
        run.attack(Rewire::forward())?;
    }
    Ok(run.finish().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use speke_core::{variant::GeneratorReading, Host, Property, Role, Variants};

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn every_variant_agrees_when_left_alone() {
        for name in Variants::NAMES {
            let report = honest(&Settings::new(name).sessions(4)).await.unwrap();
            assert!(report.outcomes().iter().all(|o| o.is_confirmed()), "{report}");
            for property in [Property::UnknownKeyShare, Property::SessionSwap, Property::KeyEquality] {
                assert!(report.verdict(property).unwrap().passed(), "{report}");
            }
            assert!(report.all_passed(), "{name}: {report}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn both_roles_hold_the_same_key_and_session() {
        let report = honest(&Settings::new("jablon")).await.unwrap();
        let [initiator, responder] = report.outcomes() else {
            panic!("expected two outcomes: {report}");
        };
        assert_eq!(initiator.key(), responder.key());
        assert_eq!(initiator.session(), responder.session());
        assert_eq!(report.rows(Role::Initiator).len(), 1);
        assert_eq!(report.rows(Role::Responder).len(), 1);
        assert!(report.disclose(&Host::new("B"), &Host::new("A")).is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn forwarding_attacker_changes_nothing() {
        let settings = Settings::new("iso-2006")
            .attacker(speke_core::AttackerMode::Active)
            .reading(GeneratorReading::RepeatedPublic)
            .sessions(3);
        let report = honest(&settings).await.unwrap();
        assert!(report.outcomes().iter().all(|o| o.is_confirmed()));
        assert!(report.all_passed(), "{report}");
    }
}
