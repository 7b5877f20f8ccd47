use super::{ScenarioError, Settings};
use speke_core::{
    material::SessionId, network::ActorId, AttackerMode, Orchestrator, Rewire, RunReport,
};

pub struct UnknownKeyShare {
    pub report: RunReport,
    /// A, talking to B.
    pub initiator: ActorId,
    /// C, answering A.
    pub responder: ActorId,
}

/// A holds the same password with B and with C. A starts a handshake with
/// B; the attacker hands A's messages to C instead and passes C's replies
/// back to A under B's name.
pub async fn unknown_key_share(settings: &Settings) -> Result<UnknownKeyShare, ScenarioError> {
    let config = settings
        .config()
        .attacker(AttackerMode::Active)
        .hosts(["A", "B", "C"])
        .credential("A", "B", "letmein")
        .credential("A", "C", "letmein")
        .allow_shared_secret(true);
    let mut run = Orchestrator::new(config)?;
    let seed = SessionId::fresh();
    let initiator = run.spawn_initiator("A", "B", seed.clone());
    let responder = run.spawn_responder("C", "A", seed);
    run.attack(Rewire::misdirect(initiator, responder))?;
    Ok(UnknownKeyShare {
        report: run.finish().await,
        initiator,
        responder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use speke_core::{Host, Property, Witness};

    async fn uks_holds(variant: &str) -> bool {
        let scenario = unknown_key_share(&Settings::new(variant)).await.unwrap();
        scenario
            .report
            .verdict(Property::UnknownKeyShare)
            .unwrap()
            .passed()
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn identity_free_keys_are_shared_with_the_wrong_party() {
        for variant in ["jablon", "iso-2006", "b-speke"] {
            assert!(!uks_holds(variant).await, "{variant}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn identity_binding_variants_resist() {
        for variant in ["iso-2017", "hao-shahandashti", "tang-mitchell"] {
            assert!(uks_holds(variant).await, "{variant}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn the_witness_names_both_parties() {
        let scenario = unknown_key_share(&Settings::new("jablon")).await.unwrap();
        let report = &scenario.report;
        assert!(report.outcome(scenario.initiator).unwrap().is_confirmed());
        assert!(report.outcome(scenario.responder).unwrap().is_confirmed());

        let verdict = report.verdict(Property::UnknownKeyShare).unwrap();
        let Some(Witness::SharedKey { earlier, later }) = verdict.witness() else {
            panic!("expected a shared key witness: {report}");
        };
        assert_eq!(earlier.key, later.key);
        let mut responders = [earlier.responder.clone(), later.responder.clone()];
        responders.sort();
        assert_eq!(responders, [Host::new("B"), Host::new("C")]);
    }
}
