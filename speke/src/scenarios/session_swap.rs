use super::{ScenarioError, Settings};
use speke_core::{AttackerMode, Orchestrator, Rewire, RunReport, SessionHandle};

pub struct SessionSwap {
    pub report: RunReport,
    pub first: SessionHandle,
    pub second: SessionHandle,
}

/// Two concurrent sessions between A and B. The attacker connects the
/// first initiator to the second responder and the other way round.
pub async fn session_swap(settings: &Settings) -> Result<SessionSwap, ScenarioError> {
    let config = settings
        .config()
        .attacker(AttackerMode::Active)
        .hosts(["A", "B"])
        .credential("A", "B", "swordfish");
    let mut run = Orchestrator::new(config)?;
    let first = run.spawn_session("A", "B");
    let second = run.spawn_session("A", "B");
    run.attack(Rewire::swap(
        (first.initiator, first.responder),
        (second.initiator, second.responder),
    ))?;
    Ok(SessionSwap {
        report: run.finish().await,
        first,
        second,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use speke_core::Property;

    async fn verdicts(variant: &str) -> (bool, bool) {
        let scenario = session_swap(&Settings::new(variant)).await.unwrap();
        let report = &scenario.report;
        (
            report.verdict(Property::SessionSwap).unwrap().passed(),
            report.verdict(Property::KeyEquality).unwrap().passed(),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn unbound_sessions_collapse_onto_one_key() {
        for variant in ["jablon", "iso-2006"] {
            assert_eq!(verdicts(variant).await, (false, false), "{variant}");
        }
        assert!(!verdicts("hao-shahandashti").await.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn session_binding_variants_resist() {
        for variant in ["iso-2017", "tang-mitchell", "b-speke"] {
            assert!(verdicts(variant).await.0, "{variant}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10000)]
    async fn crossed_actors_complete_with_foreign_sessions() {
        let scenario = session_swap(&Settings::new("jablon")).await.unwrap();
        let report = &scenario.report;
        let i1 = report.outcome(scenario.first.initiator).unwrap();
        let r2 = report.outcome(scenario.second.responder).unwrap();
        assert_eq!(i1.key(), r2.key());
        assert_ne!(i1.session(), r2.session());
    }
}
