//! Prebuilt runs that reproduce the classic attacks on SPEKE and its
//! descendants. Each one works with any variant; the tests pin down which
//! variants each attack succeeds against.

use speke_core::{
    network::NetworkError, variant::GeneratorReading, AttackError, AttackerMode, ConfigError,
    RunConfig, RunReport,
};

mod honest;
pub use honest::honest;

mod replay;
pub use replay::{replay, Replay};

mod unknown_key_share;
pub use unknown_key_share::{unknown_key_share, UnknownKeyShare};

mod session_swap;
pub use session_swap::{session_swap, SessionSwap};

mod reflection;
pub use reflection::{reflection, Reflection};

/// Every scenario name the command line accepts.
pub const NAMES: [&str; 5] = [
    "honest",
    "replay",
    "unknown-key-share",
    "session-swap",
    "reflection",
];

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Attack(#[from] AttackError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}

/// Knobs shared by all scenarios.
#[derive(Debug, Clone)]
pub struct Settings {
    pub variant: String,
    pub reading: GeneratorReading,
    /// Only the honest scenario can run under a passive attacker; the
    /// attacks always take control of the network.
    pub attacker: AttackerMode,
    pub sessions: usize,
}

impl Settings {
    pub fn new(variant: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
            reading: GeneratorReading::default(),
            attacker: AttackerMode::Passive,
            sessions: 1,
        }
    }

    pub fn attacker(mut self, attacker: AttackerMode) -> Self {
        self.attacker = attacker;
        self
    }

    pub fn sessions(mut self, sessions: usize) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn reading(mut self, reading: GeneratorReading) -> Self {
        self.reading = reading;
        self
    }

    fn config(&self) -> RunConfig {
        RunConfig::new(&self.variant).generator_reading(self.reading)
    }
}

/// Runs a scenario by name and returns its report.
pub async fn run_named(name: &str, settings: &Settings) -> Result<RunReport, ScenarioError> {
    let report = match name {
        "honest" => honest(settings).await?,
        "replay" => replay(settings).await?.report,
        "unknown-key-share" => unknown_key_share(settings).await?.report,
        "session-swap" => session_swap(settings).await?.report,
        "reflection" => reflection(settings).await?.report,
        other => return Err(ScenarioError::UnknownScenario(other.to_string())),
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn names_resolve() {
        for name in NAMES {
            assert!(run_named(name, &Settings::new("iso-2017")).await.is_ok(), "{name}");
        }
        assert!(matches!(
            run_named("smash", &Settings::new("iso-2017")).await,
            Err(ScenarioError::UnknownScenario(_))
        ));
        assert!(matches!(
            run_named("honest", &Settings::new("speke-3")).await,
            Err(ScenarioError::Config(ConfigError::UnknownVariant(_)))
        ));
    }

    #[tokio::test]
    async fn settings_reach_the_run() -> anyhow::Result<()> {
        let settings = Settings::new("iso-2006")
            .reading(GeneratorReading::RepeatedPublic)
            .sessions(2);
        let report = run_named("honest", &settings).await?;
        assert_eq!(report.variant(), "iso-2006");
        assert_eq!(report.outcomes().len(), 4);
        assert!(report.all_passed(), "{report}");
        Ok(())
    }
}
