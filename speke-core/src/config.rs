//! Run configuration and its validation.

use crate::{
    logging,
    variant::{GeneratorReading, SharedVariant, Variants},
    Host,
};
use std::{fmt, str::FromStr};

/// How much power the network attacker has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttackerMode {
    /// The attacker only observes traffic; messages reach their intended
    /// partner. After the run, the long-term secrets may be disclosed.
    #[default]
    Passive,
    /// Every message goes to the attacker, who decides what gets delivered.
    Active,
}

impl FromStr for AttackerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passive" => Ok(Self::Passive),
            "active" => Ok(Self::Active),
            other => Err(ConfigError::UnknownAttacker(other.to_string())),
        }
    }
}

impl fmt::Display for AttackerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackerMode::Passive => f.write_str("passive"),
            AttackerMode::Active => f.write_str("active"),
        }
    }
}

/// Everything needed to set up a run before any session is spawned.
#[derive(Debug, Clone)]
pub struct RunConfig {
    variant: String,
    attacker: AttackerMode,
    hosts: Vec<Host>,
    credentials: Vec<(Host, Host, Vec<u8>)>,
    allow_shared_secret: bool,
    generator_reading: GeneratorReading,
}

impl RunConfig {
    /// Starts a configuration for the named variant with a passive attacker
    /// and no hosts.
    pub fn new(variant: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
            attacker: AttackerMode::default(),
            hosts: Vec::new(),
            credentials: Vec::new(),
            allow_shared_secret: false,
            generator_reading: GeneratorReading::default(),
        }
    }

    pub fn attacker(mut self, attacker: AttackerMode) -> Self {
        self.attacker = attacker;
        self
    }

    /// Adds honest hosts to the universe.
    pub fn hosts<H: Into<Host>>(mut self, hosts: impl IntoIterator<Item = H>) -> Self {
        self.hosts.extend(hosts.into_iter().map(Into::into));
        self
    }

    /// Configures a password shared by `a` and `b`.
    pub fn credential(mut self, a: impl Into<Host>, b: impl Into<Host>, password: impl AsRef<[u8]>) -> Self {
        self.credentials
            .push((a.into(), b.into(), password.as_ref().to_vec()));
        self
    }

    /// Permits a host to hold the same password with several partners.
    pub fn allow_shared_secret(mut self, allow: bool) -> Self {
        self.allow_shared_secret = allow;
        self
    }

    pub fn generator_reading(mut self, reading: GeneratorReading) -> Self {
        self.generator_reading = reading;
        self
    }

    pub fn variant_name(&self) -> &str {
        &self.variant
    }

    pub fn attacker_mode(&self) -> AttackerMode {
        self.attacker
    }

    pub fn host_universe(&self) -> &[Host] {
        &self.hosts
    }

    pub(crate) fn credentials(&self) -> &[(Host, Host, Vec<u8>)] {
        &self.credentials
    }

    /// Resolves the variant and checks the host universe. Shared-secret
    /// hazards are checked by the orchestrator once the store is filled.
    pub fn validate(&self) -> Result<SharedVariant, ConfigError> {
        let variant = Variants::by_name(&self.variant, self.generator_reading)?;
        match self.hosts.len() {
            0 => return Err(ConfigError::EmptyHostUniverse),
            1 => return Err(ConfigError::SingleHost(self.hosts[0].clone())),
            _ => {}
        }
        for (a, b, _) in &self.credentials {
            for host in [a, b] {
                if !self.hosts.contains(host) {
                    return Err(ConfigError::UnknownHost(host.clone()));
                }
            }
        }
        logging::run_configured(self);
        Ok(variant)
    }

    pub(crate) fn check_hazards(&self, hazards: &[(Host, Vec<Host>)]) -> Result<(), ConfigError> {
        for (host, partners) in hazards {
            if self.allow_shared_secret {
                logging::shared_secret_hazard(host, partners);
            } else {
                return Err(ConfigError::SharedSecret {
                    host: host.clone(),
                    partners: partners.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A malformed configuration. These abort a run before anything is spawned.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown protocol variant: {0}")]
    UnknownVariant(String),
    #[error("Unknown attacker mode: {0} (expected passive or active)")]
    UnknownAttacker(String),
    #[error("Unknown generator reading: {0} (expected generator or repeated-public)")]
    UnknownReading(String),
    #[error("The host universe is empty")]
    EmptyHostUniverse,
    #[error("At least two honest hosts are needed, only {0} was given")]
    SingleHost(Host),
    #[error("Credential names a host outside the universe: {0}")]
    UnknownHost(Host),
    #[error("{host} holds one secret with several partners {partners:?} but shared secrets are not allowed")]
    SharedSecret { host: Host, partners: Vec<Host> },
}
