//! A symbolic execution engine for the SPEKE family of password-authenticated
//! key exchanges, and a checker for the security properties their designers
//! argue about.
//!
//! Any number of handshakes run concurrently as independent tasks, talking
//! over one shared network that an attacker may observe or control. As they
//! progress the actors record lifecycle events and detection rows; the
//! checker then decides agreement, injective agreement, unknown key-share
//! resilience, session-swap resilience and key equality over that record,
//! with a concrete counter-example whenever a property fails.
//!
//! # Organization
//! - [`GroupAlgebra`](algebra::GroupAlgebra) and [`Oracle`](oracle::Oracle)
//!   are the primitives everything computes with
//! - [`Variant`] holds what differs between protocol flavours, and
//!   [`Variants`] names them
//! - [`CredentialStore`] holds the pre-shared secrets
//! - [`Network`](network::Network), [`Adversary`] and [`Strategy`] model the
//!   public medium and the attacker on it
//! - [`Recorder`] and [`checker`] hold and judge what happened
//! - [`Orchestrator`] ties a run together
//!
//! # Failure model
//!
//! Sessions never return errors. A role that cannot continue stops in a
//! `Stalled` state, which is how most attacks show up. Only a malformed
//! [`RunConfig`] is fatal, and it is rejected before anything is spawned.

pub mod logging;

pub mod algebra;
pub mod oracle;

mod host;
pub use host::{Host, Role};

pub mod material;

pub mod credentials;
pub use credentials::CredentialStore;

pub mod config;
pub use config::{AttackerMode, ConfigError, RunConfig};

pub mod variant;
pub use variant::{Variant, Variants};

pub mod variants;

pub mod network;

pub mod adversary;
pub use adversary::{Adversary, Eavesdropper, Rewire, Route, Strategy};

pub mod session;
pub use session::{Outcome, StallReason, Terminal};

pub mod recorder;
pub use recorder::Recorder;

pub mod checker;
pub use checker::{Property, Verdict, Witness};

mod orchestrator;
pub use orchestrator::{AttackError, Orchestrator, RunReport, SessionHandle};
