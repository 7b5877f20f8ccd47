//! Per-flavour protocol logic and the registry that names it.
//!
//! A [`Variant`] fixes three things for one SPEKE flavour: how the session
//! key is derived, whether and how the roles confirm it, and how the session
//! identifier is bound. The session actor never looks at the concrete type;
//! it drives every variant through this interface.
//!
//! Key derivation receives each role's *local* view (self first, peer
//! second), so any variant that binds identities or public values must
//! combine them in an order-independent way. Confirmation tokens, by
//! contrast, are computed over a role-ordered [`Transcript`], because the
//! asymmetry between the two tokens is what stops a reflected token from
//! being accepted.

use crate::{
    algebra::Element,
    config::ConfigError,
    material::{Key, SessionId, Token},
    oracle::Oracle,
    variants::{BSpeke, HaoShahandashti, Iso2006, Iso2017, Jablon, TangMitchell},
    Host, Role,
};
use std::{fmt, sync::Arc};

/// A shared handle to a [`Variant`].
pub type SharedVariant = Arc<dyn Variant>;

/// How a role obtains the [`SessionId`] it records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBinding {
    /// The seed handed to both roles by the orchestrator is the session.
    Seed,
    /// Each role hashes `(host, seed, public)` for both sides and combines
    /// the two hashes smallest first.
    Derived,
}

/// The order in which confirmation tokens travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationFlow {
    /// Both roles send their token as soon as the key is derived.
    Simultaneous,
    /// The initiator proves first; the responder answers only after
    /// checking the initiator's token.
    InitiatorFirst,
    /// Only the initiator sends a token (three-message handshakes).
    InitiatorOnly,
}

/// Which value fills the generator slot of the ISO/IEC 11770-4:2006
/// confirmation tokens.
///
/// The standard hashes the shared generator. A widely analysed model of it
/// repeats the sender's public value in that position instead, which looks
/// like a transcription slip and does not change the analysed properties.
/// Both readings are available so the choice is always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneratorReading {
    #[default]
    Generator,
    RepeatedPublic,
}

impl std::str::FromStr for GeneratorReading {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generator" => Ok(Self::Generator),
            "repeated-public" => Ok(Self::RepeatedPublic),
            other => Err(ConfigError::UnknownReading(other.to_string())),
        }
    }
}

/// One role's view of the exchange once the peer's share has arrived.
#[derive(Debug, Clone, Copy)]
pub struct KeyInput<'a> {
    pub self_host: &'a Host,
    pub self_public: &'a Element,
    pub peer_host: &'a Host,
    pub peer_public: &'a Element,
    pub session: &'a SessionId,
    pub shared: &'a Element,
}

/// The exchange in role order, as both sides see it in an honest run.
#[derive(Debug, Clone, Copy)]
pub struct Transcript<'a> {
    pub initiator: &'a Host,
    pub responder: &'a Host,
    pub initiator_public: &'a Element,
    pub responder_public: &'a Element,
    pub session: &'a SessionId,
    pub key: &'a Key,
    pub shared: &'a Element,
    /// The generator derived from the pre-shared secret.
    pub base: &'a Element,
}

impl<'a> Transcript<'a> {
    /// The host and public value of the role sending a token.
    pub fn sender(&self, role: Role) -> (&'a Host, &'a Element) {
        match role {
            Role::Initiator => (self.initiator, self.initiator_public),
            Role::Responder => (self.responder, self.responder_public),
        }
    }

    /// The host and public value of the role receiving a token.
    pub fn receiver(&self, role: Role) -> (&'a Host, &'a Element) {
        self.sender(role.peer())
    }
}

/// Explicit key confirmation.
pub trait KeyConfirmation: Send + Sync {
    fn flow(&self) -> ConfirmationFlow;

    /// The token sent by `sender`. Each role calls this twice: once for its
    /// own token and once to recompute the token it expects from the peer.
    fn token(&self, oracle: &dyn Oracle, sender: Role, transcript: &Transcript<'_>) -> Token;
}

/// A SPEKE flavour.
pub trait Variant: Send + Sync + 'static {
    /// The registry name.
    fn name(&self) -> &'static str;

    fn session_binding(&self) -> SessionBinding {
        SessionBinding::Seed
    }

    /// Derives the session key. Both roles must get bit-identical output
    /// from their mirrored inputs.
    fn derive_key(&self, oracle: &dyn Oracle, input: &KeyInput<'_>) -> Key;

    fn confirmation(&self) -> Option<&dyn KeyConfirmation> {
        None
    }
}

impl fmt::Debug for dyn Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variant({})", self.name())
    }
}

/// Computes the session identifier a role records.
pub fn derive_session(
    binding: SessionBinding,
    oracle: &dyn Oracle,
    seed: &SessionId,
    input: &KeyInput<'_>,
) -> SessionId {
    match binding {
        SessionBinding::Seed => seed.clone(),
        SessionBinding::Derived => {
            let own = oracle.hash(
                "sid-part",
                &[input.self_host.as_bytes(), seed.as_bytes(), input.self_public.as_bytes()],
            );
            let peer = oracle.hash(
                "sid-part",
                &[input.peer_host.as_bytes(), seed.as_bytes(), input.peer_public.as_bytes()],
            );
            let (low, high) = ordered(own, peer);
            SessionId(oracle.hash("sid", &[low.as_bytes(), high.as_bytes()]))
        }
    }
}

/// Returns the pair smallest first.
pub fn ordered<T: Ord>(a: T, b: T) -> (T, T) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Maps variant names to their implementations.
pub struct Variants;

impl Variants {
    /// Every registered name, in the order they are listed to users.
    pub const NAMES: [&'static str; 8] = [
        Jablon::NAME,
        Jablon::NAME_NO_CONFIRMATION,
        Iso2006::NAME,
        Iso2017::NAME,
        Iso2017::NAME_NO_CONFIRMATION,
        HaoShahandashti::NAME,
        TangMitchell::NAME,
        BSpeke::NAME,
    ];

    /// Looks up a variant by name.
    pub fn by_name(name: &str, reading: GeneratorReading) -> Result<SharedVariant, ConfigError> {
        let variant: SharedVariant = match name {
            Jablon::NAME => Arc::new(Jablon::new(true)),
            Jablon::NAME_NO_CONFIRMATION => Arc::new(Jablon::new(false)),
            Iso2006::NAME => Arc::new(Iso2006::new(reading)),
            Iso2017::NAME => Arc::new(Iso2017::new(true)),
            Iso2017::NAME_NO_CONFIRMATION => Arc::new(Iso2017::new(false)),
            HaoShahandashti::NAME => Arc::new(HaoShahandashti),
            TangMitchell::NAME => Arc::new(TangMitchell),
            BSpeke::NAME => Arc::new(BSpeke),
            other => return Err(ConfigError::UnknownVariant(other.to_string())),
        };
        Ok(variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        algebra::{GroupAlgebra, SymbolicGroup},
        oracle::{Sha256Oracle, SymbolicOracle},
    };

    /// Runs both roles' local computations for one honest exchange.
    fn honest_exchange(variant: &dyn Variant, oracle: &dyn Oracle) -> [(SessionId, Key, Option<[Token; 2]>); 2] {
        let group = SymbolicGroup::new();
        let (a, b) = (Host::new("A"), Host::new("B"));
        let base = group.base_from_secret(b"password");
        let (x, y) = (group.fresh_scalar(), group.fresh_scalar());
        let (gx, gy) = (group.exponentiate(&base, &x), group.exponentiate(&base, &y));
        let seed = SessionId::fresh();

        let views = [
            (&a, &gx, &b, &gy, group.exponentiate(&gy, &x)),
            (&b, &gy, &a, &gx, group.exponentiate(&gx, &y)),
        ];
        views.map(|(self_host, self_public, peer_host, peer_public, shared)| {
            let input = KeyInput {
                self_host,
                self_public,
                peer_host,
                peer_public,
                session: &seed,
                shared: &shared,
            };
            let session = derive_session(variant.session_binding(), oracle, &seed, &input);
            let input = KeyInput {
                session: &session,
                ..input
            };
            let key = variant.derive_key(oracle, &input);
            let tokens = variant.confirmation().map(|kc| {
                let transcript = Transcript {
                    initiator: &a,
                    responder: &b,
                    initiator_public: &gx,
                    responder_public: &gy,
                    session: &session,
                    key: &key,
                    shared: &shared,
                    base: &base,
                };
                [
                    kc.token(oracle, Role::Initiator, &transcript),
                    kc.token(oracle, Role::Responder, &transcript),
                ]
            });
            (session, key, tokens)
        })
    }

    #[test]
    fn every_variant_agrees_in_an_honest_exchange() {
        for oracle in [&SymbolicOracle::new() as &dyn Oracle, &Sha256Oracle::new()] {
            for name in Variants::NAMES {
                let variant = Variants::by_name(name, GeneratorReading::default()).unwrap();
                let [initiator, responder] = honest_exchange(&*variant, oracle);
                assert_eq!(initiator, responder, "{name} diverged under {}", oracle.name());
            }
        }
    }

    #[test]
    fn confirmation_tokens_resist_reflection() {
        let oracle = SymbolicOracle::new();
        for name in Variants::NAMES {
            let variant = Variants::by_name(name, GeneratorReading::RepeatedPublic).unwrap();
            let [(_, _, tokens), _] = honest_exchange(&*variant, &oracle);
            if let Some([from_initiator, from_responder]) = tokens {
                assert_ne!(from_initiator, from_responder, "{name} tokens are symmetric");
            }
        }
    }

    /// Both tokens of a variant over a fixed key and shared element.
    fn tokens(
        kc: &dyn KeyConfirmation,
        oracle: &dyn Oracle,
        hosts: (&Host, &Host),
        publics: (&Element, &Element),
    ) -> [Token; 2] {
        let group = SymbolicGroup::new();
        let base = group.base_from_secret(b"password");
        let shared = group.exponentiate(&base, &group.fresh_scalar());
        let session = SessionId(oracle.hash("session", &[]));
        let key = Key(oracle.kdf("key", &[]));
        let transcript = Transcript {
            initiator: hosts.0,
            responder: hosts.1,
            initiator_public: publics.0,
            responder_public: publics.1,
            session: &session,
            key: &key,
            shared: &shared,
            base: &base,
        };
        [
            kc.token(oracle, Role::Initiator, &transcript),
            kc.token(oracle, Role::Responder, &transcript),
        ]
    }

    #[test]
    fn tokens_bind_both_public_values() {
        let (oracle, group) = (Sha256Oracle::new(), SymbolicGroup::new());
        let (a, b) = (Host::new("A"), Host::new("B"));
        let [gx, gy, gz] = [b"x", b"y", b"z"].map(|s| group.base_from_secret(s));
        for name in Variants::NAMES {
            let variant = Variants::by_name(name, GeneratorReading::default()).unwrap();
            let Some(kc) = variant.confirmation() else { continue };
            let honest = tokens(kc, &oracle, (&a, &b), (&gx, &gy));
            assert_ne!(honest, tokens(kc, &oracle, (&a, &b), (&gz, &gy)), "{name}");
            assert_ne!(honest, tokens(kc, &oracle, (&a, &b), (&gx, &gz)), "{name}");
        }
    }

    /// Jablon, ISO/IEC 11770-4:2006 and B-SPEKE keep host names out of their
    /// tokens, which is what lets a relay between two partners of a shared
    /// password confirm. The patched variants bind them and stop that relay.
    #[test]
    fn only_the_patched_variants_bind_hosts_in_tokens() {
        let (oracle, group) = (Sha256Oracle::new(), SymbolicGroup::new());
        let (a, b, c) = (Host::new("A"), Host::new("B"), Host::new("C"));
        let (gx, gy) = (group.base_from_secret(b"x"), group.base_from_secret(b"y"));
        let mut binding = Vec::new();
        for name in Variants::NAMES {
            let variant = Variants::by_name(name, GeneratorReading::default()).unwrap();
            let Some(kc) = variant.confirmation() else { continue };
            let to_b = tokens(kc, &oracle, (&a, &b), (&gx, &gy));
            let to_c = tokens(kc, &oracle, (&a, &c), (&gx, &gy));
            if to_b != to_c {
                binding.push(name);
            }
        }
        assert_eq!(binding, ["iso-2017", "hao-shahandashti", "tang-mitchell"]);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(
            Variants::by_name("speke-2", GeneratorReading::default()),
            Err(ConfigError::UnknownVariant(name)) if name == "speke-2"
        ));
    }

    #[test]
    fn ordering_is_role_independent() {
        assert_eq!(ordered(3, 1), ordered(1, 3));
        assert_eq!(ordered("b", "a"), ("a", "b"));
    }
}
