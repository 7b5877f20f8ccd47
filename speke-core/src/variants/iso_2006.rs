use crate::{
    material::{Key, Token},
    oracle::Oracle,
    variant::{ConfirmationFlow, GeneratorReading, KeyConfirmation, KeyInput, Transcript, Variant},
    Role,
};

/// SPEKE as standardised in ISO/IEC 11770-4:2006 and IEEE P1363.2.
///
/// The key is a KDF of the shared element. Each confirmation token hashes a
/// one-byte label (`03` from the initiator, `04` from the responder), the
/// sender's public value, the receiver's public value, the shared element
/// and the generator. Which value sits in the generator slot is set by
/// [`GeneratorReading`]. As in the standard, no host name is hashed.
#[derive(Debug, Clone, Copy)]
pub struct Iso2006 {
    reading: GeneratorReading,
}

impl Iso2006 {
    pub const NAME: &'static str = "iso-2006";

    pub fn new(reading: GeneratorReading) -> Self {
        Self { reading }
    }

    pub fn reading(&self) -> GeneratorReading {
        self.reading
    }
}

impl Variant for Iso2006 {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn derive_key(&self, oracle: &dyn Oracle, input: &KeyInput<'_>) -> Key {
        Key(oracle.kdf("iso-2006-key", &[input.shared.as_bytes()]))
    }

    fn confirmation(&self) -> Option<&dyn KeyConfirmation> {
        Some(self)
    }
}

impl KeyConfirmation for Iso2006 {
    fn flow(&self) -> ConfirmationFlow {
        ConfirmationFlow::Simultaneous
    }

    fn token(&self, oracle: &dyn Oracle, sender: Role, transcript: &Transcript<'_>) -> Token {
        let label: &[u8] = match sender {
            Role::Initiator => &[0x03],
            Role::Responder => &[0x04],
        };
        let (_, own_public) = transcript.sender(sender);
        let (_, peer_public) = transcript.receiver(sender);
        let generator = match self.reading {
            GeneratorReading::Generator => transcript.base,
            GeneratorReading::RepeatedPublic => own_public,
        };
        Token(oracle.hash(
            "iso-2006-confirm",
            &[
                label,
                own_public.as_bytes(),
                peer_public.as_bytes(),
                transcript.shared.as_bytes(),
                generator.as_bytes(),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        algebra::{GroupAlgebra, SymbolicGroup},
        material::SessionId,
        oracle::SymbolicOracle,
        Host,
    };

    #[test]
    fn generator_reading_changes_the_token() {
        let (group, oracle) = (SymbolicGroup::new(), SymbolicOracle::new());
        let (a, b) = (Host::new("A"), Host::new("B"));
        let base = group.base_from_secret(b"pw");
        let gx = group.exponentiate(&base, &group.fresh_scalar());
        let gy = group.exponentiate(&base, &group.fresh_scalar());
        let shared = group.exponentiate(&gx, &group.fresh_scalar());
        let session = SessionId::fresh();
        let key = Key(oracle.kdf("k", &[]));
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
        let standard = Iso2006::new(GeneratorReading::Generator);
        let repeated = Iso2006::new(GeneratorReading::RepeatedPublic);
        assert_ne!(
            standard.token(&oracle, Role::Initiator, &transcript),
            repeated.token(&oracle, Role::Initiator, &transcript)
        );
        assert_eq!(repeated.reading(), GeneratorReading::RepeatedPublic);
    }
}
