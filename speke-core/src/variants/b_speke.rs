use crate::{
    material::{Key, Token},
    oracle::Oracle,
    variant::{ConfirmationFlow, KeyConfirmation, KeyInput, Transcript, Variant},
    Role,
};

/// B-SPEKE in its three-message form.
///
/// After the two shares, only the initiator proves knowledge of the key;
/// the responder accepts on a valid token and never answers. The key binds
/// the session but no identities, and the token covers both public values
/// but no host names.
#[derive(Debug, Clone, Copy)]
pub struct BSpeke;

impl BSpeke {
    pub const NAME: &'static str = "b-speke";
}

impl Variant for BSpeke {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn derive_key(&self, oracle: &dyn Oracle, input: &KeyInput<'_>) -> Key {
        Key(oracle.kdf(
            "b-speke-key",
            &[input.session.as_bytes(), input.shared.as_bytes()],
        ))
    }

    fn confirmation(&self) -> Option<&dyn KeyConfirmation> {
        Some(self)
    }
}

impl KeyConfirmation for BSpeke {
    fn flow(&self) -> ConfirmationFlow {
        ConfirmationFlow::InitiatorOnly
    }

    fn token(&self, oracle: &dyn Oracle, sender: Role, transcript: &Transcript<'_>) -> Token {
        // The responder's token is never sent, but it must still differ from
        // the initiator's.
        let label = match sender {
            Role::Initiator => "b-speke-confirm",
            Role::Responder => "b-speke-confirm-unused",
        };
        Token(oracle.mac(
            transcript.key.digest(),
            label,
            &[
                transcript.initiator_public.as_bytes(),
                transcript.responder_public.as_bytes(),
            ],
        ))
    }
}
