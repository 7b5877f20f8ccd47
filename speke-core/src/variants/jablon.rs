use crate::{
    material::{Key, Token},
    oracle::Oracle,
    variant::{ConfirmationFlow, KeyConfirmation, KeyInput, Transcript, Variant},
    Role,
};

/// Jablon's original SPEKE.
///
/// The key is a hash of the shared element alone: neither identities nor
/// the session are bound. Confirmation follows the original paper, the
/// initiator proving with `H(H(k))` and the responder answering with `H(k)`,
/// where the inner hash also covers both public values. Host names never
/// enter a token, so a relayed handshake confirms under the wrong identity.
#[derive(Debug, Clone, Copy)]
pub struct Jablon {
    confirm: bool,
}

impl Jablon {
    pub const NAME: &'static str = "jablon";
    pub const NAME_NO_CONFIRMATION: &'static str = "jablon-nokc";

    pub fn new(confirm: bool) -> Self {
        Self { confirm }
    }
}

impl Variant for Jablon {
    fn name(&self) -> &'static str {
        if self.confirm {
            Self::NAME
        } else {
            Self::NAME_NO_CONFIRMATION
        }
    }

    fn derive_key(&self, oracle: &dyn Oracle, input: &KeyInput<'_>) -> Key {
        Key(oracle.kdf("jablon-key", &[input.shared.as_bytes()]))
    }

    fn confirmation(&self) -> Option<&dyn KeyConfirmation> {
        self.confirm.then_some(self as &dyn KeyConfirmation)
    }
}

impl KeyConfirmation for Jablon {
    fn flow(&self) -> ConfirmationFlow {
        ConfirmationFlow::InitiatorFirst
    }

    fn token(&self, oracle: &dyn Oracle, sender: Role, transcript: &Transcript<'_>) -> Token {
        let once = oracle.hash(
            "jablon-confirm",
            &[
                transcript.key.as_bytes(),
                transcript.initiator_public.as_bytes(),
                transcript.responder_public.as_bytes(),
            ],
        );
        match sender {
            Role::Initiator => Token(oracle.hash("jablon-confirm", &[once.as_bytes()])),
            Role::Responder => Token(once),
        }
    }
}
