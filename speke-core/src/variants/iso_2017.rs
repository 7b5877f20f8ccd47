use crate::{
    material::{Key, Token},
    oracle::Oracle,
    variant::{ConfirmationFlow, KeyConfirmation, KeyInput, SessionBinding, Transcript, Variant},
    Role,
};

/// The patched SPEKE of ISO/IEC 11770-4:2017.
///
/// The session identifier is derived from both `(host, seed, public)`
/// triples and folded into the key, so a key is tied to who took part and
/// to which shares were exchanged. The confirmation tokens are MACs under
/// the session key over a role label and both identities in sender-first
/// order.
#[derive(Debug, Clone, Copy)]
pub struct Iso2017 {
    confirm: bool,
}

impl Iso2017 {
    pub const NAME: &'static str = "iso-2017";
    pub const NAME_NO_CONFIRMATION: &'static str = "iso-2017-nokc";

    pub fn new(confirm: bool) -> Self {
        Self { confirm }
    }
}

impl Variant for Iso2017 {
    fn name(&self) -> &'static str {
        if self.confirm {
            Self::NAME
        } else {
            Self::NAME_NO_CONFIRMATION
        }
    }

    fn session_binding(&self) -> SessionBinding {
        SessionBinding::Derived
    }

    fn derive_key(&self, oracle: &dyn Oracle, input: &KeyInput<'_>) -> Key {
        Key(oracle.kdf(
            "iso-2017-key",
            &[input.session.as_bytes(), input.shared.as_bytes()],
        ))
    }

    fn confirmation(&self) -> Option<&dyn KeyConfirmation> {
        self.confirm.then_some(self as &dyn KeyConfirmation)
    }
}

impl KeyConfirmation for Iso2017 {
    fn flow(&self) -> ConfirmationFlow {
        ConfirmationFlow::InitiatorFirst
    }

    fn token(&self, oracle: &dyn Oracle, sender: Role, transcript: &Transcript<'_>) -> Token {
        let label: &[u8] = match sender {
            Role::Initiator => &[0x03],
            Role::Responder => &[0x04],
        };
        let (own_host, own_public) = transcript.sender(sender);
        let (peer_host, peer_public) = transcript.receiver(sender);
        Token(oracle.mac(
            transcript.key.digest(),
            "iso-2017-confirm",
            &[
                label,
                own_host.as_bytes(),
                peer_host.as_bytes(),
                own_public.as_bytes(),
                peer_public.as_bytes(),
            ],
        ))
    }
}
