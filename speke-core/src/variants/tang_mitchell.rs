use crate::{
    material::{Key, Token},
    oracle::Oracle,
    variant::{ordered, ConfirmationFlow, KeyConfirmation, KeyInput, Transcript, Variant},
    Role,
};

/// The Tang–Mitchell patch.
///
/// Each role hashes `(host, public)` for both sides and feeds the smaller
/// hash first into the KDF, together with the session and the shared
/// element. The tokens carry distinct labels per role as well as swapped
/// identities and public values.
#[derive(Debug, Clone, Copy)]
pub struct TangMitchell;

impl TangMitchell {
    pub const NAME: &'static str = "tang-mitchell";
}

impl Variant for TangMitchell {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn derive_key(&self, oracle: &dyn Oracle, input: &KeyInput<'_>) -> Key {
        let own = oracle.hash(
            "tang-mitchell-id",
            &[input.self_host.as_bytes(), input.self_public.as_bytes()],
        );
        let peer = oracle.hash(
            "tang-mitchell-id",
            &[input.peer_host.as_bytes(), input.peer_public.as_bytes()],
        );
        let (low, high) = ordered(own, peer);
        Key(oracle.kdf(
            "tang-mitchell-key",
            &[
                low.as_bytes(),
                high.as_bytes(),
                input.session.as_bytes(),
                input.shared.as_bytes(),
            ],
        ))
    }

    fn confirmation(&self) -> Option<&dyn KeyConfirmation> {
        Some(self)
    }
}

impl KeyConfirmation for TangMitchell {
    fn flow(&self) -> ConfirmationFlow {
        ConfirmationFlow::InitiatorFirst
    }

    fn token(&self, oracle: &dyn Oracle, sender: Role, transcript: &Transcript<'_>) -> Token {
        let label = match sender {
            Role::Initiator => "tang-mitchell-confirm-initiator",
            Role::Responder => "tang-mitchell-confirm-responder",
        };
        let (own_host, own_public) = transcript.sender(sender);
        let (peer_host, peer_public) = transcript.receiver(sender);
        Token(oracle.hash(
            label,
            &[
                own_host.as_bytes(),
                peer_host.as_bytes(),
                own_public.as_bytes(),
                peer_public.as_bytes(),
                transcript.key.as_bytes(),
            ],
        ))
    }
}
