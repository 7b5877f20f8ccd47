use crate::{
    material::{Key, Token},
    oracle::Oracle,
    variant::{ordered, ConfirmationFlow, KeyConfirmation, KeyInput, Transcript, Variant},
    Role,
};

/// The Hao–Shahandashti patch.
///
/// Both `(host, public)` pairs are sorted and bound into the key alongside
/// the shared element. The two confirmation tokens use the same label and
/// differ only in the order of the identities and public values, sender
/// first; that ordering is what makes a reflected token fail.
#[derive(Debug, Clone, Copy)]
pub struct HaoShahandashti;

impl HaoShahandashti {
    pub const NAME: &'static str = "hao-shahandashti";
}

impl Variant for HaoShahandashti {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn derive_key(&self, oracle: &dyn Oracle, input: &KeyInput<'_>) -> Key {
        let (first, second) = ordered(
            (input.self_host, input.self_public),
            (input.peer_host, input.peer_public),
        );
        Key(oracle.kdf(
            "hao-shahandashti-key",
            &[
                first.0.as_bytes(),
                first.1.as_bytes(),
                second.0.as_bytes(),
                second.1.as_bytes(),
                input.shared.as_bytes(),
            ],
        ))
    }

    fn confirmation(&self) -> Option<&dyn KeyConfirmation> {
        Some(self)
    }
}

impl KeyConfirmation for HaoShahandashti {
    fn flow(&self) -> ConfirmationFlow {
        ConfirmationFlow::Simultaneous
    }

    fn token(&self, oracle: &dyn Oracle, sender: Role, transcript: &Transcript<'_>) -> Token {
        let (own_host, own_public) = transcript.sender(sender);
        let (peer_host, peer_public) = transcript.receiver(sender);
        Token(oracle.mac(
            transcript.key.digest(),
            "hao-shahandashti-confirm",
            &[
                own_host.as_bytes(),
                peer_host.as_bytes(),
                own_public.as_bytes(),
                peer_public.as_bytes(),
            ],
        ))
    }
}
