//! Typed wrappers around oracle outputs.

use crate::oracle::Digest;
use rand::RngCore;
use std::fmt;

/// A derived session key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(pub(crate) Digest);

/// A key confirmation token.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub(crate) Digest);

/// Tags one logical protocol run.
///
/// Depending on the variant this is either the seed the orchestrator hands
/// to both roles before they start, or a value each role derives on its own
/// from the exchanged shares.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub(crate) Digest);

impl SessionId {
    /// A fresh random seed.
    pub fn fresh() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(Digest::from_bytes(bytes.to_vec()))
    }
}

macro_rules! digest_newtype {
    ($name:ident) => {
        impl $name {
            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_bytes()
            }

            pub fn digest(&self) -> &Digest {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

digest_newtype!(Key);
digest_newtype!(Token);
digest_newtype!(SessionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_seeds_are_distinct() {
        assert_ne!(SessionId::fresh(), SessionId::fresh());
    }
}
