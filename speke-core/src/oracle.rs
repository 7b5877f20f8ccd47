//! One-way functions consumed by the variants: hash, key derivation and MAC.
//!
//! The handshakes treat these as uninterpreted oracles. Inputs are a domain
//! label plus a list of byte strings; the [`encode_input`] framing is length
//! prefixed so distinct input lists never collide.

use crate::algebra::short_hex;
use std::{fmt, sync::Arc};

mod sha256;
pub use sha256::Sha256Oracle;

mod symbolic;
pub use symbolic::SymbolicOracle;

/// A shared handle to an [`Oracle`].
pub type SharedOracle = Arc<dyn Oracle>;

/// The output of any oracle call.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(Arc<[u8]>);

impl Digest {
    pub(crate) fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&short_hex(&self.0))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&short_hex(&self.0))
    }
}

/// Hash, KDF and MAC function objects.
///
/// Implementations must be deterministic: equal inputs give equal outputs.
/// Nothing in this interface maps an output back to its input.
pub trait Oracle: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn hash(&self, label: &str, parts: &[&[u8]]) -> Digest;

    fn kdf(&self, label: &str, parts: &[&[u8]]) -> Digest;

    fn mac(&self, key: &Digest, label: &str, parts: &[&[u8]]) -> Digest;
}

/// Frames a label and its parts as `len || label || (len || part)*`.
pub(crate) fn encode_input(label: &str, parts: &[&[u8]]) -> Vec<u8> {
    let size = 4 + label.len() + parts.iter().map(|p| 4 + p.len()).sum::<usize>();
    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&(label.len() as u32).to_be_bytes());
    out.extend_from_slice(label.as_bytes());
    for part in parts {
        out.extend_from_slice(&(part.len() as u32).to_be_bytes());
        out.extend_from_slice(part);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_separates_parts() {
        assert_ne!(encode_input("l", &[b"ab", b"c"]), encode_input("l", &[b"a", b"bc"]));
        assert_ne!(encode_input("la", &[b"b"]), encode_input("l", &[b"ab"]));
    }

    #[test]
    fn oracles_are_deterministic_and_domain_separated() {
        for oracle in [&Sha256Oracle::new() as &dyn Oracle, &SymbolicOracle::new()] {
            let h = oracle.hash("sid", &[b"alice", b"x"]);
            assert_eq!(h, oracle.hash("sid", &[b"alice", b"x"]), "{}", oracle.name());
            assert_ne!(h, oracle.hash("sid", &[b"alice", b"y"]));
            assert_ne!(h, oracle.kdf("sid", &[b"alice", b"x"]));
            let k = oracle.kdf("key", &[b"material"]);
            assert_ne!(oracle.mac(&k, "kc", &[b"1"]), oracle.mac(&h, "kc", &[b"1"]));
        }
    }
}
