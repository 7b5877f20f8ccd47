use super::{encode_input, Digest, Oracle};
use hmac::{Hmac, Mac};
use sha2::{Digest as _, Sha256};

type HmacSha256 = Hmac<Sha256>;

const KDF_SALT: &[u8] = b"speke kdf v1";

/// SHA-256 for hashing and HMAC-SHA-256 for key derivation and MACs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Oracle;

impl Sha256Oracle {
    pub fn new() -> Self {
        Self
    }

    fn hmac(key: &[u8], input: &[u8]) -> Digest {
        // HMAC accepts keys of any length, so this cannot fail.
        let mut mac = match HmacSha256::new_from_slice(key) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC takes keys of any size"),
        };
        mac.update(input);
        Digest::from_bytes(mac.finalize().into_bytes().to_vec())
    }
}

impl Oracle for Sha256Oracle {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn hash(&self, label: &str, parts: &[&[u8]]) -> Digest {
        Digest::from_bytes(Sha256::digest(encode_input(label, parts)).to_vec())
    }

    fn kdf(&self, label: &str, parts: &[&[u8]]) -> Digest {
        Self::hmac(KDF_SALT, &encode_input(label, parts))
    }

    fn mac(&self, key: &Digest, label: &str, parts: &[&[u8]]) -> Digest {
        Self::hmac(key.as_bytes(), &encode_input(label, parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_are_full_width() {
        let oracle = Sha256Oracle::new();
        assert_eq!(oracle.hash("h", &[]).as_bytes().len(), 32);
        assert_eq!(oracle.kdf("k", &[b"x"]).as_bytes().len(), 32);
        let key = oracle.kdf("k", &[b"x"]);
        assert_eq!(oracle.mac(&key, "m", &[b"y"]).as_bytes().len(), 32);
    }
}
