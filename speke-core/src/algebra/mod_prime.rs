use super::{Element, GroupAlgebra, Scalar};
use rand::Rng;
use sha2::{Digest, Sha256};

/// The Mersenne prime 2^61 - 1.
const MODULUS: u64 = (1 << 61) - 1;

/// Exponentiation in the multiplicative group of integers modulo 2^61 - 1.
///
/// Generators are squares of a hashed secret, the `g = H(π)^2` mapping from
/// the original SPEKE paper, so every base lands in the subgroup of quadratic
/// residues. The modulus is far too small for real deployments; it exists so
/// runs can exercise genuine arithmetic end to end.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModPrimeGroup;

impl ModPrimeGroup {
    pub fn new() -> Self {
        Self
    }

    fn decode(element: &Element) -> u64 {
        match <[u8; 8]>::try_from(element.as_bytes()) {
            Ok(bytes) => u64::from_be_bytes(bytes) % MODULUS,
            // Foreign encodings are folded into the group rather than rejected.
            Err(_) => hash_to_residue(element.as_bytes()),
        }
    }

    fn encode(value: u64) -> Element {
        Element::from_encoding(value.to_be_bytes().to_vec())
    }
}

impl GroupAlgebra for ModPrimeGroup {
    fn name(&self) -> &'static str {
        "mod-prime"
    }

    fn base_from_secret(&self, secret: &[u8]) -> Element {
        let h = hash_to_residue(secret).max(2);
        Self::encode(mul_mod(h, h))
    }

    fn exponentiate(&self, base: &Element, scalar: &Scalar) -> Element {
        Self::encode(pow_mod(Self::decode(base), scalar.raw()))
    }

    fn fresh_scalar(&self) -> Scalar {
        Scalar::from_raw(rand::thread_rng().gen_range(2..MODULUS - 1))
    }
}

fn hash_to_residue(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(word) % MODULUS
}

fn mul_mod(a: u64, b: u64) -> u64 {
    ((a as u128 * b as u128) % MODULUS as u128) as u64
}

fn pow_mod(mut base: u64, mut exponent: u64) -> u64 {
    let mut result = 1;
    base %= MODULUS;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = mul_mod(result, base);
        }
        base = mul_mod(base, base);
        exponent >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_powers() {
        assert_eq!(pow_mod(3, 0), 1);
        assert_eq!(pow_mod(3, 5), 243);
        assert_eq!(pow_mod(MODULUS + 2, 10), 1024);
        // Fermat: a^(p-1) = 1 for a not divisible by p.
        assert_eq!(pow_mod(123_456_789, MODULUS - 1), 1);
    }

    #[test]
    fn generators_are_squares() {
        let group = ModPrimeGroup::new();
        let g = group.base_from_secret(b"correct horse");
        // Euler's criterion for quadratic residues.
        assert_eq!(pow_mod(ModPrimeGroup::decode(&g), (MODULUS - 1) / 2), 1);
        assert_eq!(g, group.base_from_secret(b"correct horse"));
        assert_ne!(g, group.base_from_secret(b"battery staple"));
    }
}
