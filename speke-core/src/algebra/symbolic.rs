use super::{Element, GroupAlgebra, Scalar};
use dashmap::DashMap;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// A term `root ^ (e1 * e2 * ... * en)` with the exponent names kept sorted,
/// which makes exponentiation commute by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Term {
    root: Arc<[u8]>,
    exponents: Vec<u64>,
}

impl Term {
    fn encode(&self) -> Element {
        let mut hasher = Sha256::new();
        hasher.update(b"speke symbolic element");
        hasher.update((self.root.len() as u64).to_be_bytes());
        hasher.update(&self.root);
        for exponent in &self.exponents {
            hasher.update(exponent.to_be_bytes());
        }
        Element::from_encoding(hasher.finalize().to_vec())
    }
}

/// A Dolev-Yao style test double for the group.
///
/// Elements are free terms over a root and a multiset of exponent names.
/// The encoding handed out is a digest of the term, and the term table is
/// private, so holding an element reveals nothing about the exponents inside
/// it. The only ways to build elements are [`base_from_secret`] and
/// [`exponentiate`], which is exactly the capability the network attacker
/// is allowed. This backend bypasses the cryptographic hardness of the real
/// group entirely and must only be used for symbolic analysis.
///
/// [`base_from_secret`]: GroupAlgebra::base_from_secret
/// [`exponentiate`]: GroupAlgebra::exponentiate
#[derive(Debug, Default)]
pub struct SymbolicGroup {
    terms: DashMap<Element, Term>,
}

impl SymbolicGroup {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&self, term: Term) -> Element {
        let element = term.encode();
        self.terms.entry(element.clone()).or_insert(term);
        element
    }

    fn term_of(&self, element: &Element) -> Term {
        match self.terms.get(element) {
            Some(term) => term.value().clone(),
            // An element this group never produced is treated as an opaque
            // root of its own.
            None => Term {
                root: Arc::from(element.as_bytes()),
                exponents: Vec::new(),
            },
        }
    }
}

impl GroupAlgebra for SymbolicGroup {
    fn name(&self) -> &'static str {
        "symbolic"
    }

    fn base_from_secret(&self, secret: &[u8]) -> Element {
        let mut root = b"secret:".to_vec();
        root.extend_from_slice(&Sha256::digest(secret));
        self.intern(Term {
            root: root.into(),
            exponents: Vec::new(),
        })
    }

    fn exponentiate(&self, base: &Element, scalar: &Scalar) -> Element {
        let mut term = self.term_of(base);
        let at = term.exponents.partition_point(|e| *e < scalar.raw());
        term.exponents.insert(at, scalar.raw());
        self.intern(term)
    }

    fn fresh_scalar(&self) -> Scalar {
        Scalar::from_raw(rand::thread_rng().gen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_elements_become_roots() {
        let group = SymbolicGroup::new();
        let stranger = Element::from_encoding(vec![1, 2, 3]);
        let x = group.fresh_scalar();
        let y = group.fresh_scalar();
        let a = group.exponentiate(&group.exponentiate(&stranger, &x), &y);
        let b = group.exponentiate(&group.exponentiate(&stranger, &y), &x);
        assert_eq!(a, b);
        assert_ne!(a, stranger);
    }

    #[test]
    fn squaring_is_not_identity() {
        let group = SymbolicGroup::new();
        let g = group.base_from_secret(b"pw");
        let x = group.fresh_scalar();
        let once = group.exponentiate(&g, &x);
        let twice = group.exponentiate(&once, &x);
        assert_ne!(once, twice);
    }

    #[test]
    fn encodings_hide_the_term() {
        let group = SymbolicGroup::new();
        let g = group.base_from_secret(b"pw");
        let x = group.fresh_scalar();
        let gx = group.exponentiate(&g, &x);
        assert_eq!(gx.as_bytes().len(), 32);
        assert!(!gx
            .as_bytes()
            .windows(8)
            .any(|w| w == x.raw().to_be_bytes()));
    }
}
