use super::{encode_input, Digest, Oracle};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Uninterpreted oracles for symbolic runs.
///
/// Every distinct input term is interned and given a fresh opaque name, so
/// outputs are equal exactly when inputs are equal. The table is private:
/// an output can only be produced by someone holding the full preimage.
#[derive(Debug, Default)]
pub struct SymbolicOracle {
    names: DashMap<Vec<u8>, Digest>,
    next: AtomicU64,
}

impl SymbolicOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&self, function: u8, term: Vec<u8>) -> Digest {
        let mut key = Vec::with_capacity(term.len() + 1);
        key.push(function);
        key.extend_from_slice(&term);
        self.names
            .entry(key)
            .or_insert_with(|| {
                let name = self.next.fetch_add(1, Ordering::Relaxed);
                let mut bytes = vec![function];
                bytes.extend_from_slice(&name.to_be_bytes());
                Digest::from_bytes(bytes)
            })
            .value()
            .clone()
    }
}

impl Oracle for SymbolicOracle {
    fn name(&self) -> &'static str {
        "symbolic"
    }

    fn hash(&self, label: &str, parts: &[&[u8]]) -> Digest {
        self.apply(b'h', encode_input(label, parts))
    }

    fn kdf(&self, label: &str, parts: &[&[u8]]) -> Digest {
        self.apply(b'k', encode_input(label, parts))
    }

    fn mac(&self, key: &Digest, label: &str, parts: &[&[u8]]) -> Digest {
        let mut term = encode_input("mac-key", &[key.as_bytes()]);
        term.extend(encode_input(label, parts));
        self.apply(b'm', term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_do_not_embed_inputs() {
        let oracle = SymbolicOracle::new();
        let secret = b"the shared element".as_slice();
        let out = oracle.hash("key", &[secret]);
        assert_eq!(out.as_bytes().len(), 9);
        assert!(!out.as_bytes().windows(4).any(|w| secret.windows(4).any(|s| s == w)));
    }

    #[test]
    fn concurrent_callers_agree() {
        let oracle = std::sync::Arc::new(SymbolicOracle::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let oracle = oracle.clone();
                std::thread::spawn(move || oracle.hash("same", &[b"input"]))
            })
            .collect();
        let outputs: Vec<Digest> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    }
}
