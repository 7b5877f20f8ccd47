//! The symmetric table of pre-shared secrets.

use crate::{
    algebra::{Element, GroupAlgebra},
    variant::ordered,
    Host,
};
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::fmt;

/// A long-lived secret shared by one pair of hosts, already mapped onto a
/// group generator.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Element);

impl Secret {
    /// Maps a password onto the group.
    pub fn from_password(group: &dyn GroupAlgebra, password: &[u8]) -> Self {
        Self(group.base_from_secret(password))
    }

    /// The generator derived from the password.
    pub fn element(&self) -> &Element {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// Pre-shared secrets keyed by host pairs.
///
/// A pair is stored once, under its smaller host first, so a
/// [`put`](Self::put) covers both orderings in a single write and
/// `get(a, b) == get(b, a)` holds even while writers race.
#[derive(Debug, Default)]
pub struct CredentialStore {
    table: DashMap<(Host, Host), Secret>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `secret` for the pair in both orders. A later write for the
    /// same pair replaces the earlier one.
    pub fn put(&self, a: &Host, b: &Host, secret: Secret) {
        self.table.insert(ordered(a.clone(), b.clone()), secret);
    }

    /// Gets the secret for the pair. `None` is an ordinary answer: the
    /// requesting host simply cannot address that peer.
    pub fn get(&self, a: &Host, b: &Host) -> Option<Secret> {
        self.table
            .get(&ordered(a.clone(), b.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Hosts that hold the identical secret with more than one partner,
    /// along with those partners. Such setups are legal but open the door to
    /// unknown key-share attacks.
    pub fn shared_secret_hazards(&self) -> Vec<(Host, Vec<Host>)> {
        let mut by_host: FxHashMap<Host, Vec<(Host, Secret)>> = FxHashMap::default();
        for entry in self.table.iter() {
            let (low, high) = entry.key();
            if low == high {
                continue;
            }
            for (owner, partner) in [(low, high), (high, low)] {
                by_host
                    .entry(owner.clone())
                    .or_default()
                    .push((partner.clone(), entry.value().clone()));
            }
        }

        let mut hazards = Vec::new();
        for (host, partners) in by_host {
            let mut shared: Vec<Host> = partners
                .iter()
                .filter(|(partner, secret)| {
                    partners.iter().any(|(other, s)| other != partner && s == secret)
                })
                .map(|(partner, _)| partner.clone())
                .collect();
            if !shared.is_empty() {
                shared.sort();
                hazards.push((host, shared));
            }
        }
        hazards.sort();
        hazards
    }

    /// The number of configured pairs.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::SymbolicGroup;
    use proptest::prelude::*;

    fn hosts() -> (Host, Host, Host) {
        (Host::new("A"), Host::new("B"), Host::new("C"))
    }

    #[test]
    fn missing_pairs_are_silent() {
        let (a, b, c) = hosts();
        let group = SymbolicGroup::new();
        let store = CredentialStore::new();
        store.put(&a, &b, Secret::from_password(&group, b"pw"));
        assert!(store.get(&a, &c).is_none());
        assert!(store.get(&c, &a).is_none());
    }

    #[test]
    fn last_write_wins_for_both_orders() {
        let (a, b, _) = hosts();
        let group = SymbolicGroup::new();
        let store = CredentialStore::new();
        store.put(&a, &b, Secret::from_password(&group, b"old"));
        store.put(&b, &a, Secret::from_password(&group, b"new"));
        let expected = Secret::from_password(&group, b"new");
        assert_eq!(store.get(&a, &b), Some(expected.clone()));
        assert_eq!(store.get(&b, &a), Some(expected));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn racing_writers_leave_both_orders_equal() {
        let (a, b, _) = hosts();
        let group = std::sync::Arc::new(SymbolicGroup::new());
        for _ in 0..50 {
            let store = std::sync::Arc::new(CredentialStore::new());
            let writers: Vec<_> = [(a.clone(), b.clone(), "x"), (b.clone(), a.clone(), "y")]
                .into_iter()
                .map(|(from, to, pw)| {
                    let (store, group) = (store.clone(), group.clone());
                    std::thread::spawn(move || {
                        store.put(&from, &to, Secret::from_password(&*group, pw.as_bytes()))
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }
            assert!(store.get(&a, &b).is_some());
            assert_eq!(store.get(&a, &b), store.get(&b, &a));
        }
    }

    #[test]
    fn reports_a_host_sharing_one_secret_with_two_partners() {
        let (a, b, c) = hosts();
        let group = SymbolicGroup::new();
        let store = CredentialStore::new();
        store.put(&a, &b, Secret::from_password(&group, b"same"));
        store.put(&a, &c, Secret::from_password(&group, b"same"));
        assert_eq!(store.shared_secret_hazards(), vec![(a, vec![b, c])]);
    }

    #[test]
    fn distinct_secrets_are_not_hazards() {
        let (a, b, c) = hosts();
        let group = SymbolicGroup::new();
        let store = CredentialStore::new();
        store.put(&a, &b, Secret::from_password(&group, b"one"));
        store.put(&a, &c, Secret::from_password(&group, b"two"));
        assert!(store.shared_secret_hazards().is_empty());
    }

    proptest! {
        #[test]
        fn lookups_are_symmetric(
            pairs in proptest::collection::vec(("[a-e]", "[a-e]", "[a-z]{1,6}"), 1..20),
        ) {
            let group = SymbolicGroup::new();
            let store = CredentialStore::new();
            for (a, b, pw) in &pairs {
                store.put(&Host::new(a), &Host::new(b), Secret::from_password(&group, pw.as_bytes()));
            }
            for (a, b, _) in &pairs {
                let (a, b) = (Host::new(a), Host::new(b));
                prop_assert_eq!(store.get(&a, &b), store.get(&b, &a));
            }
        }
    }
}
