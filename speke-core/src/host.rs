use std::{fmt, sync::Arc};

/// The identity of a party taking part in a run.
///
/// Hosts are cheap to clone and compare by name. The ordering is the
/// lexicographic order of the name bytes, which is what the variants use
/// whenever they need a role-independent ordering of identities.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Host(Arc<str>);

impl Host {
    /// Creates a host with the given name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Gets the name of the host.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// The encoding fed to the oracles.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for Host {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Host({})", self.0)
    }
}

/// The side of a handshake a session actor plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    /// The role on the other end of the handshake.
    pub const fn peer(self) -> Self {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Role::Initiator => "initiator",
            Role::Responder => "responder",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosts_order_by_name() {
        let a = Host::new("alice");
        let b = Host::from("bob");
        assert!(a < b);
        assert_eq!(a, Host::new(String::from("alice")));
        assert_eq!(b.to_string(), "bob");
    }

    #[test]
    fn peer_role_is_an_involution() {
        assert_eq!(Role::Initiator.peer(), Role::Responder);
        assert_eq!(Role::Initiator.peer().peer(), Role::Initiator);
    }
}
