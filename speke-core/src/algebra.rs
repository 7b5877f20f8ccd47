//! The abstract group the handshakes compute in.
//!
//! Every protocol step that touches group elements goes through
//! [`GroupAlgebra`]. The only law the rest of the crate relies on is that
//! exponentiation commutes:
//!
//! ```text
//! exponentiate(exponentiate(g, x), y) == exponentiate(exponentiate(g, y), x)
//! ```
//!
//! There is deliberately no way to take a logarithm, divide out an exponent
//! or otherwise decompose an [`Element`]. [`Scalar`]s can only be drawn fresh
//! from a group, so nothing outside the session that drew an exponent can
//! ever hold it.

use std::{fmt, sync::Arc};

mod mod_prime;
pub use mod_prime::ModPrimeGroup;

mod symbolic;
pub use symbolic::SymbolicGroup;

/// A shared handle to a [`GroupAlgebra`].
pub type SharedGroup = Arc<dyn GroupAlgebra>;

/// The group operations consumed by the handshakes.
pub trait GroupAlgebra: Send + Sync + 'static {
    /// A short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Maps a low-entropy secret onto a generator. This is the SPEKE
    /// password-to-base mapping.
    fn base_from_secret(&self, secret: &[u8]) -> Element;

    /// Raises `base` to the power `scalar`. Total, deterministic and pure.
    fn exponentiate(&self, base: &Element, scalar: &Scalar) -> Element;

    /// Draws a scalar that has never been handed out before.
    fn fresh_scalar(&self) -> Scalar;
}

/// A secret exponent.
///
/// Only a [`GroupAlgebra`] can create one and the value is never printed.
/// A scalar is meant to be used by a single session role and dropped with it.
#[derive(Clone, PartialEq, Eq)]
pub struct Scalar(u64);

impl Scalar {
    pub(crate) const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub(crate) const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Scalar(..)")
    }
}

/// A public group element in its canonical encoding.
///
/// Elements compare and order by their encoding. That ordering is the
/// consistent total order used wherever a variant needs to combine two
/// values independently of which role computed them.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Element(Arc<[u8]>);

impl Element {
    pub(crate) fn from_encoding(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// The canonical encoding, as fed to the oracles.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({})", short_hex(&self.0))
    }
}

/// Renders a value as hex for logs. Values longer than twelve bytes keep
/// only their first and last four bytes, since symbolic names differ only
/// in their trailing counter.
pub(crate) fn short_hex(bytes: &[u8]) -> String {
    let hex = |part: &[u8]| part.iter().map(|b| format!("{b:02x}")).collect::<String>();
    if bytes.len() <= 12 {
        hex(bytes)
    } else {
        format!("{}..{}", hex(&bytes[..4]), hex(&bytes[bytes.len() - 4..]))
    }
}
