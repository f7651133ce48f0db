//! The fixed-width content digest used by the content-addressed file
//! database and the server's hash-confirmation path.

use std::fmt;

/// A 16-byte content digest.
///
/// `Hash::default()` (all-zero) is never a valid digest: it marks entries
/// primed without content hashing (see the directory-priming module) so
/// they cannot be selected by a hash-match lookup.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hash([u8; 16]);

impl Hash {
    /// The all-zero sentinel, meaning "no hash computed".
    pub const ZERO: Self = Self([0u8; 16]);

    /// Wraps a raw 16-byte digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// A hash is valid if it is not the all-zero sentinel.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        *self != Self::ZERO
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({self})")
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
