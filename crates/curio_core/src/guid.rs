//! GUID identity
//!
//! Primary keys for collections and items: 32-character lowercase hex
//! strings, lexicographically ordered.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally unique string identifier.
///
/// Equality is ordinal (case-sensitive); collision detection uses
/// [`Guid::eq_ignore_case`] because external tools are not consistent about
/// hex casing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    /// The empty GUID, used for not-yet-synchronized identities.
    pub fn nil() -> Self {
        Self(String::new())
    }

    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut rng = rand::thread_rng();
        let mut out = String::with_capacity(32);
        for _ in 0..32 {
            let nibble: usize = rng.gen_range(0..16);
            out.push(HEX[nibble] as char);
        }
        Self(out)
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison, used only by the collision repair scan.
    /// Nil GUIDs never match anything.
    pub fn eq_ignore_case(&self, other: &Guid) -> bool {
        !self.is_nil() && self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Guid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Guid {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
