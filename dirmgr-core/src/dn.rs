// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Distinguished name of a directory object, for example `CN=alice,OU=People,DC=example,DC=org`.
///
/// Directories treat attribute names and most values case-insensitively, so two names compare
/// equal when they only differ in ASCII case or in whitespace around the `,` separators.
#[derive(Clone)]
pub struct Dn(String);

impl Dn {
    pub fn new(dn: impl Into<String>) -> Self {
        Self(dn.into())
    }

    /// `OU=<name>,<parent>`
    pub fn ou(name: &str, parent: &Dn) -> Self {
        Self(format!("OU={name},{parent}"))
    }

    /// `CN=<name>,<parent>`
    pub fn cn(name: &str, parent: &Dn) -> Self {
        Self(format!("CN={name},{parent}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw value of the leftmost RDN, `alice` for `CN=alice,OU=People,...`.
    pub fn rdn_value(&self) -> &str {
        let rdn = &self.0[..split_point(&self.0).unwrap_or(self.0.len())];
        match rdn.split_once('=') {
            Some((_, value)) => value.trim(),
            None => rdn.trim(),
        }
    }

    /// Everything after the leftmost RDN.
    pub fn parent(&self) -> Option<Dn> {
        split_point(&self.0).map(|index| Dn(self.0[index + 1..].trim_start().to_owned()))
    }

    /// True if `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Dn) -> bool {
        let mut current = self.parent();
        while let Some(dn) = current {
            if &dn == ancestor {
                return true;
            }
            current = dn.parent();
        }
        false
    }

    fn normalized(&self) -> String {
        self.0
            .split(',')
            .map(|part| part.trim().to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Index of the first `,` which is not escaped with a backslash.
fn split_point(dn: &str) -> Option<usize> {
    let mut escaped = false;
    for (index, c) in dn.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => return Some(index),
            _ => escaped = false,
        }
    }
    None
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl PartialOrd for Dn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized().cmp(&other.normalized())
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dn({})", self.0)
    }
}

impl From<&str> for Dn {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Dn {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
