// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical group names derived from entity short names.
//!
//! Every entity kind follows a `(prefix, suffix)` convention. The primary group of entity `acme`
//! under the convention `("is.racs.pirg.", "")` is called `is.racs.pirg.acme`; all auxiliary
//! groups hang off that name with a `.` separator:
//!
//! ```text
//! is.racs.pirg.acme           primary group
//! is.racs.pirg.acme.admins    admin group
//! is.racs.pirg.acme.pi        owner group
//! is.racs.pirg.acme.gpu       sub-group "gpu"
//! ```
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Separates the primary group name from auxiliary and sub-group suffixes.
pub const SEPARATOR: char = '.';

/// Suffix of every admin group.
pub const ADMIN_SUFFIX: &str = "admins";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name \"{0}\" may only contain letters, digits, '_' and '-'")]
    Malformed(String),

    #[error("name \"{0}\" is reserved")]
    Reserved(String),
}

/// Checks that a short name only uses `[A-Za-z0-9_-]` and is not empty.
///
/// The separator `.` is rejected, otherwise `a.admins` could either be the admin group of `a` or
/// the primary group of an entity called `a.admins`.
pub fn validate_short_name(value: &str) -> bool {
    static SHORT_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
        // Unwrap as we checked the regular expression for correctness
        Regex::new("^[A-Za-z0-9_-]+$").unwrap()
    });

    SHORT_NAME_REGEX.is_match(value)
}

/// Validated short name of an entity or sub-group, for example `acme`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortName(String);

impl ShortName {
    pub fn new(name: &str) -> Result<Self, NameError> {
        if !validate_short_name(name) {
            return Err(NameError::Malformed(name.to_owned()));
        }

        Ok(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ShortName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ShortName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Naming convention of one entity kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Convention {
    prefix: String,
    suffix: String,
    owner_suffix: Option<String>,
}

impl Convention {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            owner_suffix: None,
        }
    }

    /// Entities of this convention carry an owner group named `<primary>.<owner_suffix>`.
    pub fn with_owner_suffix(mut self, owner_suffix: impl Into<String>) -> Self {
        self.owner_suffix = Some(owner_suffix.into());
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn owner_suffix(&self) -> Option<&str> {
        self.owner_suffix.as_deref()
    }

    pub fn primary_name(&self, name: &ShortName) -> String {
        format!("{}{}{}", self.prefix, name, self.suffix)
    }

    pub fn admin_name(&self, name: &ShortName) -> String {
        format!("{}{SEPARATOR}{ADMIN_SUFFIX}", self.primary_name(name))
    }

    pub fn owner_name(&self, name: &ShortName) -> Option<String> {
        self.owner_suffix
            .as_ref()
            .map(|suffix| format!("{}{SEPARATOR}{suffix}", self.primary_name(name)))
    }

    /// Name of sub-group `sub` of entity `name`.
    ///
    /// Fails when `sub` would collide with the admin or owner group of the same entity.
    pub fn subgroup_name(&self, name: &ShortName, sub: &ShortName) -> Result<String, NameError> {
        if sub.as_str() == ADMIN_SUFFIX || self.owner_suffix.as_deref() == Some(sub.as_str()) {
            return Err(NameError::Reserved(sub.to_string()));
        }

        Ok(format!("{}{SEPARATOR}{sub}", self.primary_name(name)))
    }

    /// Maps a full primary group name back to the entity short name.
    ///
    /// Returns `None` for anything that is not a primary group of this convention, which
    /// includes admin, owner and sub-group names since their remainder contains a `.`.
    pub fn short_name(&self, full_name: &str) -> Option<ShortName> {
        let rest = full_name
            .strip_prefix(&self.prefix)?
            .strip_suffix(&self.suffix)?;
        ShortName::new(rest).ok()
    }

    /// Last `.`-delimited component of a sub-group name.
    pub fn subgroup_short_name(&self, full_name: &str) -> Option<ShortName> {
        let last = full_name.rsplit(SEPARATOR).next()?;
        ShortName::new(last).ok()
    }
}
