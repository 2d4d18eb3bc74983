// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::Dn;
use crate::gid::GidRange;
use crate::kind::EntityKind;

/// What happens to roster membership when a user loses a role in one entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RosterPolicy {
    /// Remove the user from a roster once no entity of any kind feeding that roster grants them
    /// the role anymore.
    #[default]
    CrossEntity,

    /// Never remove users from rosters.
    Retain,
}

#[derive(Debug, Error)]
#[error("unknown roster policy \"{0}\", expected \"cross-entity\" or \"retain\"")]
pub struct UnknownRosterPolicy(String);

impl FromStr for RosterPolicy {
    type Err = UnknownRosterPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cross-entity" => Ok(Self::CrossEntity),
            "retain" => Ok(Self::Retain),
            other => Err(UnknownRosterPolicy(other.to_owned())),
        }
    }
}

impl fmt::Display for RosterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CrossEntity => write!(f, "cross-entity"),
            Self::Retain => write!(f, "retain"),
        }
    }
}

/// Configuration for a manager instance.
#[derive(Clone, Debug)]
pub struct Config {
    /// Subtree scanned when allocating group ids.
    pub(crate) groups_base: Dn,

    pub(crate) gid_range: GidRange,

    pub(crate) kinds: Vec<EntityKind>,

    pub(crate) roster_policy: RosterPolicy,
}

impl Config {
    pub fn new(groups_base: Dn, gid_range: GidRange) -> Self {
        Self {
            groups_base,
            gid_range,
            kinds: Vec::new(),
            roster_policy: RosterPolicy::default(),
        }
    }

    /// Registers an entity kind. A kind with the same name replaces the earlier one.
    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kinds.retain(|existing| existing.name() != kind.name());
        self.kinds.push(kind);
        self
    }

    pub fn with_roster_policy(mut self, roster_policy: RosterPolicy) -> Self {
        self.roster_policy = roster_policy;
        self
    }

    pub fn groups_base(&self) -> &Dn {
        &self.groups_base
    }

    pub fn gid_range(&self) -> GidRange {
        self.gid_range
    }

    pub fn kinds(&self) -> &[EntityKind] {
        &self.kinds
    }

    pub fn kind(&self, name: &str) -> Option<&EntityKind> {
        self.kinds.iter().find(|kind| kind.name() == name)
    }

    pub fn roster_policy(&self) -> RosterPolicy {
        self.roster_policy
    }
}
