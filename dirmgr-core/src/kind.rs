// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Dn;
use crate::naming::{Convention, NameError, ShortName};

/// Name of the container holding the sub-groups of an entity.
pub const SUBGROUPS_CONTAINER: &str = "Groups";

/// One type of managed entity, for example research groups or storage allocations.
///
/// A kind without admin, owner and sub-group roles is "flat": each entity is a single group
/// directly inside the kind container. All other kinds are "nested": each entity gets its own
/// container holding the primary, admin and owner group plus a container for sub-groups.
#[derive(Clone, Debug)]
pub struct EntityKind {
    name: String,
    label: String,
    container: Dn,
    convention: Convention,
    admins: bool,
    subgroups: bool,
    users_roster: Option<Dn>,
    admins_roster: Option<Dn>,
}

impl EntityKind {
    /// Creates a flat kind. Use the `with_` methods to add roles.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        container: Dn,
        convention: Convention,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            container,
            convention,
            admins: false,
            subgroups: false,
            users_roster: None,
            admins_roster: None,
        }
    }

    pub fn with_admins(mut self) -> Self {
        self.admins = true;
        self
    }

    pub fn with_subgroups(mut self) -> Self {
        self.subgroups = true;
        self
    }

    /// Every member of an entity of this kind is also a member of `roster`.
    pub fn with_users_roster(mut self, roster: Dn) -> Self {
        self.users_roster = Some(roster);
        self
    }

    /// Every admin of an entity of this kind is also a member of `roster`.
    pub fn with_admins_roster(mut self, roster: Dn) -> Self {
        self.admins_roster = Some(roster);
        self
    }

    /// Identifier used in configuration and on the command line, for example `pirg`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human readable name used in messages, for example `PIRG`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn container(&self) -> &Dn {
        &self.container
    }

    pub fn convention(&self) -> &Convention {
        &self.convention
    }

    pub fn has_owner(&self) -> bool {
        self.convention.owner_suffix().is_some()
    }

    /// An owner is always an admin too, so an owner role implies an admin group.
    pub fn has_admins(&self) -> bool {
        self.admins || self.has_owner()
    }

    pub fn has_subgroups(&self) -> bool {
        self.subgroups
    }

    pub fn is_nested(&self) -> bool {
        self.has_admins() || self.has_subgroups()
    }

    pub fn users_roster(&self) -> Option<&Dn> {
        self.users_roster.as_ref()
    }

    pub fn admins_roster(&self) -> Option<&Dn> {
        self.admins_roster.as_ref()
    }

    /// Container holding the groups of one entity, `None` for flat kinds.
    pub fn entity_dn(&self, name: &ShortName) -> Option<Dn> {
        self.is_nested()
            .then(|| Dn::ou(name.as_str(), &self.container))
    }

    /// Container the primary, admin and owner group of an entity are created in.
    pub fn parent_dn(&self, name: &ShortName) -> Dn {
        self.entity_dn(name).unwrap_or_else(|| self.container.clone())
    }

    pub fn primary_dn(&self, name: &ShortName) -> Dn {
        Dn::cn(&self.convention.primary_name(name), &self.parent_dn(name))
    }

    pub fn admin_dn(&self, name: &ShortName) -> Option<Dn> {
        self.has_admins()
            .then(|| Dn::cn(&self.convention.admin_name(name), &self.parent_dn(name)))
    }

    pub fn owner_dn(&self, name: &ShortName) -> Option<Dn> {
        self.convention
            .owner_name(name)
            .map(|owner| Dn::cn(&owner, &self.parent_dn(name)))
    }

    pub fn subgroups_dn(&self, name: &ShortName) -> Option<Dn> {
        if !self.subgroups {
            return None;
        }
        self.entity_dn(name)
            .map(|entity| Dn::ou(SUBGROUPS_CONTAINER, &entity))
    }

    /// DN of a sub-group, `Ok(None)` if this kind has no sub-groups.
    pub fn subgroup_dn(&self, name: &ShortName, sub: &ShortName) -> Result<Option<Dn>, NameError> {
        let Some(container) = self.subgroups_dn(name) else {
            return Ok(None);
        };
        let full_name = self.convention.subgroup_name(name, sub)?;
        Ok(Some(Dn::cn(&full_name, &container)))
    }
}
