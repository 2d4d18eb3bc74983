// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cascading membership changes between the groups of an entity and the rosters.
//!
//! A user relates to an entity in one of these ways, each one including the previous:
//!
//! ```text
//! non-member -> member -> admin -> owner
//! ```
//!
//! Members are listed in the primary group, admins additionally in the admin group and the
//! owner additionally in the owner group. Rosters aggregate the members and admins of every
//! entity of one or more kinds.
use tracing::{debug, warn};

use crate::Dn;
use crate::config::RosterPolicy;
use crate::directory::{Directory, DirectoryError};
use crate::entity::Entities;
use crate::error::EntityError;
use crate::naming::ShortName;

#[derive(Clone, Copy, Debug)]
enum Role {
    Member,
    Admin,
}

impl<D> Entities<'_, D>
where
    D: Directory,
{
    /// Adds a user to the primary group and the users roster.
    ///
    /// Returns `false` without touching anything if the user is already a member.
    pub fn add_member(&mut self, name: &ShortName, username: &str) -> Result<bool, EntityError> {
        self.require(name)?;
        let user = self.user_dn(username)?;
        self.add_member_dn(name, &user)
    }

    /// Removes a user from the entity, its sub-groups and its admin group.
    ///
    /// Fails if the user is the current owner. Returns `false` if the user was not a member.
    pub fn remove_member(&mut self, name: &ShortName, username: &str) -> Result<bool, EntityError> {
        self.require(name)?;
        let user = self.user_dn(username)?;
        let kind = self.kind;
        let primary = kind.primary_dn(name);

        if !self.directory.is_member(&primary, &user)? {
            debug!(%name, username, "not a member");
            return Ok(false);
        }

        if self.is_owner(name, &user)? {
            return Err(EntityError::CannotRemoveOwner {
                kind: kind.label().to_owned(),
                name: name.to_string(),
                user: username.to_owned(),
            });
        }

        self.directory.remove_member(&primary, &user)?;

        if let Some(container) = kind.subgroups_dn(name) {
            let subgroups = match self.directory.group_names_in_container(&container, false) {
                Ok(subgroups) => subgroups,
                Err(DirectoryError::NoSuchObject(_)) => Vec::new(),
                Err(err) => return Err(err.into()),
            };
            for subgroup in subgroups {
                let dn = Dn::cn(&subgroup, &container);
                match self.directory.remove_member(&dn, &user) {
                    Ok(removed) => debug!(subgroup, removed, "remove from subgroup"),
                    Err(DirectoryError::NoSuchObject(_)) => {
                        debug!(subgroup, "subgroup vanished, skipping");
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        let mut was_admin = false;
        if let Some(admin) = kind.admin_dn(name) {
            if self.contains_member(&admin, &user)? {
                self.directory.remove_member(&admin, &user)?;
                was_admin = true;
            }
        }

        self.reconcile_rosters(&user, true, was_admin)?;
        Ok(true)
    }

    /// Grants admin rights to an existing member.
    pub fn add_admin(&mut self, name: &ShortName, username: &str) -> Result<bool, EntityError> {
        let admin = self.admin_dn(name)?;
        self.require(name)?;
        let user = self.user_dn(username)?;

        if !self.directory.is_member(&self.kind.primary_dn(name), &user)? {
            return Err(EntityError::NotAMember {
                kind: self.kind.label().to_owned(),
                name: name.to_string(),
                user: username.to_owned(),
            });
        }

        self.add_admin_dn(&admin, &user)
    }

    /// Revokes admin rights, the user stays a member.
    ///
    /// The owner keeps admin rights for as long as they own the entity.
    pub fn remove_admin(&mut self, name: &ShortName, username: &str) -> Result<bool, EntityError> {
        let admin = self.admin_dn(name)?;
        self.require(name)?;
        let user = self.user_dn(username)?;

        if !self.contains_member(&admin, &user)? {
            debug!(%name, username, "not an admin");
            return Ok(false);
        }

        if self.is_owner(name, &user)? {
            return Err(EntityError::CannotRemoveOwner {
                kind: self.kind.label().to_owned(),
                name: name.to_string(),
                user: username.to_owned(),
            });
        }

        self.directory.remove_member(&admin, &user)?;
        self.reconcile_rosters(&user, false, true)?;
        Ok(true)
    }

    /// Makes `username` the only owner of the entity.
    ///
    /// Previous owners lose the owner role but stay members and admins. The new owner becomes a
    /// member and an admin.
    pub fn set_owner(&mut self, name: &ShortName, username: &str) -> Result<(), EntityError> {
        let owner = self.owner_dn(name)?;
        self.require(name)?;
        let user = self.user_dn(username)?;

        let current = self.members_or_empty(&owner)?;
        if current.len() > 1 {
            warn!(
                kind = self.kind.name(),
                %name,
                owners = current.len(),
                "entity has more than one owner, removing all of them"
            );
        }
        for previous in current.iter().filter(|previous| **previous != user) {
            debug!(%name, previous = previous.rdn_value(), "remove previous owner");
            self.directory.remove_member(&owner, previous)?;
        }

        self.add_member_dn(name, &user)?;
        self.directory.add_member(&owner, &user)?;
        if let Some(admin) = self.kind.admin_dn(name) {
            self.add_admin_dn(&admin, &user)?;
        }
        Ok(())
    }

    pub(crate) fn is_owner(&mut self, name: &ShortName, user: &Dn) -> Result<bool, EntityError> {
        match self.kind.owner_dn(name) {
            Some(owner) => self.contains_member(&owner, user),
            None => Ok(false),
        }
    }

    fn add_member_dn(&mut self, name: &ShortName, user: &Dn) -> Result<bool, EntityError> {
        let primary = self.kind.primary_dn(name);
        if self.directory.is_member(&primary, user)? {
            debug!(%name, user = user.rdn_value(), "already a member");
            return Ok(false);
        }

        self.directory.add_member(&primary, user)?;
        if let Some(roster) = self.kind.users_roster() {
            self.directory.add_member(roster, user)?;
        }
        Ok(true)
    }

    fn add_admin_dn(&mut self, admin: &Dn, user: &Dn) -> Result<bool, EntityError> {
        if self.directory.is_member(admin, user)? {
            debug!(user = user.rdn_value(), "already an admin");
            return Ok(false);
        }

        self.directory.add_member(admin, user)?;
        if let Some(roster) = self.kind.admins_roster() {
            self.directory.add_member(roster, user)?;
        }
        Ok(true)
    }

    /// Removes `user` from the rosters of this kind once no entity feeding them grants the role
    /// anymore.
    pub(crate) fn reconcile_rosters(
        &mut self,
        user: &Dn,
        member_removed: bool,
        admin_removed: bool,
    ) -> Result<(), EntityError> {
        if self.config.roster_policy == RosterPolicy::Retain {
            return Ok(());
        }

        let kind = self.kind;
        if let Some(roster) = kind.users_roster().filter(|_| member_removed) {
            if !self.holds_role(user, roster, Role::Member)? {
                debug!(user = user.rdn_value(), %roster, "remove from users roster");
                self.directory.remove_member(roster, user)?;
            }
        }

        if let Some(roster) = kind.admins_roster().filter(|_| admin_removed) {
            if !self.holds_role(user, roster, Role::Admin)? {
                debug!(user = user.rdn_value(), %roster, "remove from admins roster");
                self.directory.remove_member(roster, user)?;
            }
        }

        Ok(())
    }

    /// True if any entity of any kind feeding `roster` grants `role` to `user`.
    fn holds_role(&mut self, user: &Dn, roster: &Dn, role: Role) -> Result<bool, EntityError> {
        let config = self.config;
        let kinds = config.kinds().iter().filter(|kind| match role {
            Role::Member => kind.users_roster() == Some(roster),
            Role::Admin => kind.admins_roster() == Some(roster),
        });

        for kind in kinds {
            let groups = match self
                .directory
                .group_names_in_container(kind.container(), true)
            {
                Ok(groups) => groups,
                Err(DirectoryError::NoSuchObject(_)) => continue,
                Err(err) => return Err(err.into()),
            };

            for entity in groups
                .iter()
                .filter_map(|group| kind.convention().short_name(group))
            {
                let group = match role {
                    Role::Member => Some(kind.primary_dn(&entity)),
                    Role::Admin => kind.admin_dn(&entity),
                };
                if let Some(group) = group {
                    if self.contains_member(&group, user)? {
                        return Ok(true);
                    }
                }
            }
        }

        Ok(false)
    }
}
