// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle and read projections of entities.
use tracing::{debug, info};

use crate::Dn;
use crate::config::Config;
use crate::directory::{Directory, DirectoryError};
use crate::error::EntityError;
use crate::gid;
use crate::kind::{EntityKind, SUBGROUPS_CONTAINER};
use crate::naming::ShortName;

/// Operations on all entities of one kind.
///
/// Obtained through [`Manager::entities`](crate::Manager::entities). Membership and sub-group
/// operations live in their own modules but are methods of this handle as well.
#[derive(Debug)]
pub struct Entities<'a, D> {
    pub(crate) directory: &'a mut D,
    pub(crate) config: &'a Config,
    pub(crate) kind: &'a EntityKind,
}

impl<'a, D> Entities<'a, D>
where
    D: Directory,
{
    pub(crate) fn new(directory: &'a mut D, config: &'a Config, kind: &'a EntityKind) -> Self {
        Self {
            directory,
            config,
            kind,
        }
    }

    pub fn kind(&self) -> &EntityKind {
        self.kind
    }

    /// True if the primary group of `name` exists anywhere in the directory.
    pub fn exists(&mut self, name: &ShortName) -> Result<bool, EntityError> {
        let primary = self.kind.convention().primary_name(name);
        Ok(self.directory.resolve_group_dn(&primary)?.is_some())
    }

    /// Creates an entity with its container and groups.
    ///
    /// Does nothing and returns `false` if every group of the entity already exists. A partially
    /// created entity is completed, skipping each object which is already present.
    ///
    /// Kinds with an owner role require `owner` unless the entity is already complete, it is made
    /// owner through [`set_owner`](Self::set_owner). For kinds without owner role a given `owner`
    /// is added as the first member (and admin, if the kind has admins).
    pub fn create(&mut self, name: &ShortName, owner: Option<&str>) -> Result<bool, EntityError> {
        let kind = self.kind;
        let parent = kind.parent_dn(name);
        let groups = self.group_names(name);
        let mut complete = true;
        for group in &groups {
            if !self.directory.group_exists(&Dn::cn(group, &parent))? {
                complete = false;
                break;
            }
        }
        if complete {
            debug!(kind = kind.name(), %name, "entity already exists");
            return Ok(false);
        }

        if kind.has_owner() && owner.is_none() {
            return Err(EntityError::MissingOwner {
                kind: kind.label().to_owned(),
                name: name.to_string(),
            });
        }

        // Resolve the user before writing anything.
        if let Some(owner) = owner {
            self.user_dn(owner)?;
        }

        let base_gid = gid::next_block(
            &mut *self.directory,
            &self.config.groups_base,
            self.config.gid_range,
            groups.len() as u32,
        )?;

        if let Some(entity) = kind.entity_dn(name) {
            self.directory.create_container(kind.container(), name.as_str())?;
            if kind.has_subgroups() {
                self.directory.create_container(&entity, SUBGROUPS_CONTAINER)?;
            }
        }

        for (offset, group) in (0u32..).zip(groups.iter()) {
            let created = self
                .directory
                .create_group(&parent, group, base_gid + offset)?;
            debug!(group, gid = base_gid + offset, created, "create group");
        }

        match owner {
            Some(owner) if kind.has_owner() => self.set_owner(name, owner)?,
            Some(owner) => {
                self.add_member(name, owner)?;
                if kind.has_admins() {
                    self.add_admin(name, owner)?;
                }
            }
            None => (),
        }

        info!(kind = kind.name(), %name, "created entity");
        Ok(true)
    }

    /// Deletes an entity together with all its sub-groups.
    ///
    /// Refuses to delete an entity which has members besides its owner. Returns `false` if the
    /// entity did not exist.
    pub fn delete(&mut self, name: &ShortName) -> Result<bool, EntityError> {
        if !self.exists(name)? {
            debug!(kind = self.kind.name(), %name, "entity does not exist");
            return Ok(false);
        }

        let kind = self.kind;
        let owners = match kind.owner_dn(name) {
            Some(owner) => self.members_or_empty(&owner)?,
            None => Vec::new(),
        };
        // Only a single owner is tolerated as the last member.
        if owners.len() > 1 {
            return Err(EntityError::AmbiguousOwner {
                kind: kind.label().to_owned(),
                name: name.to_string(),
                owners: owners
                    .iter()
                    .map(|owner| owner.rdn_value().to_owned())
                    .collect(),
            });
        }
        let others = self
            .directory
            .member_dns(&kind.primary_dn(name))?
            .into_iter()
            .filter(|member| !owners.contains(member))
            .count();
        if others > 0 {
            return Err(EntityError::NotEmpty {
                kind: kind.label().to_owned(),
                name: name.to_string(),
                count: others,
            });
        }

        match kind.entity_dn(name) {
            Some(entity) => self.directory.delete_container_recursive(&entity)?,
            None => self.directory.delete_group(&kind.primary_dn(name))?,
        };

        // The former owner might not hold a role anywhere else now.
        for owner in &owners {
            self.reconcile_rosters(owner, true, true)?;
        }

        info!(kind = kind.name(), %name, "deleted entity");
        Ok(true)
    }

    /// Short names of all entities of this kind in ascending order.
    pub fn list(&mut self) -> Result<Vec<ShortName>, EntityError> {
        let kind = self.kind;
        let mut names: Vec<ShortName> = self
            .directory
            .group_names_in_container(kind.container(), true)?
            .iter()
            .filter_map(|group| kind.convention().short_name(group))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub fn member_usernames(&mut self, name: &ShortName) -> Result<Vec<String>, EntityError> {
        self.require(name)?;
        let primary = self.kind.primary_dn(name);
        self.sorted_usernames(&primary)
    }

    pub fn admin_usernames(&mut self, name: &ShortName) -> Result<Vec<String>, EntityError> {
        let admin = self.admin_dn(name)?;
        self.require(name)?;
        self.sorted_usernames(&admin)
    }

    /// Username of the single member of the owner group.
    pub fn owner_username(&mut self, name: &ShortName) -> Result<String, EntityError> {
        let owner = self.owner_dn(name)?;
        self.require(name)?;

        let mut owners = self.members_or_empty(&owner)?;
        match owners.len() {
            0 => Err(EntityError::NoOwner {
                kind: self.kind.label().to_owned(),
                name: name.to_string(),
            }),
            1 => Ok(owners.remove(0).rdn_value().to_owned()),
            _ => Err(EntityError::AmbiguousOwner {
                kind: self.kind.label().to_owned(),
                name: name.to_string(),
                owners: owners
                    .iter()
                    .map(|owner| owner.rdn_value().to_owned())
                    .collect(),
            }),
        }
    }

    /// Numeric id of the primary group.
    pub fn gid(&mut self, name: &ShortName) -> Result<Option<u32>, EntityError> {
        self.require(name)?;
        let primary = self.kind.primary_dn(name);
        Ok(self.directory.group_gid(&primary)?)
    }

    /// Names of the primary, admin and owner group, in the order their gids are assigned.
    fn group_names(&self, name: &ShortName) -> Vec<String> {
        let convention = self.kind.convention();
        let mut names = vec![convention.primary_name(name)];
        if self.kind.has_admins() {
            names.push(convention.admin_name(name));
        }
        names.extend(convention.owner_name(name));
        names
    }

    pub(crate) fn require(&mut self, name: &ShortName) -> Result<(), EntityError> {
        if self.exists(name)? {
            Ok(())
        } else {
            Err(EntityError::EntityNotFound {
                kind: self.kind.label().to_owned(),
                name: name.to_string(),
            })
        }
    }

    pub(crate) fn user_dn(&mut self, username: &str) -> Result<Dn, EntityError> {
        self.directory
            .resolve_user_dn(username)?
            .ok_or_else(|| EntityError::UserNotFound(username.to_owned()))
    }

    pub(crate) fn admin_dn(&self, name: &ShortName) -> Result<Dn, EntityError> {
        self.kind.admin_dn(name).ok_or_else(|| self.unsupported("admins"))
    }

    pub(crate) fn owner_dn(&self, name: &ShortName) -> Result<Dn, EntityError> {
        self.kind.owner_dn(name).ok_or_else(|| self.unsupported("owner"))
    }

    pub(crate) fn unsupported(&self, role: &'static str) -> EntityError {
        EntityError::Unsupported {
            kind: self.kind.label().to_owned(),
            role,
        }
    }

    /// Members of a group, treating a missing group as empty.
    pub(crate) fn members_or_empty(&mut self, group: &Dn) -> Result<Vec<Dn>, EntityError> {
        match self.directory.member_dns(group) {
            Ok(members) => Ok(members),
            Err(DirectoryError::NoSuchObject(_)) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Membership check treating a missing group as not containing anyone.
    pub(crate) fn contains_member(&mut self, group: &Dn, user: &Dn) -> Result<bool, EntityError> {
        match self.directory.is_member(group, user) {
            Ok(member) => Ok(member),
            Err(DirectoryError::NoSuchObject(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn sorted_usernames(&mut self, group: &Dn) -> Result<Vec<String>, EntityError> {
        let mut usernames = self.directory.member_usernames(group)?;
        usernames.sort();
        Ok(usernames)
    }
}
