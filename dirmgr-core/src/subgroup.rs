// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sub-groups nested below an entity.
//!
//! Sub-group members must be members of the parent entity when they are added. Removing a user
//! from the entity through [`Entities::remove_member`] also removes them from all sub-groups.
use tracing::{debug, info};

use crate::Dn;
use crate::directory::{Directory, DirectoryError};
use crate::entity::Entities;
use crate::error::EntityError;
use crate::gid;
use crate::kind::SUBGROUPS_CONTAINER;
use crate::naming::{SEPARATOR, ShortName};

impl<D> Entities<'_, D>
where
    D: Directory,
{
    pub fn subgroup_exists(
        &mut self,
        name: &ShortName,
        sub: &ShortName,
    ) -> Result<bool, EntityError> {
        let dn = self.subgroup_dn(name, sub)?;
        self.require(name)?;
        Ok(self.directory.group_exists(&dn)?)
    }

    /// Short names of all sub-groups of an entity in ascending order.
    pub fn subgroups(&mut self, name: &ShortName) -> Result<Vec<ShortName>, EntityError> {
        let container = self.subgroups_container(name)?;
        self.require(name)?;

        let groups = match self.directory.group_names_in_container(&container, false) {
            Ok(groups) => groups,
            Err(DirectoryError::NoSuchObject(_)) => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let prefix = format!("{}{SEPARATOR}", self.kind.convention().primary_name(name));
        let mut subgroups: Vec<ShortName> = groups
            .iter()
            .filter(|group| group.starts_with(&prefix))
            .filter_map(|group| self.kind.convention().subgroup_short_name(group))
            .collect();
        subgroups.sort();
        Ok(subgroups)
    }

    /// Creates a sub-group with a freshly allocated gid. Returns `false` if it already exists.
    pub fn create_subgroup(
        &mut self,
        name: &ShortName,
        sub: &ShortName,
    ) -> Result<bool, EntityError> {
        let dn = self.subgroup_dn(name, sub)?;
        self.require(name)?;

        if self.directory.group_exists(&dn)? {
            debug!(%dn, "subgroup already exists");
            return Ok(false);
        }

        if let Some(entity) = self.kind.entity_dn(name) {
            self.directory.create_container(&entity, SUBGROUPS_CONTAINER)?;
        }

        let gid = gid::next_gid(
            &mut *self.directory,
            &self.config.groups_base,
            self.config.gid_range,
        )?;
        let full_name = self.kind.convention().subgroup_name(name, sub)?;
        let container = self.subgroups_container(name)?;
        self.directory.create_group(&container, &full_name, gid)?;

        info!(kind = self.kind.name(), %name, %sub, gid, "created subgroup");
        Ok(true)
    }

    /// Deletes a sub-group regardless of its members. Returns `false` if it did not exist.
    pub fn delete_subgroup(
        &mut self,
        name: &ShortName,
        sub: &ShortName,
    ) -> Result<bool, EntityError> {
        let dn = self.subgroup_dn(name, sub)?;
        self.require(name)?;

        let deleted = self.directory.delete_group(&dn)?;
        if deleted {
            info!(kind = self.kind.name(), %name, %sub, "deleted subgroup");
        }
        Ok(deleted)
    }

    pub fn subgroup_member_usernames(
        &mut self,
        name: &ShortName,
        sub: &ShortName,
    ) -> Result<Vec<String>, EntityError> {
        let dn = self.existing_subgroup(name, sub)?;
        self.sorted_usernames(&dn)
    }

    /// Adds a member of the entity to one of its sub-groups.
    pub fn add_subgroup_member(
        &mut self,
        name: &ShortName,
        sub: &ShortName,
        username: &str,
    ) -> Result<bool, EntityError> {
        let dn = self.existing_subgroup(name, sub)?;
        let user = self.user_dn(username)?;

        if !self.directory.is_member(&self.kind.primary_dn(name), &user)? {
            return Err(EntityError::NotAMember {
                kind: self.kind.label().to_owned(),
                name: name.to_string(),
                user: username.to_owned(),
            });
        }

        Ok(self.directory.add_member(&dn, &user)?)
    }

    pub fn remove_subgroup_member(
        &mut self,
        name: &ShortName,
        sub: &ShortName,
        username: &str,
    ) -> Result<bool, EntityError> {
        let dn = self.existing_subgroup(name, sub)?;
        let user = self.user_dn(username)?;
        Ok(self.directory.remove_member(&dn, &user)?)
    }

    fn subgroups_container(&self, name: &ShortName) -> Result<Dn, EntityError> {
        self.kind
            .subgroups_dn(name)
            .ok_or_else(|| self.unsupported("subgroups"))
    }

    fn subgroup_dn(&self, name: &ShortName, sub: &ShortName) -> Result<Dn, EntityError> {
        self.kind
            .subgroup_dn(name, sub)?
            .ok_or_else(|| self.unsupported("subgroups"))
    }

    /// DN of a sub-group, failing if the entity or the sub-group does not exist.
    fn existing_subgroup(&mut self, name: &ShortName, sub: &ShortName) -> Result<Dn, EntityError> {
        let dn = self.subgroup_dn(name, sub)?;
        self.require(name)?;

        if !self.directory.group_exists(&dn)? {
            return Err(EntityError::SubgroupNotFound {
                kind: self.kind.label().to_owned(),
                name: name.to_string(),
                subgroup: sub.to_string(),
            });
        }
        Ok(dn)
    }
}
