// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory implementation of the directory contract.
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::Dn;
use crate::directory::{Directory, DirectoryError};

#[derive(Clone, Debug)]
struct MemoryGroup {
    name: String,
    gid: Option<u32>,
    members: BTreeSet<Dn>,
}

/// Directory keeping containers, groups and users in memory.
///
/// Like a real directory it refuses to create objects below a missing container and rejects a
/// group whose name or numeric id is already taken. This does not persist data and only knows
/// the users it was seeded with. Use this only in development or test contexts.
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory {
    containers: BTreeSet<Dn>,
    groups: BTreeMap<Dn, MemoryGroup>,
    users: BTreeMap<String, Dn>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a container without requiring its parent to exist, for seeding base containers.
    pub fn insert_container(&mut self, dn: Dn) {
        self.containers.insert(dn);
    }

    /// Inserts a group without any checks, for seeding groups not managed by this crate.
    pub fn insert_group(&mut self, dn: Dn, gid: Option<u32>) {
        let name = dn.rdn_value().to_owned();
        self.groups.insert(
            dn,
            MemoryGroup {
                name,
                gid,
                members: BTreeSet::new(),
            },
        );
    }

    /// Inserts the user `CN=<username>,<parent>` and returns its DN.
    pub fn insert_user(&mut self, parent: &Dn, username: &str) -> Dn {
        let dn = Dn::cn(username, parent);
        self.users.insert(username.to_ascii_lowercase(), dn.clone());
        dn
    }

    pub fn contains(&self, dn: &Dn) -> bool {
        self.containers.contains(dn) || self.groups.contains_key(dn)
    }

    fn require_container(&self, dn: &Dn) -> Result<(), DirectoryError> {
        if self.containers.contains(dn) {
            Ok(())
        } else {
            Err(DirectoryError::NoSuchObject(dn.clone()))
        }
    }

    fn group(&self, dn: &Dn) -> Result<&MemoryGroup, DirectoryError> {
        self.groups
            .get(dn)
            .ok_or_else(|| DirectoryError::NoSuchObject(dn.clone()))
    }

    fn group_mut(&mut self, dn: &Dn) -> Result<&mut MemoryGroup, DirectoryError> {
        self.groups
            .get_mut(dn)
            .ok_or_else(|| DirectoryError::NoSuchObject(dn.clone()))
    }
}

impl Directory for MemoryDirectory {
    fn create_container(&mut self, parent: &Dn, name: &str) -> Result<bool, DirectoryError> {
        self.require_container(parent)?;
        let dn = Dn::ou(name, parent);
        if self.contains(&dn) {
            return Ok(false);
        }
        debug!(%dn, "create container");
        self.containers.insert(dn);
        Ok(true)
    }

    fn delete_container_recursive(&mut self, dn: &Dn) -> Result<bool, DirectoryError> {
        if !self.containers.contains(dn) {
            return Ok(false);
        }
        debug!(%dn, "delete container recursively");
        self.containers
            .retain(|container| container != dn && !container.is_descendant_of(dn));
        self.groups.retain(|group, _| !group.is_descendant_of(dn));
        Ok(true)
    }

    fn create_group(&mut self, parent: &Dn, name: &str, gid: u32) -> Result<bool, DirectoryError> {
        self.require_container(parent)?;
        let dn = Dn::cn(name, parent);
        if self.groups.contains_key(&dn) {
            return Ok(false);
        }

        if let Some((other, _)) = self
            .groups
            .iter()
            .find(|(_, group)| group.name.eq_ignore_ascii_case(name))
        {
            return Err(DirectoryError::Conflict(format!(
                "group name {name} already used by {other}"
            )));
        }

        if let Some((other, _)) = self
            .groups
            .iter()
            .find(|(_, group)| group.gid == Some(gid))
        {
            return Err(DirectoryError::Conflict(format!(
                "gid {gid} already used by {other}"
            )));
        }

        debug!(%dn, gid, "create group");
        self.groups.insert(
            dn,
            MemoryGroup {
                name: name.to_owned(),
                gid: Some(gid),
                members: BTreeSet::new(),
            },
        );
        Ok(true)
    }

    fn delete_group(&mut self, dn: &Dn) -> Result<bool, DirectoryError> {
        Ok(self.groups.remove(dn).is_some())
    }

    fn group_exists(&mut self, dn: &Dn) -> Result<bool, DirectoryError> {
        Ok(self.groups.contains_key(dn))
    }

    fn resolve_group_dn(&mut self, name: &str) -> Result<Option<Dn>, DirectoryError> {
        Ok(self
            .groups
            .iter()
            .find(|(_, group)| group.name.eq_ignore_ascii_case(name))
            .map(|(dn, _)| dn.clone()))
    }

    fn resolve_user_dn(&mut self, username: &str) -> Result<Option<Dn>, DirectoryError> {
        Ok(self.users.get(&username.to_ascii_lowercase()).cloned())
    }

    fn add_member(&mut self, group: &Dn, user: &Dn) -> Result<bool, DirectoryError> {
        Ok(self.group_mut(group)?.members.insert(user.clone()))
    }

    fn remove_member(&mut self, group: &Dn, user: &Dn) -> Result<bool, DirectoryError> {
        Ok(self.group_mut(group)?.members.remove(user))
    }

    fn is_member(&mut self, group: &Dn, user: &Dn) -> Result<bool, DirectoryError> {
        Ok(self.group(group)?.members.contains(user))
    }

    fn member_dns(&mut self, group: &Dn) -> Result<Vec<Dn>, DirectoryError> {
        Ok(self.group(group)?.members.iter().cloned().collect())
    }

    fn group_names_in_container(
        &mut self,
        container: &Dn,
        recursive: bool,
    ) -> Result<Vec<String>, DirectoryError> {
        self.require_container(container)?;
        Ok(self
            .groups
            .iter()
            .filter(|(dn, _)| {
                if recursive {
                    dn.is_descendant_of(container)
                } else {
                    dn.parent().as_ref() == Some(container)
                }
            })
            .map(|(_, group)| group.name.clone())
            .collect())
    }

    fn max_gid(&mut self, base: &Dn) -> Result<Option<u32>, DirectoryError> {
        self.require_container(base)?;
        Ok(self
            .groups
            .iter()
            .filter(|(dn, _)| dn.is_descendant_of(base))
            .filter_map(|(_, group)| group.gid)
            .max())
    }

    fn group_gid(&mut self, dn: &Dn) -> Result<Option<u32>, DirectoryError> {
        Ok(self.group(dn)?.gid)
    }
}
