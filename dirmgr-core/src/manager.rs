// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::config::Config;
use crate::directory::Directory;
use crate::entity::Entities;
use crate::error::EntityError;
use crate::gid::{self, GidError};

/// Owns the directory connection and hands out per-kind [`Entities`] handles.
///
/// ```
/// # use dirmgr_core::{Config, Convention, Dn, EntityKind, GidRange, Manager, ShortName};
/// # use dirmgr_core::memory::MemoryDirectory;
/// let base = Dn::new("OU=RACS,DC=example,DC=org");
/// let mut directory = MemoryDirectory::new();
/// directory.insert_container(base.clone());
/// directory.insert_group(Dn::cn("seed", &base), Some(49999));
/// let alice = directory.insert_user(&Dn::new("OU=People,DC=example,DC=org"), "alice");
///
/// let config = Config::new(base.clone(), GidRange::new(50000, 60000).unwrap()).with_kind(
///     EntityKind::new("lab", "Lab", base, Convention::new("lab.", "").with_owner_suffix("owner")),
/// );
/// let mut manager = Manager::new(directory, config);
///
/// let acme = ShortName::new("acme").unwrap();
/// let mut labs = manager.entities("lab").unwrap();
/// labs.create(&acme, Some("alice")).unwrap();
/// assert_eq!(labs.owner_username(&acme).unwrap(), "alice");
/// ```
#[derive(Debug)]
pub struct Manager<D> {
    directory: D,
    config: Config,
}

impl<D> Manager<D>
where
    D: Directory,
{
    pub fn new(directory: D, config: Config) -> Self {
        Self { directory, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut D {
        &mut self.directory
    }

    pub fn into_directory(self) -> D {
        self.directory
    }

    /// Handle for all operations on entities of one kind.
    pub fn entities(&mut self, kind: &str) -> Result<Entities<'_, D>, EntityError> {
        let entity_kind = self
            .config
            .kind(kind)
            .ok_or_else(|| EntityError::UnknownKind(kind.to_owned()))?;
        Ok(Entities::new(&mut self.directory, &self.config, entity_kind))
    }

    /// Next group id which would be handed out, without reserving it.
    pub fn next_gid(&mut self) -> Result<u32, GidError> {
        gid::next_gid(
            &mut self.directory,
            &self.config.groups_base,
            self.config.gid_range,
        )
    }
}
