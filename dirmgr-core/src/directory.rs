// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operations the entity engine needs from a directory service.
use thiserror::Error;

use crate::Dn;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Directory could not be reached or refused our credentials.
    #[error("directory connection failed: {0}")]
    Connection(String),

    /// Request was rejected by the directory for any other reason.
    #[error("directory request failed: {0}")]
    Protocol(String),

    #[error("no such object: {0}")]
    NoSuchObject(Dn),

    /// A uniqueness constraint was violated, for example two groups claiming the same gid.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Synchronous directory client.
///
/// Methods which create or remove something return `true` if the directory changed and `false`
/// if the object (or membership) was already in the requested state, so callers can treat
/// "already exists" as a silent success.
///
/// All methods take `&mut self` since a directory client is usually a single connection which
/// can only run one request at a time.
pub trait Directory {
    /// Creates the container `OU=<name>,<parent>`.
    fn create_container(&mut self, parent: &Dn, name: &str) -> Result<bool, DirectoryError>;

    /// Deletes a container and everything below it.
    fn delete_container_recursive(&mut self, dn: &Dn) -> Result<bool, DirectoryError>;

    /// Creates the group `CN=<name>,<parent>` carrying numeric id `gid`.
    fn create_group(&mut self, parent: &Dn, name: &str, gid: u32) -> Result<bool, DirectoryError>;

    fn delete_group(&mut self, dn: &Dn) -> Result<bool, DirectoryError>;

    fn group_exists(&mut self, dn: &Dn) -> Result<bool, DirectoryError>;

    /// Looks up a group by its common name anywhere below the groups base.
    fn resolve_group_dn(&mut self, name: &str) -> Result<Option<Dn>, DirectoryError>;

    /// Looks up a user by account name.
    fn resolve_user_dn(&mut self, username: &str) -> Result<Option<Dn>, DirectoryError>;

    fn add_member(&mut self, group: &Dn, user: &Dn) -> Result<bool, DirectoryError>;

    fn remove_member(&mut self, group: &Dn, user: &Dn) -> Result<bool, DirectoryError>;

    fn is_member(&mut self, group: &Dn, user: &Dn) -> Result<bool, DirectoryError>;

    /// Member references of a group. Fails with [`DirectoryError::NoSuchObject`] if the group
    /// does not exist.
    fn member_dns(&mut self, group: &Dn) -> Result<Vec<Dn>, DirectoryError>;

    /// Member account names of a group, taken from the first RDN of every member reference.
    fn member_usernames(&mut self, group: &Dn) -> Result<Vec<String>, DirectoryError> {
        Ok(self
            .member_dns(group)?
            .iter()
            .map(|member| member.rdn_value().to_owned())
            .collect())
    }

    /// Common names of all groups directly in `container`, or anywhere below it when
    /// `recursive` is set.
    fn group_names_in_container(
        &mut self,
        container: &Dn,
        recursive: bool,
    ) -> Result<Vec<String>, DirectoryError>;

    /// Highest numeric id of any group below `base`, `None` if no group carries one.
    fn max_gid(&mut self, base: &Dn) -> Result<Option<u32>, DirectoryError>;

    /// Numeric id of a single group.
    fn group_gid(&mut self, dn: &Dn) -> Result<Option<u32>, DirectoryError>;
}
