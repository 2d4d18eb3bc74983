// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashSet;
use std::fmt;

use dirmgr_core::{Directory, DirectoryError, Dn};
use ldap3::controls::RawControl;
use ldap3::{LdapConn, LdapError, LdapResult, Mod, Scope, SearchEntry, SearchResult};
use tracing::{debug, warn};

use crate::filter;

// Result codes, RFC 4511 section 4.1.9
const SUCCESS: u32 = 0;
const NO_SUCH_ATTRIBUTE: u32 = 16;
const ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
const NO_SUCH_OBJECT: u32 = 32;
const UNWILLING_TO_PERFORM: u32 = 53;
const ENTRY_ALREADY_EXISTS: u32 = 68;

/// Deletes an object together with all its children in one request (Active Directory).
const TREE_DELETE_OID: &str = "1.2.840.113556.1.4.805";

/// Global security group.
const GROUP_TYPE: &str = "-2147483646";

/// Connection parameters.
#[derive(Clone)]
pub struct LdapSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Subtree searched for user accounts.
    pub users_base: Dn,
    /// Subtree searched for groups.
    pub groups_base: Dn,
}

impl LdapSettings {
    pub fn url(&self) -> String {
        format!("ldaps://{}:{}", self.server, self.port)
    }
}

impl fmt::Debug for LdapSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("users_base", &self.users_base)
            .field("groups_base", &self.groups_base)
            .finish()
    }
}

/// Directory backed by an Active Directory server.
///
/// Holds a single bound connection which is released when the value is dropped.
pub struct LdapDirectory {
    conn: LdapConn,
    users_base: Dn,
    groups_base: Dn,
}

impl LdapDirectory {
    /// Connects over LDAPS and binds with the configured credentials.
    pub fn connect(settings: &LdapSettings) -> Result<Self, DirectoryError> {
        let url = settings.url();
        debug!(%url, "connecting to directory");
        let mut conn = LdapConn::new(&url)
            .map_err(|err| DirectoryError::Connection(format!("{url}: {err}")))?;

        let result = conn
            .simple_bind(&settings.username, &settings.password)
            .map_err(|err| DirectoryError::Connection(format!("bind failed: {err}")))?;
        if result.rc != SUCCESS {
            return Err(DirectoryError::Connection(format!("bind failed: {result}")));
        }

        Ok(Self {
            conn,
            users_base: settings.users_base.clone(),
            groups_base: settings.groups_base.clone(),
        })
    }

    /// Runs a search, returning `None` if `base` does not exist.
    fn search(
        &mut self,
        base: &Dn,
        scope: Scope,
        filter: &str,
        attrs: Vec<&str>,
    ) -> Result<Option<Vec<SearchEntry>>, DirectoryError> {
        let SearchResult(entries, result) = self
            .conn
            .search(base.as_str(), scope, filter, attrs)
            .map_err(protocol)?;

        match result.rc {
            SUCCESS => Ok(Some(
                entries.into_iter().map(SearchEntry::construct).collect(),
            )),
            NO_SUCH_OBJECT => Ok(None),
            _ => Err(unexpected(base, &result)),
        }
    }

    /// Runs a search, failing if `base` does not exist.
    fn search_existing(
        &mut self,
        base: &Dn,
        scope: Scope,
        filter: &str,
        attrs: Vec<&str>,
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        self.search(base, scope, filter, attrs)?
            .ok_or_else(|| DirectoryError::NoSuchObject(base.clone()))
    }

    fn add(
        &mut self,
        dn: &Dn,
        attrs: Vec<(&str, HashSet<&str>)>,
    ) -> Result<LdapResult, DirectoryError> {
        self.conn.add(dn.as_str(), attrs).map_err(protocol)
    }

    fn delete(&mut self, dn: &Dn) -> Result<bool, DirectoryError> {
        let result = self.conn.delete(dn.as_str()).map_err(protocol)?;
        match result.rc {
            SUCCESS => Ok(true),
            NO_SUCH_OBJECT => Ok(false),
            _ => Err(unexpected(dn, &result)),
        }
    }
}

impl Drop for LdapDirectory {
    fn drop(&mut self) {
        match self.conn.unbind() {
            Ok(()) => debug!("closed directory connection"),
            Err(err) => warn!(%err, "failed to close directory connection"),
        }
    }
}

impl fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("users_base", &self.users_base)
            .field("groups_base", &self.groups_base)
            .finish_non_exhaustive()
    }
}

impl Directory for LdapDirectory {
    fn create_container(&mut self, parent: &Dn, name: &str) -> Result<bool, DirectoryError> {
        let dn = Dn::ou(name, parent);
        let result = self.add(
            &dn,
            vec![
                ("objectClass", HashSet::from(["top", "organizationalUnit"])),
                ("ou", HashSet::from([name])),
            ],
        )?;

        match result.rc {
            SUCCESS => {
                debug!(%dn, "created container");
                Ok(true)
            }
            ENTRY_ALREADY_EXISTS => Ok(false),
            NO_SUCH_OBJECT => Err(DirectoryError::NoSuchObject(parent.clone())),
            _ => Err(unexpected(&dn, &result)),
        }
    }

    fn delete_container_recursive(&mut self, dn: &Dn) -> Result<bool, DirectoryError> {
        let result = self
            .conn
            .with_controls(vec![RawControl {
                ctype: TREE_DELETE_OID.to_owned(),
                crit: true,
                val: None,
            }])
            .delete(dn.as_str())
            .map_err(protocol)?;

        match result.rc {
            SUCCESS => {
                debug!(%dn, "deleted container recursively");
                Ok(true)
            }
            NO_SUCH_OBJECT => Ok(false),
            _ => Err(unexpected(dn, &result)),
        }
    }

    fn create_group(&mut self, parent: &Dn, name: &str, gid: u32) -> Result<bool, DirectoryError> {
        let dn = Dn::cn(name, parent);
        // Checked upfront since Active Directory also reports a taken account name as
        // "already exists".
        if self.group_exists(&dn)? {
            return Ok(false);
        }

        let gid_number = gid.to_string();
        let result = self.add(
            &dn,
            vec![
                ("objectClass", HashSet::from(["top", "group", "posixGroup"])),
                ("cn", HashSet::from([name])),
                ("sAMAccountName", HashSet::from([name])),
                ("groupType", HashSet::from([GROUP_TYPE])),
                ("gidNumber", HashSet::from([gid_number.as_str()])),
            ],
        )?;

        match result.rc {
            SUCCESS => {
                debug!(%dn, gid, "created group");
                Ok(true)
            }
            NO_SUCH_OBJECT => Err(DirectoryError::NoSuchObject(parent.clone())),
            ENTRY_ALREADY_EXISTS | ATTRIBUTE_OR_VALUE_EXISTS => Err(DirectoryError::Conflict(
                format!("{dn} with gid {gid}: {}", result.text),
            )),
            _ => Err(unexpected(&dn, &result)),
        }
    }

    fn delete_group(&mut self, dn: &Dn) -> Result<bool, DirectoryError> {
        self.delete(dn)
    }

    fn group_exists(&mut self, dn: &Dn) -> Result<bool, DirectoryError> {
        Ok(self
            .search(dn, Scope::Base, filter::GROUPS, vec![filter::NO_ATTRIBUTES])?
            .is_some_and(|entries| !entries.is_empty()))
    }

    fn resolve_group_dn(&mut self, name: &str) -> Result<Option<Dn>, DirectoryError> {
        let base = self.groups_base.clone();
        let entries = self
            .search(&base, Scope::Subtree, &filter::group_by_name(name), vec!["cn"])?
            .unwrap_or_default();
        Ok(entries.into_iter().next().map(|entry| Dn::new(entry.dn)))
    }

    fn resolve_user_dn(&mut self, username: &str) -> Result<Option<Dn>, DirectoryError> {
        let base = self.users_base.clone();
        let entries = self.search_existing(
            &base,
            Scope::Subtree,
            &filter::user_by_account(username),
            vec![filter::NO_ATTRIBUTES],
        )?;
        Ok(entries.into_iter().next().map(|entry| Dn::new(entry.dn)))
    }

    fn add_member(&mut self, group: &Dn, user: &Dn) -> Result<bool, DirectoryError> {
        let result = self
            .conn
            .modify(
                group.as_str(),
                vec![Mod::Add("member", HashSet::from([user.as_str()]))],
            )
            .map_err(protocol)?;

        match result.rc {
            SUCCESS => Ok(true),
            ENTRY_ALREADY_EXISTS | ATTRIBUTE_OR_VALUE_EXISTS => {
                debug!(%group, %user, "user already in group");
                Ok(false)
            }
            NO_SUCH_OBJECT => Err(DirectoryError::NoSuchObject(group.clone())),
            _ => Err(unexpected(group, &result)),
        }
    }

    fn remove_member(&mut self, group: &Dn, user: &Dn) -> Result<bool, DirectoryError> {
        let result = self
            .conn
            .modify(
                group.as_str(),
                vec![Mod::Delete("member", HashSet::from([user.as_str()]))],
            )
            .map_err(protocol)?;

        match result.rc {
            SUCCESS => Ok(true),
            NO_SUCH_ATTRIBUTE => Ok(false),
            // Active Directory refuses to remove a value which is not there
            UNWILLING_TO_PERFORM if !self.is_member(group, user)? => Ok(false),
            NO_SUCH_OBJECT => Err(DirectoryError::NoSuchObject(group.clone())),
            _ => Err(unexpected(group, &result)),
        }
    }

    fn is_member(&mut self, group: &Dn, user: &Dn) -> Result<bool, DirectoryError> {
        let entries = self.search_existing(
            group,
            Scope::Base,
            &filter::group_with_member(user.as_str()),
            vec![filter::NO_ATTRIBUTES],
        )?;
        Ok(!entries.is_empty())
    }

    fn member_dns(&mut self, group: &Dn) -> Result<Vec<Dn>, DirectoryError> {
        let entries = self.search_existing(group, Scope::Base, filter::GROUPS, vec!["member"])?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::NoSuchObject(group.clone()))?;
        Ok(filter::values(&entry.attrs, "member")
            .iter()
            .map(|member| Dn::new(member.as_str()))
            .collect())
    }

    fn group_names_in_container(
        &mut self,
        container: &Dn,
        recursive: bool,
    ) -> Result<Vec<String>, DirectoryError> {
        let scope = if recursive {
            Scope::Subtree
        } else {
            Scope::OneLevel
        };
        let entries = self.search_existing(container, scope, filter::GROUPS, vec!["cn"])?;
        Ok(entries
            .iter()
            .filter_map(|entry| filter::first_value(&entry.attrs, "cn"))
            .map(str::to_owned)
            .collect())
    }

    fn max_gid(&mut self, base: &Dn) -> Result<Option<u32>, DirectoryError> {
        let entries =
            self.search_existing(base, Scope::Subtree, filter::POSIX_GROUPS, vec!["gidNumber"])?;
        Ok(entries
            .iter()
            .filter_map(|entry| filter::first_value(&entry.attrs, "gidNumber"))
            .filter_map(|gid| gid.parse::<u32>().ok())
            .max())
    }

    fn group_gid(&mut self, dn: &Dn) -> Result<Option<u32>, DirectoryError> {
        let entries = self.search_existing(dn, Scope::Base, filter::GROUPS, vec!["gidNumber"])?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::NoSuchObject(dn.clone()))?;
        Ok(filter::first_value(&entry.attrs, "gidNumber").and_then(|gid| gid.parse().ok()))
    }
}

fn protocol(err: LdapError) -> DirectoryError {
    DirectoryError::Protocol(err.to_string())
}

fn unexpected(dn: &Dn, result: &LdapResult) -> DirectoryError {
    DirectoryError::Protocol(format!("{dn}: {result}"))
}
