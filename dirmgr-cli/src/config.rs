// SPDX-License-Identifier: MIT OR Apache-2.0

//! YAML configuration merged with environment overrides.
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use dirmgr_core::{Config, Convention, Dn, EntityKind, GidRange, RosterPolicy};
use dirmgr_ldap::LdapSettings;
use serde::Deserialize;
use tracing::debug;

use crate::cli::LdapArgs;

pub const DEFAULT_PATH: &str = "/etc/directory-manager/config.yaml";

const DEFAULT_PORT: u16 = 636;
const DEFAULT_USERS_BASE_DN: &str = "dc=ad,dc=uoregon,dc=edu";
const DEFAULT_GROUPS_BASE_DN: &str = "ou=RACS,ou=Groups,ou=IS,ou=units,dc=ad,dc=uoregon,dc=edu";
const DEFAULT_MIN_GID: u32 = 50000;
const DEFAULT_MAX_GID: u32 = 60000;

/// Roster every member of a built-in kind belongs to, relative to the groups base.
const USERS_ROSTER: &str = "IS.RACS.Talapas.Users";

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub ldap_server: Option<String>,
    pub ldap_port: u16,
    pub ldap_username: Option<String>,
    pub ldap_password: Option<String>,
    pub ldap_users_base_dn: String,
    pub ldap_groups_base_dn: String,
    /// Container of the PIRGs, defaults to `OU=PIRGS` below the groups base.
    pub ldap_pirg_dn: Option<String>,
    /// Parent of the CephFS and CephS3 containers, defaults to `OU=Ceph` below the groups base.
    pub ldap_ceph_dn: Option<String>,
    pub ldap_min_gid: u32,
    pub ldap_max_gid: u32,
    pub roster_policy: String,

    /// Accepted for older configuration files. Group ids are never cached.
    pub data_path: Option<String>,

    /// Additional kinds, or replacements of built-in kinds with the same name.
    pub kinds: BTreeMap<String, KindSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ldap_server: None,
            ldap_port: DEFAULT_PORT,
            ldap_username: None,
            ldap_password: None,
            ldap_users_base_dn: DEFAULT_USERS_BASE_DN.to_owned(),
            ldap_groups_base_dn: DEFAULT_GROUPS_BASE_DN.to_owned(),
            ldap_pirg_dn: None,
            ldap_ceph_dn: None,
            ldap_min_gid: DEFAULT_MIN_GID,
            ldap_max_gid: DEFAULT_MAX_GID,
            roster_policy: RosterPolicy::default().to_string(),
            data_path: None,
            kinds: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("ldap_server", &self.ldap_server)
            .field("ldap_port", &self.ldap_port)
            .field("ldap_username", &self.ldap_username)
            .field("ldap_password", &self.ldap_password.as_ref().map(|_| "***"))
            .field("ldap_users_base_dn", &self.ldap_users_base_dn)
            .field("ldap_groups_base_dn", &self.ldap_groups_base_dn)
            .field("ldap_pirg_dn", &self.ldap_pirg_dn)
            .field("ldap_ceph_dn", &self.ldap_ceph_dn)
            .field("ldap_min_gid", &self.ldap_min_gid)
            .field("ldap_max_gid", &self.ldap_max_gid)
            .field("roster_policy", &self.roster_policy)
            .field("data_path", &self.data_path)
            .field("kinds", &self.kinds)
            .finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KindSettings {
    /// Name used in messages, defaults to the kind name.
    pub label: Option<String>,
    pub container_dn: Option<String>,
    pub prefix: Option<String>,
    pub suffix: String,
    pub owner_suffix: Option<String>,
    pub admins: bool,
    pub subgroups: bool,
    pub users_roster_dn: Option<String>,
    pub admins_roster_dn: Option<String>,
}

impl Settings {
    /// Reads the file at `path`. Without an explicit path the default location is used if it
    /// exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_PATH).exists() => Path::new(DEFAULT_PATH),
            None => {
                debug!("no configuration file found, using defaults");
                return Ok(Self::default());
            }
        };

        debug!(path = %path.display(), "loading configuration file");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file is a valid configuration.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(yaml)?;
        Ok(settings)
    }

    /// Values from the environment take precedence over the file.
    pub fn merge(mut self, overrides: &LdapArgs) -> Self {
        let LdapArgs {
            ldap_server,
            ldap_port,
            ldap_username,
            ldap_password,
            ldap_users_base_dn,
            ldap_groups_base_dn,
            ldap_pirg_dn,
            ldap_ceph_dn,
            ldap_min_gid,
            ldap_max_gid,
        } = overrides.clone();

        if ldap_server.is_some() {
            self.ldap_server = ldap_server;
        }
        if ldap_username.is_some() {
            self.ldap_username = ldap_username;
        }
        if ldap_password.is_some() {
            self.ldap_password = ldap_password;
        }
        if ldap_pirg_dn.is_some() {
            self.ldap_pirg_dn = ldap_pirg_dn;
        }
        if ldap_ceph_dn.is_some() {
            self.ldap_ceph_dn = ldap_ceph_dn;
        }
        self.ldap_port = ldap_port.unwrap_or(self.ldap_port);
        self.ldap_users_base_dn = ldap_users_base_dn.unwrap_or(self.ldap_users_base_dn);
        self.ldap_groups_base_dn = ldap_groups_base_dn.unwrap_or(self.ldap_groups_base_dn);
        self.ldap_min_gid = ldap_min_gid.unwrap_or(self.ldap_min_gid);
        self.ldap_max_gid = ldap_max_gid.unwrap_or(self.ldap_max_gid);
        self
    }

    /// Checks the merged settings and splits them into connection and manager configuration.
    pub fn resolve(self) -> Result<(LdapSettings, Config)> {
        let server = required(self.ldap_server, "ldap_server")?;
        let username = required(self.ldap_username, "ldap_username")?;
        let password = required(self.ldap_password, "ldap_password")?;
        ensure!(
            self.ldap_min_gid < self.ldap_max_gid,
            "ldap_min_gid must be less than ldap_max_gid"
        );
        let gid_range = GidRange::new(self.ldap_min_gid, self.ldap_max_gid)?;
        let roster_policy: RosterPolicy = self.roster_policy.parse()?;

        if let Some(path) = &self.data_path {
            debug!(%path, "ignoring data_path, group ids are not cached");
        }

        let groups_base = Dn::new(self.ldap_groups_base_dn);
        let pirg = container_or(self.ldap_pirg_dn, || Dn::ou("PIRGS", &groups_base));
        let ceph = container_or(self.ldap_ceph_dn, || Dn::ou("Ceph", &groups_base));
        let mut kinds = builtin_kinds(&groups_base, pirg, &ceph);
        kinds.extend(self.kinds);

        let mut config = Config::new(groups_base, gid_range).with_roster_policy(roster_policy);
        for (name, kind) in kinds {
            let kind = kind
                .into_kind(&name)
                .with_context(|| format!("invalid configuration of kind \"{name}\""))?;
            config = config.with_kind(kind);
        }

        let ldap = LdapSettings {
            server,
            port: self.ldap_port,
            username,
            password,
            users_base: Dn::new(self.ldap_users_base_dn),
            groups_base: config.groups_base().clone(),
        };
        Ok((ldap, config))
    }
}

impl KindSettings {
    fn into_kind(self, name: &str) -> Result<EntityKind> {
        let container = self.container_dn.filter(|dn| !dn.trim().is_empty());
        let Some(container) = container else {
            bail!("container_dn is required");
        };
        let prefix = self.prefix.unwrap_or_default();
        if prefix.is_empty() && self.suffix.is_empty() {
            bail!("prefix or suffix is required");
        }

        let mut convention = Convention::new(prefix, self.suffix);
        if let Some(owner_suffix) = self.owner_suffix {
            convention = convention.with_owner_suffix(owner_suffix);
        }

        let label = self.label.unwrap_or_else(|| name.to_owned());
        let mut kind = EntityKind::new(name, label, Dn::new(container), convention);
        if self.admins {
            kind = kind.with_admins();
        }
        if self.subgroups {
            kind = kind.with_subgroups();
        }
        if let Some(roster) = self.users_roster_dn {
            kind = kind.with_users_roster(Dn::new(roster));
        }
        if let Some(roster) = self.admins_roster_dn {
            kind = kind.with_admins_roster(Dn::new(roster));
        }
        Ok(kind)
    }
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => bail!("{key} is required"),
    }
}

fn container_or(dn: Option<String>, default: impl FnOnce() -> Dn) -> Dn {
    dn.filter(|dn| !dn.trim().is_empty())
        .map(Dn::new)
        .unwrap_or_else(default)
}

/// PIRGs, CephFS and CephS3 allocations and software groups. Rosters live below the groups base.
fn builtin_kinds(groups_base: &Dn, pirg: Dn, ceph: &Dn) -> BTreeMap<String, KindSettings> {
    let users_roster = Dn::cn(USERS_ROSTER, groups_base).to_string();

    let nested = |label: &str, container: Dn, prefix: &str, owner: &str, admins: &str| {
        KindSettings {
            label: Some(label.to_owned()),
            container_dn: Some(container.to_string()),
            prefix: Some(prefix.to_owned()),
            suffix: String::new(),
            owner_suffix: Some(owner.to_owned()),
            admins: true,
            subgroups: true,
            users_roster_dn: Some(users_roster.clone()),
            admins_roster_dn: Some(Dn::cn(admins, groups_base).to_string()),
        }
    };

    BTreeMap::from([
        (
            "pirg".to_owned(),
            nested(
                "PIRG",
                pirg,
                "is.racs.pirg.",
                "pi",
                "IS.RACS.Talapas.PirgAdmins",
            ),
        ),
        (
            "cephfs".to_owned(),
            nested(
                "CEPHFS",
                Dn::ou("CephFS", ceph),
                "is.racs.cephfs.",
                "owner",
                "IS.RACS.Talapas.CephAdmins",
            ),
        ),
        (
            "cephs3".to_owned(),
            nested(
                "CEPHS3",
                Dn::ou("CephS3", ceph),
                "is.racs.cephs3.",
                "owner",
                "IS.RACS.Talapas.CephS3Admins",
            ),
        ),
        (
            "software".to_owned(),
            KindSettings {
                label: Some("Software".to_owned()),
                container_dn: Some(Dn::ou("Software", groups_base).to_string()),
                prefix: Some("is.racs.software.".to_owned()),
                users_roster_dn: Some(users_roster.clone()),
                ..KindSettings::default()
            },
        ),
    ])
}
