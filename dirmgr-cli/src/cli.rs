// SPDX-License-Identifier: MIT OR Apache-2.0

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "directory-manager", version, about)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short = 'c', long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(flatten)]
    pub ldap: LdapArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection settings taken from the environment, overriding the configuration file.
#[derive(Clone, Debug, Default, Args)]
pub struct LdapArgs {
    #[arg(long, env = "DIRECTORY_MANAGER_LDAP_SERVER", global = true, hide = true)]
    pub ldap_server: Option<String>,

    #[arg(long, env = "DIRECTORY_MANAGER_LDAP_PORT", global = true, hide = true)]
    pub ldap_port: Option<u16>,

    #[arg(long, env = "DIRECTORY_MANAGER_LDAP_USERNAME", global = true, hide = true)]
    pub ldap_username: Option<String>,

    #[arg(
        long,
        env = "DIRECTORY_MANAGER_LDAP_PASSWORD",
        global = true,
        hide = true,
        hide_env_values = true
    )]
    pub ldap_password: Option<String>,

    #[arg(long, env = "DIRECTORY_MANAGER_LDAP_USERS_BASE_DN", global = true, hide = true)]
    pub ldap_users_base_dn: Option<String>,

    #[arg(long, env = "DIRECTORY_MANAGER_LDAP_GROUPS_BASE_DN", global = true, hide = true)]
    pub ldap_groups_base_dn: Option<String>,

    #[arg(long, env = "DIRECTORY_MANAGER_LDAP_PIRG_DN", global = true, hide = true)]
    pub ldap_pirg_dn: Option<String>,

    #[arg(long, env = "DIRECTORY_MANAGER_LDAP_CEPH_DN", global = true, hide = true)]
    pub ldap_ceph_dn: Option<String>,

    #[arg(long, env = "DIRECTORY_MANAGER_LDAP_MIN_GID", global = true, hide = true)]
    pub ldap_min_gid: Option<u32>,

    #[arg(long, env = "DIRECTORY_MANAGER_LDAP_MAX_GID", global = true, hide = true)]
    pub ldap_max_gid: Option<u32>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage PIRGs.
    Pirg(EntityArgs),

    /// Manage CephFS allocations.
    Cephfs(EntityArgs),

    /// Manage CephS3 allocations.
    Cephs3(EntityArgs),

    /// Manage software groups.
    Software(EntityArgs),

    /// Manage entities of any configured kind.
    Kind {
        /// Name of the kind as configured.
        kind: String,

        /// Short name of the entity, not needed for `list`.
        name: Option<String>,

        #[command(subcommand)]
        action: EntityAction,
    },

    /// Print the next free group id.
    #[command(visible_alias = "nextgidnumber")]
    NextGid,
}

impl Command {
    /// Kind, entity name and action of entity commands.
    pub fn entity(&self) -> Option<(&str, Option<&str>, &EntityAction)> {
        let (kind, args) = match self {
            Command::Pirg(args) => ("pirg", args),
            Command::Cephfs(args) => ("cephfs", args),
            Command::Cephs3(args) => ("cephs3", args),
            Command::Software(args) => ("software", args),
            Command::Kind { kind, name, action } => {
                return Some((kind.as_str(), name.as_deref(), action));
            }
            Command::NextGid => return None,
        };
        Some((kind, args.name.as_deref(), &args.action))
    }
}

#[derive(Debug, Args)]
pub struct EntityArgs {
    /// Short name of the entity, not needed for `list`.
    pub name: Option<String>,

    #[command(subcommand)]
    pub action: EntityAction,
}

#[derive(Debug, Subcommand)]
pub enum EntityAction {
    /// List all entities.
    List,

    /// Create the entity.
    Create {
        /// Owner of the new entity.
        #[arg(long, visible_alias = "pi", value_name = "USER")]
        owner: Option<String>,
    },

    /// Delete the entity. It must not have members besides its owner.
    Delete,

    /// Print the owner.
    #[command(visible_alias = "get-pi")]
    GetOwner,

    /// Transfer ownership to a user.
    #[command(visible_alias = "set-pi")]
    SetOwner { user: String },

    /// Print the group id of the primary group.
    GetGid,

    ListMembers,

    AddMember {
        #[arg(required = true)]
        users: Vec<String>,
    },

    /// Remove users, including from all sub-groups and the admin group.
    RemoveMember {
        #[arg(required = true)]
        users: Vec<String>,
    },

    ListAdmins,

    AddAdmin {
        #[arg(required = true)]
        users: Vec<String>,
    },

    RemoveAdmin {
        #[arg(required = true)]
        users: Vec<String>,
    },

    /// Manage sub-groups.
    Subgroup(SubgroupArgs),
}

#[derive(Debug, Args)]
pub struct SubgroupArgs {
    /// Short name of the sub-group, not needed for `list`.
    pub name: Option<String>,

    #[command(subcommand)]
    pub action: SubgroupAction,
}

#[derive(Debug, Subcommand)]
pub enum SubgroupAction {
    /// List all sub-groups of the entity.
    List,

    Create,

    Delete,

    ListMembers,

    /// Add users, who must be members of the entity already.
    AddMember {
        #[arg(required = true)]
        users: Vec<String>,
    },

    RemoveMember {
        #[arg(required = true)]
        users: Vec<String>,
    },
}
