// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities.
//!
//! A seeded in-memory directory laid out like a small organisation: two nested kinds sharing a
//! users roster but with separate admin rosters, and one flat kind.

use crate::Dn;
use crate::config::{Config, RosterPolicy};
use crate::gid::GidRange;
use crate::kind::EntityKind;
use crate::manager::Manager;
use crate::memory::MemoryDirectory;
use crate::naming::{Convention, ShortName};

pub const USERS: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];

pub const MIN_GID: u32 = 50000;
pub const MAX_GID: u32 = 60000;

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

pub fn groups_base() -> Dn {
    Dn::new("OU=RACS,OU=Groups,DC=example,DC=org")
}

pub fn people() -> Dn {
    Dn::new("OU=People,DC=example,DC=org")
}

pub fn users_roster() -> Dn {
    Dn::cn("Talapas.Users", &groups_base())
}

pub fn pirg_admins_roster() -> Dn {
    Dn::cn("Talapas.PirgAdmins", &groups_base())
}

pub fn ceph_admins_roster() -> Dn {
    Dn::cn("Talapas.CephAdmins", &groups_base())
}

pub fn pirg_kind() -> EntityKind {
    EntityKind::new(
        "pirg",
        "PIRG",
        Dn::ou("PIRGS", &groups_base()),
        Convention::new("is.racs.pirg.", "").with_owner_suffix("pi"),
    )
    .with_subgroups()
    .with_users_roster(users_roster())
    .with_admins_roster(pirg_admins_roster())
}

pub fn cephfs_kind() -> EntityKind {
    EntityKind::new(
        "cephfs",
        "CEPHFS",
        Dn::ou("CephFS", &groups_base()),
        Convention::new("is.racs.cephfs.", "").with_owner_suffix("owner"),
    )
    .with_subgroups()
    .with_users_roster(users_roster())
    .with_admins_roster(ceph_admins_roster())
}

pub fn software_kind() -> EntityKind {
    EntityKind::new(
        "software",
        "Software",
        Dn::ou("Software", &groups_base()),
        Convention::new("is.racs.software.", ""),
    )
    .with_users_roster(users_roster())
}

pub fn config(policy: RosterPolicy) -> Config {
    Config::new(groups_base(), GidRange::new(MIN_GID, MAX_GID).unwrap())
        .with_kind(pirg_kind())
        .with_kind(cephfs_kind())
        .with_kind(software_kind())
        .with_roster_policy(policy)
}

/// Directory holding all kind containers, the rosters and [`USERS`].
pub fn directory() -> MemoryDirectory {
    let mut directory = MemoryDirectory::new();
    directory.insert_container(people());
    directory.insert_container(groups_base());
    for kind in [pirg_kind(), cephfs_kind(), software_kind()] {
        directory.insert_container(kind.container().clone());
    }

    // Rosters are not managed by this crate, their ids sit just below the managed range.
    directory.insert_group(users_roster(), Some(MIN_GID - 3));
    directory.insert_group(pirg_admins_roster(), Some(MIN_GID - 2));
    directory.insert_group(ceph_admins_roster(), Some(MIN_GID - 1));

    for user in USERS {
        directory.insert_user(&people(), user);
    }
    directory
}

pub fn manager() -> Manager<MemoryDirectory> {
    Manager::new(directory(), config(RosterPolicy::CrossEntity))
}

pub fn name(value: &str) -> ShortName {
    ShortName::new(value).unwrap()
}

pub fn user(username: &str) -> Dn {
    Dn::cn(username, &people())
}
