// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_matches::assert_matches;

use crate::config::RosterPolicy;
use crate::directory::Directory;
use crate::error::EntityError;
use crate::manager::Manager;
use crate::memory::MemoryDirectory;
use crate::test_utils::{
    MAX_GID, MIN_GID, ceph_admins_roster, cephfs_kind, config, directory, manager, name,
    pirg_admins_roster, pirg_kind, setup_logging, software_kind, user, users_roster,
};

fn in_group(manager: &mut Manager<MemoryDirectory>, group: &crate::Dn, username: &str) -> bool {
    manager
        .directory_mut()
        .is_member(group, &user(username))
        .unwrap()
}

#[test]
fn create_entity_with_owner() {
    setup_logging();
    let mut manager = manager();
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    assert!(pirgs.create(&acme, Some("alice")).unwrap());
    assert!(pirgs.exists(&acme).unwrap());
    assert_eq!(pirgs.list().unwrap(), vec![acme.clone()]);
    assert_eq!(pirgs.owner_username(&acme).unwrap(), "alice");
    assert_eq!(pirgs.admin_usernames(&acme).unwrap(), vec!["alice"]);
    assert_eq!(pirgs.member_usernames(&acme).unwrap(), vec!["alice"]);
    assert_eq!(pirgs.gid(&acme).unwrap(), Some(MIN_GID));

    let kind = pirg_kind();
    assert_eq!(
        manager
            .directory_mut()
            .group_gid(&kind.admin_dn(&acme).unwrap())
            .unwrap(),
        Some(MIN_GID + 1)
    );
    assert_eq!(
        manager
            .directory_mut()
            .group_gid(&kind.owner_dn(&acme).unwrap())
            .unwrap(),
        Some(MIN_GID + 2)
    );
    assert!(in_group(&mut manager, &users_roster(), "alice"));
    assert!(in_group(&mut manager, &pirg_admins_roster(), "alice"));
    assert!(!in_group(&mut manager, &ceph_admins_roster(), "alice"));
}

#[test]
fn create_is_idempotent() {
    let mut manager = manager();
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    assert!(pirgs.create(&acme, Some("alice")).unwrap());
    assert!(!pirgs.create(&acme, Some("alice")).unwrap());
    assert!(!pirgs.create(&acme, Some("bob")).unwrap());
    assert_eq!(pirgs.owner_username(&acme).unwrap(), "alice");
    assert_eq!(pirgs.member_usernames(&acme).unwrap(), vec!["alice"]);

    // No ids were consumed by the repeated calls
    assert_eq!(manager.next_gid().unwrap(), MIN_GID + 3);
}

#[test]
fn create_on_complete_entity_ignores_owner() {
    let mut manager = manager();
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    assert!(pirgs.create(&acme, Some("alice")).unwrap());

    // The owner is neither required nor resolved once every group exists
    assert_matches!(pirgs.create(&acme, Some("mallory")), Ok(false));
    assert_matches!(pirgs.create(&acme, None), Ok(false));
    assert_eq!(pirgs.owner_username(&acme).unwrap(), "alice");
    assert_eq!(manager.next_gid().unwrap(), MIN_GID + 3);
}

#[test]
fn create_validates_before_writing() {
    let mut manager = manager();
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    assert_matches!(
        pirgs.create(&acme, None),
        Err(EntityError::MissingOwner { .. })
    );
    assert_matches!(
        pirgs.create(&acme, Some("mallory")),
        Err(EntityError::UserNotFound(username)) if username == "mallory"
    );
    assert!(!pirgs.exists(&acme).unwrap());
    assert!(
        !manager
            .directory()
            .contains(&pirg_kind().entity_dn(&acme).unwrap())
    );
}

#[test]
fn create_completes_partial_entity() {
    let mut manager = manager();
    let acme = name("acme");
    let kind = pirg_kind();

    // Only the container and the primary group made it into the directory
    let directory = manager.directory_mut();
    directory.create_container(kind.container(), "acme").unwrap();
    directory
        .create_group(
            &kind.entity_dn(&acme).unwrap(),
            "is.racs.pirg.acme",
            MIN_GID,
        )
        .unwrap();

    let mut pirgs = manager.entities("pirg").unwrap();
    assert!(pirgs.exists(&acme).unwrap());
    assert!(pirgs.create(&acme, Some("alice")).unwrap());
    assert_eq!(pirgs.owner_username(&acme).unwrap(), "alice");
    assert_eq!(pirgs.admin_usernames(&acme).unwrap(), vec!["alice"]);
    assert_eq!(pirgs.gid(&acme).unwrap(), Some(MIN_GID));
    assert!(pirgs.subgroups(&acme).unwrap().is_empty());
}

#[test]
fn add_member_is_idempotent() {
    let mut manager = manager();
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    pirgs.create(&acme, Some("alice")).unwrap();
    assert!(pirgs.add_member(&acme, "bob").unwrap());
    assert!(!pirgs.add_member(&acme, "bob").unwrap());
    assert_eq!(pirgs.member_usernames(&acme).unwrap(), vec!["alice", "bob"]);
    assert_eq!(pirgs.admin_usernames(&acme).unwrap(), vec!["alice"]);
    assert_matches!(
        pirgs.add_member(&acme, "mallory"),
        Err(EntityError::UserNotFound(_))
    );

    assert!(in_group(&mut manager, &users_roster(), "bob"));
    assert!(!in_group(&mut manager, &pirg_admins_roster(), "bob"));
}

#[test]
fn remove_member_cascades() {
    let mut manager = manager();
    let acme = name("acme");
    let (s1, s2) = (name("s1"), name("s2"));

    let mut pirgs = manager.entities("pirg").unwrap();
    pirgs.create(&acme, Some("alice")).unwrap();
    pirgs.add_member(&acme, "bob").unwrap();
    pirgs.add_admin(&acme, "bob").unwrap();
    pirgs.create_subgroup(&acme, &s1).unwrap();
    pirgs.create_subgroup(&acme, &s2).unwrap();
    pirgs.add_subgroup_member(&acme, &s1, "bob").unwrap();
    pirgs.add_subgroup_member(&acme, &s2, "alice").unwrap();

    assert!(pirgs.remove_member(&acme, "bob").unwrap());
    assert_eq!(pirgs.member_usernames(&acme).unwrap(), vec!["alice"]);
    assert_eq!(pirgs.admin_usernames(&acme).unwrap(), vec!["alice"]);
    assert!(pirgs.subgroup_member_usernames(&acme, &s1).unwrap().is_empty());
    assert_eq!(
        pirgs.subgroup_member_usernames(&acme, &s2).unwrap(),
        vec!["alice"]
    );

    // Not part of any other entity anymore
    assert!(!in_group(&mut manager, &users_roster(), "bob"));
    assert!(!in_group(&mut manager, &pirg_admins_roster(), "bob"));
    assert!(in_group(&mut manager, &users_roster(), "alice"));
}

#[test]
fn remove_member_of_non_member() {
    let mut manager = manager();
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    pirgs.create(&acme, Some("alice")).unwrap();
    assert!(!pirgs.remove_member(&acme, "bob").unwrap());
    assert_eq!(pirgs.member_usernames(&acme).unwrap(), vec!["alice"]);
}

#[test]
fn owner_can_not_be_removed() {
    let mut manager = manager();
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    pirgs.create(&acme, Some("alice")).unwrap();
    pirgs.add_member(&acme, "bob").unwrap();

    assert_matches!(
        pirgs.remove_member(&acme, "alice"),
        Err(EntityError::CannotRemoveOwner { user: username, .. }) if username == "alice"
    );
    assert_matches!(
        pirgs.remove_admin(&acme, "alice"),
        Err(EntityError::CannotRemoveOwner { .. })
    );
    assert_eq!(pirgs.member_usernames(&acme).unwrap(), vec!["alice", "bob"]);
    assert_eq!(pirgs.admin_usernames(&acme).unwrap(), vec!["alice"]);
    assert_eq!(pirgs.owner_username(&acme).unwrap(), "alice");
    assert!(in_group(&mut manager, &users_roster(), "alice"));
}

#[test]
fn users_roster_spans_kinds() {
    let mut manager = manager();
    let acme = name("acme");
    let store = name("store");

    manager
        .entities("pirg")
        .unwrap()
        .create(&acme, Some("alice"))
        .unwrap();
    manager
        .entities("pirg")
        .unwrap()
        .add_member(&acme, "bob")
        .unwrap();

    let mut cephfs = manager.entities("cephfs").unwrap();
    cephfs.create(&store, Some("carol")).unwrap();
    cephfs.add_member(&store, "bob").unwrap();

    // Still a member of a storage allocation
    manager
        .entities("pirg")
        .unwrap()
        .remove_member(&acme, "bob")
        .unwrap();
    assert!(in_group(&mut manager, &users_roster(), "bob"));

    manager
        .entities("cephfs")
        .unwrap()
        .remove_member(&store, "bob")
        .unwrap();
    assert!(!in_group(&mut manager, &users_roster(), "bob"));
}

#[test]
fn admins_roster_is_reconciled() {
    let mut manager = manager();
    let (acme, beta) = (name("acme"), name("beta"));

    let mut pirgs = manager.entities("pirg").unwrap();
    for pirg in [&acme, &beta] {
        pirgs.create(pirg, Some("alice")).unwrap();
        pirgs.add_member(pirg, "bob").unwrap();
        pirgs.add_admin(pirg, "bob").unwrap();
    }

    assert!(pirgs.remove_admin(&acme, "bob").unwrap());
    assert!(!pirgs.remove_admin(&acme, "bob").unwrap());
    assert_eq!(pirgs.member_usernames(&acme).unwrap(), vec!["alice", "bob"]);
    assert!(in_group(&mut manager, &pirg_admins_roster(), "bob"));

    manager
        .entities("pirg")
        .unwrap()
        .remove_admin(&beta, "bob")
        .unwrap();
    assert!(!in_group(&mut manager, &pirg_admins_roster(), "bob"));
    assert!(in_group(&mut manager, &users_roster(), "bob"));
}

#[test]
fn retain_policy_keeps_rosters() {
    let mut manager = Manager::new(directory(), config(RosterPolicy::Retain));
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    pirgs.create(&acme, Some("alice")).unwrap();
    pirgs.add_member(&acme, "bob").unwrap();
    pirgs.add_admin(&acme, "bob").unwrap();
    pirgs.remove_member(&acme, "bob").unwrap();

    assert!(in_group(&mut manager, &users_roster(), "bob"));
    assert!(in_group(&mut manager, &pirg_admins_roster(), "bob"));
}

#[test]
fn admin_requires_membership() {
    let mut manager = manager();
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    pirgs.create(&acme, Some("alice")).unwrap();

    assert_matches!(
        pirgs.add_admin(&acme, "bob"),
        Err(EntityError::NotAMember { user: username, .. }) if username == "bob"
    );
    pirgs.add_member(&acme, "bob").unwrap();
    assert!(pirgs.add_admin(&acme, "bob").unwrap());
    assert!(!pirgs.add_admin(&acme, "bob").unwrap());
    assert_eq!(pirgs.admin_usernames(&acme).unwrap(), vec!["alice", "bob"]);
    assert!(in_group(&mut manager, &pirg_admins_roster(), "bob"));
}

#[test]
fn set_owner_transfers_ownership() {
    let mut manager = manager();
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    pirgs.create(&acme, Some("alice")).unwrap();
    pirgs.set_owner(&acme, "bob").unwrap();

    assert_eq!(pirgs.owner_username(&acme).unwrap(), "bob");
    assert_eq!(pirgs.member_usernames(&acme).unwrap(), vec!["alice", "bob"]);
    assert_eq!(pirgs.admin_usernames(&acme).unwrap(), vec!["alice", "bob"]);

    // The previous owner is an ordinary admin now
    assert!(pirgs.remove_member(&acme, "alice").unwrap());
    assert_matches!(
        pirgs.remove_member(&acme, "bob"),
        Err(EntityError::CannotRemoveOwner { .. })
    );

    // Setting the same owner again changes nothing
    pirgs.set_owner(&acme, "bob").unwrap();
    assert_eq!(pirgs.owner_username(&acme).unwrap(), "bob");
    assert_eq!(pirgs.member_usernames(&acme).unwrap(), vec!["bob"]);
    assert!(in_group(&mut manager, &users_roster(), "bob"));
    assert!(in_group(&mut manager, &pirg_admins_roster(), "bob"));
}

#[test]
fn set_owner_repairs_multiple_owners() {
    let mut manager = manager();
    let acme = name("acme");
    let owner = pirg_kind().owner_dn(&acme).unwrap();

    manager
        .entities("pirg")
        .unwrap()
        .create(&acme, Some("alice"))
        .unwrap();
    manager
        .directory_mut()
        .add_member(&owner, &user("carol"))
        .unwrap();

    let mut pirgs = manager.entities("pirg").unwrap();
    assert_matches!(
        pirgs.owner_username(&acme),
        Err(EntityError::AmbiguousOwner { owners, .. }) if owners.len() == 2
    );

    pirgs.set_owner(&acme, "dave").unwrap();
    assert_eq!(pirgs.owner_username(&acme).unwrap(), "dave");
    assert_eq!(
        manager.directory_mut().member_usernames(&owner).unwrap(),
        vec!["dave"]
    );
}

#[test]
fn entity_without_owner() {
    let mut manager = manager();
    let acme = name("acme");
    let owner = pirg_kind().owner_dn(&acme).unwrap();

    manager
        .entities("pirg")
        .unwrap()
        .create(&acme, Some("alice"))
        .unwrap();
    manager
        .directory_mut()
        .remove_member(&owner, &user("alice"))
        .unwrap();

    assert_matches!(
        manager.entities("pirg").unwrap().owner_username(&acme),
        Err(EntityError::NoOwner { .. })
    );
}

#[test]
fn delete_requires_empty_entity() {
    let mut manager = manager();
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    pirgs.create(&acme, Some("alice")).unwrap();
    pirgs.create_subgroup(&acme, &name("gpu")).unwrap();
    pirgs.add_member(&acme, "bob").unwrap();

    assert_matches!(
        pirgs.delete(&acme),
        Err(EntityError::NotEmpty { count: 1, .. })
    );
    assert!(pirgs.exists(&acme).unwrap());

    pirgs.remove_member(&acme, "bob").unwrap();
    assert!(pirgs.delete(&acme).unwrap());
    assert!(!pirgs.exists(&acme).unwrap());
    assert!(pirgs.list().unwrap().is_empty());
    assert!(!pirgs.delete(&acme).unwrap());

    assert!(
        !manager
            .directory()
            .contains(&pirg_kind().entity_dn(&acme).unwrap())
    );
    assert!(!in_group(&mut manager, &users_roster(), "alice"));
    assert!(!in_group(&mut manager, &pirg_admins_roster(), "alice"));
}

#[test]
fn delete_refuses_ambiguous_owner() {
    let mut manager = manager();
    let acme = name("acme");

    let mut pirgs = manager.entities("pirg").unwrap();
    pirgs.create(&acme, Some("alice")).unwrap();
    pirgs.add_member(&acme, "bob").unwrap();

    // A second owner written behind the manager's back
    let owner = pirg_kind().owner_dn(&acme).unwrap();
    manager
        .directory_mut()
        .add_member(&owner, &user("bob"))
        .unwrap();

    let mut pirgs = manager.entities("pirg").unwrap();
    assert_matches!(
        pirgs.delete(&acme),
        Err(EntityError::AmbiguousOwner { owners, .. }) if owners.len() == 2
    );
    assert!(pirgs.exists(&acme).unwrap());
    assert!(in_group(&mut manager, &users_roster(), "bob"));
}

#[test]
fn subgroups() {
    let mut manager = manager();
    let acme = name("acme");
    let gpu = name("gpu");

    let mut pirgs = manager.entities("pirg").unwrap();
    pirgs.create(&acme, Some("alice")).unwrap();

    assert!(!pirgs.subgroup_exists(&acme, &gpu).unwrap());
    assert!(pirgs.create_subgroup(&acme, &gpu).unwrap());
    assert!(!pirgs.create_subgroup(&acme, &gpu).unwrap());
    assert!(pirgs.create_subgroup(&acme, &name("cpu")).unwrap());
    assert!(pirgs.subgroup_exists(&acme, &gpu).unwrap());
    assert_eq!(pirgs.subgroups(&acme).unwrap(), vec![name("cpu"), name("gpu")]);

    assert_matches!(
        pirgs.add_subgroup_member(&acme, &gpu, "bob"),
        Err(EntityError::NotAMember { .. })
    );
    pirgs.add_member(&acme, "bob").unwrap();
    assert!(pirgs.add_subgroup_member(&acme, &gpu, "bob").unwrap());
    assert!(!pirgs.add_subgroup_member(&acme, &gpu, "bob").unwrap());
    assert_eq!(
        pirgs.subgroup_member_usernames(&acme, &gpu).unwrap(),
        vec!["bob"]
    );
    assert!(pirgs.remove_subgroup_member(&acme, &gpu, "bob").unwrap());
    assert!(!pirgs.remove_subgroup_member(&acme, &gpu, "bob").unwrap());

    // Deleting ignores members
    pirgs.add_subgroup_member(&acme, &gpu, "alice").unwrap();
    assert!(pirgs.delete_subgroup(&acme, &gpu).unwrap());
    assert!(!pirgs.delete_subgroup(&acme, &gpu).unwrap());
    assert_eq!(pirgs.subgroups(&acme).unwrap(), vec![name("cpu")]);

    let missing = pirgs.subgroup_member_usernames(&acme, &gpu).unwrap_err();
    assert!(missing.is_not_found());
    assert_matches!(missing, EntityError::SubgroupNotFound { .. });

    assert_matches!(
        pirgs.create_subgroup(&acme, &name("admins")),
        Err(EntityError::InvalidName(_))
    );
    assert_matches!(
        pirgs.create_subgroup(&name("missing"), &gpu),
        Err(EntityError::EntityNotFound { .. })
    );

    // Sub-groups never show up as entities
    assert_eq!(pirgs.list().unwrap(), vec![acme]);
}

#[test]
fn flat_kind() {
    let mut manager = manager();
    let matlab = name("matlab");

    let mut software = manager.entities("software").unwrap();
    assert!(software.create(&matlab, None).unwrap());
    assert!(!software.create(&matlab, None).unwrap());
    assert_eq!(software.list().unwrap(), vec![matlab.clone()]);
    assert!(software.member_usernames(&matlab).unwrap().is_empty());

    assert_matches!(
        software.add_admin(&matlab, "alice"),
        Err(EntityError::Unsupported { role: "admins", .. })
    );
    assert_matches!(
        software.owner_username(&matlab),
        Err(EntityError::Unsupported { role: "owner", .. })
    );
    assert_matches!(
        software.subgroups(&matlab),
        Err(EntityError::Unsupported { role: "subgroups", .. })
    );

    software.add_member(&matlab, "alice").unwrap();
    assert_matches!(
        software.delete(&matlab),
        Err(EntityError::NotEmpty { count: 1, .. })
    );
    software.remove_member(&matlab, "alice").unwrap();
    assert!(software.delete(&matlab).unwrap());
    assert!(!software.exists(&matlab).unwrap());

    let kind = software_kind();
    assert!(manager.directory().contains(kind.container()));
    assert!(!in_group(&mut manager, &users_roster(), "alice"));
}

#[test]
fn list_is_sorted_and_filtered() {
    let mut manager = manager();

    let mut cephfs = manager.entities("cephfs").unwrap();
    for entity in ["zeta", "acme", "mid"] {
        cephfs.create(&name(entity), Some("alice")).unwrap();
        cephfs.create_subgroup(&name(entity), &name("ro")).unwrap();
    }
    assert_eq!(
        cephfs.list().unwrap(),
        vec![name("acme"), name("mid"), name("zeta")]
    );
    assert!(manager.entities("pirg").unwrap().list().unwrap().is_empty());
    assert_eq!(cephfs_kind().convention().owner_suffix(), Some("owner"));
}

#[test]
fn gids_stay_in_range_and_increase() {
    let mut manager = manager();
    let mut gids = Vec::new();

    for entity in ["a", "b", "c"] {
        let entity = name(entity);
        let mut pirgs = manager.entities("pirg").unwrap();
        pirgs.create(&entity, Some("alice")).unwrap();
        pirgs.create_subgroup(&entity, &name("sub")).unwrap();
        gids.push(pirgs.gid(&entity).unwrap().unwrap());
    }

    assert_eq!(gids, vec![MIN_GID, MIN_GID + 4, MIN_GID + 8]);
    assert!(gids.iter().all(|gid| (MIN_GID..MAX_GID).contains(gid)));
}

#[test]
fn unknown_entities() {
    let mut manager = manager();
    let acme = name("acme");

    assert_matches!(manager.entities("lab"), Err(EntityError::UnknownKind(_)));

    let mut pirgs = manager.entities("pirg").unwrap();
    assert!(!pirgs.exists(&acme).unwrap());
    assert!(!pirgs.delete(&acme).unwrap());
    for result in [
        pirgs.member_usernames(&acme).map(|_| ()),
        pirgs.add_member(&acme, "alice").map(|_| ()),
        pirgs.set_owner(&acme, "alice"),
    ] {
        let err = result.unwrap_err();
        assert!(err.is_not_found(), "{err}");
        assert_eq!(err.to_string(), "PIRG acme not found");
    }
}
