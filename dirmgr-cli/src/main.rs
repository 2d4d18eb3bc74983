// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manages research groups, storage allocations and software groups in Active Directory.
mod cli;
mod config;

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use dirmgr_core::{Directory, Entities, EntityError, Manager, ShortName};
use dirmgr_ldap::LdapDirectory;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::cli::{Cli, EntityAction, SubgroupAction, SubgroupArgs};
use crate::config::Settings;

/// Logs to stderr. `RUST_LOG` takes precedence over the `--debug` flag.
fn setup_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<EntityError>() {
            // Asking for something which does not exist is not a failure.
            Some(not_found) if not_found.is_not_found() => {
                println!("{not_found}.");
                ExitCode::SUCCESS
            }
            _ => {
                eprintln!("Error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?.merge(&cli.ldap);
    debug!(?settings, "loaded configuration");
    let (ldap, config) = settings.resolve()?;

    let directory = LdapDirectory::connect(&ldap).context("failed to connect to directory")?;
    let mut manager = Manager::new(directory, config);

    match cli.command.entity() {
        Some((kind, name, action)) => {
            let mut entities = manager.entities(kind)?;
            run_entity(&mut entities, name, action)
        }
        None => {
            println!("{}", manager.next_gid()?);
            Ok(())
        }
    }
}

fn run_entity<D: Directory>(
    entities: &mut Entities<'_, D>,
    name: Option<&str>,
    action: &EntityAction,
) -> Result<()> {
    let label = entities.kind().label().to_owned();
    let name = match (action, name) {
        (EntityAction::List, _) => {
            for name in entities.list()? {
                println!("{name}");
            }
            return Ok(());
        }
        (_, Some(name)) => ShortName::new(name)?,
        (_, None) => bail!("missing {label} name"),
    };

    match action {
        EntityAction::List => {}
        EntityAction::Create { owner } => {
            if !entities.create(&name, owner.as_deref())? {
                println!("{label} {name} already exists.");
            }
        }
        EntityAction::Delete => {
            if !entities.delete(&name)? {
                return Err(EntityError::EntityNotFound {
                    kind: label,
                    name: name.to_string(),
                }
                .into());
            }
        }
        EntityAction::GetOwner => println!("{}", entities.owner_username(&name)?),
        EntityAction::SetOwner { user } => entities.set_owner(&name, user)?,
        EntityAction::GetGid => match entities.gid(&name)? {
            Some(gid) => println!("{gid}"),
            None => bail!("{label} {name} has no gid"),
        },
        EntityAction::ListMembers => print_all(entities.member_usernames(&name)?),
        EntityAction::AddMember { users } => {
            for user in users {
                entities
                    .add_member(&name, user)
                    .with_context(|| format!("failed to add {user} to {label} {name}"))?;
            }
        }
        EntityAction::RemoveMember { users } => {
            for user in users {
                entities
                    .remove_member(&name, user)
                    .with_context(|| format!("failed to remove {user} from {label} {name}"))?;
            }
        }
        EntityAction::ListAdmins => print_all(entities.admin_usernames(&name)?),
        EntityAction::AddAdmin { users } => {
            for user in users {
                entities
                    .add_admin(&name, user)
                    .with_context(|| format!("failed to make {user} admin of {label} {name}"))?;
            }
        }
        EntityAction::RemoveAdmin { users } => {
            for user in users {
                entities.remove_admin(&name, user).with_context(|| {
                    format!("failed to remove {user} as admin of {label} {name}")
                })?;
            }
        }
        EntityAction::Subgroup(args) => run_subgroup(entities, &name, args)?,
    }
    Ok(())
}

fn run_subgroup<D: Directory>(
    entities: &mut Entities<'_, D>,
    name: &ShortName,
    args: &SubgroupArgs,
) -> Result<()> {
    let sub = match (&args.action, args.name.as_deref()) {
        (SubgroupAction::List, _) => {
            print_all(entities.subgroups(name)?);
            return Ok(());
        }
        (_, Some(sub)) => ShortName::new(sub)?,
        (_, None) => bail!("missing subgroup name"),
    };

    match &args.action {
        SubgroupAction::List => {}
        SubgroupAction::Create => {
            if !entities.create_subgroup(name, &sub)? {
                println!("subgroup {sub} of {} {name} already exists.", entities.kind().label());
            }
        }
        SubgroupAction::Delete => {
            if !entities.delete_subgroup(name, &sub)? {
                return Err(EntityError::SubgroupNotFound {
                    kind: entities.kind().label().to_owned(),
                    name: name.to_string(),
                    subgroup: sub.to_string(),
                }
                .into());
            }
        }
        SubgroupAction::ListMembers => print_all(entities.subgroup_member_usernames(name, &sub)?),
        SubgroupAction::AddMember { users } => {
            for user in users {
                entities
                    .add_subgroup_member(name, &sub, user)
                    .with_context(|| format!("failed to add {user} to subgroup {sub}"))?;
            }
        }
        SubgroupAction::RemoveMember { users } => {
            for user in users {
                entities
                    .remove_subgroup_member(name, &sub, user)
                    .with_context(|| format!("failed to remove {user} from subgroup {sub}"))?;
            }
        }
    }
    Ok(())
}

fn print_all<T: std::fmt::Display>(values: Vec<T>) {
    for value in values {
        println!("{value}");
    }
}
