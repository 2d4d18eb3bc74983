// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle and membership consistency of directory-managed entities.
//!
//! An entity (a research group, a storage allocation, a software license, ...) is represented
//! in the directory by a primary group listing its members, an admin group, an optional owner
//! group and any number of sub-groups. This crate derives the names of these groups from the
//! entity's short name, allocates their numeric ids and keeps them consistent with each other
//! and with organisation-wide roster groups when users are added, removed or promoted.
//!
//! Entity kinds are plain configuration values ([`EntityKind`]), every kind is handled by the
//! same code. The directory itself is abstracted behind the [`Directory`] trait.
pub mod config;
pub mod directory;
mod dn;
mod entity;
mod error;
pub mod gid;
pub mod kind;
mod manager;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
mod membership;
pub mod naming;
mod subgroup;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
#[cfg(test)]
mod tests;

pub use config::{Config, RosterPolicy};
pub use directory::{Directory, DirectoryError};
pub use dn::Dn;
pub use entity::Entities;
pub use error::EntityError;
pub use gid::{GidError, GidRange};
pub use kind::EntityKind;
pub use manager::Manager;
pub use naming::{Convention, NameError, ShortName};
