// SPDX-License-Identifier: MIT OR Apache-2.0

//! Active Directory backend for `dirmgr-core`.
//!
//! [`LdapDirectory`] implements the [`Directory`](dirmgr_core::Directory) trait over a
//! synchronous, bound LDAPS connection. Groups are created as global security groups carrying
//! a `gidNumber`, containers as organizational units.
mod directory;
pub mod filter;

pub use directory::{LdapDirectory, LdapSettings};
