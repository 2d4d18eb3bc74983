// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

use crate::directory::DirectoryError;
use crate::gid::GidError;
use crate::naming::NameError;

#[derive(Debug, Error)]
pub enum EntityError {
    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("unknown entity kind \"{0}\"")]
    UnknownKind(String),

    #[error("{kind} {name} not found")]
    EntityNotFound { kind: String, name: String },

    #[error("subgroup {subgroup} of {kind} {name} not found")]
    SubgroupNotFound {
        kind: String,
        name: String,
        subgroup: String,
    },

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("{kind} {name} still has {count} member(s) besides the owner, remove them first")]
    NotEmpty {
        kind: String,
        name: String,
        count: usize,
    },

    #[error("{kind} {name} has no owner")]
    NoOwner { kind: String, name: String },

    #[error("{kind} {name} has more than one owner: {}", .owners.join(", "))]
    AmbiguousOwner {
        kind: String,
        name: String,
        owners: Vec<String>,
    },

    #[error("{user} is the owner of {kind} {name}, set a new owner first")]
    CannotRemoveOwner {
        kind: String,
        name: String,
        user: String,
    },

    #[error("{user} is not a member of {kind} {name}")]
    NotAMember {
        kind: String,
        name: String,
        user: String,
    },

    #[error("{kind} entities have no {role}")]
    Unsupported { kind: String, role: &'static str },

    #[error("{kind} {name} can not be created without an owner")]
    MissingOwner { kind: String, name: String },

    #[error(transparent)]
    Gid(#[from] GidError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl EntityError {
    /// True if the entity or sub-group an operation addressed does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EntityError::EntityNotFound { .. } | EntityError::SubgroupNotFound { .. }
        )
    }
}
