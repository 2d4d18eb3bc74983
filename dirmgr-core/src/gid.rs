// SPDX-License-Identifier: MIT OR Apache-2.0

//! Allocation of numeric group ids.
//!
//! The next id is always one above the highest id found in the directory. There is no lock
//! around the read and the following group creation: the tool assumes a single writer at a time
//! and leaves it to the directory's uniqueness constraint to reject a colliding id.
use thiserror::Error;
use tracing::debug;

use crate::Dn;
use crate::directory::{Directory, DirectoryError};

#[derive(Debug, Error)]
pub enum GidError {
    #[error("invalid gid range, minimum {min} must be below maximum {max}")]
    InvalidRange { min: u32, max: u32 },

    #[error("no gid available, next gid {next} is not below maximum {max}")]
    Exhausted { next: u64, max: u32 },

    #[error("next gid {next} is below minimum {min}, check the configured gid range")]
    BelowRange { next: u64, min: u32 },

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Half-open range `[min, max)` of ids this tool may hand out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GidRange {
    min: u32,
    max: u32,
}

impl GidRange {
    pub fn new(min: u32, max: u32) -> Result<Self, GidError> {
        if min >= max {
            return Err(GidError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn contains(&self, gid: u32) -> bool {
        self.min <= gid && gid < self.max
    }
}

/// Returns the next free gid below `base`.
pub fn next_gid<D>(directory: &mut D, base: &Dn, range: GidRange) -> Result<u32, GidError>
where
    D: Directory + ?Sized,
{
    next_block(directory, base, range, 1)
}

/// Returns the first of `count` consecutive free gids below `base`.
///
/// Fails if any id of the block would leave `range`.
pub fn next_block<D>(
    directory: &mut D,
    base: &Dn,
    range: GidRange,
    count: u32,
) -> Result<u32, GidError>
where
    D: Directory + ?Sized,
{
    let highest = directory.max_gid(base)?.unwrap_or(0);
    let next = u64::from(highest) + 1;
    let last = next + u64::from(count.max(1)) - 1;

    if last >= u64::from(range.max) {
        return Err(GidError::Exhausted {
            next,
            max: range.max,
        });
    }

    if next < u64::from(range.min) {
        return Err(GidError::BelowRange {
            next,
            min: range.min,
        });
    }

    debug!(highest, next, count, "allocated gid block");

    // Both bounds were checked against u32 values above.
    Ok(next as u32)
}
