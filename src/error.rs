//! The crate's single error type.
//!
//! Every fallible operation in the public API returns `Result<T, Error>`.
//! `NoSpace` from the original design notes has no variant here: a failed
//! block allocation during `write` is recovered locally as a partial
//! success rather than surfaced as an error (see [`crate::fs::FileSystem::write`]).

use std::io;

/// Errors produced by the filesystem core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned by `format`/`mount` when the disk is already mounted, or
    /// when the on-disk superblock does not match the disk's geometry.
    #[error("disk is not mountable: already mounted, or superblock mismatch")]
    NotMountable,
    /// An inode number whose slot is not currently valid.
    #[error("inode {0} is not valid")]
    InvalidInode(u32),
    /// A read offset that lies beyond the file's current size.
    #[error("offset exceeds file size")]
    OutOfRange,
    /// `create` found no free inode slot.
    #[error("no free inode slot available")]
    Exhausted,
    /// Propagated from the underlying `Disk`.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
