//! A flat, inode-based simple file system (SFS) on top of a fixed-size
//! block device.
//!
//! There are no directories and no path names: a mounted [`fs::FileSystem`]
//! is a flat table of inodes addressed by integer. Every inode has five
//! direct block pointers and one indirect (pointer-block) pointer,
//! giving a maximum file size of [`inode::MAX_FILE_SIZE`] bytes.
//!
//! ```no_run
//! use sfs::disk::MemDisk;
//! use sfs::fs::FileSystem;
//!
//! let mut disk = MemDisk::new(100);
//! FileSystem::format(&mut disk).unwrap();
//! let mut fs = FileSystem::mount(disk).unwrap();
//!
//! let n = fs.create().unwrap();
//! fs.write(n, b"hello", 0).unwrap();
//! assert_eq!(fs.stat(n).unwrap(), 5);
//! ```

pub mod bitmap;
pub mod block;
pub mod disk;
pub mod error;
pub mod fs;
pub mod inode;
pub mod superblock;

pub use disk::Disk;
pub use error::{Error, Result};
pub use fs::FileSystem;
