//! The block device abstraction the filesystem core is built on.

use crate::block::{Block, BLOCK_SIZE};
use libc::ioctl;
use std::fs::{File, OpenOptions};
use std::io::{self, Error, Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

/// ioctl macro: command.
macro_rules! ioc {
    ($a:expr, $b:expr, $c:expr, $d:expr) => {
        (($a) << 30) | (($b) << 8) | ($c) | (($d) << 16)
    };
}

/// ioctl macro: read command.
macro_rules! ior {
    ($a:expr, $b:expr, $c:ty) => {
        ioc!(2, $a, $b, std::mem::size_of::<$c>() as std::ffi::c_long)
    };
}

/// ioctl command: get size of disk in number of sectors.
const BLKGETSIZE64: std::ffi::c_long = ior!(0x12, 114, u64);

/// A block device exposing uniform [`BLOCK_SIZE`]-byte blocks addressed
/// by a zero-based 32-bit block number.
///
/// Implementations are expected to own whatever resource backs them
/// (a file descriptor, a buffer) and are bound to a single
/// [`crate::fs::FileSystem`] for the lifetime of a mount.
pub trait Disk {
    /// Reads block `block_num` into `buf`.
    fn read(&mut self, block_num: u32, buf: &mut Block) -> io::Result<()>;
    /// Writes `buf` to block `block_num`.
    fn write(&mut self, block_num: u32, buf: &Block) -> io::Result<()>;
    /// Total number of blocks the disk exposes.
    fn size(&self) -> u32;
    /// Marks the disk as mounted.
    fn mount(&mut self);
    /// Whether the disk is currently mounted.
    fn mounted(&self) -> bool;
}

/// Returns the number of `BLOCK_SIZE`-byte blocks backing the open file
/// `f` at `path`: via `BLKGETSIZE64` for a block/character device, or
/// via the file's length for a regular file (a disk image).
fn block_count(path: &Path, f: &File) -> io::Result<u32> {
    let metadata = f.metadata()?;
    let file_type = metadata.file_type();
    let bytes = if file_type.is_block_device() || file_type.is_char_device() {
        let mut sectors: u64 = 0;
        let ret = unsafe { ioctl(f.as_raw_fd(), BLKGETSIZE64 as _, &mut sectors) };
        if ret < 0 {
            return Err(Error::last_os_error());
        }
        sectors * 512
    } else if file_type.is_file() {
        metadata.len()
    } else {
        return Err(Error::new(
            io::ErrorKind::InvalidInput,
            format!("{}: not a regular file or a block device", path.display()),
        ));
    };
    Ok((bytes / BLOCK_SIZE as u64) as u32)
}

/// A [`Disk`] backed by a real file: either a disk image on a regular
/// filesystem, or a raw block/character device.
pub struct FileDisk {
    file: File,
    blocks: u32,
    mounted: bool,
}

impl FileDisk {
    /// Opens `path` for reading and writing and determines its block
    /// count. Does not format or validate any on-disk structure.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let blocks = block_count(path, &file)?;
        Ok(Self {
            file,
            blocks,
            mounted: false,
        })
    }
}

impl Disk for FileDisk {
    fn read(&mut self, block_num: u32, buf: &mut Block) -> io::Result<()> {
        self.file
            .seek(SeekFrom::Start(block_num as u64 * BLOCK_SIZE as u64))?;
        self.file.read_exact(buf)
    }

    fn write(&mut self, block_num: u32, buf: &Block) -> io::Result<()> {
        self.file
            .seek(SeekFrom::Start(block_num as u64 * BLOCK_SIZE as u64))?;
        self.file.write_all(buf)
    }

    fn size(&self) -> u32 {
        self.blocks
    }

    fn mount(&mut self) {
        self.mounted = true;
    }

    fn mounted(&self) -> bool {
        self.mounted
    }
}

/// A [`Disk`] backed by a plain in-memory buffer. Used by the test
/// suite and by the `demo` subcommand, where no real file is wanted.
pub struct MemDisk {
    blocks: Vec<Block>,
    mounted: bool,
}

impl MemDisk {
    /// Creates a zero-filled in-memory disk of `blocks` blocks.
    pub fn new(blocks: u32) -> Self {
        Self {
            blocks: vec![[0u8; BLOCK_SIZE]; blocks as usize],
            mounted: false,
        }
    }
}

impl Disk for MemDisk {
    fn read(&mut self, block_num: u32, buf: &mut Block) -> io::Result<()> {
        let block = self.blocks.get(block_num as usize).ok_or_else(|| {
            Error::new(io::ErrorKind::InvalidInput, "block number out of range")
        })?;
        buf.copy_from_slice(block);
        Ok(())
    }

    fn write(&mut self, block_num: u32, buf: &Block) -> io::Result<()> {
        let block = self.blocks.get_mut(block_num as usize).ok_or_else(|| {
            Error::new(io::ErrorKind::InvalidInput, "block number out of range")
        })?;
        block.copy_from_slice(buf);
        Ok(())
    }

    fn size(&self) -> u32 {
        self.blocks.len() as u32
    }

    fn mount(&mut self) {
        self.mounted = true;
    }

    fn mounted(&self) -> bool {
        self.mounted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_disk_round_trip() {
        let mut disk = MemDisk::new(4);
        assert_eq!(disk.size(), 4);
        assert!(!disk.mounted());

        let mut block = [0u8; BLOCK_SIZE];
        block[0] = 0xab;
        disk.write(2, &block).unwrap();

        let mut out = [0u8; BLOCK_SIZE];
        disk.read(2, &mut out).unwrap();
        assert_eq!(out, block);

        let mut untouched = [0u8; BLOCK_SIZE];
        disk.read(0, &mut untouched).unwrap();
        assert_eq!(untouched, [0u8; BLOCK_SIZE]);

        disk.mount();
        assert!(disk.mounted());
    }

    #[test]
    fn mem_disk_out_of_range() {
        let mut disk = MemDisk::new(1);
        let buf = [0u8; BLOCK_SIZE];
        assert!(disk.write(1, &buf).is_err());
    }

    #[test]
    fn file_disk_round_trip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(4 * BLOCK_SIZE as u64).unwrap();

        let mut disk = FileDisk::open(file.path()).unwrap();
        assert_eq!(disk.size(), 4);
        assert!(!disk.mounted());

        let mut block = [0u8; BLOCK_SIZE];
        block[10] = 0x7a;
        disk.write(3, &block).unwrap();
        drop(disk);

        // Reopening picks the write back up from the underlying file.
        let mut reopened = FileDisk::open(file.path()).unwrap();
        let mut out = [0u8; BLOCK_SIZE];
        reopened.read(3, &mut out).unwrap();
        assert_eq!(out, block);
    }

    #[test]
    fn file_disk_format_and_mount_round_trip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(20 * BLOCK_SIZE as u64).unwrap();

        let mut disk = FileDisk::open(file.path()).unwrap();
        crate::fs::FileSystem::format(&mut disk).unwrap();
        let mut fs = crate::fs::FileSystem::mount(disk).unwrap();

        let n = fs.create().unwrap();
        fs.write(n, b"persisted", 0).unwrap();
        assert_eq!(fs.stat(n).unwrap(), 9);
    }
}
